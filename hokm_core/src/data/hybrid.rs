//! Hybrid Data Layer: routes reads/writes across a hot store (low-latency,
//! short-lived) and a cold store (durable), per a static routing table keyed
//! by entity type, and reconciles them through a priority sync queue.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::circuit_breaker::{CircuitBreaker, CircuitBreakerError};

/// The kinds of data the Room Coordinator and auth layer persist. Each has a
/// fixed routing policy; see [`routing_for`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum EntityType {
    GameState,
    PlayerHand,
    MoveLog,
    Session,
    PlayerProfile,
    PlayerStats,
    CompletedGameRecord,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Store {
    Hot,
    Cold,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SyncPolicy {
    Immediate,
    Periodic { interval: Duration },
    OnEvent(&'static [&'static str]),
    /// Syncs right away on any of `events`, and otherwise no later than
    /// `interval` after the write — the periodic timer drains the queue
    /// regardless, but this also bounds how long a quiet write can wait.
    EventOrPeriodic { events: &'static [&'static str], interval: Duration },
    CacheOnRead,
    BatchedUpdates,
    None,
}

#[derive(Clone, Copy, Debug)]
pub struct RoutingEntry {
    pub primary: Store,
    pub secondary: Option<Store>,
    pub hot_ttl: Duration,
    pub sync_policy: SyncPolicy,
}

/// The static per-entity-type routing table described by the data layer design.
pub fn routing_for(entity: EntityType) -> RoutingEntry {
    use EntityType::*;
    use Store::*;
    match entity {
        GameState => RoutingEntry {
            primary: Hot,
            secondary: Some(Cold),
            hot_ttl: Duration::from_secs(2 * 3600),
            sync_policy: SyncPolicy::EventOrPeriodic {
                events: &["hand_complete", "game_over"],
                interval: Duration::from_secs(60),
            },
        },
        PlayerHand => RoutingEntry {
            primary: Hot,
            secondary: None,
            hot_ttl: Duration::from_secs(2 * 3600),
            sync_policy: SyncPolicy::None,
        },
        MoveLog => RoutingEntry {
            primary: Hot,
            secondary: Some(Cold),
            hot_ttl: Duration::from_secs(3600),
            sync_policy: SyncPolicy::Immediate,
        },
        Session => RoutingEntry {
            primary: Hot,
            secondary: None,
            hot_ttl: Duration::from_secs(30 * 60),
            sync_policy: SyncPolicy::None,
        },
        PlayerProfile => RoutingEntry {
            primary: Cold,
            secondary: Some(Hot),
            hot_ttl: Duration::from_secs(15 * 60),
            sync_policy: SyncPolicy::CacheOnRead,
        },
        PlayerStats => RoutingEntry {
            primary: Cold,
            secondary: Some(Hot),
            hot_ttl: Duration::from_secs(30 * 60),
            sync_policy: SyncPolicy::BatchedUpdates,
        },
        CompletedGameRecord => RoutingEntry {
            primary: Cold,
            secondary: None,
            hot_ttl: Duration::ZERO,
            sync_policy: SyncPolicy::Immediate,
        },
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub enum SyncPriority {
    High,
    Medium,
    Low,
}

impl SyncPriority {
    /// Target latency for a task at this priority, used only for observability.
    pub fn target_latency(&self) -> Duration {
        match self {
            SyncPriority::High => Duration::from_secs(1),
            SyncPriority::Medium => Duration::from_secs(30),
            SyncPriority::Low => Duration::from_secs(5 * 60),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SyncOp {
    Put,
    Delete,
}

#[derive(Clone, Debug)]
pub struct SyncTask {
    pub op: SyncOp,
    pub entity: EntityType,
    pub key: String,
    pub payload: Option<String>,
    pub retry_count: u32,
    pub priority: SyncPriority,
    /// Earliest time this task should be attempted. Set to now for a fresh
    /// task, or pushed out by the breaker's backoff delay after a failure.
    pub scheduled_at: Instant,
}

const DEFAULT_MAX_RETRIES: u32 = 3;

/// The four transaction modes callers may request for a `put`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransactionMode {
    WriteThrough,
    WriteBehind,
    Eventual,
    SingleStore(Store),
}

#[derive(Debug, thiserror::Error)]
pub enum DataLayerError {
    #[error("hot store unavailable")]
    HotStoreUnavailable,
    #[error("cold store unavailable")]
    ColdStoreUnavailable,
    #[error("entity not found")]
    NotFound,
    #[error("circuit open for {0}")]
    CircuitOpen(&'static str),
}

impl<E: std::fmt::Debug> From<CircuitBreakerError<E>> for DataLayerError {
    fn from(err: CircuitBreakerError<E>) -> Self {
        match err {
            CircuitBreakerError::Open => DataLayerError::CircuitOpen("store"),
            CircuitBreakerError::Operation(_) => DataLayerError::HotStoreUnavailable,
        }
    }
}

/// Backing store abstraction; production code backs `Hot` with Redis and
/// `Cold` with PostgreSQL, tests back both with an in-memory map.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn put(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), String>;
    async fn get(&self, key: &str) -> Result<Option<String>, String>;
    async fn delete(&self, key: &str) -> Result<(), String>;
}

/// An in-memory store used for tests and local development.
#[derive(Default)]
pub struct InMemoryStore {
    data: RwLock<HashMap<String, String>>,
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn put(&self, key: &str, value: String, _ttl: Option<Duration>) -> Result<(), String> {
        self.data.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, String> {
        Ok(self.data.read().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), String> {
        self.data.write().await.remove(key);
        Ok(())
    }
}

/// Routes `put`/`get`/`delete` across the hot and cold stores per
/// [`routing_for`], and queues cross-store reconciliation work.
pub struct HybridDataLayer {
    hot: Arc<dyn KeyValueStore>,
    cold: Arc<dyn KeyValueStore>,
    hot_breaker: CircuitBreaker,
    cold_breaker: CircuitBreaker,
    queue: RwLock<HashMap<SyncPriority, VecDeque<SyncTask>>>,
    dead_letter: RwLock<VecDeque<SyncTask>>,
    max_retries: u32,
}

fn store_key(entity: EntityType, key: &str) -> String {
    format!("{entity:?}:{key}")
}

impl HybridDataLayer {
    pub fn new(hot: Arc<dyn KeyValueStore>, cold: Arc<dyn KeyValueStore>) -> Self {
        let mut queue = HashMap::new();
        queue.insert(SyncPriority::High, VecDeque::new());
        queue.insert(SyncPriority::Medium, VecDeque::new());
        queue.insert(SyncPriority::Low, VecDeque::new());
        Self {
            hot,
            cold,
            hot_breaker: CircuitBreaker::new(super::circuit_breaker::CircuitBreakerConfig::default()),
            cold_breaker: CircuitBreaker::new(super::circuit_breaker::CircuitBreakerConfig::default()),
            queue: RwLock::new(queue),
            dead_letter: RwLock::new(VecDeque::new()),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Writes `value` to the entity's primary store and, per its sync
    /// policy, either writes through, enqueues a sync task, or does nothing.
    pub async fn put(
        &self,
        entity: EntityType,
        key: &str,
        value: String,
        event: Option<&str>,
    ) -> Result<(), DataLayerError> {
        self.put_with_mode(entity, key, value, event, TransactionMode::Eventual)
            .await
    }

    pub async fn put_with_mode(
        &self,
        entity: EntityType,
        key: &str,
        value: String,
        event: Option<&str>,
        mode: TransactionMode,
    ) -> Result<(), DataLayerError> {
        let routing = routing_for(entity);
        let full_key = store_key(entity, key);

        match mode {
            TransactionMode::SingleStore(store) => {
                self.write_store(store, &full_key, value, Some(routing.hot_ttl))
                    .await
            }
            TransactionMode::WriteThrough => {
                self.write_store(Store::Cold, &full_key, value.clone(), None)
                    .await?;
                if let Err(err) = self
                    .write_store(Store::Hot, &full_key, value, Some(routing.hot_ttl))
                    .await
                {
                    log::warn!("write-through hot write failed for {full_key}, rolling back cold write");
                    if let Err(undo_err) = self.delete_store(Store::Cold, &full_key).await {
                        log::error!("compensating cold delete failed for {full_key}: {undo_err}");
                    }
                    return Err(err);
                }
                Ok(())
            }
            TransactionMode::WriteBehind => {
                self.write_store(routing.primary, &full_key, value.clone(), Some(routing.hot_ttl))
                    .await?;
                self.enqueue_if_due(entity, key, &value, routing, event)
                    .await;
                Ok(())
            }
            TransactionMode::Eventual => {
                self.write_store(routing.primary, &full_key, value.clone(), Some(routing.hot_ttl))
                    .await?;
                self.enqueue_if_due(entity, key, &value, routing, event)
                    .await;
                Ok(())
            }
        }
    }

    async fn enqueue_if_due(
        &self,
        entity: EntityType,
        key: &str,
        value: &str,
        routing: RoutingEntry,
        event: Option<&str>,
    ) {
        if routing.secondary.is_none() {
            return;
        }
        let (due, priority, delay) = match routing.sync_policy {
            SyncPolicy::Immediate => (true, SyncPriority::High, Duration::ZERO),
            SyncPolicy::OnEvent(names) => {
                (event.is_some_and(|e| names.contains(&e)), SyncPriority::Medium, Duration::ZERO)
            }
            SyncPolicy::EventOrPeriodic { events, interval } => {
                if event.is_some_and(|e| events.contains(&e)) {
                    (true, SyncPriority::Medium, Duration::ZERO)
                } else {
                    (true, SyncPriority::Low, interval)
                }
            }
            SyncPolicy::Periodic { interval } => (true, SyncPriority::Low, interval),
            SyncPolicy::CacheOnRead | SyncPolicy::BatchedUpdates | SyncPolicy::None => {
                (false, SyncPriority::Low, Duration::ZERO)
            }
        };
        if !due {
            return;
        }
        self.queue
            .write()
            .await
            .entry(priority)
            .or_default()
            .push_back(SyncTask {
                op: SyncOp::Put,
                entity,
                key: key.to_string(),
                payload: Some(value.to_string()),
                retry_count: 0,
                priority,
                scheduled_at: Instant::now() + delay,
            });
    }

    /// Reads the entity's primary store. For cache-backed entities (cold
    /// primary with a hot secondary) the hot store is checked first as a
    /// cache; a cold hit repopulates it at the configured TTL.
    pub async fn get(&self, entity: EntityType, key: &str) -> Result<Option<String>, DataLayerError> {
        let routing = routing_for(entity);
        let full_key = store_key(entity, key);

        if routing.primary == Store::Cold && routing.secondary == Some(Store::Hot) {
            if let Some(cached) = self.read_store(Store::Hot, &full_key).await? {
                return Ok(Some(cached));
            }
            let cold_value = self.read_store(Store::Cold, &full_key).await?;
            if let Some(value) = &cold_value {
                let _ = self
                    .write_store(Store::Hot, &full_key, value.clone(), Some(routing.hot_ttl))
                    .await;
            }
            return Ok(cold_value);
        }

        self.read_store(routing.primary, &full_key).await
    }

    /// Deletes the entity from both stores in routing order; failures are
    /// logged but never roll back a prior successful delete.
    pub async fn delete(&self, entity: EntityType, key: &str) -> Result<(), DataLayerError> {
        let routing = routing_for(entity);
        let full_key = store_key(entity, key);

        if let Err(err) = self.delete_store(routing.primary, &full_key).await {
            log::warn!("primary delete failed for {full_key}: {err}");
        }
        if let Some(secondary) = routing.secondary {
            if let Err(err) = self.delete_store(secondary, &full_key).await {
                log::warn!("secondary delete failed for {full_key}: {err}");
            }
        }
        Ok(())
    }

    async fn write_store(
        &self,
        store: Store,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<(), DataLayerError> {
        // No cross-store fallback here: a write that silently lands on the
        // other tier would make the sync queue and dead-letter accounting
        // (see `run_sync_batch`, the sole other caller of this method) lie
        // about whether the intended store actually has the value. A
        // successful write still refreshes the cache under the same key, so
        // a later `read_store` against an Open breaker can serve it.
        let (target, breaker) = self.store_and_breaker(store);
        let key = key.to_string();
        let cache_key = key.clone();
        breaker
            .call(
                move || {
                    let target = target.clone();
                    let key = key.clone();
                    let value = value.clone();
                    async move { target.put(&key, value, ttl).await }
                },
                None::<fn() -> std::future::Ready<Result<(), String>>>,
                Some(&cache_key),
            )
            .await
            .map_err(DataLayerError::from)
    }

    async fn read_store(&self, store: Store, key: &str) -> Result<Option<String>, DataLayerError> {
        let (target, breaker) = self.store_and_breaker(store);
        let (fallback_target, _) = self.store_and_breaker(other_store(store));
        let key = key.to_string();
        let cache_key = key.clone();
        let fallback_key = key.clone();
        breaker
            .call(
                move || {
                    let target = target.clone();
                    let key = key.clone();
                    async move { target.get(&key).await }
                },
                Some(move || {
                    let fallback_target = fallback_target.clone();
                    let key = fallback_key.clone();
                    async move { fallback_target.get(&key).await }
                }),
                Some(&cache_key),
            )
            .await
            .map_err(DataLayerError::from)
    }

    async fn delete_store(&self, store: Store, key: &str) -> Result<(), String> {
        let (target, _breaker) = self.store_and_breaker(store);
        target.delete(key).await
    }

    fn store_and_breaker(&self, store: Store) -> (Arc<dyn KeyValueStore>, &CircuitBreaker) {
        match store {
            Store::Hot => (self.hot.clone(), &self.hot_breaker),
            Store::Cold => (self.cold.clone(), &self.cold_breaker),
        }
    }

    /// Drains and runs one batch of queued sync tasks for `priority`. Tasks
    /// not yet due (see [`SyncTask::scheduled_at`]) are put back untouched;
    /// a failure reschedules the task after the relevant breaker's
    /// [`CircuitBreaker::backoff_delay`] and moves it to the dead-letter
    /// queue once retries are exhausted.
    pub async fn run_sync_batch(&self, priority: SyncPriority) {
        let tasks = {
            let mut queue = self.queue.write().await;
            queue.entry(priority).or_default().drain(..).collect::<Vec<_>>()
        };

        let now = Instant::now();
        for task in tasks {
            if task.scheduled_at > now {
                self.queue.write().await.entry(priority).or_default().push_back(task);
                continue;
            }

            let routing = routing_for(task.entity);
            let Some(secondary) = routing.secondary else {
                continue;
            };
            let full_key = store_key(task.entity, &task.key);
            let value = task.payload.clone().unwrap_or_default();
            let result = match task.op {
                SyncOp::Put => self.write_store(secondary, &full_key, value, None).await,
                SyncOp::Delete => self
                    .delete_store(secondary, &full_key)
                    .await
                    .map_err(|_| DataLayerError::ColdStoreUnavailable),
            };
            if let Err(err) = result {
                log::warn!("sync task for {full_key} failed: {err}");
                if task.retry_count + 1 >= self.max_retries {
                    self.dead_letter.write().await.push_back(SyncTask {
                        retry_count: task.retry_count + 1,
                        ..task
                    });
                } else {
                    let (_, breaker) = self.store_and_breaker(secondary);
                    let delay = breaker.backoff_delay(task.retry_count);
                    self.queue
                        .write()
                        .await
                        .entry(priority)
                        .or_default()
                        .push_back(SyncTask {
                            retry_count: task.retry_count + 1,
                            scheduled_at: Instant::now() + delay,
                            ..task
                        });
                }
            }
        }
    }

    /// Runs forever, draining all three priority queues every `interval` —
    /// the backstop that keeps `Periodic`/`EventOrPeriodic` entities (and
    /// anything event-driven that missed its trigger) from going stale.
    pub async fn run_periodic_sync(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            self.run_sync_batch(SyncPriority::High).await;
            self.run_sync_batch(SyncPriority::Medium).await;
            self.run_sync_batch(SyncPriority::Low).await;
        }
    }

    pub async fn dead_letter_depth(&self) -> usize {
        self.dead_letter.read().await.len()
    }

    pub async fn queue_depth(&self, priority: SyncPriority) -> usize {
        self.queue
            .read()
            .await
            .get(&priority)
            .map(|q| q.len())
            .unwrap_or(0)
    }
}

/// The other tier, used as a degrade path when a store's breaker trips.
fn other_store(store: Store) -> Store {
    match store {
        Store::Hot => Store::Cold,
        Store::Cold => Store::Hot,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer() -> HybridDataLayer {
        HybridDataLayer::new(
            Arc::new(InMemoryStore::default()),
            Arc::new(InMemoryStore::default()),
        )
    }

    #[tokio::test]
    async fn put_then_get_round_trips_through_primary_store() {
        let layer = layer();
        layer
            .put(EntityType::GameState, "room-1", "state-json".to_string(), None)
            .await
            .unwrap();
        let value = layer.get(EntityType::GameState, "room-1").await.unwrap();
        assert_eq!(value.as_deref(), Some("state-json"));
    }

    #[tokio::test]
    async fn hand_complete_event_enqueues_medium_priority_sync() {
        let layer = layer();
        layer
            .put(
                EntityType::GameState,
                "room-1",
                "state-json".to_string(),
                Some("hand_complete"),
            )
            .await
            .unwrap();
        assert_eq!(layer.queue_depth(SyncPriority::Medium).await, 1);
    }

    #[tokio::test]
    async fn move_log_put_is_always_high_priority_immediate() {
        let layer = layer();
        layer
            .put(EntityType::MoveLog, "room-1:42", "card-json".to_string(), None)
            .await
            .unwrap();
        assert_eq!(layer.queue_depth(SyncPriority::High).await, 1);
    }

    #[tokio::test]
    async fn write_through_populates_both_stores_before_returning() {
        let layer = layer();
        layer
            .put_with_mode(
                EntityType::CompletedGameRecord,
                "room-1",
                "record-json".to_string(),
                None,
                TransactionMode::WriteThrough,
            )
            .await
            .unwrap();
        let hot = layer.hot.get(&store_key(EntityType::CompletedGameRecord, "room-1")).await.unwrap();
        let cold = layer.cold.get(&store_key(EntityType::CompletedGameRecord, "room-1")).await.unwrap();
        assert_eq!(hot.as_deref(), Some("record-json"));
        assert_eq!(cold.as_deref(), Some("record-json"));
    }

    #[tokio::test(start_paused = true)]
    async fn dead_letter_queue_catches_exhausted_retries() {
        struct AlwaysFails;
        #[async_trait]
        impl KeyValueStore for AlwaysFails {
            async fn put(&self, _key: &str, _value: String, _ttl: Option<Duration>) -> Result<(), String> {
                Err("unavailable".to_string())
            }
            async fn get(&self, _key: &str) -> Result<Option<String>, String> {
                Ok(None)
            }
            async fn delete(&self, _key: &str) -> Result<(), String> {
                Ok(())
            }
        }

        let layer = HybridDataLayer::new(
            Arc::new(InMemoryStore::default()),
            Arc::new(AlwaysFails),
        );
        layer
            .put(EntityType::MoveLog, "room-1:1", "card".to_string(), None)
            .await
            .unwrap();
        for _ in 0..layer.max_retries {
            layer.run_sync_batch(SyncPriority::High).await;
            tokio::time::advance(Duration::from_secs(60)).await;
        }
        assert_eq!(layer.dead_letter_depth().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn open_hot_breaker_serves_last_known_good_from_cache() {
        struct FlakyAfterWrite {
            inner: InMemoryStore,
            fail_gets: std::sync::atomic::AtomicBool,
        }
        #[async_trait]
        impl KeyValueStore for FlakyAfterWrite {
            async fn put(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), String> {
                self.inner.put(key, value, ttl).await
            }
            async fn get(&self, key: &str) -> Result<Option<String>, String> {
                if self.fail_gets.load(std::sync::atomic::Ordering::SeqCst) {
                    Err("unavailable".to_string())
                } else {
                    self.inner.get(key).await
                }
            }
            async fn delete(&self, key: &str) -> Result<(), String> {
                self.inner.delete(key).await
            }
        }

        let hot = Arc::new(FlakyAfterWrite {
            inner: InMemoryStore::default(),
            fail_gets: std::sync::atomic::AtomicBool::new(false),
        });
        let layer = HybridDataLayer::new(hot.clone(), Arc::new(InMemoryStore::default()));

        layer
            .put(EntityType::GameState, "room-1", "state-v1".to_string(), None)
            .await
            .unwrap();
        assert_eq!(
            layer.get(EntityType::GameState, "room-1").await.unwrap().as_deref(),
            Some("state-v1")
        );

        hot.fail_gets.store(true, std::sync::atomic::Ordering::SeqCst);
        for _ in 0..4 {
            let _ = layer.get(EntityType::GameState, "room-1").await;
        }

        let value = layer.get(EntityType::GameState, "room-1").await.unwrap();
        assert_eq!(
            value.as_deref(),
            Some("state-v1"),
            "an open hot breaker should serve the cached last-known-good value"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn game_state_sync_defers_to_the_periodic_window_without_a_qualifying_event() {
        let layer = layer();
        layer
            .put(EntityType::GameState, "room-1", "state-json".to_string(), None)
            .await
            .unwrap();
        assert_eq!(layer.queue_depth(SyncPriority::Low).await, 1);

        layer.run_sync_batch(SyncPriority::Low).await;
        assert_eq!(layer.queue_depth(SyncPriority::Low).await, 1, "not due yet, should be put back");

        tokio::time::advance(Duration::from_secs(61)).await;
        layer.run_sync_batch(SyncPriority::Low).await;
        assert_eq!(layer.queue_depth(SyncPriority::Low).await, 0);
    }

    #[tokio::test]
    async fn game_over_event_also_enqueues_medium_priority_sync() {
        let layer = layer();
        layer
            .put(
                EntityType::GameState,
                "room-1",
                "state-json".to_string(),
                Some("game_over"),
            )
            .await
            .unwrap();
        assert_eq!(layer.queue_depth(SyncPriority::Medium).await, 1);
    }
}
