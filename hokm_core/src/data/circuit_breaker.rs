//! Circuit breaker protecting calls into the hot/cold stores.
//!
//! Tracks failures in a sliding time window and trips from `closed` to
//! `open` once they cross a threshold, failing fast (optionally via a
//! cached value or caller-supplied fallback) until a cooldown elapses and a
//! trial request in `half_open` decides whether to fully recover.

use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Tunables for one circuit breaker instance.
#[derive(Clone, Copy, Debug)]
pub struct CircuitBreakerConfig {
    /// Failures within `time_window` needed to trip from closed to open.
    pub failure_threshold: u32,
    /// Consecutive successes in half-open needed to close the circuit.
    pub success_threshold: u32,
    /// How long to stay open before trying a half-open trial request.
    pub timeout: Duration,
    /// Sliding window over which failures count toward `failure_threshold`.
    pub time_window: Duration,
    pub max_retry_attempts: u32,
    pub base_backoff_delay: Duration,
    pub max_backoff_delay: Duration,
    /// How long a cached value stays eligible to serve an open-circuit read.
    pub cache_ttl: Duration,
    /// Entry cap on the result cache; the oldest entry is evicted once a
    /// fresh insert would exceed it.
    pub max_cache_entries: usize,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 3,
            timeout: Duration::from_secs(60),
            time_window: Duration::from_secs(300),
            max_retry_attempts: 3,
            base_backoff_delay: Duration::from_secs(1),
            max_backoff_delay: Duration::from_secs(30),
            cache_ttl: Duration::from_secs(300),
            max_cache_entries: 1000,
        }
    }
}

/// Metrics accumulated across every call made through the breaker.
#[derive(Debug, Default)]
pub struct CircuitBreakerMetrics {
    pub total_requests: u64,
    pub total_failures: u64,
    pub total_successes: u64,
    pub circuit_opens: u64,
    pub circuit_closes: u64,
    pub fallback_executions: u64,
    pub cache_hits: u64,
    pub avg_response_time: Duration,
    response_times: VecDeque<Duration>,
    pub failure_reasons: HashMap<String, u64>,
}

const MAX_TRACKED_RESPONSE_TIMES: usize = 1000;

impl CircuitBreakerMetrics {
    fn record_request(&mut self, success: bool, elapsed: Duration, failure_reason: Option<&str>) {
        self.total_requests += 1;
        if self.response_times.len() == MAX_TRACKED_RESPONSE_TIMES {
            self.response_times.pop_front();
        }
        self.response_times.push_back(elapsed);

        if success {
            self.total_successes += 1;
        } else {
            self.total_failures += 1;
            if let Some(reason) = failure_reason {
                *self.failure_reasons.entry(reason.to_string()).or_insert(0) += 1;
            }
        }

        let total: Duration = self.response_times.iter().sum();
        self.avg_response_time = total / self.response_times.len() as u32;
    }

    pub fn failure_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.total_failures as f64 / self.total_requests as f64
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    #[error("circuit is open")]
    Open,
    #[error("operation failed: {0}")]
    Operation(E),
}

struct TimeWindow {
    window: Duration,
    events: VecDeque<(Instant, bool)>,
}

impl TimeWindow {
    fn new(window: Duration) -> Self {
        Self {
            window,
            events: VecDeque::new(),
        }
    }

    fn record(&mut self, success: bool) {
        let now = Instant::now();
        self.events.push_back((now, success));
        self.evict_before(now);
    }

    fn evict_before(&mut self, now: Instant) {
        while let Some(&(ts, _)) = self.events.front() {
            if now.duration_since(ts) > self.window {
                self.events.pop_front();
            } else {
                break;
            }
        }
    }

    fn failure_count(&mut self) -> u32 {
        let now = Instant::now();
        self.evict_before(now);
        self.events.iter().filter(|(_, success)| !success).count() as u32
    }
}

/// A cached value and the time it was written, for TTL expiry.
struct CacheEntry {
    value: Box<dyn Any + Send + Sync>,
    inserted_at: Instant,
}

struct Inner {
    state: CircuitState,
    opened_at: Option<Instant>,
    half_open_successes: u32,
    window: TimeWindow,
    metrics: CircuitBreakerMetrics,
    cache: HashMap<String, CacheEntry>,
    /// Insertion order of `cache`'s keys, oldest first, for cap eviction.
    cache_order: VecDeque<String>,
}

impl Inner {
    /// Returns a cached value for `key` if present and younger than `ttl`.
    /// An expired entry is dropped on read rather than lingering.
    fn cache_get<T: Clone + Send + Sync + 'static>(&mut self, key: &str, ttl: Duration) -> Option<T> {
        let expired = match self.cache.get(key) {
            Some(entry) => entry.inserted_at.elapsed() > ttl,
            None => return None,
        };
        if expired {
            self.cache.remove(key);
            return None;
        }
        self.cache.get(key).and_then(|entry| entry.value.downcast_ref::<T>()).cloned()
    }

    /// Inserts `value` under `key`, evicting the oldest entries past
    /// `max_entries` and anything already past `ttl`.
    fn cache_insert<T: Send + Sync + 'static>(&mut self, key: String, value: T, ttl: Duration, max_entries: usize) {
        let now = Instant::now();
        self.cache.retain(|_, entry| now.duration_since(entry.inserted_at) <= ttl);
        self.cache_order.retain(|k| self.cache.contains_key(k));

        if !self.cache.contains_key(&key) {
            self.cache_order.push_back(key.clone());
        }
        self.cache.insert(key, CacheEntry { value: Box::new(value), inserted_at: now });

        while self.cache.len() > max_entries {
            if let Some(oldest) = self.cache_order.pop_front() {
                self.cache.remove(&oldest);
            } else {
                break;
            }
        }
    }
}

/// A single circuit breaker instance, shared across the calls it guards.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        let window = TimeWindow::new(config.time_window);
        Self {
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                opened_at: None,
                half_open_successes: 0,
                window,
                metrics: CircuitBreakerMetrics::default(),
                cache: HashMap::new(),
                cache_order: VecDeque::new(),
            }),
        }
    }

    pub async fn state(&self) -> CircuitState {
        self.inner.lock().await.state
    }

    /// Guards `op`, optionally serving `cache_key` from the last successful
    /// value when the circuit is open and no `fallback` is supplied.
    ///
    /// Single entry point for a guarded call: the breaker decides whether
    /// to attempt `op`, run `fallback`, serve a cached value, or fail fast
    /// with [`CircuitBreakerError::Open`]. A failed attempt is retried up to
    /// `max_retry_attempts` times with an exponential backoff sleep between
    /// attempts (via [`Self::backoff_delay`]), stopping early if the circuit
    /// trips open mid-retry.
    pub async fn call<T, E, Op, OpFut, Fb, FbFut>(
        &self,
        op: Op,
        fallback: Option<Fb>,
        cache_key: Option<&str>,
    ) -> Result<T, CircuitBreakerError<E>>
    where
        Op: Fn() -> OpFut,
        OpFut: Future<Output = Result<T, E>>,
        Fb: FnOnce() -> FbFut,
        FbFut: Future<Output = Result<T, E>>,
        T: Clone + Send + Sync + 'static,
    {
        let should_attempt = self.should_attempt().await;
        if !should_attempt {
            // Prefer the last-known-good cached value over a fallback: the
            // fallback is itself a degraded path, so a cache hit is the
            // better answer when one is available.
            if let Some(key) = cache_key {
                let mut inner = self.inner.lock().await;
                let cached = inner.cache_get::<T>(key, self.config.cache_ttl);
                if let Some(value) = cached {
                    inner.metrics.cache_hits += 1;
                    return Ok(value);
                }
            }
            if let Some(fb) = fallback {
                self.inner.lock().await.metrics.fallback_executions += 1;
                return fb().await.map_err(CircuitBreakerError::Operation);
            }
            return Err(CircuitBreakerError::Open);
        }

        let attempts = self.config.max_retry_attempts.max(1);
        let mut last_err = None;

        for attempt in 0..attempts {
            let started = Instant::now();
            let result = op().await;
            let elapsed = started.elapsed();

            match result {
                Ok(value) => {
                    self.on_success(elapsed).await;
                    if let Some(key) = cache_key {
                        self.inner.lock().await.cache_insert(
                            key.to_string(),
                            value.clone(),
                            self.config.cache_ttl,
                            self.config.max_cache_entries,
                        );
                    }
                    return Ok(value);
                }
                Err(err) => {
                    self.on_failure(elapsed).await;
                    last_err = Some(err);
                    if self.state().await == CircuitState::Open {
                        break;
                    }
                    if attempt + 1 < attempts {
                        tokio::time::sleep(self.backoff_delay(attempt)).await;
                    }
                }
            }
        }

        if let Some(fb) = fallback {
            self.inner.lock().await.metrics.fallback_executions += 1;
            return fb().await.map_err(CircuitBreakerError::Operation);
        }
        Err(CircuitBreakerError::Operation(
            last_err.expect("loop always runs at least once and records an error on every non-Ok path"),
        ))
    }

    async fn should_attempt(&self) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let opened_at = inner.opened_at.expect("open state always has opened_at");
                if opened_at.elapsed() >= self.config.timeout {
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_successes = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    async fn on_success(&self, elapsed: Duration) {
        let mut inner = self.inner.lock().await;
        inner.metrics.record_request(true, elapsed, None);
        inner.window.record(true);
        match inner.state {
            CircuitState::HalfOpen => {
                inner.half_open_successes += 1;
                if inner.half_open_successes >= self.config.success_threshold {
                    inner.state = CircuitState::Closed;
                    inner.opened_at = None;
                    inner.metrics.circuit_closes += 1;
                }
            }
            CircuitState::Closed | CircuitState::Open => {}
        }
    }

    async fn on_failure(&self, elapsed: Duration) {
        let mut inner = self.inner.lock().await;
        inner.metrics.record_request(false, elapsed, Some("operation_error"));
        inner.window.record(false);
        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                inner.metrics.circuit_opens += 1;
            }
            CircuitState::Closed => {
                if inner.window.failure_count() >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                    inner.metrics.circuit_opens += 1;
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Exponential backoff delay for retry attempt `attempt` (0-indexed),
    /// capped at `max_backoff_delay`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let scaled = self.config.base_backoff_delay.saturating_mul(1u32 << attempt.min(16));
        scaled.min(self.config.max_backoff_delay)
    }

    pub fn max_retry_attempts(&self) -> u32 {
        self.config.max_retry_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 2,
            success_threshold: 1,
            timeout: Duration::from_millis(10),
            time_window: Duration::from_secs(300),
            max_retry_attempts: 3,
            base_backoff_delay: Duration::from_millis(1),
            max_backoff_delay: Duration::from_millis(50),
            cache_ttl: Duration::from_secs(300),
            max_cache_entries: 1000,
        }
    }

    type NoFallback = fn() -> std::future::Ready<Result<String, &'static str>>;

    #[tokio::test]
    async fn opens_after_failure_threshold() {
        let breaker = CircuitBreaker::new(fast_config());
        for _ in 0..2 {
            let result: Result<String, CircuitBreakerError<&str>> = breaker
                .call(
                    || async { Err("boom") },
                    None::<NoFallback>,
                    None,
                )
                .await;
            assert!(result.is_err());
        }
        assert_eq!(breaker.state().await, CircuitState::Open);
    }

    #[tokio::test]
    async fn half_open_recovers_to_closed_on_success() {
        let breaker = CircuitBreaker::new(fast_config());
        for _ in 0..2 {
            let _: Result<String, CircuitBreakerError<&str>> = breaker
                .call(
                    || async { Err("boom") },
                    None::<NoFallback>,
                    None,
                )
                .await;
        }
        assert_eq!(breaker.state().await, CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(20)).await;

        let result: Result<String, CircuitBreakerError<&str>> = breaker
            .call(
                || async { Ok("ok".to_string()) },
                None::<NoFallback>,
                None,
            )
            .await;
        assert!(result.is_ok());
        assert_eq!(breaker.state().await, CircuitState::Closed);
    }

    #[test]
    fn backoff_delay_is_capped() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig::default());
        assert_eq!(breaker.backoff_delay(0), Duration::from_secs(1));
        assert_eq!(breaker.backoff_delay(10), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn open_circuit_serves_last_known_good_from_cache() {
        let breaker = CircuitBreaker::new(fast_config());

        let _: Result<String, CircuitBreakerError<&str>> = breaker
            .call(|| async { Ok("fresh".to_string()) }, None::<NoFallback>, Some("k"))
            .await;

        for _ in 0..2 {
            let _: Result<String, CircuitBreakerError<&str>> = breaker
                .call(|| async { Err("boom") }, None::<NoFallback>, Some("k"))
                .await;
        }
        assert_eq!(breaker.state().await, CircuitState::Open);

        let result: Result<String, CircuitBreakerError<&str>> = breaker
            .call(|| async { Err("boom") }, None::<NoFallback>, Some("k"))
            .await;
        assert_eq!(result.unwrap(), "fresh");
    }

    #[tokio::test]
    async fn expired_cache_entry_is_not_served() {
        let mut config = fast_config();
        config.cache_ttl = Duration::from_millis(5);
        let breaker = CircuitBreaker::new(config);

        let _: Result<String, CircuitBreakerError<&str>> = breaker
            .call(|| async { Ok("stale".to_string()) }, None::<NoFallback>, Some("k"))
            .await;

        tokio::time::sleep(Duration::from_millis(20)).await;

        for _ in 0..2 {
            let _: Result<String, CircuitBreakerError<&str>> = breaker
                .call(|| async { Err("boom") }, None::<NoFallback>, Some("k"))
                .await;
        }
        assert_eq!(breaker.state().await, CircuitState::Open);

        let result: Result<String, CircuitBreakerError<&str>> = breaker
            .call(|| async { Err("boom") }, None::<NoFallback>, Some("k"))
            .await;
        assert!(result.is_err(), "an expired entry should not be served");
    }

    #[tokio::test]
    async fn cache_evicts_oldest_entry_past_the_entry_cap() {
        let mut inner = Inner {
            state: CircuitState::Closed,
            opened_at: None,
            half_open_successes: 0,
            window: TimeWindow::new(Duration::from_secs(300)),
            metrics: CircuitBreakerMetrics::default(),
            cache: HashMap::new(),
            cache_order: VecDeque::new(),
        };

        inner.cache_insert("a".to_string(), 1u32, Duration::from_secs(300), 2);
        inner.cache_insert("b".to_string(), 2u32, Duration::from_secs(300), 2);
        inner.cache_insert("c".to_string(), 3u32, Duration::from_secs(300), 2);

        assert_eq!(inner.cache.len(), 2);
        assert!(inner.cache_get::<u32>("a", Duration::from_secs(300)).is_none());
        assert_eq!(inner.cache_get::<u32>("b", Duration::from_secs(300)), Some(2));
        assert_eq!(inner.cache_get::<u32>("c", Duration::from_secs(300)), Some(3));
    }
}
