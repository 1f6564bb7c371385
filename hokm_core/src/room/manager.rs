//! Spawns and tracks the [`RoomActor`] for every live room.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::data::HybridDataLayer;

use super::actor::{RoomActor, RoomCode, RoomHandle};

/// How often the data layer's sync queues are drained regardless of what
/// triggered them, bounding staleness for `Periodic`/`EventOrPeriodic` entities.
const SYNC_QUEUE_DRAIN_INTERVAL: Duration = Duration::from_secs(60);

/// Owns the registry of live rooms and the shared data layer they persist through.
pub struct RoomManager {
    data: Arc<HybridDataLayer>,
    rooms: RwLock<HashMap<RoomCode, RoomHandle>>,
}

impl RoomManager {
    pub fn new(data: Arc<HybridDataLayer>) -> Self {
        tokio::spawn(data.clone().run_periodic_sync(SYNC_QUEUE_DRAIN_INTERVAL));
        Self {
            data,
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the handle for `code`, spawning a fresh room if none exists yet.
    pub async fn get_or_create(&self, code: &str) -> RoomHandle {
        if let Some(handle) = self.rooms.read().await.get(code) {
            return handle.clone();
        }

        let mut rooms = self.rooms.write().await;
        if let Some(handle) = rooms.get(code) {
            return handle.clone();
        }

        let (actor, handle) = RoomActor::new(code.to_string(), self.data.clone());
        tokio::spawn(actor.run());
        rooms.insert(code.to_string(), handle.clone());
        log::info!("room {code} created");
        handle
    }

    pub async fn get(&self, code: &str) -> Option<RoomHandle> {
        self.rooms.read().await.get(code).cloned()
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Room codes currently tracked, open or not yet reaped.
    pub async fn list_codes(&self) -> Vec<RoomCode> {
        self.rooms.read().await.keys().cloned().collect()
    }

    /// Drops handles whose actor has already shut down (aborted rooms past
    /// their linger, or rooms that hit a terminal error). Safe to call
    /// periodically; a dropped handle's send would fail anyway.
    pub async fn reap_closed(&self) {
        let mut rooms = self.rooms.write().await;
        rooms.retain(|code, handle| {
            let alive = !handle.is_closed();
            if !alive {
                log::debug!("room {code} reaped");
            }
            alive
        });
    }
}
