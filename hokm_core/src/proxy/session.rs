//! Per-client proxy sessions: bidirectional forwarding plus failover migration.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::backend::BackendRegistry;
use super::config::ProxyConfig;
use super::errors::ProxyError;
use crate::game::GamePhase;
use crate::net::{ClientFrame, RoomContext, ServerFrame};

/// Learns a client's current room from frames passing through [`forward`],
/// since the proxy otherwise never decodes the JSON it relays.
#[derive(Default, Clone)]
pub struct RoomTracker {
    room_code: Option<String>,
    has_active_game: bool,
}

impl RoomTracker {
    fn observe_client_text(&mut self, text: &str) {
        match serde_json::from_str::<ClientFrame>(text) {
            Ok(ClientFrame::Join { room_code }) | Ok(ClientFrame::Rejoin { room_code, .. }) => {
                self.room_code = Some(room_code);
            }
            Ok(ClientFrame::Leave { .. }) => {
                self.room_code = None;
                self.has_active_game = false;
            }
            _ => {}
        }
    }

    fn observe_server_text(&mut self, text: &str) {
        match serde_json::from_str::<ServerFrame>(text) {
            Ok(ServerFrame::JoinSuccess { room_code, phase, .. }) => {
                self.room_code = Some(room_code);
                self.has_active_game = phase != GamePhase::WaitingForPlayers;
            }
            Ok(ServerFrame::PhaseChange { new_phase }) => {
                self.has_active_game = new_phase != GamePhase::WaitingForPlayers;
            }
            _ => {}
        }
    }

    /// The context to hand a migrating client, if a room has been observed.
    pub fn as_room_context(&self) -> Option<RoomContext> {
        self.room_code.clone().map(|room_code| RoomContext {
            room_code,
            has_active_game: self.has_active_game,
        })
    }
}

/// Tracks migration attempts per client so a flapping backend can't be used
/// to bounce one client forever; mirrors the load balancer's
/// `reconnect_attempts` map.
#[derive(Default)]
pub struct ReconnectTracker {
    attempts: HashMap<String, (u32, Instant)>,
}

impl ReconnectTracker {
    /// Returns `Ok(())` if another migration attempt is allowed right now for
    /// `client_id`, recording the attempt; `Err` if the client has exceeded
    /// `max_reconnect_attempts` within `reconnect_window`, or is retrying
    /// sooner than `min_reconnect_interval`.
    pub fn try_record(&mut self, client_id: &str, config: &ProxyConfig) -> Result<(), ProxyError> {
        let now = Instant::now();
        let entry = self.attempts.entry(client_id.to_string()).or_insert((0, now));

        if now.duration_since(entry.1) > config.reconnect_window {
            *entry = (0, now);
        }

        if entry.0 >= config.max_reconnect_attempts {
            return Err(ProxyError::ReconnectRateLimited);
        }
        if entry.0 > 0 && now.duration_since(entry.1) < config.min_reconnect_interval {
            return Err(ProxyError::ReconnectRateLimited);
        }

        entry.0 += 1;
        entry.1 = now;
        Ok(())
    }

    pub fn forget(&mut self, client_id: &str) {
        self.attempts.remove(client_id);
    }
}

type InboundStream = WebSocketStream<TcpStream>;
type OutboundStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens an upstream connection to the selected backend.
pub async fn connect_backend(ws_url: &str) -> Result<OutboundStream, ProxyError> {
    let (stream, _) = connect_async(ws_url).await?;
    Ok(stream)
}

/// Why a call to [`forward`] returned.
#[derive(Debug, Eq, PartialEq)]
pub enum ForwardOutcome {
    /// The client closed or the inbound socket errored: the session is over.
    ClientClosed,
    /// The backend closed or the outbound socket errored: eligible for migration.
    BackendClosed,
    /// The health checker marked this client's current backend unhealthy.
    ForcedMigration,
}

/// Forwards frames between `client` and `backend` until either side closes,
/// errors, or a forced migration is signaled on `migrate_rx`. Text frames are
/// peeked (not altered) to keep `tracker` current for the next migration.
pub async fn forward(
    client: &mut InboundStream,
    backend: &mut OutboundStream,
    migrate_rx: &mut tokio::sync::mpsc::Receiver<()>,
    tracker: &mut RoomTracker,
) -> ForwardOutcome {
    loop {
        tokio::select! {
            signal = migrate_rx.recv() => {
                if signal.is_some() {
                    return ForwardOutcome::ForcedMigration;
                }
            }
            msg = client.next() => {
                match msg {
                    Some(Ok(m)) if m.is_close() => return ForwardOutcome::ClientClosed,
                    Some(Ok(m)) => {
                        if let Ok(text) = m.to_text() {
                            tracker.observe_client_text(text);
                        }
                        if backend.send(m).await.is_err() {
                            return ForwardOutcome::BackendClosed;
                        }
                    }
                    _ => return ForwardOutcome::ClientClosed,
                }
            }
            msg = backend.next() => {
                match msg {
                    Some(Ok(m)) if m.is_close() => return ForwardOutcome::BackendClosed,
                    Some(Ok(m)) => {
                        if let Ok(text) = m.to_text() {
                            tracker.observe_server_text(text);
                        }
                        if client.send(m).await.is_err() {
                            return ForwardOutcome::ClientClosed;
                        }
                    }
                    _ => return ForwardOutcome::BackendClosed,
                }
            }
        }
    }
}

/// Sends a single `server_migration` frame to the client, as required before
/// rewiring its forwarding loop to a new backend.
pub async fn send_migration_frame(
    client: &mut InboundStream,
    new_server: &str,
    room_context: Option<RoomContext>,
) -> Result<(), ProxyError> {
    let frame = ServerFrame::ServerMigration { new_server: new_server.to_string(), room_context };
    let payload = serde_json::to_string(&frame).map_err(crate::net::SerializationError::from)?;
    client.send(Message::text(payload)).await?;
    Ok(())
}

/// Runs one client's full session: selects a backend, forwards traffic, and
/// on a migration signal, sends `server_migration` and rewires to the
/// replacement backend, subject to [`ReconnectTracker`]'s rate limit.
///
/// `migrate_rx` is this client's slot in the proxy's session registry — the
/// health loop sends on the matching `Sender` when this session's current
/// backend is marked unhealthy, so migration can happen mid-game, not just
/// when the backend connection happens to drop.
pub struct ProxySession {
    pub client_id: String,
    pub current_backend: Option<String>,
    migrate_rx: tokio::sync::mpsc::Receiver<()>,
    /// Mirrors `current_backend` into the proxy's session registry so the
    /// health loop can tell which clients sit on a backend it just marked
    /// unhealthy, without needing this session to have finished running.
    backend_cell: Option<std::sync::Arc<Mutex<Option<String>>>>,
    /// The last room/game-activity state observed on this client's traffic.
    room: RoomTracker,
}

impl ProxySession {
    pub fn new(client_id: impl Into<String>, migrate_rx: tokio::sync::mpsc::Receiver<()>) -> Self {
        Self {
            client_id: client_id.into(),
            current_backend: None,
            migrate_rx,
            backend_cell: None,
            room: RoomTracker::default(),
        }
    }

    /// Attaches the shared cell the proxy's session registry reads to learn
    /// which backend this client is currently bound to.
    pub fn with_backend_cell(mut self, cell: std::sync::Arc<Mutex<Option<String>>>) -> Self {
        self.backend_cell = Some(cell);
        self
    }

    /// Runs the session to completion against an initial backend selection.
    pub async fn run(
        &mut self,
        mut client: InboundStream,
        registry: &Mutex<BackendRegistry>,
        config: &ProxyConfig,
        reconnects: &Mutex<ReconnectTracker>,
    ) -> Result<(), ProxyError> {
        let label = registry
            .lock()
            .await
            .select(None)
            .map(|b| b.label.clone())
            .ok_or(ProxyError::NoHealthyBackend)?;
        let mut outcome = self.connect_and_forward(&mut client, &label, registry).await;

        loop {
            if outcome == ForwardOutcome::ClientClosed {
                break;
            }

            let exclude = self.current_backend.clone();
            let next_label = {
                let reg = registry.lock().await;
                reg.select(exclude.as_deref()).map(|b| b.label.clone())
            };
            let Some(next_label) = next_label else {
                let _ = client.close(None).await;
                return Err(ProxyError::NoHealthyBackend);
            };

            if reconnects.lock().await.try_record(&self.client_id, config).is_err() {
                log::warn!("proxy: client {} exceeded reconnect rate limit", self.client_id);
                let _ = client.close(None).await;
                return Err(ProxyError::ReconnectRateLimited);
            }

            send_migration_frame(&mut client, &next_label, self.room.as_room_context()).await?;
            // Give the client a moment to process before the new upstream opens.
            tokio::time::sleep(Duration::from_millis(200)).await;

            outcome = self.connect_and_forward(&mut client, &next_label, registry).await;
        }

        reconnects.lock().await.forget(&self.client_id);
        Ok(())
    }

    async fn connect_and_forward(
        &mut self,
        client: &mut InboundStream,
        label: &str,
        registry: &Mutex<BackendRegistry>,
    ) -> ForwardOutcome {
        let ws_url = {
            let reg = registry.lock().await;
            reg.get(label).map(|b| b.ws_url.clone())
        };
        let Some(ws_url) = ws_url else { return ForwardOutcome::BackendClosed };

        match connect_backend(&ws_url).await {
            Ok(mut backend) => {
                {
                    let mut reg = registry.lock().await;
                    if let Some(b) = reg.get_mut(label) {
                        b.connection_count += 1;
                    }
                }
                self.current_backend = Some(label.to_string());
                if let Some(cell) = &self.backend_cell {
                    *cell.lock().await = Some(label.to_string());
                }
                let outcome = forward(client, &mut backend, &mut self.migrate_rx, &mut self.room).await;
                let mut reg = registry.lock().await;
                if let Some(b) = reg.get_mut(label) {
                    b.connection_count = b.connection_count.saturating_sub(1);
                }
                outcome
            }
            Err(err) => {
                log::error!("proxy: failed to connect to backend {label}: {err}");
                ForwardOutcome::BackendClosed
            }
        }
    }
}
