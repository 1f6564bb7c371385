//! Errors raised by the Edge Proxy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("no healthy backend available")]
    NoHealthyBackend,

    #[error("backend {0} not found")]
    UnknownBackend(String),

    #[error("reconnect rate limit exceeded for client")]
    ReconnectRateLimited,

    #[error("backend connection failed: {0}")]
    Connect(String),

    #[error("frame error: {0}")]
    Frame(#[from] crate::net::SerializationError),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}
