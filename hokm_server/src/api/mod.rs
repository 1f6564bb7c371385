//! HTTP/WebSocket API for the Hokm game server.
//!
//! This module provides the complete surface for the Hokm platform: a single
//! WebSocket gateway (`/ws`) that carries the whole wire protocol — auth,
//! join, rejoin, leave, hokm selection, card play, and chat — as JSON frames,
//! plus a small HTTP surface for room discovery and health checks. There is
//! no REST auth surface: the `auth`/`auth_token` frames on the gateway are
//! the only way to establish identity, delegating to
//! [`hokm_core::auth::AuthService`].
//!
//! # Architecture
//!
//! The API is built with:
//! - **Axum**: Async web framework for HTTP/WebSocket
//! - **Tower**: Middleware for CORS and request ids
//! - **Actor Model**: Room state managed by one [`hokm_core::room::RoomActor`] per room
//!
//! # Modules
//!
//! - [`rooms`]: Room discovery (list active room codes)
//! - [`websocket`]: The `/ws` gateway carrying the Hokm wire protocol, including auth frames
//!
//! # Endpoints Overview
//!
//! - `GET  /api/v1/rooms` - List active room codes (public)
//! - `GET  /ws` - WebSocket gateway; authenticates itself via the `auth`/`auth_token` frames
//! - `GET  /health` - Server health status
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod rate_limiter;
pub mod request_id;
pub mod rooms;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    response::{IntoResponse, Json},
    routing::get,
};
use hokm_core::auth::AuthService;
use hokm_core::room::RoomManager;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers and WebSocket connections.
///
/// This state is cloned for each request (cheap due to Arc wrappers) and provides
/// access to the core system managers.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<dyn AuthService>,
    pub rooms: Arc<RoomManager>,
    pub pool: Arc<PgPool>,
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let v1_routes = Router::new().route("/rooms", get(rooms::list_rooms));

    let root_routes = Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(websocket::websocket_handler));

    Router::new()
        .merge(root_routes)
        .nest("/api/v1", v1_routes)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Checks database connectivity and reports the number of active rooms.
/// Returns `200 OK` if all components are healthy, or `503 Service Unavailable` otherwise.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = sqlx::query("SELECT 1").fetch_one(&*state.pool).await.is_ok();
    let room_count = state.rooms.room_count().await;

    let status_code = if db_healthy {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "rooms_active": room_count,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
