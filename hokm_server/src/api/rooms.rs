//! Room discovery API handlers.
//!
//! The Hokm wire protocol carries joining, play, and chat over the
//! WebSocket gateway rather than HTTP, so this module is intentionally
//! small: it exposes the set of currently live room codes so a client can
//! offer "rejoin an in-progress room" without guessing a code.

use axum::{Json, extract::State};
use serde::Serialize;

use super::AppState;

#[derive(Debug, Serialize)]
pub struct RoomListItem {
    pub room_code: String,
}

#[derive(Debug, Serialize)]
pub struct RoomListResponse {
    pub rooms: Vec<RoomListItem>,
}

/// List the room codes currently tracked by this server instance.
///
/// Does not require authentication — joining still requires the client to
/// authenticate over the WebSocket gateway before sending a `join` frame.
///
/// # Response
///
/// ```json
/// { "rooms": [{ "room_code": "ABCD" }] }
/// ```
pub async fn list_rooms(State(state): State<AppState>) -> Json<RoomListResponse> {
    let rooms = state
        .rooms
        .list_codes()
        .await
        .into_iter()
        .map(|room_code| RoomListItem { room_code })
        .collect();
    Json(RoomListResponse { rooms })
}
