//! HTTP API client for the Hokm game server.

use anyhow::{Context, Result};
use serde::Deserialize;

/// API client for communicating with the Hokm server's HTTP surface.
///
/// Account identity is established over the WebSocket gateway itself with an
/// `auth`/`auth_token` frame (see [`crate::websocket_client`]); this client
/// only covers room discovery and building the `/ws` URL to hand off to.
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
pub struct RoomInfo {
    pub room_code: String,
}

#[derive(Debug, Deserialize)]
struct RoomListResponse {
    rooms: Vec<RoomInfo>,
}

impl ApiClient {
    /// Create a new API client.
    pub fn new(base_url: String) -> Self {
        Self { base_url, client: reqwest::Client::new() }
    }

    /// List the room codes currently tracked by the server.
    pub async fn list_rooms(&self) -> Result<Vec<RoomInfo>> {
        let response = self
            .client
            .get(format!("{}/api/v1/rooms", self.base_url))
            .send()
            .await
            .context("Failed to list rooms")?;

        let body: RoomListResponse = response
            .json()
            .await
            .context("Failed to parse room list")?;

        Ok(body.rooms)
    }

    /// Build the `/ws` URL for the gateway.
    pub fn get_websocket_url(&self) -> String {
        let ws_url = self
            .base_url
            .replace("http://", "ws://")
            .replace("https://", "wss://");
        format!("{}/ws", ws_url)
    }
}
