//! The JSON wire protocol shared between clients, the edge proxy, and the server.
//!
//! Every frame is a JSON object with a `type` field (`#[serde(tag = "type")]`);
//! unknown `type`s deserialize as [`ClientFrame::Unknown`] /
//! [`ServerFrame::Unknown`] rather than failing, so a client can reply with a
//! single `error` frame instead of dropping the connection.

use serde::{Deserialize, Serialize};

use crate::game::{Card, GamePhase, Seat, Suit, Team};

/// Frames a connected client may send.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Auth { username: String, password: String },
    AuthToken { token: String },
    Join { room_code: String },
    Rejoin { room_code: String, player_id: i64 },
    Leave { room_code: String },
    HokmSelected { room_code: String, suit: String },
    PlayCard { room_code: String, card: String },
    Chat { room_code: String, text: String },
    Heartbeat,
    /// Sent by the edge proxy's health checker, not by game clients.
    HealthCheck { timestamp: f64 },
    #[serde(other)]
    Unknown,
}

/// Machine-readable codes carried by [`ServerFrame::Error`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    RoomFull,
    NotYourTurn,
    WrongPhase,
    InvalidCard,
    MustFollowSuit,
    SessionExpired,
    RateLimited,
    InternalError,
}

/// A seated player as surfaced to clients in `join_success`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerSummary {
    pub seat: Seat,
    pub player_id: i64,
    pub username: String,
}

/// Room context handed to a migrating client so it can resume without
/// re-fetching room metadata first.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoomContext {
    pub room_code: String,
    pub has_active_game: bool,
}

/// Frames the server (or, for `server_migration`, the edge proxy) sends to a client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    AuthSuccess { player_id: i64, token: String },
    AuthFailed { reason: String },
    JoinSuccess {
        room_code: String,
        seat: Seat,
        players: Vec<PlayerSummary>,
        phase: GamePhase,
        teams: [Team; 4],
        hakem: Seat,
        hokm: Option<Suit>,
        current_turn: Seat,
        /// The joining/reconnecting seat's own hand, if any cards have been dealt yet.
        hand: Option<Vec<String>>,
    },
    PlayerJoined { seat: Seat, player_id: i64 },
    Error { code: ErrorCode, message: String },
    PhaseChange { new_phase: GamePhase },
    TeamAssignment { teams: [Team; 4], hakem: Seat },
    /// `hand` is only ever populated in the frame sent to the owning seat.
    InitialDeal { hand: Vec<String>, is_hakem: bool },
    HokmSelected { suit: Suit },
    FinalDeal { hand: Vec<String> },
    TurnStart { current_player: Seat, your_turn: bool, hand: Option<Vec<String>> },
    CardPlayed { player: Seat, card: String },
    TrickResult { winner: Seat, team_tricks: [u8; 2] },
    HandComplete { winning_team: Team, round_scores: [u8; 2] },
    GameOver { winning_team: Team, final_scores: [u8; 2] },
    PlayerDisconnected { player: Seat },
    PlayerReconnected { player: Seat },
    Chat { player: Seat, text: String },
    RoomClosed { reason: String },
    ServerMigration { new_server: String, room_context: Option<RoomContext> },
    #[serde(other)]
    Unknown,
}

impl ServerFrame {
    /// Builds the `error` frame for a given code, matching the taxonomy in
    /// the `error` frame's `code` field.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerFrame::Error { code, message: message.into() }
    }
}

/// Encodes a playing card as `"{rank}_{suit}"`, e.g. `"A_hearts"`.
pub fn encode_card(card: Card) -> String {
    card.to_string()
}

/// Parses a `"{rank}_{suit}"` card string back into a [`Card`].
pub fn decode_card(s: &str) -> Option<Card> {
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_frame_round_trips_through_json() {
        let frame = ClientFrame::PlayCard { room_code: "ABCD".into(), card: "A_hearts".into() };
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("\"type\":\"play_card\""));
        let back: ClientFrame = serde_json::from_str(&json).unwrap();
        matches!(back, ClientFrame::PlayCard { .. });
    }

    #[test]
    fn unknown_client_frame_type_does_not_fail_to_parse() {
        let json = r#"{"type":"something_new","foo":1}"#;
        let frame: ClientFrame = serde_json::from_str(json).unwrap();
        matches!(frame, ClientFrame::Unknown);
    }

    #[test]
    fn error_frame_serializes_snake_case_code() {
        let frame = ServerFrame::error(ErrorCode::MustFollowSuit, "must follow hearts");
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("\"code\":\"must_follow_suit\""));
    }

    #[test]
    fn server_migration_frame_round_trips() {
        let frame = ServerFrame::ServerMigration {
            new_server: "secondary".into(),
            room_context: Some(RoomContext { room_code: "ABCD".into(), has_active_game: true }),
        };
        let json = serde_json::to_string(&frame).unwrap();
        let back: ServerFrame = serde_json::from_str(&json).unwrap();
        matches!(back, ServerFrame::ServerMigration { .. });
    }
}
