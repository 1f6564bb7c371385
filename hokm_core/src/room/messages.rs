//! Messages accepted by a [`super::actor::RoomActor`] and the acks/broadcasts it sends back.

use tokio::sync::{mpsc, oneshot};

use crate::game::{Card, GameError, GamePhase, Seat, Suit, Team};

#[derive(Clone, Debug, thiserror::Error)]
pub enum RoomError {
    #[error(transparent)]
    Game(#[from] GameError),
    #[error("session expired")]
    SessionExpired,
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
}

/// Everything a joining or reconnecting client needs to rebuild its view of
/// the room, scoped to that player's own seat (their hand only). `players`
/// is the full seated roster as `(seat, player_id)` pairs, in seat order.
#[derive(Debug, Clone)]
pub struct JoinAck {
    pub seat: Seat,
    pub players: Vec<(Seat, i64)>,
    pub phase: GamePhase,
    pub hand: Vec<Card>,
    pub teams: [Team; 4],
    pub hakem: Seat,
    pub hokm: Option<Suit>,
    pub current_turn: Seat,
}

/// Everything a reconnecting client needs to rebuild its view of the room,
/// scoped to that player's own seat (their hand only).
#[derive(Debug, Clone)]
pub struct PrivateSnapshot {
    pub seat: Seat,
    pub players: Vec<(Seat, i64)>,
    pub phase: GamePhase,
    pub hand: Vec<Card>,
    pub teams: [Team; 4],
    pub hakem: Seat,
    pub hokm: Option<Suit>,
    pub current_turn: Seat,
    pub tricks_won: [u8; 2],
    pub rounds_won: [u8; 2],
}

/// Broadcast events the Room Coordinator hands to the connection layer for
/// per-seat wire framing. Variants carrying a hand are only ever sent to the
/// one subscriber that owns it — see [`super::actor::RoomActor::send_hand`].
#[derive(Debug, Clone)]
pub enum RoomBroadcast {
    PlayerJoined { seat: Seat, player_id: i64 },
    PhaseChanged { phase: GamePhase },
    TeamsAssigned { teams: [Team; 4], hakem: Seat },
    HandDealt { hand: Vec<Card> },
    HokmSelected { suit: Suit },
    TurnStarted { seat: Seat },
    CardPlayed { seat: Seat, card: Card },
    TrickResolved { winner: Seat, team_tricks: [u8; 2] },
    HandComplete { winning_team: Team, rounds_won: [u8; 2] },
    GameOver { winning_team: Team, final_scores: [u8; 2] },
    PlayerDisconnected { seat: Seat },
    PlayerReconnected { seat: Seat },
    Chat { seat: Seat, text: String },
    RoomAborted,
}

#[derive(Debug)]
pub enum RoomMessage {
    Join {
        player_id: i64,
        response: oneshot::Sender<Result<JoinAck, RoomError>>,
    },
    Rejoin {
        player_id: i64,
        response: oneshot::Sender<Result<PrivateSnapshot, RoomError>>,
    },
    Leave {
        player_id: i64,
        response: oneshot::Sender<Result<(), RoomError>>,
    },
    SelectHokm {
        player_id: i64,
        suit: String,
        response: oneshot::Sender<Result<(), RoomError>>,
    },
    PlayCard {
        player_id: i64,
        card: Card,
        response: oneshot::Sender<Result<(), RoomError>>,
    },
    Chat {
        player_id: i64,
        text: String,
        response: oneshot::Sender<Result<(), RoomError>>,
    },
    Subscribe {
        player_id: i64,
        sender: mpsc::Sender<RoomBroadcast>,
    },
    Unsubscribe {
        player_id: i64,
    },
    Tick,
}
