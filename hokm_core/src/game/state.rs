//! The Game State value the rule engine operates on, and the phases it moves through.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entities::{Card, Seat, Suit, Team};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    WaitingForPlayers,
    TeamAssignment,
    InitialDeal,
    HokmSelection,
    FinalDeal,
    Gameplay,
    HandComplete,
    GameOver,
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            GamePhase::WaitingForPlayers => "waiting_for_players",
            GamePhase::TeamAssignment => "team_assignment",
            GamePhase::InitialDeal => "initial_deal",
            GamePhase::HokmSelection => "hokm_selection",
            GamePhase::FinalDeal => "final_deal",
            GamePhase::Gameplay => "gameplay",
            GamePhase::HandComplete => "hand_complete",
            GamePhase::GameOver => "game_over",
        };
        write!(f, "{repr}")
    }
}

/// One card played by one seat within the current trick, in play order.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TrickPlay {
    pub seat: Seat,
    pub card: Card,
}

/// The authoritative, per-room game state. Mutated only through
/// [`super::engine`] operations, and only ever by the Room Coordinator.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GameState {
    pub phase: GamePhase,

    /// Player identity bound to each seat, in fixed turn order. `None` while waiting.
    pub seating: [Option<i64>; 4],

    /// Team assignment by seat; fixed for the life of the room (0,2 vs 1,3).
    pub teams: [Team; 4],

    /// Seat index of the current hand's hakem (trump chooser, first leader).
    pub hakem: Seat,

    /// Trump suit chosen for the current hand, if any.
    pub hokm: Option<Suit>,

    /// Per-seat private hands.
    pub hands: [Vec<Card>; 4],

    /// Cards played so far in the current trick, in play order.
    pub current_trick: Vec<TrickPlay>,

    /// Suit of the first card played in the current trick.
    pub led_suit: Option<Suit>,

    /// Seat whose move is currently awaited.
    pub current_turn: Seat,

    /// Tricks won by each team within the current hand.
    pub tricks_won: [u8; 2],

    /// Hands won by each team within the current game.
    pub rounds_won: [u8; 2],

    /// Every card played this hand, in play order, for audit/reconnect.
    pub played_cards: Vec<TrickPlay>,

    /// Cards left over from the initial deal, held until hokm is chosen and
    /// the final deal hands them out. Empty outside `hokm_selection`.
    pub rest_of_deck: Vec<Card>,

    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl GameState {
    /// A fresh room with no seats filled, before any hand has started.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            phase: GamePhase::WaitingForPlayers,
            seating: [None; 4],
            teams: [Team::A, Team::B, Team::A, Team::B],
            hakem: 0,
            hokm: None,
            hands: Default::default(),
            current_trick: Vec::new(),
            led_suit: None,
            current_turn: 0,
            tricks_won: [0, 0],
            rounds_won: [0, 0],
            played_cards: Vec::new(),
            rest_of_deck: Vec::new(),
            created_at: now,
            last_activity_at: now,
        }
    }

    pub fn seated_count(&self) -> usize {
        self.seating.iter().filter(|s| s.is_some()).count()
    }

    pub fn seat_of(&self, player_id: i64) -> Option<Seat> {
        self.seating
            .iter()
            .position(|&occupant| occupant == Some(player_id))
    }

    pub fn tricks_played(&self) -> usize {
        self.played_cards.len() / 4
    }
}

/// Events the engine reports back to the caller so it can broadcast them.
/// None of these carry I/O; they describe what changed in one engine call.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub enum GameEvent {
    PhaseChanged { phase: GamePhase },
    TeamsAssigned { teams: [Team; 4], hakem: Seat },
    InitialDealt,
    HokmSelected { suit: Suit },
    FinalDealt,
    CardPlayed { seat: Seat, card: Card },
    TrickResolved { winner: Seat, team_tricks: [u8; 2] },
    HandComplete { winning_team: Team, rounds_won: [u8; 2] },
    GameOver { winning_team: Team, final_scores: [u8; 2] },
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("wrong phase")]
    WrongPhase,
    #[error("not your turn")]
    NotYourTurn,
    #[error("not the hakem")]
    NotHakem,
    #[error("invalid suit")]
    InvalidSuit,
    #[error("card not in hand")]
    CardNotInHand,
    #[error("must follow suit")]
    MustFollowSuit,
    #[error("room is full")]
    RoomFull,
    #[error("already seated")]
    AlreadySeated,
    #[error("not seated")]
    NotSeated,
}
