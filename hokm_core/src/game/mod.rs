//! Hokm game engine - pure rules operating on a single authoritative state value.
//!
//! This module provides:
//! - Card, suit, and seat primitives ([`entities`])
//! - The per-room [`state::GameState`] value and its [`state::GamePhase`] lifecycle
//! - The rule engine ([`engine`]) that validates and applies moves against it

pub mod constants;
pub mod engine;
pub mod entities;
pub mod state;

pub use entities::{Card, Deck, Rank, Seat, Suit, Team, next_seat, team_of};
pub use state::{GameError, GameEvent, GamePhase, GameState, TrickPlay};
