//! The Room Coordinator: a single-writer actor per room, and the manager
//! that spawns and tracks one per active [`messages::RoomMessage`] stream.
//!
//! Mirrors the table-actor pattern: every room is its own task with its own
//! inbox, so concurrent client requests against the same [`crate::game::GameState`]
//! are always serialized through a single `&mut self` handler.

pub mod actor;
pub mod manager;
pub mod messages;

pub use actor::{RoomActor, RoomCode, RoomHandle};
pub use manager::RoomManager;
pub use messages::{JoinAck, PrivateSnapshot, RoomBroadcast, RoomError, RoomMessage};
