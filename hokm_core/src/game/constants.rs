//! Fixed quantities that define the shape of a Hokm game.

use std::time::Duration;

/// A room is always exactly four seats.
pub const NUM_SEATS: usize = 4;

/// Cards dealt to each seat before hokm selection.
pub const INITIAL_DEAL_SIZE: usize = 5;

/// Cards dealt to each seat after hokm selection.
pub const FINAL_DEAL_SIZE: usize = 8;

/// A full hand is every card in every seat: 13 per seat.
pub const CARDS_PER_HAND: usize = INITIAL_DEAL_SIZE + FINAL_DEAL_SIZE;

/// Tricks played in a single hand.
pub const TRICKS_PER_HAND: usize = 13;

/// Tricks a team needs to win a hand outright before all 13 are played.
pub const TRICKS_TO_WIN_HAND: u8 = 7;

/// Hands (rounds) a team needs to win the game.
pub const ROUNDS_TO_WIN_GAME: u8 = 7;

/// How long a seat may hold up play before the turn-timeout policy fires.
pub const DEFAULT_TURN_TIMEOUT: Duration = Duration::from_secs(60);

/// How long a disconnected seat is held open for rejoin.
pub const DEFAULT_DISCONNECT_GRACE: Duration = Duration::from_secs(180);

/// How long a finished room lingers for reconnect/review before teardown.
pub const DEFAULT_GAME_OVER_LINGER: Duration = Duration::from_secs(5 * 60);

/// Minimum seconds between chat messages from a single seat.
pub const DEFAULT_CHAT_INTERVAL: Duration = Duration::from_secs(2);
