//! Authentication data models.

/// Stable player id type, as handed out by the identity provider and used
/// everywhere else in the system (room seats, stats, completed-game records).
pub type PlayerId = i64;

/// What `validate(token)` resolves to: just enough to seat a connection and
/// label it on the wire. Everything else about the player (credentials,
/// profile, durable stats) lives behind the identity provider or in
/// [`crate::db::repository::GameRepository`], not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerIdentity {
    pub player_id: PlayerId,
    pub username: String,
}
