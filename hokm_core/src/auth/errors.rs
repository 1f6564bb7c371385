//! Authentication error types.
//!
//! The real identity provider this module stands in front of is out of
//! scope here — only its interface is. These variants cover the failure
//! modes that interface can surface to a caller, nothing about how
//! credentials are stored or tokens are signed on the other side of it.

use thiserror::Error;

/// Authentication and identity-lookup errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Database error (surfaced by [`crate::db::repository::GameRepository`]
    /// as well as the identity lookups here, since both share this result type).
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// `authenticate` was called with a username/password pair the identity
    /// provider does not recognize.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// `validate` was called with a token the identity provider does not
    /// recognize or that has expired.
    #[error("invalid or expired token")]
    InvalidToken,

    /// A player id has no corresponding identity on file.
    #[error("player not found")]
    PlayerNotFound,
}

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;
