//! Security module providing rate limiting for auth and chat endpoints.
//!
//! Anti-cheat beyond server-side move-legality checks (already enforced by
//! [`crate::game::engine`]) is explicitly out of scope for this server.
//!
//! ## Rate Limiting
//!
//! Protects endpoints from abuse with configurable limits:
//! - **Login**: 5 attempts per 5 minutes, 15-minute lockout with exponential backoff
//! - **Registration**: 3 attempts per hour, 1-hour lockout
//! - **Password Reset**: 3 attempts per hour, 2-hour lockout with exponential backoff
//! - **Chat**: 10 messages per minute, 5-minute lockout (the per-seat in-room chat
//!   cadence in [`crate::room::actor`] is a separate, much shorter check; this
//!   limiter guards against sustained abuse tracked across reconnects)
//!
//! ## Example
//!
//! ```no_run
//! use hokm_core::security::RateLimiter;
//! use hokm_core::db::Database;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     # let config = hokm_core::db::DatabaseConfig {
//!     #     database_url: "postgres://localhost/test".to_string(),
//!     #     max_connections: 5,
//!     #     min_connections: 1,
//!     #     connection_timeout_secs: 5,
//!     #     idle_timeout_secs: 300,
//!     #     max_lifetime_secs: 1800,
//!     # };
//!     # let db = Database::new(&config).await?;
//!     let db_pool = Arc::new(db.pool().clone());
//!
//!     let rate_limiter = RateLimiter::new(db_pool.clone());
//!     let result = rate_limiter.check_rate_limit("login", "192.168.1.1").await?;
//!     if result.is_allowed() {
//!         rate_limiter.record_attempt("login", "192.168.1.1").await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod rate_limiter;

pub use errors::{RateLimitError, RateLimiterResult};
pub use rate_limiter::{RateLimitConfig, RateLimitResult, RateLimiter};
