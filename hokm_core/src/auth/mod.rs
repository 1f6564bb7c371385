//! Identity interface the rest of the system depends on.
//!
//! Credential storage format, password hashing, and token issuance belong to
//! whatever identity provider sits in front of this server; this module only
//! specifies the two operations the rest of the crate calls against it
//! ([`AuthService::authenticate`], [`AuthService::validate`]) plus a minimal
//! in-process implementation ([`InMemoryAuthService`]) for running the
//! server standalone.
//!
//! ## Example
//!
//! ```
//! use hokm_core::auth::{AuthService, InMemoryAuthService};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let auth = InMemoryAuthService::new();
//! let token = auth.authenticate("player1", "whatever-their-password-is").await.unwrap();
//! let identity = auth.validate(&token).await.unwrap();
//! println!("authenticated as {}", identity.username);
//! # }
//! ```

pub mod errors;
pub mod models;
pub mod service;

pub use errors::{AuthError, AuthResult};
pub use models::{PlayerId, PlayerIdentity};
pub use service::{AuthService, InMemoryAuthService};
