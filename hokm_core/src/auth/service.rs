//! A minimal stand-in identity provider.
//!
//! The real system this crate ships behind owns credential storage, password
//! hashing, and token issuance; all this crate assumes is the interface in
//! [`AuthService`]. [`InMemoryAuthService`] is a pass-through implementation
//! of that interface for running the server standalone (and for tests/bots):
//! the first `authenticate` call for a username provisions it, later calls
//! must repeat the same password.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::errors::{AuthError, AuthResult};
use super::models::{PlayerId, PlayerIdentity};

/// Interface the rest of the system needs from an identity provider: turn a
/// username/password pair into an opaque session token, and turn that token
/// back into a [`PlayerIdentity`]. Credential storage format and token
/// issuance are the provider's concern, not this crate's.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Exchange a username/password pair for an opaque session token.
    async fn authenticate(&self, username: &str, password: &str) -> AuthResult<String>;

    /// Resolve a previously issued token back to the identity it belongs to.
    async fn validate(&self, token: &str) -> AuthResult<PlayerIdentity>;

    /// Look up a player's username by id, for labeling roster entries on the
    /// wire (the WebSocket gateway calls this when announcing seated players).
    async fn username_for(&self, player_id: PlayerId) -> AuthResult<String>;
}

struct Account {
    player_id: PlayerId,
    password: String,
}

/// In-process [`AuthService`]: accounts and tokens live only for the life of
/// the server, and passwords are compared as plain strings. Swapping in a
/// real provider only means implementing this trait against it.
pub struct InMemoryAuthService {
    by_username: RwLock<HashMap<String, Account>>,
    usernames: RwLock<HashMap<PlayerId, String>>,
    tokens: RwLock<HashMap<String, PlayerId>>,
    next_id: AtomicI64,
}

impl Default for InMemoryAuthService {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAuthService {
    pub fn new() -> Self {
        Self {
            by_username: RwLock::new(HashMap::new()),
            usernames: RwLock::new(HashMap::new()),
            tokens: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl AuthService for InMemoryAuthService {
    async fn authenticate(&self, username: &str, password: &str) -> AuthResult<String> {
        let mut by_username = self.by_username.write().await;
        let player_id = match by_username.get(username) {
            Some(account) if account.password == password => account.player_id,
            Some(_) => return Err(AuthError::InvalidCredentials),
            None => {
                let player_id = self.next_id.fetch_add(1, Ordering::SeqCst);
                by_username.insert(
                    username.to_string(),
                    Account { player_id, password: password.to_string() },
                );
                self.usernames.write().await.insert(player_id, username.to_string());
                player_id
            }
        };
        drop(by_username);

        let token = Uuid::new_v4().to_string();
        self.tokens.write().await.insert(token.clone(), player_id);
        Ok(token)
    }

    async fn validate(&self, token: &str) -> AuthResult<PlayerIdentity> {
        let player_id = *self
            .tokens
            .read()
            .await
            .get(token)
            .ok_or(AuthError::InvalidToken)?;
        let username = self.username_for(player_id).await?;
        Ok(PlayerIdentity { player_id, username })
    }

    async fn username_for(&self, player_id: PlayerId) -> AuthResult<String> {
        self.usernames
            .read()
            .await
            .get(&player_id)
            .cloned()
            .ok_or(AuthError::PlayerNotFound)
    }
}
