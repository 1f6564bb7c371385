//! Integration tests for the identity-provider interface.
//!
//! Credential storage and token issuance belong to whatever real provider a
//! deployment puts behind [`AuthService`]; these tests exercise the
//! in-process stand-in ([`InMemoryAuthService`]) this crate ships for running
//! the server without one.

use hokm_core::auth::{AuthError, AuthService, InMemoryAuthService};
use std::sync::Arc;

#[tokio::test]
async fn test_authenticate_new_username_provisions_an_account() {
    let auth = InMemoryAuthService::new();

    let token = auth
        .authenticate("new_player", "SecurePass123!")
        .await
        .expect("first authenticate for a username should succeed");

    let identity = auth.validate(&token).await.expect("issued token should validate");
    assert_eq!(identity.username, "new_player");
    assert!(identity.player_id > 0);
}

#[tokio::test]
async fn test_authenticate_same_username_returns_same_player_id() {
    let auth = InMemoryAuthService::new();

    let token1 = auth.authenticate("repeat_player", "SecurePass123!").await.unwrap();
    let token2 = auth.authenticate("repeat_player", "SecurePass123!").await.unwrap();

    let identity1 = auth.validate(&token1).await.unwrap();
    let identity2 = auth.validate(&token2).await.unwrap();

    assert_eq!(identity1.player_id, identity2.player_id);
    assert_ne!(token1, token2, "each authenticate call issues a fresh token");
}

#[tokio::test]
async fn test_authenticate_wrong_password_is_rejected() {
    let auth = InMemoryAuthService::new();

    auth.authenticate("locked_player", "CorrectPass123!").await.unwrap();

    let result = auth.authenticate("locked_player", "WrongPass123!").await;
    assert!(result.is_err(), "login with wrong password should fail");
    assert!(matches!(result.unwrap_err(), AuthError::InvalidCredentials));
}

#[tokio::test]
async fn test_validate_unknown_token_is_rejected() {
    let auth = InMemoryAuthService::new();

    let result = auth.validate("a-token-nobody-issued").await;
    assert!(result.is_err(), "an unrecognized token should fail validation");
    assert!(matches!(result.unwrap_err(), AuthError::InvalidToken));
}

#[tokio::test]
async fn test_username_for_unknown_player_is_rejected() {
    let auth = InMemoryAuthService::new();

    let result = auth.username_for(999_999).await;
    assert!(result.is_err());
    assert!(matches!(result.unwrap_err(), AuthError::PlayerNotFound));
}

#[tokio::test]
async fn test_concurrent_authentication_for_distinct_usernames() {
    let auth = Arc::new(InMemoryAuthService::new());

    let mut handles = vec![];
    for i in 0..10 {
        let auth = Arc::clone(&auth);
        let username = format!("concurrent_user_{i}");
        handles.push(tokio::spawn(async move {
            auth.authenticate(&username, "SecurePass123!").await
        }));
    }

    let mut success_count = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            success_count += 1;
        }
    }

    assert_eq!(success_count, 10, "all distinct usernames should authenticate");
}

#[tokio::test]
async fn test_multiple_sessions_same_user_get_distinct_tokens() {
    let auth = InMemoryAuthService::new();

    let token1 = auth.authenticate("multi_session_user", "SecurePass123!").await.unwrap();
    let token2 = auth.authenticate("multi_session_user", "SecurePass123!").await.unwrap();

    assert_ne!(token1, token2);
    assert!(auth.validate(&token1).await.is_ok());
    assert!(auth.validate(&token2).await.is_ok());

    let identity1 = auth.validate(&token1).await.unwrap();
    let identity2 = auth.validate(&token2).await.unwrap();
    assert_eq!(identity1.player_id, identity2.player_id);
}
