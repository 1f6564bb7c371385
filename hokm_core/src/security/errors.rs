//! Error types for security module

use thiserror::Error;

/// Result type for rate limiting operations
pub type RateLimiterResult<T> = Result<T, RateLimitError>;

/// Rate limiting errors
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Rate limit exceeded
    #[error("Rate limit exceeded for {endpoint}: locked until {locked_until}")]
    Exceeded {
        endpoint: String,
        locked_until: chrono::DateTime<chrono::Utc>,
    },

    /// Invalid endpoint configuration
    #[error("Invalid endpoint configuration: {0}")]
    InvalidEndpoint(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}
