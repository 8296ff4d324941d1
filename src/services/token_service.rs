//! Domain service for the external token client.
//!
//! Handles the credential-for-token exchange and the mode-toggle status poll.

use thiserror::Error;

/// Operating mode reported to the polling client.
pub const MODE_SCAN: &str = "scan";
pub const MODE_READ: &str = "read";

/// Errors specific to token client operations.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Lookup miss and password failure are deliberately indistinguishable.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Covers both an unrecognized and a missing token.
    #[error("Invalid token")]
    InvalidToken,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for TokenError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for TokenError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Domain service trait for the token client API.
#[async_trait::async_trait]
pub trait TokenService: Send + Sync {
    /// Verifies credentials, stores the caller-supplied mode tag on the user
    /// (unconditionally, even when unchanged or absent) and returns the
    /// user's durable token.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidCredentials`] on lookup miss or password
    /// mismatch.
    async fn login(
        &self,
        username: &str,
        password: &str,
        mode: Option<String>,
    ) -> Result<String, TokenError>;

    /// Looks up the user by token and flips the mode tag: "scan" becomes
    /// "read", anything else (including no mode at all) becomes "scan".
    /// Returns the newly persisted mode.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidToken`] when the token is unknown.
    async fn poll_status(&self, token: &str) -> Result<String, TokenError>;
}
