//! Error types for the chat hub
//!
//! Defines application-level errors and message send errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Covers both fatal errors (connection termination) and
/// business errors (send error message to client).
#[derive(Debug, Error)]
pub enum AppError {
    /// Undecodable inbound envelope
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Room actor channel closed
    #[error("Room {0} is not running")]
    RoomStopped(String),

    /// Nickname is already registered
    #[error("Nickname already taken")]
    NicknameTaken,

    /// Nickname length outside 1..=20
    #[error("Invalid nickname length")]
    InvalidNickname,

    /// Password length outside 6..=50
    #[error("Invalid password length")]
    InvalidPassword,

    /// Unknown nickname or wrong password; deliberately not distinguished
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Room code is not one of the accepted codes
    #[error("Room rejected: {0}")]
    RoomRejected(String),

    /// Unexpected failure while handling a request
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// True for the nickname/password length errors
    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::InvalidNickname | AppError::InvalidPassword)
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AppError::Internal(format!("credential hashing failed: {}", err))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("hashing task failed: {}", err))
    }
}

/// Message send errors
///
/// Occurs when attempting to send messages through closed channels.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors() {
        assert!(AppError::InvalidNickname.is_validation());
        assert!(AppError::InvalidPassword.is_validation());
        assert!(!AppError::NicknameTaken.is_validation());
        assert!(!AppError::InvalidCredentials.is_validation());
    }
}
