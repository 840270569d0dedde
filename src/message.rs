//! Message protocol definitions
//!
//! JSON-based bidirectional message protocol using Serde's tagged enum
//! for type-safe serialization/deserialization.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Author name used for hub-generated log entries
pub const SYSTEM_AUTHOR: &str = "System";

/// Reply text for undecodable envelopes and internal failures
pub const SERVER_ERROR: &str = "Server error";

/// Client → Server message
///
/// All messages from client to server. Uses tagged enum with snake_case naming.
/// Unrecognized `type` values decode to `Unknown` and are ignored.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Create an account
    Register { nickname: String, password: String },
    /// Check credentials
    Login { nickname: String, password: String },
    /// Join a room by code
    Join {
        #[serde(rename = "chatCode")]
        chat_code: String,
        nickname: String,
    },
    /// Post a message to a room
    Message {
        #[serde(rename = "chatCode")]
        chat_code: String,
        nickname: String,
        text: String,
    },
    #[serde(other)]
    Unknown,
}

/// Server → Client message
///
/// All messages from server to client. Uses tagged enum with snake_case naming.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Account created
    RegisterSuccess { nickname: String },
    /// Credentials accepted
    LoginSuccess { nickname: String },
    /// Full current log of a room
    Messages { messages: Arc<[ChatMessage]> },
    /// Error occurred
    Error { message: String },
}

/// Whether a log entry was posted by a member or generated by the hub
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Sent,
    Received,
}

/// One entry of a room log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,
    #[serde(rename = "sender")]
    pub direction: Direction,
    #[serde(rename = "user")]
    pub author: String,
}

impl ChatMessage {
    /// A message posted by a room member
    pub fn sent(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            direction: Direction::Sent,
            author: author.into(),
        }
    }

    /// A hub-generated message
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            direction: Direction::Received,
            author: SYSTEM_AUTHOR.to_string(),
        }
    }
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

/// Convert AppError to ServerMessage for client notification
impl From<AppError> for ServerMessage {
    fn from(err: AppError) -> Self {
        let message = match &err {
            AppError::NicknameTaken => "This nickname is already taken.",
            AppError::InvalidNickname => "Nickname must be between 1 and 20 characters.",
            AppError::InvalidPassword => "Password must be between 6 and 50 characters.",
            AppError::InvalidCredentials => "Invalid nickname or password.",
            AppError::RoomRejected(_) => "Invalid chat code.",
            // Decode failures and everything unexpected look the same to the client
            _ => SERVER_ERROR,
        };
        ServerMessage::error(message)
    }
}
