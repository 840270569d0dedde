//! Session definitions
//!
//! `SessionState` is the passive per-connection record (nickname, room).
//! `Session` pairs it with the connection's outbound queue so room actors
//! can check membership and deliver without going through the connection.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::{ConnectionId, RoomCode};

/// Per-connection state
///
/// No validation happens here.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// Nickname from the last login/register/join (None before any)
    pub nickname: Option<String>,
    /// Room this connection currently receives broadcasts for
    pub room: Option<RoomCode>,
}

impl SessionState {
    /// Record a successful login or registration. Informational only.
    pub fn mark_authenticated(&mut self, nickname: String) {
        self.nickname = Some(nickname);
    }

    /// Record a successful join, replacing any previous room
    pub fn mark_joined(&mut self, room: RoomCode, nickname: String) {
        self.room = Some(room);
        self.nickname = Some(nickname);
    }

    pub fn is_joined_to(&self, room: &RoomCode) -> bool {
        self.room.as_ref() == Some(room)
    }
}

/// A live connection as seen by room actors
#[derive(Debug)]
pub struct Session {
    /// Unique identifier for this connection
    pub id: ConnectionId,
    /// Server → Client message channel
    sender: mpsc::UnboundedSender<ServerMessage>,
    state: Mutex<SessionState>,
    closed: AtomicBool,
}

impl Session {
    /// Create a new session with the given ID and sender channel
    pub fn new(id: ConnectionId, sender: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self {
            id,
            sender,
            state: Mutex::new(SessionState::default()),
            closed: AtomicBool::new(false),
        }
    }

    /// Queue a message; never waits
    ///
    /// Fails only if the connection is gone.
    pub fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        if !self.is_open() {
            return Err(SendError::ChannelClosed);
        }
        self.sender.send(msg).map_err(|_| SendError::ChannelClosed)
    }

    pub fn mark_authenticated(&self, nickname: String) {
        self.state.lock().mark_authenticated(nickname);
    }

    pub fn mark_joined(&self, room: RoomCode, nickname: String) {
        self.state.lock().mark_joined(room, nickname);
    }

    pub fn is_joined_to(&self, room: &RoomCode) -> bool {
        self.state.lock().is_joined_to(room)
    }

    /// Copy of the current state
    pub fn state(&self) -> SessionState {
        self.state.lock().clone()
    }

    /// Called once the socket is gone; rooms stop delivering to it
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// False once the connection has closed
    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire) && !self.sender.is_closed()
    }
}
