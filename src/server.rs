//! RoomActor implementation
//!
//! Every room is owned by one actor task. Joins and messages for a room run
//! as one actor step, broadcast included, so each member sees that room's
//! log grow in order. Different rooms never wait on each other.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::broadcast;
use crate::error::AppError;
use crate::message::{ChatMessage, ServerMessage};
use crate::room::Room;
use crate::session::Session;
use crate::types::RoomCode;

/// Command channel capacity per room
pub const CHANNEL_BUFFER_SIZE: usize = 256;

/// Commands sent from connection routers to a room actor
#[derive(Debug)]
pub enum RoomCommand {
    /// Add a member; replies with the log including its welcome
    Join {
        session: Arc<Session>,
        nickname: String,
        reply: oneshot::Sender<Arc<[ChatMessage]>>,
    },
    /// Append a message; replies with the resulting log
    Message {
        author: String,
        text: String,
        reply: oneshot::Sender<Arc<[ChatMessage]>>,
    },
    /// Read the current log
    Log {
        reply: oneshot::Sender<Arc<[ChatMessage]>>,
    },
}

/// Actor owning a single room
pub struct RoomActor {
    room: Room,
    /// Command receiver channel
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    pub fn new(code: RoomCode, receiver: mpsc::Receiver<RoomCommand>) -> Self {
        Self {
            room: Room::new(code),
            receiver,
        }
    }

    /// Run the room event loop
    ///
    /// Continuously receives and processes commands until all handles are dropped.
    pub async fn run(mut self) {
        debug!("Room {} actor started", self.room.code);

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        debug!("Room {} actor stopped", self.room.code);
    }

    /// Process a single command
    fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join {
                session,
                nickname,
                reply,
            } => {
                let log = self.handle_join(&session, nickname);
                let _ = reply.send(log);
            }
            RoomCommand::Message {
                author,
                text,
                reply,
            } => {
                let log = self.handle_message(author, text);
                let _ = reply.send(log);
            }
            RoomCommand::Log { reply } => {
                let _ = reply.send(self.room.snapshot());
            }
        }
    }

    /// Handle room joining
    ///
    /// The joiner first gets the log as it stood before its welcome, then
    /// the updated log together with everyone else in the room.
    fn handle_join(&mut self, session: &Arc<Session>, nickname: String) -> Arc<[ChatMessage]> {
        info!("'{}' ({}) joined room {}", nickname, session.id, self.room.code);
        let joined = self.room.join(session, nickname);

        let history = ServerMessage::Messages {
            messages: joined.history,
        };
        if let Err(e) = session.send(history) {
            warn!("Failed to send history to {}: {}", session.id, e);
        }

        self.publish(Arc::clone(&joined.log));
        joined.log
    }

    /// Handle chat message
    fn handle_message(&mut self, author: String, text: String) -> Arc<[ChatMessage]> {
        debug!("Message from '{}' to room {}", author, self.room.code);
        let log = self.room.append(&author, &text);
        self.publish(Arc::clone(&log));
        log
    }

    fn publish(&mut self, log: Arc<[ChatMessage]>) {
        let members = self.room.members();
        broadcast::publish(members.iter().map(Arc::as_ref), &self.room.code, log);
    }
}

/// Handle to a running room actor
#[derive(Debug, Clone)]
pub struct RoomHandle {
    pub code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Spawn the actor for a new, empty room
    pub fn spawn(code: RoomCode) -> Self {
        let (sender, receiver) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        tokio::spawn(RoomActor::new(code.clone(), receiver).run());
        Self { code, sender }
    }

    pub async fn join(
        &self,
        session: Arc<Session>,
        nickname: String,
    ) -> Result<Arc<[ChatMessage]>, AppError> {
        self.request(|reply| RoomCommand::Join {
            session,
            nickname,
            reply,
        })
        .await
    }

    pub async fn message(&self, author: String, text: String) -> Result<Arc<[ChatMessage]>, AppError> {
        self.request(|reply| RoomCommand::Message {
            author,
            text,
            reply,
        })
        .await
    }

    pub async fn log(&self) -> Result<Arc<[ChatMessage]>, AppError> {
        self.request(|reply| RoomCommand::Log { reply }).await
    }

    async fn request(
        &self,
        cmd: impl FnOnce(oneshot::Sender<Arc<[ChatMessage]>>) -> RoomCommand,
    ) -> Result<Arc<[ChatMessage]>, AppError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(cmd(reply))
            .await
            .map_err(|_| AppError::RoomStopped(self.code.to_string()))?;
        rx.await
            .map_err(|_| AppError::RoomStopped(self.code.to_string()))
    }
}
