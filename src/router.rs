//! Per-connection message router
//!
//! Decodes inbound envelopes and dispatches them by `type`:
//! register/login run here against the account store, so a slow hash only
//! holds up this connection; join/message go to the room's actor.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::account::AccountStore;
use crate::error::AppError;
use crate::message::{ClientMessage, ServerMessage};
use crate::room::RoomStore;
use crate::session::Session;
use crate::types::RoomCode;

/// Routes one connection's inbound envelopes
pub struct MessageRouter {
    session: Arc<Session>,
    accounts: Arc<AccountStore>,
    rooms: Arc<RoomStore>,
}

impl MessageRouter {
    pub fn new(session: Arc<Session>, accounts: Arc<AccountStore>, rooms: Arc<RoomStore>) -> Self {
        Self {
            session,
            accounts,
            rooms,
        }
    }

    /// Handle one inbound text frame
    ///
    /// Failures are answered with an error envelope to this connection only;
    /// the connection always stays open.
    pub async fn handle_text(&self, text: &str) {
        let Err(e) = self.dispatch(text).await else {
            return;
        };

        match &e {
            AppError::Json(inner) => warn!("Invalid envelope from {}: {}", self.session.id, inner),
            AppError::Internal(_) | AppError::RoomStopped(_) => {
                warn!("Request from {} failed: {}", self.session.id, e)
            }
            other => debug!("Request from {} refused: {}", self.session.id, other),
        }
        self.reply(e.into());
    }

    async fn dispatch(&self, text: &str) -> Result<(), AppError> {
        let msg: ClientMessage = serde_json::from_str(text)?;

        match msg {
            ClientMessage::Register { nickname, password } => {
                let account = self.accounts.register(&nickname, &password).await?;
                self.session.mark_authenticated(account.nickname.clone());
                self.reply(ServerMessage::RegisterSuccess {
                    nickname: account.nickname,
                });
            }
            ClientMessage::Login { nickname, password } => {
                let account = self.accounts.authenticate(&nickname, &password).await?;
                info!("'{}' logged in on {}", account.nickname, self.session.id);
                self.session.mark_authenticated(account.nickname.clone());
                self.reply(ServerMessage::LoginSuccess {
                    nickname: account.nickname,
                });
            }
            ClientMessage::Join {
                chat_code,
                nickname,
            } => {
                // No login is required first; the nickname is taken as given
                let code = RoomCode::from(chat_code);
                self.rooms.join(&code, &self.session, nickname).await?;
            }
            ClientMessage::Message {
                chat_code,
                nickname,
                text,
            } => {
                let code = RoomCode::from(chat_code);
                self.rooms.append_message(&code, nickname, text).await?;
            }
            ClientMessage::Unknown => {
                debug!("Ignoring unknown envelope type from {}", self.session.id);
            }
        }

        Ok(())
    }

    /// Reply to this connection only
    fn reply(&self, msg: ServerMessage) {
        if self.session.send(msg).is_err() {
            debug!("Reply to {} dropped, connection closing", self.session.id);
        }
    }
}
