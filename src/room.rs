//! Rooms and the room store
//!
//! A `Room` is the append-only log plus the connections that joined it.
//! Each room is owned by its own actor (see `server`), so appends and
//! broadcasts are serialized per room while unrelated rooms run in parallel.
//! `RoomStore` maps codes to those actors and checks the accepted codes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::error::AppError;
use crate::message::ChatMessage;
use crate::server::RoomHandle;
use crate::session::Session;
use crate::types::{ConnectionId, RoomCode};

/// Log snapshots around a join
#[derive(Debug, Clone)]
pub struct JoinedLog {
    /// The log as it was before this join's welcome
    pub history: Arc<[ChatMessage]>,
    /// The log including the welcome
    pub log: Arc<[ChatMessage]>,
}

/// A chat room with its full history
#[derive(Debug)]
pub struct Room {
    /// Room code for identification
    pub code: RoomCode,
    /// Messages in processing order; never shrinks
    log: Vec<ChatMessage>,
    /// Connections that joined this room. Entries whose session closed or
    /// moved on are pruned lazily.
    members: HashMap<ConnectionId, Arc<Session>>,
}

impl Room {
    pub fn new(code: RoomCode) -> Self {
        Self {
            code,
            log: Vec::new(),
            members: HashMap::new(),
        }
    }

    /// Immutable copy of the current log, shared by all recipients of one broadcast
    pub fn snapshot(&self) -> Arc<[ChatMessage]> {
        Arc::from(self.log.as_slice())
    }

    /// Add `session` as a member and append a welcome
    ///
    /// Every join appends its own welcome, even for repeat joins.
    pub fn join(&mut self, session: &Arc<Session>, nickname: String) -> JoinedLog {
        let history = self.snapshot();
        self.log
            .push(ChatMessage::system(format!("Welcome to chat {}!", self.code)));
        session.mark_joined(self.code.clone(), nickname);
        self.members.insert(session.id, Arc::clone(session));

        JoinedLog {
            history,
            log: self.snapshot(),
        }
    }

    /// Append a member's message and return the whole log
    pub fn append(&mut self, author: &str, text: &str) -> Arc<[ChatMessage]> {
        self.log.push(ChatMessage::sent(author, text));
        self.snapshot()
    }

    /// Current recipients of this room's broadcasts
    ///
    /// Drops members that closed or joined another room since.
    pub fn members(&mut self) -> Vec<Arc<Session>> {
        let code = &self.code;
        self.members
            .retain(|_, session| session.is_open() && session.is_joined_to(code));
        self.members.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }
}

/// All rooms plus the set of codes clients may join
pub struct RoomStore {
    rooms: DashMap<RoomCode, RoomHandle>,
    accepted: HashSet<RoomCode>,
}

impl RoomStore {
    pub fn new(accepted: impl IntoIterator<Item = RoomCode>) -> Self {
        Self {
            rooms: DashMap::new(),
            accepted: accepted.into_iter().collect(),
        }
    }

    pub fn is_accepted(&self, code: &RoomCode) -> bool {
        self.accepted.contains(code)
    }

    /// Get the room for `code`, starting an empty one if absent
    pub fn ensure_room(&self, code: &RoomCode) -> RoomHandle {
        self.rooms
            .entry(code.clone())
            .or_insert_with(|| {
                debug!("Room {} created", code);
                RoomHandle::spawn(code.clone())
            })
            .clone()
    }

    /// Join a room
    ///
    /// Appends a system welcome on every successful join and returns the
    /// whole log. A rejected code leaves the store untouched.
    pub async fn join(
        &self,
        code: &RoomCode,
        session: &Arc<Session>,
        nickname: String,
    ) -> Result<Arc<[ChatMessage]>, AppError> {
        if !self.is_accepted(code) {
            return Err(AppError::RoomRejected(code.to_string()));
        }
        self.ensure_room(code)
            .join(Arc::clone(session), nickname)
            .await
    }

    /// Append a member's message and return the whole log
    ///
    /// Any code is accepted here; unseen codes get a fresh room.
    pub async fn append_message(
        &self,
        code: &RoomCode,
        author: String,
        text: String,
    ) -> Result<Arc<[ChatMessage]>, AppError> {
        self.ensure_room(code).message(author, text).await
    }

    /// Current log of a room, if it exists
    pub async fn log(&self, code: &RoomCode) -> Option<Arc<[ChatMessage]>> {
        let handle = self.rooms.get(code).map(|r| r.value().clone())?;
        handle.log().await.ok()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::message::{Direction, ServerMessage, SYSTEM_AUTHOR};

    fn store() -> RoomStore {
        RoomStore::new([RoomCode::from("123456")])
    }

    fn session() -> (Arc<Session>, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Session::new(ConnectionId::generate(), tx)), rx)
    }

    #[test]
    fn test_room_join_snapshots() {
        let mut room = Room::new(RoomCode::from("123456"));
        let (alice, _rx) = session();

        let first = room.join(&alice, "alice".to_string());
        assert!(first.history.is_empty());
        assert_eq!(first.log.len(), 1);
        assert_eq!(first.log[0].author, SYSTEM_AUTHOR);
        assert_eq!(first.log[0].direction, Direction::Received);
        assert_eq!(first.log[0].text, "Welcome to chat 123456!");
        assert!(alice.is_joined_to(&room.code));

        let second = room.join(&alice, "alice".to_string());
        assert_eq!(second.history.len(), 1);
        assert_eq!(second.log.len(), 2);
    }

    #[test]
    fn test_room_members_pruned() {
        let mut room = Room::new(RoomCode::from("123456"));
        let (stays, _stays_rx) = session();
        let (moves, _moves_rx) = session();
        let (leaves, _leaves_rx) = session();
        room.join(&stays, "a".to_string());
        room.join(&moves, "b".to_string());
        room.join(&leaves, "c".to_string());

        moves.mark_joined(RoomCode::from("777777"), "b".to_string());
        leaves.close();

        let members = room.members();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].id, stays.id);
    }

    #[test]
    fn test_room_append_order() {
        let mut room = Room::new(RoomCode::from("123456"));
        room.append("alice", "one");
        let log = room.append("bob", "two");

        let texts: Vec<_> = log.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["one", "two"]);
        assert_eq!(log[1].direction, Direction::Sent);
        assert_eq!(log[1].author, "bob");
    }

    #[tokio::test]
    async fn test_ensure_room_idempotent() {
        let rooms = store();
        let code = RoomCode::from("123456");

        rooms.ensure_room(&code);
        rooms.ensure_room(&code);
        assert_eq!(rooms.room_count(), 1);
        assert_eq!(rooms.log(&code).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_join_rejected_creates_nothing() {
        let rooms = store();
        let code = RoomCode::from("654321");
        let (alice, mut rx) = session();

        let err = rooms
            .join(&code, &alice, "alice".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::RoomRejected(_)));
        assert_eq!(rooms.room_count(), 0);
        assert!(rooms.log(&code).await.is_none());
        assert!(!alice.is_joined_to(&code));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_every_join_appends_welcome() {
        let rooms = store();
        let code = RoomCode::from("123456");
        let (alice, _rx) = session();

        for n in 1..=3 {
            let log = rooms.join(&code, &alice, "alice".to_string()).await.unwrap();
            assert_eq!(log.len(), n);
        }
        assert!(rooms
            .log(&code)
            .await
            .unwrap()
            .iter()
            .all(|m| m.author == SYSTEM_AUTHOR));
    }

    #[tokio::test]
    async fn test_append_message_any_code() {
        let rooms = store();
        let code = RoomCode::from("not-accepted");

        let log = rooms
            .append_message(&code, "alice".to_string(), "hello".to_string())
            .await
            .unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(rooms.room_count(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_is_detached() {
        let rooms = store();
        let code = RoomCode::from("123456");
        let (alice, _rx) = session();

        let before = rooms.join(&code, &alice, "alice".to_string()).await.unwrap();
        rooms
            .append_message(&code, "alice".to_string(), "later".to_string())
            .await
            .unwrap();
        assert_eq!(before.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_rooms_are_independent() {
        let rooms = Arc::new(RoomStore::new(Vec::new()));
        let mut tasks = Vec::new();

        for code in ["room-a", "room-b"] {
            for writer in 0..4 {
                let rooms = Arc::clone(&rooms);
                tasks.push(tokio::spawn(async move {
                    let code = RoomCode::from(code);
                    for n in 0..25 {
                        rooms
                            .append_message(&code, format!("w{}", writer), n.to_string())
                            .await
                            .unwrap();
                    }
                }));
            }
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(rooms.room_count(), 2);
        for code in ["room-a", "room-b"] {
            let log = rooms.log(&RoomCode::from(code)).await.unwrap();
            assert_eq!(log.len(), 100);
            // Each writer's own messages keep their order
            for writer in 0..4 {
                let author = format!("w{}", writer);
                let seen: Vec<u32> = log
                    .iter()
                    .filter(|m| m.author == author)
                    .map(|m| m.text.parse().unwrap())
                    .collect();
                assert_eq!(seen, (0..25).collect::<Vec<_>>());
            }
        }
    }
}
