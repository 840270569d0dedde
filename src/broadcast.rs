//! Room broadcast
//!
//! Fans a room log snapshot out to every open session joined to that room.

use std::sync::Arc;

use tracing::debug;

use crate::message::{ChatMessage, ServerMessage};
use crate::session::Session;
use crate::types::RoomCode;

/// Send `log` to every open session joined to `room`
///
/// Fire-and-forget: queues are unbounded, so sends never wait and a slow
/// reader only grows its own queue. Every recipient gets the same snapshot.
/// Returns the number of sessions the envelope was queued to.
pub fn publish<'a>(
    sessions: impl IntoIterator<Item = &'a Session>,
    room: &RoomCode,
    log: Arc<[ChatMessage]>,
) -> usize {
    let envelope = ServerMessage::Messages { messages: log };
    let mut delivered = 0;

    for session in sessions {
        if !session.is_open() || !session.is_joined_to(room) {
            continue;
        }
        match session.send(envelope.clone()) {
            Ok(()) => delivered += 1,
            Err(e) => debug!("Skipping {} during broadcast: {}", session.id, e),
        }
    }

    debug!("Published room {} to {} sessions", room, delivered);
    delivered
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::types::ConnectionId;

    fn joined(room: &str) -> (Session, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Session::new(ConnectionId::generate(), tx);
        session.mark_joined(RoomCode::from(room), "someone".to_string());
        (session, rx)
    }

    fn log_len(msg: ServerMessage) -> usize {
        match msg {
            ServerMessage::Messages { messages } => messages.len(),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_publish_only_to_room_members() {
        let (a, mut a_rx) = joined("123456");
        let (b, mut b_rx) = joined("123456");
        let (elsewhere, mut elsewhere_rx) = joined("999999");
        let (tx, mut idle_rx) = mpsc::unbounded_channel();
        let idle = Session::new(ConnectionId::generate(), tx);

        let log: Arc<[ChatMessage]> = vec![ChatMessage::sent("a", "hi")].into();
        let sessions = [a, b, elsewhere, idle];
        let delivered = publish(sessions.iter(), &RoomCode::from("123456"), log);

        assert_eq!(delivered, 2);
        assert_eq!(log_len(a_rx.try_recv().unwrap()), 1);
        assert_eq!(log_len(b_rx.try_recv().unwrap()), 1);
        assert!(elsewhere_rx.try_recv().is_err());
        assert!(idle_rx.try_recv().is_err());
    }

    #[test]
    fn test_publish_skips_closed() {
        let (dropped, dropped_rx) = joined("123456");
        drop(dropped_rx);
        let (closed, _closed_rx) = joined("123456");
        closed.close();
        let (ok, mut ok_rx) = joined("123456");

        let log: Arc<[ChatMessage]> = vec![ChatMessage::system("Welcome")].into();
        let sessions = [dropped, closed, ok];
        let delivered = publish(sessions.iter(), &RoomCode::from("123456"), log);

        assert_eq!(delivered, 1);
        assert_eq!(log_len(ok_rx.try_recv().unwrap()), 1);
    }

    #[test]
    fn test_slow_reader_keeps_every_update() {
        let (slow, mut slow_rx) = joined("123456");
        let room = RoomCode::from("123456");
        let mut log = Vec::new();

        for n in 0..500 {
            log.push(ChatMessage::sent("a", format!("m{}", n)));
            publish([&slow], &room, Arc::from(log.as_slice()));
        }

        let mut last = 0;
        let mut received = 0;
        while let Ok(msg) = slow_rx.try_recv() {
            last = log_len(msg);
            received += 1;
        }
        assert_eq!(received, 500);
        assert_eq!(last, log.len());
    }
}
