//! WebSocket Chat Hub Library
//!
//! A WebSocket chat hub built with axum: clients register or
//! log in, join a room by code and exchange messages. Every accepted join
//! or message appends to the room log, and the whole updated log is sent
//! to everyone in the room.
//!
//! # Features
//! - Account registration and login (bcrypt password hashes)
//! - Room joining against a set of accepted codes
//! - Room log broadcast on every join and message
//! - Plain HTTP health text at `/` on the same port
//!
//! # Architecture
//! - `AccountStore` is a `DashMap` shared by all connection tasks; slow
//!   password hashing runs on the blocking pool and only stalls its own
//!   connection
//! - Every room is its own `RoomActor` owning the log and member list;
//!   join, message and broadcast are single steps of that room's actor, and
//!   rooms never wait on each other
//! - Outbound queues are unbounded, so a slow reader never loses updates
//! - Each connection has a `MessageRouter` decoding its envelopes
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use chat_hub::{serve, Config};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_env().unwrap();
//!     let listener = TcpListener::bind(config.bind_addr()).await.unwrap();
//!     serve(listener, config).await.unwrap();
//! }
//! ```

pub mod account;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod handler;
pub mod message;
pub mod room;
pub mod router;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use account::{Account, AccountStore, BcryptHasher, CredentialHasher};
pub use config::{Config, ConfigError};
pub use error::{AppError, SendError};
pub use handler::{router, serve, AppState};
pub use message::{ChatMessage, ClientMessage, Direction, ServerMessage};
pub use room::{JoinedLog, Room, RoomStore};
pub use router::MessageRouter;
pub use server::{RoomActor, RoomCommand, RoomHandle};
pub use session::{Session, SessionState};
pub use types::{ConnectionId, RoomCode};
