//! HTTP and WebSocket entry point
//!
//! One axum route at `/`: a WebSocket upgrade starts a chat connection, a
//! plain GET gets the health text. Each connection then runs a read loop
//! feeding its router and a write task draining its outbound queue.

use std::sync::Arc;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::account::{AccountStore, BcryptHasher};
use crate::config::Config;
use crate::error::AppError;
use crate::message::ServerMessage;
use crate::room::RoomStore;
use crate::router::MessageRouter;
use crate::session::Session;
use crate::types::ConnectionId;

/// Body served to plain HTTP requests at `/`
pub const HEALTH_BODY: &str = "WebSocket server is running";

/// Shared state accessible from axum handlers
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountStore>,
    pub rooms: Arc<RoomStore>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            accounts: Arc::new(AccountStore::new(Arc::new(BcryptHasher::new(
                config.hash_cost,
            )))),
            rooms: Arc::new(RoomStore::new(config.chat_codes.iter().cloned())),
        }
    }
}

/// Build the axum router
pub fn router(state: AppState) -> Router {
    Router::new().route("/", get(root)).with_state(state)
}

/// Serve HTTP and WebSocket traffic on `listener` until it fails
pub async fn serve(listener: TcpListener, config: Config) -> Result<(), AppError> {
    let app = router(AppState::new(&config));
    axum::serve(listener, app).await?;
    Ok(())
}

/// GET /
async fn root(
    State(state): State<AppState>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    match ws {
        Ok(ws) => ws.on_upgrade(move |socket| handle_socket(socket, state)),
        Err(_) => HEALTH_BODY.into_response(),
    }
}

/// Serve one chat connection until the client goes away
///
/// Envelopes are handled one at a time in arrival order. Rooms and
/// accounts outlive the connection.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let connection_id = ConnectionId::generate();
    info!("Connection {} established", connection_id);

    // Server -> client queue; room broadcasts never wait on it
    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel::<ServerMessage>();
    let session = Arc::new(Session::new(connection_id, msg_tx));
    let router = MessageRouter::new(Arc::clone(&session), state.accounts, state.rooms);

    // Spawn write task (ServerMessage -> WebSocket)
    let write_task = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json.into())).await.is_err() {
                        debug!("WebSocket send failed, ending write task");
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to serialize message: {}", e);
                }
            }
        }
        debug!("Write task ended for {}", connection_id);

        let _ = ws_sender.close().await;
    });

    // Read loop (WebSocket -> router)
    while let Some(msg_result) = ws_receiver.next().await {
        match msg_result {
            Ok(Message::Text(text)) => router.handle_text(text.as_str()).await,
            Ok(Message::Close(_)) => {
                debug!("Connection {} sent close frame", connection_id);
                break;
            }
            Ok(_) => {
                // Binary and control frames are not part of the protocol
            }
            Err(e) => {
                error!("WebSocket error for {}: {}", connection_id, e);
                break;
            }
        }
    }

    // Rooms stop delivering to this session from here on
    session.close();
    write_task.abort();

    info!("Connection {} closed", connection_id);
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use tower::ServiceExt;

    use super::*;

    fn app() -> Router {
        router(AppState::new(&Config::default()))
    }

    #[tokio::test]
    async fn test_root_serves_health_text() {
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();

        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 10_000)
            .await
            .unwrap();
        assert_eq!(&body[..], HEALTH_BODY.as_bytes());
    }

    #[tokio::test]
    async fn test_unknown_route_returns_404() {
        let req = Request::builder()
            .uri("/nonexistent")
            .body(Body::empty())
            .unwrap();

        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_post_root_not_allowed() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/")
            .body(Body::empty())
            .unwrap();

        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn test_state_uses_configured_codes() {
        let state = AppState::new(&Config::default());
        assert!(state.rooms.is_accepted(&"123456".into()));
        assert!(!state.rooms.is_accepted(&"654321".into()));
        assert!(state.accounts.is_empty());
    }
}
