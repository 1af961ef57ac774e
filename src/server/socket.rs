//! Worker WebSocket connections

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, error};

use super::ServerState;
use crate::session::Session;
use crate::worker::Worker;

/// Handle WebSocket upgrade for a playground instance
pub async fn worker_websocket(ws: WebSocketUpgrade, State(state): State<Arc<ServerState>>) -> Response {
    ws.on_upgrade(|socket| handle_worker_socket(socket, state))
}

/// Serve one playground instance
///
/// Messages are answered in arrival order; the next message is not read
/// until the current pass has replied.
async fn handle_worker_socket(socket: WebSocket, state: Arc<ServerState>) {
    let session = match Session::with_defaults(state.config.clone(), state.registry.clone()) {
        Ok(session) => Arc::new(session),
        Err(e) => {
            error!("Failed to start worker session: {}", e);
            return;
        }
    };
    let worker = Worker::new(session);
    let (mut sender, mut receiver) = socket.split();

    debug!("Worker client connected");

    while let Some(Ok(message)) = receiver.next().await {
        match message {
            Message::Text(text) => {
                if let Some(reply) = worker.handle_text(&text).await {
                    if sender.send(Message::Text(reply)).await.is_err() {
                        break;
                    }
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    debug!("Worker client disconnected");
}
