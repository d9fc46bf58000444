//! Realtime change events over WebSocket.

use crate::notifier::ChangeNotifier;
use crate::state::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;

/// Connection parameters.
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// Opaque identity of the connecting user.
    pub user_id: Option<String>,
}

/// GET /v1/events - Subscribe to change events.
pub async fn events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let notifier = state.notifier.clone();
    ws.on_upgrade(move |socket| forward_events(socket, notifier, query.user_id))
}

/// Pump events to one socket until either side goes away.
async fn forward_events(
    socket: WebSocket,
    notifier: Arc<ChangeNotifier>,
    user_id: Option<String>,
) {
    let (connection_id, mut events) = notifier.register(user_id.clone());
    tracing::info!(connection_id, user_id = ?user_id, "Listener connected");

    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(connection_id, error = %e, "Failed to encode change event");
                        continue;
                    }
                };
                if sink.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Pings are answered by the transport; clients have nothing else to say.
                Some(Ok(_)) => {}
            },
        }
    }

    notifier.unregister(connection_id);
    tracing::info!(connection_id, "Listener disconnected");
}
