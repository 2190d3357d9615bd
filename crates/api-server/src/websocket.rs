//! WebSocket handler for the live event stream.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use crate::handlers::events::EventResponse;
use crate::state::AppState;

const PING_INTERVAL: Duration = Duration::from_secs(20);

/// Upgrade handler for `/events/ws/live`: forwards every qualifying Event
/// as a JSON text frame, with periodic pings keeping the connection alive
/// across idle stretches between whale events.
pub async fn ws_live_events(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let (subscriber_id, mut events_rx) = state.broadcaster.subscribe();

    info!(subscriber = %subscriber_id, "websocket client subscribed to live events");
    let mut ping_ticker = tokio::time::interval(PING_INTERVAL);

    loop {
        tokio::select! {
            Some(msg) = receiver.next() => {
                match msg {
                    Ok(Message::Close(_)) => {
                        debug!(subscriber = %subscriber_id, "client closed live events socket");
                        break;
                    }
                    Ok(Message::Ping(payload)) => {
                        if sender.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(subscriber = %subscriber_id, error = %e, "websocket error");
                        break;
                    }
                    _ => {}
                }
            }
            event = events_rx.recv() => {
                let Some(event) = event else { break };
                let response = EventResponse::from(event);
                match serde_json::to_string(&response) {
                    Ok(json) => {
                        if sender.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "failed to serialize event for websocket"),
                }
            }
            _ = ping_ticker.tick() => {
                if sender.send(Message::Ping(vec![])).await.is_err() {
                    break;
                }
            }
        }
    }

    state.broadcaster.unsubscribe(subscriber_id);
    info!(subscriber = %subscriber_id, "websocket client disconnected from live events");
}
