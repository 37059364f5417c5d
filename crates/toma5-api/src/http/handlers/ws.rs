//! WebSocket live channel.
//!
//! `GET /api/v1/ws` upgrades an authenticated request. Once connected, the
//! handler forwards every [`LiveEvent`] addressed to the caller (and every
//! broadcast) as a JSON text frame `{"event": ..., "payload": ...}`, and
//! answers `{"type":"ping"}` with `{"type":"pong"}`.
//!
//! Live delivery is best-effort: the notification is already persisted, and a
//! slow client only misses frames it can recover from the inbox.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};

use toma5_core::notification::LiveSubscription;
use toma5_types::notification::LiveEvent;

use crate::http::extractors::auth::CurrentActor;
use crate::state::AppState;

/// Incoming command from a WebSocket client.
#[derive(Debug, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WsCommand {
    /// Keep-alive ping. Server responds with `{"type":"pong"}`.
    Ping,
}

/// Upgrade an HTTP request to the caller's live channel.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> impl IntoResponse {
    // Register before the upgrade completes so nothing emitted meanwhile is lost.
    let subscription = state.dispatcher.connect(actor.user_id);
    ws.on_upgrade(move |socket| handle_ws_connection(socket, subscription))
}

async fn handle_ws_connection(socket: WebSocket, mut subscription: LiveSubscription) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let user_id = subscription.user_id();
    tracing::debug!(%user_id, "live connection opened");

    loop {
        tokio::select! {
            event = subscription.recv() => {
                let Some(event) = event else {
                    break;
                };
                match encode_event(&event) {
                    Ok(json) => {
                        if ws_sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(event = %event.event, "failed to serialize live event: {err}");
                    }
                }
            }

            msg_result = ws_receiver.next() => {
                match msg_result {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = process_command(&text) {
                            if ws_sender.send(Message::Text(reply.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        tracing::debug!("WebSocket receive error: {err}");
                        break;
                    }
                    // Binary and protocol-level ping/pong frames are handled by axum.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    tracing::debug!(%user_id, "live connection closed");
}

fn encode_event(event: &LiveEvent) -> Result<String, serde_json::Error> {
    serde_json::to_string(event)
}

/// Reply to a client command, if any. Unknown messages are ignored.
fn process_command(text: &str) -> Option<String> {
    match serde_json::from_str::<WsCommand>(text) {
        Ok(WsCommand::Ping) => Some(r#"{"type":"pong"}"#.to_string()),
        Err(err) => {
            tracing::debug!("ignoring unrecognized live command: {err}");
            None
        }
    }
}
