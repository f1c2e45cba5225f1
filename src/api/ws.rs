// WebSocket handler for the live bot event feed.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use tokio::sync::broadcast::error::RecvError;

use super::AppState;
use crate::events::BotEvent;
use crate::metrics;

/// WebSocket upgrade handler for bot events.
pub async fn ws_bots(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn handle_ws(mut socket: WebSocket, state: AppState) {
    metrics::CONNECTED_WEBSOCKETS.inc();
    // Subscribe before snapshotting so no event falls between the two.
    let mut rx = state.events.subscribe();

    let initial = BotEvent::BotsList {
        bots: state.registry.snapshots(),
    };
    if let Some(json) = initial.to_json() {
        if send_text(&mut socket, json).await {
            forward_events(&mut socket, &mut rx).await;
        }
    }

    metrics::CONNECTED_WEBSOCKETS.dec();
}

async fn forward_events(
    socket: &mut WebSocket,
    rx: &mut tokio::sync::broadcast::Receiver<String>,
) {
    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(msg) => {
                        if !send_text(socket, msg).await {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!("WebSocket client lagged, skipped {n} events");
                    }
                }
            }
            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    // The feed is one-way
                    _ => {}
                }
            }
        }
    }
}

/// Returns false once the client is gone.
async fn send_text(socket: &mut WebSocket, msg: String) -> bool {
    if socket.send(Message::Text(msg.into())).await.is_err() {
        return false;
    }
    metrics::WEBSOCKET_MESSAGES_SENT_TOTAL.inc();
    true
}
