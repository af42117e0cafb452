//! Live channel WebSocket handler.
//!
//! Each connection may subscribe to any number of source channels.
//! Pushes are at-most-once: a session disconnected at push time never
//! sees that push and catches up through the poll endpoint.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::web::handlers::AppState;

use super::messages::{ClientMessage, ServerMessage};

/// Capacity of the per-connection outbound message queue.
const SESSION_QUEUE_CAPACITY: usize = 64;

/// WebSocket live channel handler.
///
/// GET /api/ws
pub async fn live_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle one live connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let session_id = format!("live-{}", uuid::Uuid::new_v4());
    tracing::debug!("WebSocket session started: {}", session_id);

    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Pushes from all subscribed channels funnel through one queue so the
    // socket is written from a single place.
    let (push_tx, mut push_rx) = mpsc::channel::<ServerMessage>(SESSION_QUEUE_CAPACITY);

    // One forwarding task per subscribed channel.
    let mut subscriptions: HashMap<String, JoinHandle<()>> = HashMap::new();

    loop {
        tokio::select! {
            // Outbound: channel pushes
            Some(server_msg) = push_rx.recv() => {
                if send_message(&mut ws_sender, &server_msg).await.is_err() {
                    break;
                }
            }

            // Inbound: client protocol messages
            maybe_msg = ws_receiver.next() => {
                match maybe_msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                handle_client_message(
                                    &state,
                                    &push_tx,
                                    &mut subscriptions,
                                    client_msg,
                                )
                                .await
                            }
                            Err(e) => {
                                tracing::debug!("Failed to parse client message: {}", e);
                                ServerMessage::error("invalid_message", "Invalid message format")
                            }
                        };
                        if send_message(&mut ws_sender, &reply).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!("WebSocket closed: {}", session_id);
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = ws_sender.send(Message::Pong(data)).await;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!("WebSocket error on {}: {}", session_id, e);
                        break;
                    }
                }
            }
        }
    }

    // Disconnection removes the session from every channel it held
    for (_, handle) in subscriptions {
        handle.abort();
    }
    tracing::debug!("WebSocket session ended: {}", session_id);
}

/// Apply one client message, returning the reply to send.
async fn handle_client_message(
    state: &Arc<AppState>,
    push_tx: &mpsc::Sender<ServerMessage>,
    subscriptions: &mut HashMap<String, JoinHandle<()>>,
    msg: ClientMessage,
) -> ServerMessage {
    match msg {
        ClientMessage::Subscribe { channel } => {
            if subscriptions.contains_key(&channel) {
                return ServerMessage::error("already_subscribed", "Already subscribed");
            }

            let receiver = state.hub.subscribe(&channel).await;
            let handle = spawn_forwarder(channel.clone(), receiver, push_tx.clone());
            subscriptions.insert(channel.clone(), handle);

            ServerMessage::Subscribed { channel }
        }

        ClientMessage::Unsubscribe { channel } => match subscriptions.remove(&channel) {
            Some(handle) => {
                handle.abort();
                ServerMessage::Unsubscribed { channel }
            }
            None => ServerMessage::error("not_subscribed", "Not subscribed to that channel"),
        },

        ClientMessage::Ping => ServerMessage::Pong,
    }
}

/// Forward items from one channel to the session queue.
///
/// A lagged receiver silently drops the missed pushes; the client's
/// fallback is a re-poll, not a replay.
fn spawn_forwarder(
    channel: String,
    mut receiver: broadcast::Receiver<crate::feed::types::FeedItem>,
    push_tx: mpsc::Sender<ServerMessage>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(item) => {
                    let msg = ServerMessage::NewItem {
                        channel: channel.clone(),
                        item: item.into(),
                    };
                    if push_tx.send(msg).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::debug!("Session lagged on {}: {} push(es) dropped", channel, missed);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Serialize and send one server message.
async fn send_message(
    ws_sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), axum::Error> {
    match serde_json::to_string(msg) {
        Ok(json) => ws_sender.send(Message::Text(json.into())).await,
        Err(e) => {
            tracing::error!("Failed to serialize server message: {}", e);
            Ok(())
        }
    }
}
