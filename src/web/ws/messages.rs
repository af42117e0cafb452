//! WebSocket message types for the live channel protocol.

use serde::{Deserialize, Serialize};

use crate::web::dto::FeedItemResponse;

/// Messages sent from client to server.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Subscribe to a source channel.
    Subscribe {
        /// Channel (source) name.
        channel: String,
    },
    /// Unsubscribe from a source channel.
    Unsubscribe {
        /// Channel (source) name.
        channel: String,
    },
    /// Heartbeat ping.
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A newly ingested item on a subscribed channel.
    NewItem {
        /// Channel (source) name.
        channel: String,
        /// The item.
        item: FeedItemResponse,
    },
    /// Subscription confirmed.
    Subscribed {
        /// Channel (source) name.
        channel: String,
    },
    /// Unsubscription confirmed.
    Unsubscribed {
        /// Channel (source) name.
        channel: String,
    },
    /// Error message.
    Error {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
    },
    /// Heartbeat pong response.
    Pong,
}

impl ServerMessage {
    /// Create an error message.
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }
}
