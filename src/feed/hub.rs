//! Realtime broadcast hub for newswire.
//!
//! One channel per source, each backed by a tokio broadcast sender.
//! Delivery is at-most-once and best-effort: a session that is not
//! subscribed (or has lagged past the channel capacity) at push time
//! misses the push and catches up through the poll endpoint.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};

use crate::feed::types::FeedItem;

/// Maximum number of items buffered per channel.
const CHANNEL_CAPACITY: usize = 256;

/// A named broadcast channel carrying newly-inserted items for one source.
pub struct Channel {
    name: String,
    sender: broadcast::Sender<FeedItem>,
}

impl Channel {
    /// Create a new channel.
    pub fn new(name: impl Into<String>) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            name: name.into(),
            sender,
        }
    }

    /// Get the channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get a receiver for items pushed to this channel.
    pub fn subscribe(&self) -> broadcast::Receiver<FeedItem> {
        self.sender.subscribe()
    }

    /// Number of live receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Push an item to every subscribed session.
    ///
    /// Returns the number of receivers that got the item; 0 when nobody
    /// is listening.
    pub fn publish(&self, item: FeedItem) -> usize {
        self.sender.send(item).unwrap_or(0)
    }
}

/// Registry of broadcast channels, one per source.
///
/// Membership is ephemeral: sessions resubscribe after reconnecting.
pub struct ChannelHub {
    channels: RwLock<HashMap<String, Arc<Channel>>>,
}

impl ChannelHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Create a hub with channels pre-created for the given source names.
    pub fn with_sources<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let channels = names
            .into_iter()
            .map(|name| {
                let name = name.into();
                let channel = Arc::new(Channel::new(name.clone()));
                (name, channel)
            })
            .collect();
        Self {
            channels: RwLock::new(channels),
        }
    }

    /// Get a channel by name.
    pub async fn channel(&self, name: &str) -> Option<Arc<Channel>> {
        self.channels.read().await.get(name).cloned()
    }

    /// Get a channel, creating it if absent.
    pub async fn get_or_create(&self, name: &str) -> Arc<Channel> {
        if let Some(channel) = self.channel(name).await {
            return channel;
        }
        let mut channels = self.channels.write().await;
        channels
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Channel::new(name)))
            .clone()
    }

    /// Subscribe to a channel, creating it if absent.
    pub async fn subscribe(&self, name: &str) -> broadcast::Receiver<FeedItem> {
        self.get_or_create(name).await.subscribe()
    }

    /// Push an item to the channel matching its source.
    ///
    /// Returns the number of receivers reached. An item for a source
    /// without a channel has no audience and is dropped.
    pub async fn publish(&self, item: FeedItem) -> usize {
        match self.channel(&item.source).await {
            Some(channel) => channel.publish(item),
            None => 0,
        }
    }

    /// Names of all known channels.
    pub async fn channel_names(&self) -> Vec<String> {
        self.channels.read().await.keys().cloned().collect()
    }
}

impl Default for ChannelHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(source: &str, external_id: &str) -> FeedItem {
        let now = Utc::now();
        FeedItem {
            id: 1,
            source: source.to_string(),
            external_id: external_id.to_string(),
            title: "Headline".to_string(),
            link: format!("https://example.com/{external_id}"),
            summary: None,
            author: None,
            categories: Vec::new(),
            published_at: now,
            fetched_at: now,
            revision: 0,
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let hub = ChannelHub::new();
        let mut rx = hub.subscribe("wires").await;

        let reached = hub.publish(item("wires", "g1")).await;
        assert_eq!(reached, 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.external_id, "g1");
    }

    #[tokio::test]
    async fn test_publish_without_channel_drops() {
        let hub = ChannelHub::new();
        let reached = hub.publish(item("nobody-home", "g1")).await;
        assert_eq!(reached, 0);
    }

    #[tokio::test]
    async fn test_channels_are_isolated() {
        let hub = ChannelHub::new();
        let mut wires_rx = hub.subscribe("wires").await;
        let mut market_rx = hub.subscribe("marketwatch-top").await;

        hub.publish(item("wires", "g1")).await;

        let received = wires_rx.recv().await.unwrap();
        assert_eq!(received.source, "wires");
        assert!(market_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_publish_preserves_order() {
        let hub = ChannelHub::new();
        let mut rx = hub.subscribe("wires").await;

        for id in ["g1", "g2", "g3"] {
            hub.publish(item("wires", id)).await;
        }

        assert_eq!(rx.recv().await.unwrap().external_id, "g1");
        assert_eq!(rx.recv().await.unwrap().external_id, "g2");
        assert_eq!(rx.recv().await.unwrap().external_id, "g3");
    }

    #[tokio::test]
    async fn test_multiple_subscribers_all_receive() {
        let hub = ChannelHub::new();
        let mut rx1 = hub.subscribe("wires").await;
        let mut rx2 = hub.subscribe("wires").await;

        let reached = hub.publish(item("wires", "g1")).await;
        assert_eq!(reached, 2);

        assert_eq!(rx1.recv().await.unwrap().external_id, "g1");
        assert_eq!(rx2.recv().await.unwrap().external_id, "g1");
    }

    #[tokio::test]
    async fn test_dropped_receiver_misses_pushes() {
        let hub = ChannelHub::new();
        {
            let _rx = hub.subscribe("wires").await;
        }
        // Receiver dropped: push has no audience, and there is no replay
        let reached = hub.publish(item("wires", "g1")).await;
        assert_eq!(reached, 0);

        let mut late_rx = hub.subscribe("wires").await;
        assert!(late_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_with_sources_precreates_channels() {
        let hub = ChannelHub::with_sources(["wires", "marketwatch-top"]);
        let mut names = hub.channel_names().await;
        names.sort();
        assert_eq!(names, vec!["marketwatch-top", "wires"]);
        assert!(hub.channel("wires").await.is_some());
    }
}
