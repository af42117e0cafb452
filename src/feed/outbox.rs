//! Outbound push queue for newswire.
//!
//! Newly-inserted items are accumulated in a bounded buffer owned by a
//! single task and flushed to the broadcast hub when the buffer reaches
//! a size threshold, when the flush ticker fires, or on shutdown,
//! whichever comes first.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::feed::hub::ChannelHub;
use crate::feed::types::FeedItem;

/// Buffer size at which a flush happens without waiting for the ticker.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 32;

/// Flush ticker period in milliseconds.
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 250;

/// Capacity of the intake queue feeding the buffer task.
const INTAKE_CAPACITY: usize = 1024;

/// Handle for enqueueing items onto the outbound queue.
#[derive(Clone)]
pub struct Outbox {
    tx: mpsc::Sender<FeedItem>,
}

impl Outbox {
    /// Spawn the queue task with default thresholds.
    pub fn spawn(hub: Arc<ChannelHub>, shutdown: watch::Receiver<bool>) -> Self {
        Self::spawn_with(
            hub,
            DEFAULT_FLUSH_THRESHOLD,
            Duration::from_millis(DEFAULT_FLUSH_INTERVAL_MS),
            shutdown,
        )
    }

    /// Spawn the queue task with explicit threshold and ticker period.
    pub fn spawn_with(
        hub: Arc<ChannelHub>,
        threshold: usize,
        flush_interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel::<FeedItem>(INTAKE_CAPACITY);

        tokio::spawn(async move {
            let mut buffer: Vec<FeedItem> = Vec::with_capacity(threshold);
            let mut ticker = interval(flush_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut shutdown_watchable = true;

            loop {
                tokio::select! {
                    maybe = rx.recv() => match maybe {
                        Some(item) => {
                            buffer.push(item);
                            if buffer.len() >= threshold {
                                flush(&hub, &mut buffer).await;
                            }
                        }
                        None => {
                            // All senders gone
                            flush(&hub, &mut buffer).await;
                            break;
                        }
                    },
                    _ = ticker.tick() => {
                        if !buffer.is_empty() {
                            flush(&hub, &mut buffer).await;
                        }
                    }
                    changed = shutdown.changed(), if shutdown_watchable => {
                        match changed {
                            Ok(()) if *shutdown.borrow() => {
                                flush(&hub, &mut buffer).await;
                                break;
                            }
                            Ok(()) => {}
                            Err(_) => {
                                // Shutdown sender gone; the intake queue
                                // closing still terminates the task
                                shutdown_watchable = false;
                            }
                        }
                    }
                }
            }
            info!("Outbound queue stopped");
        });

        Self { tx }
    }

    /// Enqueue one item for broadcast.
    ///
    /// Best-effort: a full intake queue applies backpressure, and a
    /// stopped queue task drops the item.
    pub async fn push(&self, item: FeedItem) {
        if self.tx.send(item).await.is_err() {
            debug!("Outbound queue is gone; dropping push");
        }
    }
}

/// Drain the buffer to the hub in arrival order.
async fn flush(hub: &ChannelHub, buffer: &mut Vec<FeedItem>) {
    for item in buffer.drain(..) {
        hub.publish(item).await;
    }
}
