use crate::broker::{Broker, BrokerConfig, BrokerHandle};
use crate::topic::{CommentTopic, FeedTopic, NotificationTopic};
use log::*;
use std::sync::Mutex;

/// The process-wide set of brokers: one per topic.
pub struct Hub {
    feed: Broker<FeedTopic>,
    comments: Broker<CommentTopic>,
    notifications: Broker<NotificationTopic>,
    handles: Mutex<Vec<BrokerHandle>>,
}

impl Hub {
    /// Starts the dispatch loop of every broker.
    pub fn start(config: &BrokerConfig) -> Self {
        let (feed, feed_handle) = Broker::start(config);
        let (comments, comments_handle) = Broker::start(config);
        let (notifications, notifications_handle) = Broker::start(config);

        info!(
            "Started SSE hub (ingress capacity {}, subscriber buffer {})",
            config.ingress_capacity, config.subscriber_buffer
        );

        Self {
            feed,
            comments,
            notifications,
            handles: Mutex::new(vec![feed_handle, comments_handle, notifications_handle]),
        }
    }

    pub fn feed(&self) -> &Broker<FeedTopic> {
        &self.feed
    }

    pub fn comments(&self) -> &Broker<CommentTopic> {
        &self.comments
    }

    pub fn notifications(&self) -> &Broker<NotificationTopic> {
        &self.notifications
    }

    /// Stops every broker, closing all open subscriptions. Later calls are no-ops.
    pub async fn shutdown(&self) {
        let handles = match self.handles.lock() {
            Ok(mut handles) => std::mem::take(&mut *handles),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };

        for handle in handles {
            debug!("Shutting down {} broker", handle.topic());
            handle.shutdown().await;
        }
    }
}
