//! Routing rules for each broker.
//!
//! A [`Topic`] ties an event type to the subscriber key it is routed by and
//! the predicate deciding whether a subscriber receives a given event. One
//! generic [`Broker`](crate::broker::Broker) engine is instantiated once per
//! topic.

use events::{Comment, FeedItem, Notification, PostId, UserId};
use std::fmt::Debug;

pub trait Topic: Send + Sync + 'static {
    type Event: Clone + Send + Sync + 'static;
    type Key: Clone + Debug + Send + Sync + 'static;

    /// Short name used in logs and errors.
    const NAME: &'static str;

    /// Returns true if a subscriber registered with `key` must receive `event`.
    fn matches(key: &Self::Key, event: &Self::Event) -> bool;
}

/// New posts landing in a follower's timeline. Routed by recipient.
pub struct FeedTopic;

impl Topic for FeedTopic {
    type Event = FeedItem;
    type Key = UserId;

    const NAME: &'static str = "feed";

    fn matches(key: &UserId, event: &FeedItem) -> bool {
        *key == event.user_id
    }
}

/// Notifications for a single user. Routed by recipient.
pub struct NotificationTopic;

impl Topic for NotificationTopic {
    type Event = Notification;
    type Key = UserId;

    const NAME: &'static str = "notifications";

    fn matches(key: &UserId, event: &Notification) -> bool {
        *key == event.user_id
    }
}

/// Identifies a viewer of a post's comment thread. Anonymous viewers have no
/// `viewer` id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommentKey {
    pub viewer: Option<UserId>,
    pub post_id: PostId,
}

/// New comments on a post. The author never gets an echo of their own comment.
pub struct CommentTopic;

impl Topic for CommentTopic {
    type Event = Comment;
    type Key = CommentKey;

    const NAME: &'static str = "comments";

    fn matches(key: &CommentKey, event: &Comment) -> bool {
        key.post_id == event.post_id && key.viewer.as_deref() != Some(event.user_id.as_str())
    }
}
