//! Event values pushed to live clients by the real-time fan-out subsystem.
//!
//! This crate has no dependencies on internal crates, avoiding circular
//! dependencies between `entity_api`, `domain`, `sse` and `web`.
//!
//! # Routing fields
//!
//! Every event carries the identity needed to route it to subscribers:
//!
//! - [`FeedItem`] and [`Notification`] carry the recipient in `user_id`.
//! - [`Comment`] carries the post in `post_id` and its author in `user_id`.
//!
//! Routing fields are never serialized. Clients receive exactly the payload
//! they need to render the update without a follow-up fetch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a user, as supplied by the authentication layer.
pub type UserId = String;

/// Opaque identifier of a post.
pub type PostId = String;

/// Public view of a user embedded in posts and comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(skip)]
    pub id: UserId,
    pub username: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    /// Author of the post.
    #[serde(skip)]
    pub user_id: UserId,
    pub content: String,
    pub spoiler_of: Option<String>,
    pub likes_count: i64,
    pub comments_count: i64,
    pub created_at: DateTime<Utc>,
    pub user: Option<User>,
    pub mine: bool,
    pub liked: bool,
    pub subscribed: bool,
}

/// A post delivered into one follower's timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub id: String,
    /// Recipient of this timeline entry.
    #[serde(skip)]
    pub user_id: UserId,
    #[serde(skip)]
    pub post_id: PostId,
    pub post: Post,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub content: String,
    pub likes_count: i64,
    pub created_at: DateTime<Utc>,
    /// Author of the comment.
    #[serde(skip)]
    pub user_id: UserId,
    #[serde(skip)]
    pub post_id: PostId,
    pub user: User,
    pub mine: bool,
    pub liked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Follow,
    Comment,
    PostMention,
    CommentMention,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NotificationKind::Follow => write!(f, "follow"),
            NotificationKind::Comment => write!(f, "comment"),
            NotificationKind::PostMention => write!(f, "post_mention"),
            NotificationKind::CommentMention => write!(f, "comment_mention"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    /// Recipient of the notification.
    #[serde(skip)]
    pub user_id: UserId,
    /// Usernames of the users that caused the notification, oldest first.
    pub actors: Vec<String>,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub post_id: Option<PostId>,
    pub read: bool,
    pub issued_at: DateTime<Utc>,
}
