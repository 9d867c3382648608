use crate::error::Error;
use async_trait::async_trait;
use events::{Comment, FeedItem, Notification, NotificationKind, Post, PostId, User, UserId};
use serde::Serialize;

/// Result of toggling a follow relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowToggle {
    /// Whether the caller follows the user after the toggle.
    #[serde(rename = "followingOfMine")]
    pub following: bool,
    pub followers_count: i64,
    #[serde(skip)]
    pub followee_id: UserId,
}

/// Result of toggling a like on a post or a comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeToggle {
    pub liked: bool,
    pub likes_count: i64,
}

/// Result of toggling a post subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionToggle {
    pub subscribed: bool,
}

/// Persistence and querying of the rows the fan-out subsystem reads and writes.
///
/// Every mutating method commits before it returns, so callers may publish
/// the returned values right away.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_user(&self, email: &str, username: &str) -> Result<User, Error>;

    async fn find_user_by_id(&self, id: &str) -> Result<User, Error>;

    async fn find_user_by_username(&self, username: &str) -> Result<User, Error>;

    /// Follows `username` if `follower_id` does not follow them yet, unfollows
    /// otherwise. Following yourself is `Forbidden`.
    async fn toggle_follow(&self, follower_id: &str, username: &str)
        -> Result<FollowToggle, Error>;

    /// Stores a post and subscribes its author to it.
    async fn create_post(
        &self,
        author: &User,
        content: &str,
        spoiler_of: Option<&str>,
    ) -> Result<Post, Error>;

    /// A post as seen by `viewer`.
    async fn find_post(&self, post_id: &str, viewer: Option<&str>) -> Result<Post, Error>;

    async fn toggle_post_like(&self, user_id: &str, post_id: &str) -> Result<LikeToggle, Error>;

    /// Subscribes `user_id` to the post's comment notifications, or
    /// unsubscribes them if they already are.
    async fn toggle_subscription(
        &self,
        user_id: &str,
        post_id: &str,
    ) -> Result<SubscriptionToggle, Error>;

    /// Inserts one timeline entry per follower of the post's author and
    /// returns them, each addressed to its follower.
    async fn insert_feed_items(&self, post: &Post) -> Result<Vec<FeedItem>, Error>;

    /// Newest first. `before` is the id of a timeline entry; only older entries
    /// are returned.
    async fn feed(
        &self,
        user_id: &str,
        before: Option<&str>,
        limit: usize,
    ) -> Result<Vec<FeedItem>, Error>;

    /// Stores a comment, subscribes its author to the post and bumps the post's
    /// comment count.
    async fn create_comment(
        &self,
        author: &User,
        post_id: &str,
        content: &str,
    ) -> Result<Comment, Error>;

    /// Newest first, with `mine` set for the viewer.
    async fn comments(&self, post_id: &str, viewer: Option<&str>) -> Result<Vec<Comment>, Error>;

    async fn toggle_comment_like(
        &self,
        user_id: &str,
        comment_id: &str,
    ) -> Result<LikeToggle, Error>;

    /// Notifies every subscriber of the comment's post except its author. An
    /// unread comment notification on the same post is updated in place.
    async fn create_comment_notifications(
        &self,
        comment: &Comment,
    ) -> Result<Vec<Notification>, Error>;

    /// Notifies each existing user in `usernames` other than `actor`.
    async fn create_mention_notifications(
        &self,
        actor: &User,
        post_id: &PostId,
        usernames: &[String],
        kind: NotificationKind,
    ) -> Result<Vec<Notification>, Error>;

    async fn create_follow_notification(
        &self,
        actor: &User,
        followee_id: &str,
    ) -> Result<Notification, Error>;

    /// Newest first.
    async fn notifications(&self, user_id: &str) -> Result<Vec<Notification>, Error>;
}
