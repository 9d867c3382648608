//! In-process [`Store`] backed by plain collections behind one lock.
//!
//! Each method takes the lock once, so every operation is atomic with
//! respect to the others, the same guarantee a database transaction gives.
use crate::error::{EntityApiErrorKind, Error};
use crate::store::{FollowToggle, LikeToggle, Store, SubscriptionToggle};
use async_trait::async_trait;
use chrono::Utc;
use events::{Comment, FeedItem, Notification, NotificationKind, Post, PostId, User, UserId};
use log::*;
use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

struct UserRow {
    user: User,
    email: String,
    followers_count: i64,
    following_count: i64,
}

struct FeedRow {
    id: String,
    user_id: UserId,
    post_id: PostId,
}

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, UserRow>,
    /// (follower, followee)
    follows: HashSet<(UserId, UserId)>,
    posts: HashMap<PostId, Post>,
    /// (user, post)
    subscriptions: HashSet<(UserId, PostId)>,
    /// (user, post)
    post_likes: HashSet<(UserId, PostId)>,
    /// (user, comment)
    comment_likes: HashSet<(UserId, String)>,
    feed: Vec<FeedRow>,
    comments: Vec<Comment>,
    notifications: Vec<Notification>,
}

impl Tables {
    fn user(&self, id: &str) -> Result<&User, Error> {
        self.users
            .get(id)
            .map(|row| &row.user)
            .ok_or_else(|| Error::of_kind(EntityApiErrorKind::RecordNotFound))
    }

    fn user_by_username(&self, username: &str) -> Option<&User> {
        self.users
            .values()
            .map(|row| &row.user)
            .find(|user| user.username == username)
    }

    /// A post as seen by `viewer`.
    fn post_for(&self, post_id: &str, viewer: Option<&str>) -> Option<Post> {
        let post = self.posts.get(post_id)?;
        let Some(viewer) = viewer else {
            return Some(post.clone());
        };
        let edge = (viewer.to_string(), post_id.to_string());

        Some(Post {
            mine: post.user_id == viewer,
            liked: self.post_likes.contains(&edge),
            subscribed: self.subscriptions.contains(&edge),
            ..post.clone()
        })
    }
}

/// Adds the edge if absent, removes it otherwise. Returns whether it is now
/// present.
fn toggle<T: Eq + std::hash::Hash>(set: &mut HashSet<T>, edge: T) -> bool {
    if set.remove(&edge) {
        false
    } else {
        set.insert(edge);
        true
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, Error> {
        self.tables.read().map_err(|e| {
            error!("Memory store lock poisoned: {e}");
            Error::of_kind(EntityApiErrorKind::SystemError)
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, Error> {
        self.tables.write().map_err(|e| {
            error!("Memory store lock poisoned: {e}");
            Error::of_kind(EntityApiErrorKind::SystemError)
        })
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, email: &str, username: &str) -> Result<User, Error> {
        let mut tables = self.write()?;

        if tables
            .users
            .values()
            .any(|row| row.email == email || row.user.username == username)
        {
            return Err(Error::of_kind(EntityApiErrorKind::Conflict));
        }

        let user = User {
            id: new_id(),
            username: username.to_string(),
            avatar_url: None,
        };
        tables.users.insert(
            user.id.clone(),
            UserRow {
                user: user.clone(),
                email: email.to_string(),
                followers_count: 0,
                following_count: 0,
            },
        );

        Ok(user)
    }

    async fn find_user_by_id(&self, id: &str) -> Result<User, Error> {
        self.read()?.user(id).cloned()
    }

    async fn find_user_by_username(&self, username: &str) -> Result<User, Error> {
        self.read()?
            .user_by_username(username)
            .cloned()
            .ok_or_else(|| Error::of_kind(EntityApiErrorKind::RecordNotFound))
    }

    async fn toggle_follow(
        &self,
        follower_id: &str,
        username: &str,
    ) -> Result<FollowToggle, Error> {
        let mut tables = self.write()?;

        let followee_id = tables
            .user_by_username(username)
            .map(|user| user.id.clone())
            .ok_or_else(|| Error::of_kind(EntityApiErrorKind::RecordNotFound))?;
        tables.user(follower_id)?;

        if followee_id == follower_id {
            return Err(Error::of_kind(EntityApiErrorKind::Forbidden));
        }

        let edge = (follower_id.to_string(), followee_id.clone());
        let following = !tables.follows.remove(&edge);
        let delta = if following {
            tables.follows.insert(edge);
            1
        } else {
            -1
        };

        if let Some(row) = tables.users.get_mut(follower_id) {
            row.following_count += delta;
        }
        let followers_count = match tables.users.get_mut(&followee_id) {
            Some(row) => {
                row.followers_count += delta;
                row.followers_count
            }
            None => 0,
        };

        Ok(FollowToggle {
            following,
            followers_count,
            followee_id,
        })
    }

    async fn create_post(
        &self,
        author: &User,
        content: &str,
        spoiler_of: Option<&str>,
    ) -> Result<Post, Error> {
        let mut tables = self.write()?;
        tables.user(&author.id)?;

        let post = Post {
            id: new_id(),
            user_id: author.id.clone(),
            content: content.to_string(),
            spoiler_of: spoiler_of.map(str::to_string),
            likes_count: 0,
            comments_count: 0,
            created_at: Utc::now(),
            user: Some(author.clone()),
            mine: false,
            liked: false,
            subscribed: false,
        };
        tables.posts.insert(post.id.clone(), post.clone());
        tables
            .subscriptions
            .insert((author.id.clone(), post.id.clone()));

        Ok(post)
    }

    async fn find_post(&self, post_id: &str, viewer: Option<&str>) -> Result<Post, Error> {
        self.read()?
            .post_for(post_id, viewer)
            .ok_or_else(|| Error::of_kind(EntityApiErrorKind::RecordNotFound))
    }

    async fn toggle_post_like(&self, user_id: &str, post_id: &str) -> Result<LikeToggle, Error> {
        let mut tables = self.write()?;
        tables.user(user_id)?;
        if !tables.posts.contains_key(post_id) {
            return Err(Error::of_kind(EntityApiErrorKind::RecordNotFound));
        }

        let liked = toggle(
            &mut tables.post_likes,
            (user_id.to_string(), post_id.to_string()),
        );
        let likes_count = match tables.posts.get_mut(post_id) {
            Some(post) => {
                post.likes_count += if liked { 1 } else { -1 };
                post.likes_count
            }
            None => 0,
        };

        Ok(LikeToggle { liked, likes_count })
    }

    async fn toggle_subscription(
        &self,
        user_id: &str,
        post_id: &str,
    ) -> Result<SubscriptionToggle, Error> {
        let mut tables = self.write()?;
        tables.user(user_id)?;
        if !tables.posts.contains_key(post_id) {
            return Err(Error::of_kind(EntityApiErrorKind::RecordNotFound));
        }

        let subscribed = toggle(
            &mut tables.subscriptions,
            (user_id.to_string(), post_id.to_string()),
        );

        Ok(SubscriptionToggle { subscribed })
    }

    async fn insert_feed_items(&self, post: &Post) -> Result<Vec<FeedItem>, Error> {
        let mut tables = self.write()?;

        let followers: Vec<UserId> = tables
            .follows
            .iter()
            .filter(|(_, followee)| *followee == post.user_id)
            .map(|(follower, _)| follower.clone())
            .collect();

        let shared = Post {
            mine: false,
            subscribed: false,
            ..post.clone()
        };

        let mut items = Vec::with_capacity(followers.len());
        for follower in followers {
            let row = FeedRow {
                id: new_id(),
                user_id: follower,
                post_id: post.id.clone(),
            };
            items.push(FeedItem {
                id: row.id.clone(),
                user_id: row.user_id.clone(),
                post_id: row.post_id.clone(),
                post: shared.clone(),
            });
            tables.feed.push(row);
        }

        Ok(items)
    }

    async fn feed(
        &self,
        user_id: &str,
        before: Option<&str>,
        limit: usize,
    ) -> Result<Vec<FeedItem>, Error> {
        let tables = self.read()?;

        let mut rows: Vec<&FeedRow> = tables
            .feed
            .iter()
            .rev()
            .filter(|row| row.user_id == user_id)
            .collect();

        if let Some(before) = before {
            match rows.iter().position(|row| row.id == before) {
                Some(index) => rows.drain(..=index).for_each(drop),
                None => rows.clear(),
            }
        }

        Ok(rows
            .into_iter()
            .take(limit)
            .filter_map(|row| {
                tables.post_for(&row.post_id, Some(user_id)).map(|post| FeedItem {
                    id: row.id.clone(),
                    user_id: row.user_id.clone(),
                    post_id: row.post_id.clone(),
                    post,
                })
            })
            .collect())
    }

    async fn create_comment(
        &self,
        author: &User,
        post_id: &str,
        content: &str,
    ) -> Result<Comment, Error> {
        let mut tables = self.write()?;
        tables.user(&author.id)?;

        let post = tables
            .posts
            .get_mut(post_id)
            .ok_or_else(|| Error::of_kind(EntityApiErrorKind::RecordNotFound))?;
        post.comments_count += 1;

        let comment = Comment {
            id: new_id(),
            content: content.to_string(),
            likes_count: 0,
            created_at: Utc::now(),
            user_id: author.id.clone(),
            post_id: post_id.to_string(),
            user: author.clone(),
            mine: false,
            liked: false,
        };
        tables.comments.push(comment.clone());
        tables
            .subscriptions
            .insert((author.id.clone(), post_id.to_string()));

        Ok(comment)
    }

    async fn comments(&self, post_id: &str, viewer: Option<&str>) -> Result<Vec<Comment>, Error> {
        let tables = self.read()?;

        if !tables.posts.contains_key(post_id) {
            return Err(Error::of_kind(EntityApiErrorKind::RecordNotFound));
        }

        Ok(tables
            .comments
            .iter()
            .rev()
            .filter(|comment| comment.post_id == post_id)
            .map(|comment| Comment {
                mine: viewer == Some(comment.user_id.as_str()),
                liked: viewer.is_some_and(|viewer| {
                    tables
                        .comment_likes
                        .contains(&(viewer.to_string(), comment.id.clone()))
                }),
                ..comment.clone()
            })
            .collect())
    }

    async fn toggle_comment_like(
        &self,
        user_id: &str,
        comment_id: &str,
    ) -> Result<LikeToggle, Error> {
        let mut tables = self.write()?;
        tables.user(user_id)?;
        if !tables.comments.iter().any(|comment| comment.id == comment_id) {
            return Err(Error::of_kind(EntityApiErrorKind::RecordNotFound));
        }

        let liked = toggle(
            &mut tables.comment_likes,
            (user_id.to_string(), comment_id.to_string()),
        );
        let likes_count = match tables
            .comments
            .iter_mut()
            .find(|comment| comment.id == comment_id)
        {
            Some(comment) => {
                comment.likes_count += if liked { 1 } else { -1 };
                comment.likes_count
            }
            None => 0,
        };

        Ok(LikeToggle { liked, likes_count })
    }

    async fn create_comment_notifications(
        &self,
        comment: &Comment,
    ) -> Result<Vec<Notification>, Error> {
        let mut tables = self.write()?;

        let recipients: Vec<UserId> = tables
            .subscriptions
            .iter()
            .filter(|(user_id, post_id)| *post_id == comment.post_id && *user_id != comment.user_id)
            .map(|(user_id, _)| user_id.clone())
            .collect();

        let now = Utc::now();
        let actor = &comment.user.username;
        let mut notifications = Vec::with_capacity(recipients.len());

        for recipient in recipients {
            let unread = tables.notifications.iter_mut().find(|n| {
                n.user_id == recipient
                    && n.kind == NotificationKind::Comment
                    && n.post_id.as_deref() == Some(comment.post_id.as_str())
                    && !n.read
            });

            let notification = match unread {
                Some(existing) => {
                    if !existing.actors.contains(actor) {
                        existing.actors.push(actor.clone());
                    }
                    existing.issued_at = now;
                    existing.clone()
                }
                None => {
                    let created = Notification {
                        id: new_id(),
                        user_id: recipient,
                        actors: vec![actor.clone()],
                        kind: NotificationKind::Comment,
                        post_id: Some(comment.post_id.clone()),
                        read: false,
                        issued_at: now,
                    };
                    tables.notifications.push(created.clone());
                    created
                }
            };
            notifications.push(notification);
        }

        Ok(notifications)
    }

    async fn create_mention_notifications(
        &self,
        actor: &User,
        post_id: &PostId,
        usernames: &[String],
        kind: NotificationKind,
    ) -> Result<Vec<Notification>, Error> {
        let mut tables = self.write()?;

        let mut seen = HashSet::new();
        let recipients: Vec<UserId> = usernames
            .iter()
            .filter(|username| seen.insert(username.as_str()))
            .filter_map(|username| tables.user_by_username(username))
            .filter(|user| user.id != actor.id)
            .map(|user| user.id.clone())
            .collect();

        let now = Utc::now();
        let notifications: Vec<Notification> = recipients
            .into_iter()
            .map(|recipient| Notification {
                id: new_id(),
                user_id: recipient,
                actors: vec![actor.username.clone()],
                kind,
                post_id: Some(post_id.clone()),
                read: false,
                issued_at: now,
            })
            .collect();
        tables.notifications.extend(notifications.iter().cloned());

        Ok(notifications)
    }

    async fn create_follow_notification(
        &self,
        actor: &User,
        followee_id: &str,
    ) -> Result<Notification, Error> {
        let mut tables = self.write()?;
        tables.user(followee_id)?;

        let notification = Notification {
            id: new_id(),
            user_id: followee_id.to_string(),
            actors: vec![actor.username.clone()],
            kind: NotificationKind::Follow,
            post_id: None,
            read: false,
            issued_at: Utc::now(),
        };
        tables.notifications.push(notification.clone());

        Ok(notification)
    }

    async fn notifications(&self, user_id: &str) -> Result<Vec<Notification>, Error> {
        let tables = self.read()?;

        let mut notifications: Vec<Notification> = tables
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));

        Ok(notifications)
    }
}
