//! Operations behind the HTTP surface.
//!
//! Producers (`post::create`, `comment::create`, `user::toggle_follow`)
//! commit through the [`Store`], publish to the brokers in the [`Hub`] and
//! leave slow follow-up work to the [`Fanout`] worker. Readers return either
//! a snapshot from the store or a live [`Subscription`].
use entity_api::Store;
use fanout::Fanout;
use sse::Hub;
use std::sync::Arc;

pub use sse::subscription::Subscription;
pub use sse::topic::{CommentTopic, FeedTopic, NotificationTopic};

pub mod auth;
pub mod comment;
pub mod content;
pub mod error;
pub mod fanout;
pub mod feed;
pub mod notification;
pub mod post;
pub mod user;

/// Everything a domain operation needs to read, write and publish.
#[derive(Clone)]
pub struct Context {
    pub store: Arc<dyn Store>,
    pub hub: Arc<Hub>,
    pub fanout: Fanout,
}

impl Context {
    pub fn new(store: Arc<dyn Store>, hub: Arc<Hub>, fanout: Fanout) -> Self {
        Self { store, hub, fanout }
    }
}
