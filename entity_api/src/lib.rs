//! Storage of users, follows, posts, timelines, comments and notifications.
//!
//! Callers depend on the [`Store`] trait. [`MemoryStore`] is the in-process
//! implementation used by the server and by tests.
pub mod error;
pub mod memory;
pub mod store;

pub use memory::MemoryStore;
pub use store::{FollowToggle, LikeToggle, Store, SubscriptionToggle};
