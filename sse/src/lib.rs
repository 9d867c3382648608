//! Server-Sent Events (SSE) infrastructure for real-time updates.
//!
//! This crate pushes freshly created feed entries, comments and notifications
//! to every interested live client over long-lived streaming HTTP responses.
//!
//! # Architecture
//!
//! - **One generic broker per topic**: [`broker::Broker`] is parameterized by a
//!   [`topic::Topic`], which names the event type, the subscriber key and the
//!   routing predicate. The [`Hub`] runs the feed, comments and notifications
//!   brokers.
//! - **Actor-owned registry**: each broker has a single dispatch loop task. It
//!   is the only code that reads or writes the subscriber registry;
//!   `subscribe` and `unsubscribe` are messages it consumes, so no lock is
//!   involved.
//! - **Bounded queues**: the ingress queue holds one pending event by default
//!   and each subscriber buffers one event by default. Producers wait when the
//!   queue is full; events are never dropped.
//! - **Ephemeral messages**: if a user is offline, they miss the event and see
//!   fresh data on next page load.
//!
//! # Message Flow
//!
//! 1. Client requests `/api/feed` with `Accept: text/event-stream`
//! 2. The web layer resolves the caller and subscribes to the feed broker
//! 3. The response body is an [`stream::EventStream`] over that subscription
//! 4. A producer commits a write and publishes the event to the broker
//! 5. The dispatch loop sends it to every matching subscriber in turn
//! 6. The stream writes `data: <json>` and flushes; after 15s of silence it
//!    writes `ping: ` instead
//! 7. When the client disconnects the body is dropped, which unsubscribes
//!
//! # Modules
//!
//! - `broker`: generic broker engine and its dispatch loop
//! - `hub`: the three brokers the application runs
//! - `message`: wire frames
//! - `stream`: event-stream response body
//! - `subscription`: subscriber handle with idempotent cleanup
//! - `topic`: routing keys and predicates

pub mod broker;
pub mod error;
pub mod hub;
pub mod message;
pub mod stream;
pub mod subscription;
pub mod topic;

pub use broker::{Broker, BrokerConfig};
pub use hub::Hub;
pub use stream::EventStream;
