//! Typed request bodies and query strings.
//!
//! Field names follow the JSON the clients send (camelCase).
pub(crate) mod comment;
pub(crate) mod feed;
pub(crate) mod post;
pub(crate) mod session;
pub(crate) mod user;
