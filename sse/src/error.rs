//! Error types for the `sse` crate.
use std::error::Error as StdError;
use std::fmt;

#[derive(Debug, PartialEq)]
pub struct Error {
    /// Name of the topic whose broker produced the error.
    pub topic: &'static str,
    pub error_kind: SseErrorKind,
}

#[derive(Debug, PartialEq)]
pub enum SseErrorKind {
    /// The broker's dispatch loop has stopped; it accepts no more
    /// subscribers or events.
    BrokerClosed,
}

impl Error {
    pub(crate) fn broker_closed(topic: &'static str) -> Self {
        Self {
            topic,
            error_kind: SseErrorKind::BrokerClosed,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.error_kind {
            SseErrorKind::BrokerClosed => write!(f, "SSE Error: {} broker is closed", self.topic),
        }
    }
}

impl StdError for Error {}
