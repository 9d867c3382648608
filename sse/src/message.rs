//! Wire format of the event stream.
//!
//! Every frame is UTF-8 text terminated by a blank line:
//!
//! - heartbeat: `ping: \n\n`
//! - event: `data: <json>\n\n`
//! - serialization failure: `error: <message>\n\n`

use axum::body::Bytes;
use log::*;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Ping,
    /// A serialized event.
    Data(String),
    Error(String),
}

impl Frame {
    /// Serializes an event into a `Data` frame, or an `Error` frame describing
    /// why it could not be serialized.
    pub fn from_event<E: Serialize>(event: &E) -> Self {
        match serde_json::to_string(event) {
            Ok(json) => Frame::Data(json),
            Err(e) => {
                warn!("Failed to serialize SSE event: {e}");
                Frame::Error(e.to_string())
            }
        }
    }

    pub fn encode(&self) -> Bytes {
        match self {
            Frame::Ping => Bytes::from_static(b"ping: \n\n"),
            Frame::Data(json) => Bytes::from(format!("data: {json}\n\n")),
            // A newline inside the message would end the frame early.
            Frame::Error(message) => {
                Bytes::from(format!("error: {}\n\n", message.replace('\n', " ")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser::Error as _;
    use serde::Serializer;

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("cannot encode\nthis value"))
        }
    }

    #[test]
    fn ping_frame_is_a_blank_terminated_comment_line() {
        assert_eq!(Frame::Ping.encode(), Bytes::from_static(b"ping: \n\n"));
    }

    #[test]
    fn data_frame_wraps_compact_json() {
        let frame = Frame::from_event(&serde_json::json!({ "id": "1", "content": "hi" }));

        assert_eq!(
            frame.encode(),
            Bytes::from_static(b"data: {\"content\":\"hi\",\"id\":\"1\"}\n\n")
        );
    }

    #[test]
    fn serialization_failure_becomes_a_single_error_frame() {
        let frame = Frame::from_event(&Unserializable);

        assert_eq!(frame, Frame::Error("cannot encode\nthis value".to_string()));
        assert_eq!(
            frame.encode(),
            Bytes::from_static(b"error: cannot encode this value\n\n")
        );
    }
}
