pub(crate) mod accepts_event_stream;
pub(crate) mod authenticated_user;
pub(crate) mod caller;

use axum::http::StatusCode;

type RejectionType = (StatusCode, String);
