use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::ACCEPT, request::Parts},
};
use sse::stream::EVENT_STREAM_MIME_TYPE;
use std::convert::Infallible;

/// Whether the client asked for a live event stream rather than a JSON
/// snapshot.
pub(crate) struct AcceptsEventStream(pub bool);

#[async_trait]
impl<S> FromRequestParts<S> for AcceptsEventStream
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let accepts = parts
            .headers
            .get_all(ACCEPT)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .any(|value| value.contains(EVENT_STREAM_MIME_TYPE));

        Ok(AcceptsEventStream(accepts))
    }
}
