use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use domain::auth::Caller;
use std::convert::Infallible;

/// Whoever issued the request, signed in or not.
pub(crate) struct RequestCaller(pub Caller);

#[async_trait]
impl<S> FromRequestParts<S> for RequestCaller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let caller = parts
            .extensions
            .get::<Caller>()
            .cloned()
            .unwrap_or_default();

        Ok(RequestCaller(caller))
    }
}
