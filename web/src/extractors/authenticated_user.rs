use crate::extractors::RejectionType;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use domain::auth::Caller;

/// A caller known to be signed in. Available on routes behind `require_auth`;
/// anywhere else an anonymous request is rejected with 401.
pub(crate) struct AuthenticatedUser(pub Caller);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = RejectionType;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Caller>() {
            Some(caller) if caller.user_id.is_some() => Ok(AuthenticatedUser(caller.clone())),
            _ => Err((StatusCode::UNAUTHORIZED, "Unauthorized".to_string())),
        }
    }
}
