use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use domain::auth::Caller;
use log::*;

/// Name of the cookie a browser client keeps its token in.
pub(crate) const TOKEN_COOKIE: &str = "jwt";

/// The bearer token from the `Authorization` header, or else the `jwt` cookie.
pub(crate) fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    bearer.or_else(|| {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|cookies| cookies.split(';'))
            .filter_map(|cookie| cookie.trim().split_once('='))
            .find(|(name, _)| *name == TOKEN_COOKIE)
            .map(|(_, token)| token)
            .filter(|token| !token.is_empty())
    })
}

/// Resolves the request's token, if any, into a [`Caller`] stored in the
/// request extensions. A token that does not resolve is rejected with 401,
/// even on routes that allow anonymous callers.
pub async fn resolve_caller(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let caller = match token_from_headers(request.headers()) {
        Some(token) => match app_state.authenticator.resolve(token).await {
            Ok(user_id) => Caller::user(user_id),
            Err(e) => {
                debug!("Rejecting request with unresolvable token: {e}");
                return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
            }
        },
        None => Caller::anonymous(),
    };

    trace!("Resolved caller {:?}", caller.user_id);
    request.extensions_mut().insert(caller);
    next.run(request).await
}

/// Returns 401 Unauthorized unless [`resolve_caller`] found a user.
pub async fn require_auth(request: Request, next: Next) -> Response {
    let authenticated = request
        .extensions()
        .get::<Caller>()
        .is_some_and(|caller| caller.user_id.is_some());

    if authenticated {
        next.run(request).await
    } else {
        (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
    }
}
