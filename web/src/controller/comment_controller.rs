use crate::extractors::{
    accepts_event_stream::AcceptsEventStream, authenticated_user::AuthenticatedUser,
    caller::RequestCaller,
};
use crate::params::comment::CreateParams;
use crate::{AppState, Error};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use domain::comment as CommentApi;
use log::*;
use sse::EventStream;

/// GET the comments of a post, live or as a snapshot. Anonymous callers are
/// welcome.
pub async fn index(
    RequestCaller(caller): RequestCaller,
    AcceptsEventStream(streaming): AcceptsEventStream,
    State(app_state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Response, Error> {
    if streaming {
        debug!("Streaming comments on post {post_id} for {:?}", caller.user_id);
        let subscription = CommentApi::subscribe(&app_state.ctx, &caller, &post_id).await?;
        return Ok(EventStream::new(subscription, app_state.heartbeat()).into_response());
    }

    let comments = CommentApi::list(&app_state.ctx, &caller, &post_id).await?;

    Ok(Json(comments).into_response())
}

/// CREATE a comment on a post
pub async fn create(
    AuthenticatedUser(caller): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path(post_id): Path<String>,
    Json(params): Json<CreateParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("CREATE comment on post {post_id}");

    let comment = CommentApi::create(&app_state.ctx, &caller, &post_id, &params.content).await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

/// Like or unlike a comment
pub async fn toggle_like(
    AuthenticatedUser(caller): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path(comment_id): Path<String>,
) -> Result<impl IntoResponse, Error> {
    debug!("TOGGLE like of comment {comment_id}");

    let toggled = CommentApi::toggle_like(&app_state.ctx, &caller, &comment_id).await?;

    Ok(Json(toggled))
}
