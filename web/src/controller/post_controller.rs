use crate::extractors::{authenticated_user::AuthenticatedUser, caller::RequestCaller};
use crate::params::post::CreateParams;
use crate::{AppState, Error};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domain::post as PostApi;
use log::*;

/// CREATE a post. Followers see it on their timelines shortly after.
pub async fn create(
    AuthenticatedUser(caller): AuthenticatedUser,
    State(app_state): State<AppState>,
    Json(params): Json<CreateParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("CREATE post from {:?}", caller.user_id);

    let post = PostApi::create(
        &app_state.ctx,
        &caller,
        &params.content,
        params.spoiler_of.as_deref(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

/// GET a post by id
pub async fn read(
    RequestCaller(caller): RequestCaller,
    State(app_state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse, Error> {
    debug!("GET post {post_id}");

    let post = PostApi::find(&app_state.ctx, &caller, &post_id).await?;

    Ok(Json(post))
}

/// Like or unlike a post
pub async fn toggle_like(
    AuthenticatedUser(caller): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse, Error> {
    debug!("TOGGLE like of post {post_id}");

    let toggled = PostApi::toggle_like(&app_state.ctx, &caller, &post_id).await?;

    Ok(Json(toggled))
}

/// Start or stop receiving comment notifications for a post
pub async fn toggle_subscription(
    AuthenticatedUser(caller): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse, Error> {
    debug!("TOGGLE subscription to post {post_id}");

    let toggled = PostApi::toggle_subscription(&app_state.ctx, &caller, &post_id).await?;

    Ok(Json(toggled))
}
