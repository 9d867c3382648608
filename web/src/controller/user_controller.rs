use crate::extractors::authenticated_user::AuthenticatedUser;
use crate::params::user::CreateParams;
use crate::{AppState, Error};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domain::user as UserApi;
use log::*;

/// CREATE a new User
pub async fn create(
    State(app_state): State<AppState>,
    Json(params): Json<CreateParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("CREATE new User {}", params.username);

    let user = UserApi::create(&app_state.ctx, &params.email, &params.username).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Follow or unfollow a user
pub async fn toggle_follow(
    AuthenticatedUser(caller): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, Error> {
    debug!("TOGGLE follow of {username}");

    let toggled = UserApi::toggle_follow(&app_state.ctx, &caller, &username).await?;

    Ok(Json(toggled))
}
