use crate::params::session::DevLoginParams;
use crate::{AppState, Error};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use domain::user as UserApi;
use log::*;

/// Issues a token for an existing username without any proof of identity.
/// Only routed in the development environment.
pub async fn dev_login(
    State(app_state): State<AppState>,
    Json(params): Json<DevLoginParams>,
) -> Result<impl IntoResponse, Error> {
    let user = UserApi::find_by_username(&app_state.ctx, params.username.trim()).await?;
    let issued = app_state.tokens.issue(&user.id)?;

    info!("Development login for {}", user.username);

    Ok(Json(issued))
}
