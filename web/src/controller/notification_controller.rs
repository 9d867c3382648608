use crate::extractors::{
    accepts_event_stream::AcceptsEventStream, authenticated_user::AuthenticatedUser,
};
use crate::{AppState, Error};
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use domain::notification as NotificationApi;
use log::*;
use sse::EventStream;

/// GET the caller's notifications, live or as a snapshot.
pub async fn index(
    AuthenticatedUser(caller): AuthenticatedUser,
    AcceptsEventStream(streaming): AcceptsEventStream,
    State(app_state): State<AppState>,
) -> Result<Response, Error> {
    if streaming {
        debug!("Streaming notifications for {:?}", caller.user_id);
        let subscription = NotificationApi::subscribe(&app_state.ctx, &caller).await?;
        return Ok(EventStream::new(subscription, app_state.heartbeat()).into_response());
    }

    let notifications = NotificationApi::list(&app_state.ctx, &caller).await?;

    Ok(Json(notifications).into_response())
}
