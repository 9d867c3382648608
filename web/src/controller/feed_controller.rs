use crate::extractors::{
    accepts_event_stream::AcceptsEventStream, authenticated_user::AuthenticatedUser,
};
use crate::params::feed::IndexParams;
use crate::{AppState, Error};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use domain::feed as FeedApi;
use log::*;
use sse::EventStream;

/// GET the caller's timeline: a live stream when the client accepts
/// `text/event-stream`, otherwise one page of entries, newest first.
pub async fn index(
    AuthenticatedUser(caller): AuthenticatedUser,
    AcceptsEventStream(streaming): AcceptsEventStream,
    State(app_state): State<AppState>,
    Query(params): Query<IndexParams>,
) -> Result<Response, Error> {
    if streaming {
        debug!("Streaming feed for {:?}", caller.user_id);
        let subscription = FeedApi::subscribe(&app_state.ctx, &caller).await?;
        return Ok(EventStream::new(subscription, app_state.heartbeat()).into_response());
    }

    debug!("GET feed page before {:?}", params.before);
    let items = FeedApi::page(&app_state.ctx, &caller, params.before.as_deref()).await?;

    Ok(Json(items).into_response())
}
