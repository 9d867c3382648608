use crate::{
    controller::{
        comment_controller, feed_controller, health_check_controller, notification_controller,
        post_controller, user_controller, user_session_controller,
    },
    middleware::auth::{require_auth, resolve_caller},
    AppState,
};
use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};

pub fn define_routes(app_state: AppState) -> Router {
    let router = Router::new()
        .merge(health_routes())
        .merge(feed_routes(app_state.clone()))
        .merge(comment_routes(app_state.clone()))
        .merge(notification_routes(app_state.clone()))
        .merge(post_routes(app_state.clone()))
        .merge(user_routes(app_state.clone()));

    if app_state.config.is_development() {
        router.merge(dev_session_routes(app_state))
    } else {
        router
    }
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn feed_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/api/feed", get(feed_controller::index))
        .route_layer(from_fn(require_auth))
        .route_layer(from_fn_with_state(app_state.clone(), resolve_caller))
        .with_state(app_state)
}

fn comment_routes(app_state: AppState) -> Router {
    Router::new()
        // GET /api/posts/:post_id/comments does not require a signed in caller
        .route(
            "/api/posts/:post_id/comments",
            get(comment_controller::index).merge(
                post(comment_controller::create).route_layer(from_fn(require_auth)),
            ),
        )
        .route(
            "/api/comments/:comment_id/toggle_like",
            post(comment_controller::toggle_like).route_layer(from_fn(require_auth)),
        )
        .route_layer(from_fn_with_state(app_state.clone(), resolve_caller))
        .with_state(app_state)
}

fn notification_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/api/notifications", get(notification_controller::index))
        .route_layer(from_fn(require_auth))
        .route_layer(from_fn_with_state(app_state.clone(), resolve_caller))
        .with_state(app_state)
}

fn post_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/api/posts", post(post_controller::create))
        .route(
            "/api/posts/:post_id/toggle_like",
            post(post_controller::toggle_like),
        )
        .route(
            "/api/posts/:post_id/toggle_subscription",
            post(post_controller::toggle_subscription),
        )
        .route_layer(from_fn(require_auth))
        // GET /api/posts/:post_id does not require a signed in caller
        .merge(Router::new().route("/api/posts/:post_id", get(post_controller::read)))
        .route_layer(from_fn_with_state(app_state.clone(), resolve_caller))
        .with_state(app_state)
}

fn user_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/api/users", post(user_controller::create))
        .merge(
            // POST /api/users/:username/toggle_follow
            Router::new()
                .route(
                    "/api/users/:username/toggle_follow",
                    post(user_controller::toggle_follow),
                )
                .route_layer(from_fn(require_auth))
                .route_layer(from_fn_with_state(app_state.clone(), resolve_caller)),
        )
        .with_state(app_state)
}

fn dev_session_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/api/dev_login", post(user_session_controller::dev_login))
        .with_state(app_state)
}
