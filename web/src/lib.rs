//! HTTP surface: routing, request identity, JSON snapshots and event streams.
use axum::http::{header, HeaderValue, Method};
use domain::auth::{Authenticator, JwtAuthenticator};
use domain::Context;
use log::*;
use service::config::Config;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

mod controller;
mod error;
mod extractors;
mod middleware;
mod params;
pub mod router;

pub use error::{Error, Result};

/// Shared by every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub ctx: Context,
    pub authenticator: Arc<dyn Authenticator>,
    /// Signs tokens for the development login.
    pub tokens: Arc<JwtAuthenticator>,
}

impl AppState {
    pub fn new(config: Config, ctx: Context, tokens: Arc<JwtAuthenticator>) -> Self {
        Self {
            config,
            ctx,
            authenticator: tokens.clone(),
            tokens,
        }
    }

    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = authenticator;
        self
    }

    pub(crate) fn heartbeat(&self) -> Duration {
        self.config.sse_heartbeat()
    }
}

/// Serves the API until `shutdown` resolves, then stops accepting
/// connections and waits for open requests to finish.
///
/// Open event streams end when the brokers are shut down, so callers should
/// shut the hub down from within `shutdown`.
pub async fn init_server<F>(app_state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let interface = app_state
        .config
        .interface
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let port = app_state.config.port;
    let cors = cors_layer(&app_state.config);

    let app = router::define_routes(app_state).layer(cors);

    let listener = TcpListener::bind((interface.as_str(), port)).await?;
    let address: SocketAddr = listener.local_addr()?;
    info!("Server starting... listening for connections on http://{address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {origin}: {e}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}
