use domain::auth::JwtAuthenticator;
use domain::fanout::{Fanout, FanoutConfig};
use domain::Context;
use entity_api::{MemoryStore, Store};
use log::*;
use service::{config::Config, logging::Logger};
use sse::{BrokerConfig, Hub};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let config = Config::new();
    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to start logger: {e}");
        std::process::exit(1);
    }

    info!("Starting up in the {} environment", config.runtime_env());

    let Some(jwt_key) = config.jwt_key() else {
        error!("No JWT key provided, set JWT_KEY or pass --jwt-key");
        std::process::exit(1);
    };
    let tokens = match JwtAuthenticator::new(jwt_key, config.jwt_lifetime()) {
        Ok(tokens) => Arc::new(tokens),
        Err(e) => {
            error!("Failed to configure token authentication: {e}");
            std::process::exit(1);
        }
    };

    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());

    let hub = Arc::new(Hub::start(&BrokerConfig {
        ingress_capacity: config.broker_ingress_capacity as usize,
        subscriber_buffer: config.subscriber_buffer as usize,
    }));

    let (fanout, fanout_shutdown) = Fanout::start(FanoutConfig {
        queue_capacity: config.fanout_queue_capacity as usize,
        concurrency: config.fanout_concurrency as usize,
    });

    let grace = config.shutdown_grace();
    let app_state = web::AppState::new(config, Context::new(store, hub.clone(), fanout), tokens);

    let shutdown_hub = hub.clone();
    let served = web::init_server(app_state, async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for the shutdown signal: {e}");
        }
        info!("Shutting down, finishing background work");
        fanout_shutdown.shutdown(grace).await;
        // Open event streams end once their brokers stop.
        shutdown_hub.shutdown().await;
    })
    .await;

    if let Err(e) = served {
        error!("Server failed: {e}");
        hub.shutdown().await;
        std::process::exit(1);
    }
    info!("Stopped");
}
