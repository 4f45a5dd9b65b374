use axum::http::HeaderValue;
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod constants;
mod error;
mod integrations;
mod models;
mod services;
mod websocket;

use config::Config;
use constants::API_VERSION;
use integrations::{SuiRpcClient, WalletBridgeSigner};
use services::{
    AgentOptions, AutoStakeAgent, KeyValueStore, LiquidStakeBuilder, MemoryStore,
    NotificationService, RedisStore, SettingsStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "autostake_agent=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    config.validate()?;

    tracing::info!("Starting auto-stake agent");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!("API Version: {}", API_VERSION);
    tracing::info!(
        "Sui RPC: {} (testnet: {})",
        config.sui_rpc_url,
        config.is_testnet()
    );

    // Settings persistence: Redis when configured, process memory otherwise
    let persistence: Arc<dyn KeyValueStore> = match &config.redis_url {
        Some(url) => Arc::new(RedisStore::connect(url).await?),
        None => Arc::new(MemoryStore::new()),
    };
    let persistence_backend = persistence.backend();
    let store = Arc::new(SettingsStore::load(persistence).await);

    let notifications = NotificationService::new();
    let agent = Arc::new(AutoStakeAgent::new(
        store.clone(),
        Arc::new(SuiRpcClient::from_config(&config)?),
        Arc::new(LiquidStakeBuilder::from_config(&config)),
        Arc::new(WalletBridgeSigner::from_config(&config)),
        Arc::new(notifications.clone()),
        AgentOptions::from_config(&config),
    ));

    let app_state = api::AppState {
        agent: agent.clone(),
        store,
        notifications,
        persistence_backend,
        config: config.clone(),
    };

    // Build router
    let app = build_router(app_state);

    // Start background services
    tokio::spawn(services::start_background_services(
        agent.clone(),
        config.clone(),
    ));

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    agent.stop().await;
    tracing::info!("Auto-stake agent shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

fn build_router(state: api::AppState) -> Router {
    // CORS configuration
    let cors = cors_from_config(&state.config);

    Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        // Auto-stake agent
        .route(
            "/api/v1/auto-stake/settings",
            get(api::auto_stake::get_settings).put(api::auto_stake::update_settings),
        )
        .route("/api/v1/auto-stake/status", get(api::auto_stake::get_status))
        .route("/api/v1/auto-stake/start", post(api::auto_stake::start))
        .route("/api/v1/auto-stake/stop", post(api::auto_stake::stop))
        .route("/api/v1/auto-stake/check", post(api::auto_stake::check_now))
        .route("/api/v1/auto-stake/execute", post(api::auto_stake::execute))
        .route(
            "/api/v1/auto-stake/pending",
            delete(api::auto_stake::clear_pending),
        )
        .route(
            "/api/v1/auto-stake/actions",
            get(api::auto_stake::list_actions).delete(api::auto_stake::clear_actions),
        )
        .route(
            "/api/v1/auto-stake/reset-daily",
            post(api::auto_stake::reset_daily),
        )
        // Wallet
        .route(
            "/api/v1/wallet/disconnect",
            post(api::auto_stake::disconnect_wallet),
        )
        // WebSocket endpoints
        .route("/ws/notifications", get(websocket::notifications::handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_from_config(config: &Config) -> CorsLayer {
    match allowed_origins(&config.cors_allowed_origins) {
        Some(allowed) => CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::very_permissive(),
    }
}

/// Explicit origin list, or `None` for a permissive policy.
fn allowed_origins(raw: &str) -> Option<Vec<HeaderValue>> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "*" {
        return None;
    }

    let allowed: Vec<HeaderValue> = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    if allowed.is_empty() {
        tracing::warn!("No valid CORS origins parsed; falling back to permissive");
        return None;
    }
    Some(allowed)
}
