mod config;
mod error;
mod middleware;
mod notification_routes;
mod rate_routes;
mod requests;
mod subscriber_routes;

#[cfg(test)]
mod api_tests;

pub use config::{ServerConfig, WelcomePolicy};
pub use error::AppError;

use anyhow::{anyhow, Context};
use axum::{
    http::HeaderValue,
    middleware::from_fn,
    routing::get,
    Json, Router,
};
use fx_core::PairId;
use notification_service::{build_gateway, AlertDispatcher, NotificationGateway};
use rate_source::SyntheticRateSource;
use rate_watcher::{shutdown_channel, QuoteBoard, RateWatcher, WatcherConfig};
use serde::Serialize;
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use subscriber_store::SubscriberStore;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// `{"success": true}`
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: SubscriberStore,
    pub dispatcher: AlertDispatcher,
    pub board: QuoteBoard,
    pub rates: Arc<SyntheticRateSource>,
    pub welcome_policy: WelcomePolicy,
}

impl AppState {
    pub fn new(
        store: SubscriberStore,
        gateway: Arc<dyn NotificationGateway>,
        rates: Arc<SyntheticRateSource>,
        welcome_policy: WelcomePolicy,
        public_url: &str,
    ) -> Self {
        Self {
            dispatcher: AlertDispatcher::new(gateway, store.clone(), public_url),
            store,
            board: QuoteBoard::new(),
            rates,
            welcome_policy,
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", o);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

/// All API routes with middleware, ready to serve.
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let mut router = Router::new()
        .route("/api/health", get(health))
        .merge(subscriber_routes::subscriber_routes())
        .merge(notification_routes::notification_routes())
        .merge(rate_routes::rate_routes())
        .with_state(state)
        .layer(from_fn(middleware::security_headers_middleware));

    if config.enable_hsts {
        router = router.layer(from_fn(middleware::hsts_middleware));
    }

    router
        .layer(cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(middleware::request_id_middleware))
}

/// Fail fast on configured pairs the source has no quotes for; the watcher
/// would otherwise fail every poll.
pub fn ensure_quoted(pairs: &[PairId], rates: &SyntheticRateSource) -> anyhow::Result<()> {
    let known = rates.pairs();
    let missing: Vec<String> = pairs
        .iter()
        .filter(|p| !known.contains(p))
        .map(|p| p.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(anyhow!(
            "TRACKED_PAIRS contains pairs with no rate data: {} (available: {})",
            missing.join(", "),
            known.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(", ")
        ))
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}

/// Load configuration and serve until SIGINT/SIGTERM.
pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    std::panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
        tracing::error!("PANIC: {info}");
    }));

    let config = ServerConfig::from_env()?;
    tracing::info!("Starting FX high alert server");
    tracing::info!("  Poll interval: {}s", config.poll_interval.as_secs());
    tracing::info!("  Welcome policy: {:?}", config.welcome_policy);

    serve(config, shutdown_signal()).await
}

/// Check the tracked pairs, bind the listener, open the store, start the
/// rate watcher and serve the API until `shutdown` resolves. Startup errors
/// return before the store is opened or the watcher spawned. Shutdown order:
/// watcher, HTTP server, store.
pub async fn serve<F>(config: ServerConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let rates = Arc::new(SyntheticRateSource::new());
    ensure_quoted(&config.tracked_pairs, &rates)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    let local_addr = listener.local_addr()?;

    let store = SubscriberStore::open(&config.database_url).await?;
    match store.count_active().await {
        Ok(n) => tracing::info!("Subscriber store opened ({} active subscribers)", n),
        Err(e) => tracing::warn!("Subscriber store opened, count failed: {}", e),
    }

    let gateway = build_gateway(&config.notification);
    let state = AppState::new(
        store.clone(),
        gateway,
        rates.clone(),
        config.welcome_policy,
        &config.notification.public_url,
    );

    let (trigger, signal) = shutdown_channel();
    let watcher = RateWatcher::new(
        rates,
        state.dispatcher.clone(),
        state.board.clone(),
        WatcherConfig {
            interval: config.poll_interval,
            pairs: config.tracked_pairs.clone(),
            alert_pairs: config.alert_pairs.clone(),
        },
    );
    let watcher_handle = watcher.spawn(signal);

    let app = build_router(state, &config);
    tracing::info!("Server running on {}", local_addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("Stopping rate watcher");
            trigger.trigger();
        })
        .await;

    if let Err(e) = watcher_handle.await {
        tracing::warn!("Rate watcher task ended abnormally: {}", e);
    }
    tracing::info!("HTTP server stopped");
    store.close().await;

    served?;
    tracing::info!("Shutdown complete");
    Ok(())
}
