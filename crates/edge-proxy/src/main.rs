mod config;
mod error;
mod proxy;
mod router;
mod upstream;

use axum::routing::get;
use axum::Router;
use config::Config;
use edge_cache::MemoryStore;
use proxy::{proxy_handler, AppState};
use router::OriginMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use upstream::HttpTransport;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load config
    let config = if Path::new("config.toml").exists() {
        match Config::load(Path::new("config.toml")) {
            Ok(c) => {
                tracing::info!("loaded config from config.toml");
                c
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to load config.toml, using defaults");
                Config::default_config()
            }
        }
    } else {
        tracing::info!("no config.toml found, using defaults");
        Config::default_config()
    };

    // Origin table is fixed for the process lifetime; bad routes fail here.
    let origins = OriginMap::from_routes(&config.routes)
        .unwrap_or_else(|e| panic!("invalid route configuration: {e}"));

    let store = Arc::new(MemoryStore::open(config.cache.namespace.clone()));
    let transport = HttpTransport::new(Duration::from_millis(config.upstream.timeout_ms))
        .unwrap_or_else(|e| panic!("failed to build upstream client: {e}"));

    let state = Arc::new(AppState {
        origins,
        store,
        transport: Arc::new(transport),
        ttl_seconds: config.cache.ttl_seconds,
    });

    // GET-only surface: any other method gets axum's 405.
    let app = Router::new()
        .route("/{*path}", get(proxy_handler))
        .route("/", get(proxy_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::clone(&state));

    let listen_addr = config.server.listen_addr.clone();
    tracing::info!(
        listen = %listen_addr,
        routes = state.origins.len(),
        namespace = %config.cache.namespace,
        ttl_seconds = config.cache.ttl_seconds,
        "edge proxy starting"
    );

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind to {listen_addr}: {e}"));

    // Shutdown token for graceful shutdown
    let shutdown = CancellationToken::new();
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal(shutdown_clone).await;
    });

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await;

    if let Err(e) = result {
        tracing::error!(error = %e, "proxy server error");
    }

    tracing::info!("edge proxy shut down");
}

/// Listen for SIGINT (Ctrl+C) or SIGTERM and cancel the shutdown token.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {},
            _ = sigterm.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }

    tracing::info!("shutdown signal received, draining connections...");
    token.cancel();
}
