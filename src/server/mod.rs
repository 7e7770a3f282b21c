//! HTTP front of the gateway.
//!
//! Routes:
//! - `/go`, `/api/go` - redirect endpoint (`to=` plain or `t=` base64url)
//! - `/health` - liveness probe
//! - `/metrics` - Prometheus-compatible metrics
//! - `/status` - JSON counters
//! - `/api/diag-telegram` - messenger self-test, only when enabled

mod handlers;
mod types;

use std::sync::Arc;

use anyhow::Context;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error_handling::GatewayStats;
use crate::initialization::init_gateway;

use handlers::{
    diag_telegram_handler, go_handler, health_handler, metrics_handler, status_handler,
};
pub use handlers::render_metrics;
pub use types::{AppState, GoParams};

/// Builds the router over shared state.
pub fn build_router(state: AppState, enable_diag: bool) -> Router {
    let mut router = Router::new()
        .route("/go", get(go_handler))
        .route("/api/go", get(go_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/status", get(status_handler));

    if enable_diag {
        router = router.route("/api/diag-telegram", get(diag_telegram_handler));
    }

    router.with_state(state)
}

/// Serves `router` on `listener` until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: CancellationToken,
) -> Result<(), anyhow::Error> {
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| anyhow::anyhow!("Gateway server error: {}", e))
}

/// Builds the gateway from `config` and serves it until SIGINT or SIGTERM.
pub async fn run_server(config: Config) -> Result<(), anyhow::Error> {
    let stats = Arc::new(GatewayStats::new());
    let gateway = init_gateway(&config, Arc::clone(&stats)).context("Failed to build gateway")?;
    let state = AppState {
        gateway: Arc::new(gateway),
        stats,
        env_label: config.env_label.clone(),
    };
    let router = build_router(state, config.enable_diag);

    let listener = TcpListener::bind(&config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind gateway to {}: {}", config.bind, e))?;

    let addr = listener.local_addr().context("Failed to read bound address")?;
    log::info!("Gateway listening on http://{}/", addr);
    log::info!("  - Redirect: http://{}/go?to=...", addr);
    log::info!("  - Metrics: http://{}/metrics", addr);
    log::info!("  - Status: http://{}/status", addr);
    if config.enable_diag {
        log::info!("  - Diagnostics: http://{}/api/diag-telegram", addr);
    }

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    serve(listener, router, shutdown).await?;
    log::info!("Gateway stopped");
    Ok(())
}

async fn cancel_on_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                log::warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    log::info!("Shutdown signal received, draining connections");
    shutdown.cancel();
}
