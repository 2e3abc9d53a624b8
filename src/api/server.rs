//! API Server
//!
//! Listener setup, middleware stack and graceful shutdown.

use super::{
    errors::ApiError,
    handlers::AppState,
    middleware::{create_cors_layer, request_id_middleware},
    routes::create_router,
    security::RateLimiter,
};
use crate::{config::LuckyConfig, game_store::GameStore};
use axum::response::{IntoResponse, Response};
use std::{any::Any, net::SocketAddr, sync::Arc};
use tokio::signal;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info, warn};

/// Install the global `tracing` subscriber. Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "luckyreels=info,tower_http=info".into()),
        )
        .try_init();
}

/// Game API server
pub struct ApiServer {
    config: LuckyConfig,
    store: Arc<dyn GameStore>,
}

impl ApiServer {
    pub fn new(config: LuckyConfig, store: Arc<dyn GameStore>) -> Self {
        Self { config, store }
    }

    /// Start the API server and block until shutdown
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let state = Arc::new(AppState::new(&self.config, self.store.clone()));

        // Rebuild the projection so ranks reflect accounts written before a restart
        match state.leaderboard.refresh().await {
            Ok(ranked) => info!(ranked, "leaderboard projection ready"),
            Err(e) => warn!(error = %e, "initial leaderboard refresh failed"),
        }

        let cleanup = [
            RateLimiter::start_cleanup_task(state.api_limiter.clone()),
            RateLimiter::start_cleanup_task(state.spin_limiter.clone()),
        ];

        let app = build_app(&self.config, state);
        let addr = self.get_socket_addr()?;

        info!("🎰 Starting LuckyReels API Server");
        info!("   Listen: http://{}", addr);
        self.log_server_info();

        let listener = tokio::net::TcpListener::bind(addr).await?;

        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        for handle in cleanup {
            handle.abort();
        }
        info!("🛑 API Server stopped gracefully");
        Ok(())
    }

    fn get_socket_addr(&self) -> Result<SocketAddr, Box<dyn std::error::Error>> {
        Ok(SocketAddr::from((
            self.config.server.host.parse::<std::net::IpAddr>()?,
            self.config.server.port,
        )))
    }

    fn log_server_info(&self) {
        info!("📋 Server Configuration:");
        info!("   Environment: {:?}", self.config.environment);
        info!("   Storage: {:?} ({})", self.config.storage.backend, self.config.storage.data_directory);
        info!("   CORS: {:?}", self.config.cors_origins());
        info!("   Request timeout: {}s", self.config.server.request_timeout_secs);
        info!(
            "   Rate limits: {} req / {}s per client, {} spin / {}s per wallet",
            self.config.rate_limit.api_max_requests(self.config.environment),
            self.config.rate_limit.api_window_secs,
            self.config.rate_limit.spin_max_requests,
            self.config.rate_limit.spin_window_secs,
        );

        info!("📊 Available endpoints:");
        info!("   GET  /health            - Health check");
        info!("   GET  /metrics           - Prometheus metrics");
        info!("   GET  /api/game/state    - Player state");
        info!("   POST /api/game/spin     - Spin the reels");
        info!("   GET  /api/leaderboard   - Rankings");
    }
}

/// Router with the full middleware stack
pub fn build_app(config: &LuckyConfig, state: Arc<AppState>) -> axum::Router {
    let expose_details = state.expose_error_details;

    create_router(state)
        // Request ID middleware (first for tracing)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(CatchPanicLayer::custom(move |panic: Box<dyn Any + Send + 'static>| {
            panic_response(panic, expose_details)
        }))
        // CORS layer (before timeout to handle preflight)
        .layer(create_cors_layer(config.cors_origins()))
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(TraceLayer::new_for_http())
}

fn panic_response(panic: Box<dyn Any + Send + 'static>, expose_details: bool) -> Response {
    let details = panic
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "handler panicked".to_string());
    error!(details = %details, "request handler panicked");
    ApiError::internal_error("unknown".to_string(), details, expose_details).into_response()
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
