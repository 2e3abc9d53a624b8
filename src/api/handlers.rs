//! Request Handlers

use super::{
    errors::ApiError,
    middleware::RequestId,
    models::*,
    security::{MaybeWallet, RateLimiter, Wallet},
};
use crate::{
    config::{GameConfig, LuckyConfig},
    errors::ValidationError,
    game_store::GameStore,
    games::{GameState, SpinOutcome},
    leaderboard::LeaderboardRanker,
    ledger::PlayerLedger,
    metrics::GameMetrics,
    signature::audit_signature,
};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, Method, StatusCode, Uri},
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared application state
pub struct AppState {
    pub store: Arc<dyn GameStore>,
    pub ledger: Arc<PlayerLedger>,
    pub leaderboard: Arc<LeaderboardRanker>,
    pub metrics: GameMetrics,
    pub api_limiter: Arc<RateLimiter>,
    pub spin_limiter: Arc<RateLimiter>,
    pub game: GameConfig,
    pub expose_error_details: bool,
}

impl AppState {
    pub fn new(config: &LuckyConfig, store: Arc<dyn GameStore>) -> Self {
        let metrics = GameMetrics::new();
        let leaderboard = Arc::new(LeaderboardRanker::new(store.clone(), metrics.clone()));
        let ledger = Arc::new(PlayerLedger::new(
            store.clone(),
            leaderboard.clone(),
            metrics.clone(),
            config.game.history_limit,
        ));
        Self::with_ledger(config, store, ledger, metrics)
    }

    /// Build around an existing ledger, e.g. one with a fixed clock
    pub fn with_ledger(
        config: &LuckyConfig,
        store: Arc<dyn GameStore>,
        ledger: Arc<PlayerLedger>,
        metrics: GameMetrics,
    ) -> Self {
        let rate = &config.rate_limit;
        Self {
            store,
            leaderboard: ledger.leaderboard().clone(),
            ledger,
            metrics,
            api_limiter: Arc::new(RateLimiter::new(
                "api",
                rate.api_window(),
                rate.api_max_requests(config.environment),
            )),
            spin_limiter: Arc::new(RateLimiter::new("spin", rate.spin_window(), rate.spin_max_requests)),
            game: config.game.clone(),
            expose_error_details: config.expose_error_details(),
        }
    }
}

/// Health check with a database probe
/// GET /health
pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok".to_string(),
                database: "connected".to_string(),
                timestamp: Utc::now(),
            }),
        ),
        Err(e) => {
            warn!(error = %e, "health probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "error".to_string(),
                    database: "disconnected".to_string(),
                    timestamp: Utc::now(),
                }),
            )
        }
    }
}

/// Game state for the caller's wallet
/// GET /api/game/state?address={wallet}
pub async fn game_state_handler(
    State(state): State<Arc<AppState>>,
    Wallet(wallet): Wallet,
) -> Json<ApiResponse<GameState>> {
    Json(ApiResponse::ok(state.ledger.load_state(&wallet).await))
}

/// Resolve one spin for the caller's wallet
/// POST /api/game/spin
pub async fn spin_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Wallet(wallet): Wallet,
    body: Bytes,
) -> Result<Json<ApiResponse<SpinOutcome>>, ApiError> {
    // An empty body is the same as `{}`
    let request: SpinRequest = if body.iter().all(u8::is_ascii_whitespace) {
        SpinRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::from((request_id.0.clone(), ValidationError::field("body", e.to_string()))))?
    };

    if !state.spin_limiter.check(wallet.as_str()) {
        info!(wallet = %wallet, "spin rejected by cooldown");
        state.metrics.record_rate_limited(state.spin_limiter.name());
        return Err(ApiError::too_fast(request_id.0));
    }

    let signature = audit_signature(request.signature);
    let outcome = state.ledger.record_spin(&wallet, signature).await;
    Ok(Json(ApiResponse::ok(outcome)))
}

/// Parse an optional integer query value within `[min, max]`
fn bounded_param(
    name: &str,
    raw: Option<&str>,
    default: usize,
    min: usize,
    max: usize,
) -> Result<usize, ValidationError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(default);
    };
    let value: usize = raw
        .parse()
        .map_err(|_| ValidationError::field(name, "must be a non-negative integer"))?;
    if value < min || value > max {
        let reason = if max == usize::MAX {
            format!("must be at least {}", min)
        } else {
            format!("must be between {} and {}", min, max)
        };
        return Err(ValidationError::field(name, reason));
    }
    Ok(value)
}

/// Leaderboard page, plus the caller's rank when a valid wallet is supplied
/// GET /api/leaderboard?limit={1..100}&offset={n}
pub async fn leaderboard_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    MaybeWallet(wallet): MaybeWallet,
    query: Result<Query<LeaderboardQuery>, axum::extract::rejection::QueryRejection>,
) -> Result<Json<ApiResponse<LeaderboardResponse>>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::validation(request_id.0.clone(), e.body_text()))?;

    let limit = bounded_param(
        "limit",
        query.limit.as_deref(),
        state.game.leaderboard_default_limit,
        1,
        state.game.leaderboard_max_limit,
    )
    .map_err(|e| ApiError::from((request_id.0.clone(), e)))?;
    let offset = bounded_param("offset", query.offset.as_deref(), 0, 0, usize::MAX)
        .map_err(|e| ApiError::from((request_id.0.clone(), e)))?;

    let entries = state.leaderboard.rank(limit, offset).await;
    let user_rank = match &wallet {
        Some(wallet) => state.leaderboard.rank_of(wallet).await,
        None => None,
    };
    let total = state.leaderboard.total().await;

    Ok(Json(ApiResponse::ok(LeaderboardResponse {
        entries,
        user_rank,
        total,
    })))
}

/// Prometheus scrape endpoint
/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Fallback for unknown routes
pub async fn not_found_handler(
    request_id: Option<Extension<RequestId>>,
    method: Method,
    uri: Uri,
) -> ApiError {
    let request_id = request_id
        .map(|Extension(id)| id.0)
        .unwrap_or_else(|| "unknown".to_string());
    ApiError::not_found(request_id, format!("Route {} {} not found", method, uri.path()))
}
