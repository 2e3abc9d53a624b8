//! Rate Limiting & Wallet Authentication
//!
//! - Fixed-window rate limiting, keyed per client IP for the whole API and
//!   per wallet for spins
//! - Wallet address extraction from the `address` query parameter or the
//!   `x-wallet-address` header

use super::{
    errors::ApiError,
    handlers::AppState,
    middleware::{RequestId, WALLET_HEADER},
};
use crate::games::WalletAddress;
use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts, Query, Request, State},
    http::{request::Parts, Extensions, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use serde::Deserialize;
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
struct FixedWindow {
    started: Instant,
    count: u32,
}

/// Fixed-window request counter per key
#[derive(Debug)]
pub struct RateLimiter {
    name: &'static str,
    window: Duration,
    max_requests: u32,
    windows: DashMap<String, FixedWindow>,
}

impl RateLimiter {
    pub fn new(name: &'static str, window: Duration, max_requests: u32) -> Self {
        Self {
            name,
            window,
            max_requests,
            windows: DashMap::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Count one request for `key`; false once the window's budget is spent
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    pub fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert(FixedWindow { started: now, count: 0 });

        if now.saturating_duration_since(entry.started) >= self.window {
            *entry = FixedWindow { started: now, count: 0 };
        }

        if entry.count >= self.max_requests {
            return false;
        }
        entry.count += 1;
        true
    }

    /// Drop windows that have already expired
    pub fn prune(&self, now: Instant) {
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) < self.window);
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    /// Periodically prune expired windows so idle clients do not accumulate
    pub fn start_cleanup_task(limiter: Arc<RateLimiter>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(limiter.window.max(Duration::from_secs(1)));
            loop {
                interval.tick().await;
                limiter.prune(Instant::now());
                debug!(limiter = limiter.name, tracked = limiter.tracked_keys(), "rate limiter pruned");
            }
        })
    }
}

/// Extract client IP, honoring the first `X-Forwarded-For` hop from a proxy
pub fn extract_client_ip(headers: &HeaderMap, extensions: &Extensions) -> Option<IpAddr> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|ip| ip.trim().parse::<IpAddr>().ok());

    forwarded.or_else(|| {
        extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
    })
}

/// General request budget for `/api/*`
pub async fn api_rate_limit(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let client = extract_client_ip(request.headers(), request.extensions())
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if !state.api_limiter.check(&client) {
        warn!(client = %client, limiter = state.api_limiter.name(), "rate limit exceeded");
        state.metrics.record_rate_limited(state.api_limiter.name());
        return ApiError::too_many_requests(RequestId::from_extensions(request.extensions())).into_response();
    }

    next.run(request).await
}

#[derive(Debug, Default, Deserialize)]
struct WalletQuery {
    address: Option<String>,
}

/// Raw address from the query string, else from the wallet header
fn supplied_wallet(parts: &Parts) -> Option<String> {
    let from_query = Query::<WalletQuery>::try_from_uri(&parts.uri)
        .ok()
        .and_then(|Query(q)| q.address)
        .filter(|a| !a.is_empty());

    from_query.or_else(|| {
        parts
            .headers
            .get(WALLET_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|a| !a.is_empty())
            .map(str::to_string)
    })
}

/// Required, validated wallet address of the caller
#[derive(Debug, Clone)]
pub struct Wallet(pub WalletAddress);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Wallet {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let request_id = RequestId::from_extensions(&parts.extensions);
        let raw = supplied_wallet(parts).ok_or_else(|| ApiError::missing_wallet(request_id.clone()))?;
        WalletAddress::parse(&raw)
            .map(Wallet)
            .ok_or_else(|| ApiError::invalid_wallet(request_id))
    }
}

/// Optional wallet; a malformed address is treated as absent
#[derive(Debug, Clone)]
pub struct MaybeWallet(pub Option<WalletAddress>);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for MaybeWallet {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeWallet(
            supplied_wallet(parts).and_then(|raw| WalletAddress::parse(&raw)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;

    #[test]
    fn test_fixed_window_budget() {
        let limiter = RateLimiter::new("test", Duration::from_secs(5), 2);
        let start = Instant::now();

        assert!(limiter.check_at("a", start));
        assert!(limiter.check_at("a", start + Duration::from_secs(1)));
        assert!(!limiter.check_at("a", start + Duration::from_secs(2)));
        // Other keys have their own budget
        assert!(limiter.check_at("b", start + Duration::from_secs(2)));
        // A new window starts once the old one expires
        assert!(limiter.check_at("a", start + Duration::from_secs(5)));
    }

    #[test]
    fn test_prune_drops_expired_windows() {
        let limiter = RateLimiter::new("test", Duration::from_secs(5), 1);
        let start = Instant::now();
        limiter.check_at("a", start);
        limiter.check_at("b", start + Duration::from_secs(4));

        limiter.prune(start + Duration::from_secs(6));
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[test]
    fn test_forwarded_for_wins() {
        let request = HttpRequest::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(())
            .unwrap();
        let ip = extract_client_ip(request.headers(), request.extensions());
        assert_eq!(ip, Some("203.0.113.7".parse().unwrap()));

        let bare = HttpRequest::builder().body(()).unwrap();
        assert_eq!(extract_client_ip(bare.headers(), bare.extensions()), None);
    }

    #[tokio::test]
    async fn test_wallet_from_query_then_header() {
        let addr = "0x00000000000000000000000000000000000000AA";
        let (mut parts, _) = HttpRequest::builder()
            .uri(format!("/api/game/state?address={}", addr))
            .header(WALLET_HEADER, "0x00000000000000000000000000000000000000bb")
            .body(())
            .unwrap()
            .into_parts();
        let Wallet(wallet) = Wallet::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(wallet.as_str(), addr.to_ascii_lowercase());

        let (mut parts, _) = HttpRequest::builder()
            .uri("/api/game/state")
            .header(WALLET_HEADER, "0x00000000000000000000000000000000000000bb")
            .body(())
            .unwrap()
            .into_parts();
        let Wallet(wallet) = Wallet::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(wallet.as_str().ends_with("bb"));
    }

    #[tokio::test]
    async fn test_wallet_rejections() {
        let (mut parts, _) = HttpRequest::builder().uri("/x").body(()).unwrap().into_parts();
        let err = Wallet::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert!(matches!(err.kind, super::super::errors::ApiErrorKind::MissingWallet));

        let (mut parts, _) = HttpRequest::builder()
            .uri("/x?address=0x1234")
            .body(())
            .unwrap()
            .into_parts();
        let err = Wallet::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert!(matches!(err.kind, super::super::errors::ApiErrorKind::InvalidWallet));

        let MaybeWallet(maybe) = MaybeWallet::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(maybe.is_none());
    }
}
