//! HTTP contract tests driven through the full middleware stack

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use luckyreels::{
    api::{build_app, AppState},
    config::{Environment, LuckyConfig},
    GameStore, MemoryGameStore, SpinOutcome, Symbol,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const WALLET: &str = "0xAbCdEf0123456789abcdef0123456789ABCDEF01";
const OTHER_WALLET: &str = "0x1111111111111111111111111111111111111111";

fn app_with(config: LuckyConfig) -> (Router, Arc<MemoryGameStore>) {
    let store = Arc::new(MemoryGameStore::new());
    let state = Arc::new(AppState::new(&config, store.clone()));
    (build_app(&config, state), store)
}

fn app() -> (Router, Arc<MemoryGameStore>) {
    app_with(LuckyConfig::default())
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn spin(address: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method("POST")
        .uri(format!("/api/game/spin?address={}", address));
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn wait_for_total(app: &Router, expected: u64) -> Value {
    let mut body = Value::Null;
    for _ in 0..100 {
        let (_, b) = send(app, get("/api/leaderboard")).await;
        body = b;
        if body["data"]["total"] == json!(expected) {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    body
}

#[tokio::test]
async fn test_health_reports_database() {
    let (app, _) = app();
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_state_requires_wallet() {
    let (app, _) = app();

    let (status, body) = send(&app, get("/api/game/state")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"success": false, "error": "Missing wallet address", "message": "Wallet address is required"})
    );

    let (status, body) = send(&app, get("/api/game/state?address=0x1234")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid wallet address");
    assert_eq!(body["message"], "Wallet address format is invalid");
}

#[tokio::test]
async fn test_new_wallet_state_is_empty_and_created() {
    let (app, store) = app();

    let (status, body) = send(&app, get(&format!("/api/game/state?address={}", WALLET))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "success": true,
            "data": {
                "totalPoints": 0,
                "spinsToday": 0,
                "lastSpinDate": null,
                "spinHistory": [],
                "highestWin": 0,
                "jackpotCount": 0
            }
        })
    );

    let wallet = luckyreels::WalletAddress::parse(WALLET).unwrap();
    assert!(store.load_account(&wallet).await.unwrap().is_some());
}

#[tokio::test]
async fn test_spin_returns_scored_outcome_and_updates_state() {
    let (app, _) = app();

    let (status, body) = send(&app, spin(WALLET, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let data = &body["data"];
    let symbols: [Symbol; 3] = serde_json::from_value(data["symbols"].clone()).unwrap();
    let expected = SpinOutcome::resolve(symbols);
    assert_eq!(data["points"], json!(expected.points()));
    assert_eq!(data["matchType"], json!(expected.match_type()));
    assert_eq!(data["isJackpot"], json!(expected.is_jackpot()));

    // Mixed-case address in the header addresses the same account
    let request = Request::builder()
        .uri("/api/game/state")
        .header("x-wallet-address", WALLET.to_ascii_lowercase())
        .body(Body::empty())
        .unwrap();
    let (status, state) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state["data"]["totalPoints"], json!(expected.points()));
    assert_eq!(state["data"]["spinsToday"], 1);
    assert_eq!(state["data"]["spinHistory"][0], *data);
}

#[tokio::test]
async fn test_spin_cooldown_is_per_wallet() {
    let (app, _) = app();

    let (status, _) = send(&app, spin(WALLET, Some(json!({})))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, spin(WALLET, Some(json!({})))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        body,
        json!({"success": false, "error": "Too fast", "message": "Please wait a few seconds between spins"})
    );

    let (status, _) = send(&app, spin(OTHER_WALLET, None)).await;
    assert_eq!(status, StatusCode::OK);

    // The rejected spin left no trace
    let (_, state) = send(&app, get(&format!("/api/game/state?address={}", WALLET))).await;
    assert_eq!(state["data"]["spinsToday"], 1);
    assert_eq!(state["data"]["spinHistory"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_client_symbols_are_validated_but_ignored() {
    let (app, _) = app();

    let (status, body) = send(&app, spin(WALLET, Some(json!({"symbols": ["7", "X", "7"]})))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation error");

    let (status, _) = send(&app, spin(WALLET, Some(json!({"symbols": ["7", "7"]})))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, state) = send(&app, get(&format!("/api/game/state?address={}", WALLET))).await;
    assert_eq!(state["data"]["spinsToday"], 0);

    // Invalid bodies do not burn the cooldown
    let claimed = json!({
        "symbols": ["7", "7", "7"],
        "signature": format!("0x{}", "ab".repeat(65)),
        "timestamp": 1_780_000_000_000u64
    });
    let (status, body) = send(&app, spin(WALLET, Some(claimed))).await;
    assert_eq!(status, StatusCode::OK);
    let symbols: [Symbol; 3] = serde_json::from_value(body["data"]["symbols"].clone()).unwrap();
    assert_eq!(body["data"]["points"], json!(SpinOutcome::resolve(symbols).points()));
}

#[tokio::test]
async fn test_leaderboard_pagination_validation() {
    let (app, _) = app();

    for query in ["limit=0", "limit=101", "limit=abc", "offset=-1", "offset=1.5"] {
        let (status, body) = send(&app, get(&format!("/api/leaderboard?{}", query))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "query {}", query);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Validation error");
    }

    let (status, body) = send(&app, get("/api/leaderboard?limit=100&offset=0")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"entries": [], "userRank": null, "total": 0}));

    let (status, body) = send(&app, get(&format!("/api/leaderboard?offset={}", usize::MAX))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["entries"], json!([]));
}

#[tokio::test]
async fn test_leaderboard_ranks_players_after_spins() {
    let (app, _) = app();

    send(&app, spin(WALLET, None)).await;
    send(&app, spin(OTHER_WALLET, None)).await;

    let body = wait_for_total(&app, 2).await;
    assert_eq!(body["data"]["total"], 2);
    let entries = body["data"]["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["rank"], 1);
    assert_eq!(entries[1]["rank"], 2);
    assert!(entries[0]["points"].as_u64() >= entries[1]["points"].as_u64());
    for entry in entries {
        assert!(entry["address"].is_string());
        assert!(entry["jackpots"].is_u64());
    }

    let (_, mine) = send(&app, get(&format!("/api/leaderboard?address={}", WALLET))).await;
    assert!(mine["data"]["userRank"].is_u64());

    // A malformed optional wallet is ignored rather than rejected
    let (status, anon) = send(&app, get("/api/leaderboard?address=not-a-wallet&limit=1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(anon["data"]["userRank"], Value::Null);
    assert_eq!(anon["data"]["entries"].as_array().unwrap().len(), 1);
    assert_eq!(anon["data"]["total"], 2);
}

#[tokio::test]
async fn test_unknown_route_uses_envelope() {
    let (app, _) = app();
    let (status, body) = send(&app, get("/api/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body,
        json!({"success": false, "error": "Not found", "message": "Route GET /api/nope not found"})
    );
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let (app, _) = app();
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "trace-me")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "trace-me");

    let response = app.oneshot(get("/health")).await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_general_rate_limit() {
    let mut config = LuckyConfig::default();
    config.environment = Environment::Production;
    config.rate_limit.api_max_requests_production = 2;
    let (app, _) = app_with(config);

    let forwarded = |uri: &str| {
        Request::builder()
            .uri(uri)
            .header("x-forwarded-for", "198.51.100.4")
            .body(Body::empty())
            .unwrap()
    };

    assert_eq!(send(&app, forwarded("/api/leaderboard")).await.0, StatusCode::OK);
    assert_eq!(send(&app, forwarded("/api/leaderboard")).await.0, StatusCode::OK);
    let (status, body) = send(&app, forwarded("/api/leaderboard")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Too many requests");

    // Health checks are outside the API budget
    assert_eq!(send(&app, forwarded("/health")).await.0, StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_exposed() {
    let (app, _) = app();
    send(&app, spin(WALLET, None)).await;

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("luckyreels_spins_total 1"));
}
