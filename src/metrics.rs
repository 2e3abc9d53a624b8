//! Prometheus metrics for gameplay and storage health

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Ledger step names used as the `step` label on swallowed failures
pub mod steps {
    pub const LOAD_ACCOUNT: &str = "load_account";
    pub const CREATE_ACCOUNT: &str = "create_account";
    pub const RESET_DAILY: &str = "reset_daily";
    pub const LOAD_HISTORY: &str = "load_history";
    pub const ENSURE_ACCOUNT: &str = "ensure_account";
    pub const APPEND_SPIN: &str = "append_spin";
    pub const APPLY_SPIN: &str = "apply_spin";
    pub const REFRESH_LEADERBOARD: &str = "refresh_leaderboard";
    pub const QUERY_LEADERBOARD: &str = "query_leaderboard";
}

#[derive(Clone)]
pub struct GameMetrics {
    registry: Registry,
    pub spins_total: IntCounter,
    pub jackpots_total: IntCounter,
    pub points_awarded_total: IntCounter,
    pub storage_failures_total: IntCounterVec,
    pub leaderboard_refreshes_total: IntCounter,
    pub rate_limited_total: IntCounterVec,
}

impl GameMetrics {
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("luckyreels".to_string()), None)
            .unwrap_or_default();

        let spins_total = IntCounter::new("spins_total", "Spins resolved by the server")
            .expect("static metric definition");
        let jackpots_total = IntCounter::new("jackpots_total", "Triple lucky-mark outcomes")
            .expect("static metric definition");
        let points_awarded_total = IntCounter::new("points_awarded_total", "Points handed out by spins")
            .expect("static metric definition");
        let storage_failures_total = IntCounterVec::new(
            Opts::new("storage_failures_total", "Storage failures recovered without failing the caller"),
            &["step"],
        )
        .expect("static metric definition");
        let leaderboard_refreshes_total =
            IntCounter::new("leaderboard_refreshes_total", "Completed leaderboard projections")
                .expect("static metric definition");
        let rate_limited_total = IntCounterVec::new(
            Opts::new("rate_limited_total", "Requests rejected by a rate limiter"),
            &["limiter"],
        )
        .expect("static metric definition");

        for collector in [
            Box::new(spins_total.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(jackpots_total.clone()),
            Box::new(points_awarded_total.clone()),
            Box::new(storage_failures_total.clone()),
            Box::new(leaderboard_refreshes_total.clone()),
            Box::new(rate_limited_total.clone()),
        ] {
            if let Err(e) = registry.register(collector) {
                tracing::warn!(error = %e, "metric registration failed");
            }
        }

        Self {
            registry,
            spins_total,
            jackpots_total,
            points_awarded_total,
            storage_failures_total,
            leaderboard_refreshes_total,
            rate_limited_total,
        }
    }

    pub fn record_spin(&self, points: u64, jackpot: bool) {
        self.spins_total.inc();
        self.points_awarded_total.inc_by(points);
        if jackpot {
            self.jackpots_total.inc();
        }
    }

    pub fn record_storage_failure(&self, step: &str) {
        self.storage_failures_total.with_label_values(&[step]).inc();
    }

    pub fn record_rate_limited(&self, limiter: &str) {
        self.rate_limited_total.with_label_values(&[limiter]).inc();
    }

    /// Render in the Prometheus text exposition format
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %e, "failed to encode metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for GameMetrics {
    fn default() -> Self {
        Self::new()
    }
}
