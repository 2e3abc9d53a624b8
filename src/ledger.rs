//! Player ledger
//!
//! Owns per-wallet progress. Both entry points favor availability over
//! consistency: storage failures are logged and counted but never surfaced
//! to the caller. A spin that fails to persist still returns its outcome.

use crate::{
    game_store::GameStore,
    games::{GameState, OutcomeGenerator, SpinOutcome, SpinRecord, SpinUpdate, Symbol, WalletAddress},
    leaderboard::LeaderboardRanker,
    metrics::{steps, GameMetrics},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Source of the current time for day boundaries and record timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Source of reel symbols for a spin
pub trait ReelSource: Send + Sync {
    fn draw(&self) -> [Symbol; 3];
}

impl ReelSource for OutcomeGenerator {
    fn draw(&self) -> [Symbol; 3] {
        self.generate()
    }
}

pub struct PlayerLedger {
    store: Arc<dyn GameStore>,
    reels: Arc<dyn ReelSource>,
    leaderboard: Arc<LeaderboardRanker>,
    metrics: GameMetrics,
    clock: Arc<dyn Clock>,
    history_limit: usize,
}

impl PlayerLedger {
    pub fn new(
        store: Arc<dyn GameStore>,
        leaderboard: Arc<LeaderboardRanker>,
        metrics: GameMetrics,
        history_limit: usize,
    ) -> Self {
        Self {
            store,
            reels: Arc::new(OutcomeGenerator::new()),
            leaderboard,
            metrics,
            clock: Arc::new(SystemClock),
            history_limit,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_reels(mut self, reels: Arc<dyn ReelSource>) -> Self {
        self.reels = reels;
        self
    }

    pub fn leaderboard(&self) -> &Arc<LeaderboardRanker> {
        &self.leaderboard
    }

    /// Current state for a wallet.
    ///
    /// Not a pure read: an unknown wallet gets an empty account created, and
    /// a stale daily counter is zeroed in storage before the view is built.
    /// A failed account read yields the empty default state; a failed
    /// history read keeps the account and shows no history.
    pub async fn load_state(&self, wallet: &WalletAddress) -> GameState {
        let now = self.clock.now();

        let account = match self.store.load_account(wallet).await {
            Ok(account) => account,
            Err(e) => {
                error!(wallet = %wallet, error = %e, "error loading game state");
                self.metrics.record_storage_failure(steps::LOAD_ACCOUNT);
                return GameState::default();
            }
        };

        let Some(mut account) = account else {
            if let Err(e) = self.store.ensure_account(wallet, now).await {
                error!(wallet = %wallet, error = %e, "error creating account");
                self.metrics.record_storage_failure(steps::CREATE_ACCOUNT);
            } else {
                info!(wallet = %wallet, "new player account");
            }
            return GameState::default();
        };

        let today = now.date_naive();
        if account.last_spin_date != Some(today) && account.spins_today > 0 {
            if let Err(e) = self.store.reset_daily_spins(wallet, today, now).await {
                error!(wallet = %wallet, error = %e, "error resetting daily spins");
                self.metrics.record_storage_failure(steps::RESET_DAILY);
            }
        }
        // The view reflects today's count even if the stored reset is pending
        account.reset_daily_if_stale(today);

        let history = match self.store.recent_spins(wallet, self.history_limit).await {
            Ok(records) => records.iter().map(SpinRecord::outcome).collect(),
            Err(e) => {
                error!(wallet = %wallet, error = %e, "error loading spin history");
                self.metrics.record_storage_failure(steps::LOAD_HISTORY);
                Vec::new()
            }
        };

        GameState::from_account(&account, history)
    }

    /// Spin once for `wallet` and persist the result.
    ///
    /// The three writes are independent: a failure in one is logged and the
    /// rest still run. A leaderboard refresh is requested afterwards.
    pub async fn record_spin(&self, wallet: &WalletAddress, signature: Option<String>) -> SpinOutcome {
        let outcome = SpinOutcome::resolve(self.reels.draw());
        self.persist_spin(wallet, outcome, signature).await
    }

    async fn persist_spin(
        &self,
        wallet: &WalletAddress,
        outcome: SpinOutcome,
        signature: Option<String>,
    ) -> SpinOutcome {
        let now = self.clock.now();

        self.metrics.record_spin(outcome.points(), outcome.is_jackpot());
        info!(
            wallet = %wallet,
            points = outcome.points(),
            match_type = outcome.match_type(),
            jackpot = outcome.is_jackpot(),
            "spin resolved"
        );

        if let Err(e) = self.store.ensure_account(wallet, now).await {
            error!(wallet = %wallet, step = steps::ENSURE_ACCOUNT, error = %e, "error recording spin");
            self.metrics.record_storage_failure(steps::ENSURE_ACCOUNT);
        }

        let record = SpinRecord::new(wallet.clone(), &outcome, signature, now);
        if let Err(e) = self.store.append_spin(&record).await {
            error!(wallet = %wallet, step = steps::APPEND_SPIN, error = %e, "error recording spin");
            self.metrics.record_storage_failure(steps::APPEND_SPIN);
        }

        let update = SpinUpdate::from_outcome(&outcome, now);
        if let Err(e) = self.store.apply_spin(wallet, &update).await {
            error!(wallet = %wallet, step = steps::APPLY_SPIN, error = %e, "error recording spin");
            self.metrics.record_storage_failure(steps::APPLY_SPIN);
        }

        debug!(wallet = %wallet, spin_id = %record.id, "spin persisted");
        self.leaderboard.request_refresh();
        outcome
    }
}
