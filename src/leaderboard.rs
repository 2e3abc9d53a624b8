//! Leaderboard projection
//!
//! The ranking is a materialized view over every persisted account. It is
//! recomputed after spins on a background task and read back by position, so
//! a rank lookup right after a spin may still show the previous snapshot.

use crate::{
    errors::LuckyResult,
    game_store::GameStore,
    games::{LeaderboardRow, PlayerAccount, WalletAddress},
    metrics::{steps, GameMetrics},
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tracing::{debug, error, warn};

pub struct LeaderboardRanker {
    store: Arc<dyn GameStore>,
    metrics: GameMetrics,
    /// Set when a refresh is requested, cleared when one starts
    dirty: AtomicBool,
    /// Held by the single in-flight background refresh
    running: AtomicBool,
}

impl LeaderboardRanker {
    pub fn new(store: Arc<dyn GameStore>, metrics: GameMetrics) -> Self {
        Self {
            store,
            metrics,
            dirty: AtomicBool::new(false),
            running: AtomicBool::new(false),
        }
    }

    /// Order accounts by total points descending. Ties go to the older
    /// account, then to the lower address, so positions are deterministic.
    pub fn compute_rows(mut accounts: Vec<PlayerAccount>) -> Vec<LeaderboardRow> {
        accounts.sort_by(|a, b| {
            b.total_points
                .cmp(&a.total_points)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.wallet_address.cmp(&b.wallet_address))
        });

        accounts
            .into_iter()
            .enumerate()
            .map(|(position, account)| LeaderboardRow {
                address: account.wallet_address,
                points: account.total_points,
                rank: position as u64 + 1,
                jackpots: account.jackpot_count,
            })
            .collect()
    }

    /// Recompute and store the projection now. Returns the number of ranked accounts.
    pub async fn refresh(&self) -> LuckyResult<usize> {
        let accounts = self.store.load_accounts().await?;
        let rows = Self::compute_rows(accounts);
        self.store.replace_leaderboard(&rows).await?;
        self.metrics.leaderboard_refreshes_total.inc();
        debug!(ranked = rows.len(), "leaderboard refreshed");
        Ok(rows.len())
    }

    /// Fire-and-forget refresh. Requests arriving while a refresh runs are
    /// coalesced into one follow-up pass.
    pub fn request_refresh(self: &Arc<Self>) {
        self.dirty.store(true, Ordering::SeqCst);
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            self.running.store(false, Ordering::SeqCst);
            warn!("no async runtime, leaderboard refresh skipped");
            return;
        };

        let ranker = Arc::clone(self);
        handle.spawn(async move {
            loop {
                ranker.dirty.store(false, Ordering::SeqCst);
                if let Err(e) = ranker.refresh().await {
                    warn!(error = %e, "failed to refresh leaderboard");
                    ranker.metrics.record_storage_failure(steps::REFRESH_LEADERBOARD);
                }
                ranker.running.store(false, Ordering::SeqCst);

                if !ranker.dirty.load(Ordering::SeqCst) || ranker.running.swap(true, Ordering::SeqCst) {
                    break;
                }
            }
        });
    }

    /// A page of the current projection; empty if the store cannot answer
    pub async fn rank(&self, limit: usize, offset: usize) -> Vec<LeaderboardRow> {
        match self.store.leaderboard_page(limit, offset).await {
            Ok(rows) => rows,
            Err(e) => {
                error!(error = %e, limit, offset, "error loading leaderboard");
                self.metrics.record_storage_failure(steps::QUERY_LEADERBOARD);
                Vec::new()
            }
        }
    }

    /// Position of one wallet in the current projection
    pub async fn rank_of(&self, wallet: &WalletAddress) -> Option<u64> {
        match self.store.leaderboard_rank(wallet).await {
            Ok(rank) => rank,
            Err(e) => {
                error!(wallet = %wallet, error = %e, "error getting user rank");
                self.metrics.record_storage_failure(steps::QUERY_LEADERBOARD);
                None
            }
        }
    }

    /// Number of ranked accounts in the current projection
    pub async fn total(&self) -> u64 {
        match self.store.leaderboard_size().await {
            Ok(size) => size,
            Err(e) => {
                error!(error = %e, "error getting leaderboard size");
                self.metrics.record_storage_failure(steps::QUERY_LEADERBOARD);
                0
            }
        }
    }
}
