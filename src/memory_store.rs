//! Process-local `GameStore`
//!
//! Backs `storage.backend = "memory"` for local development and the test
//! suites. Every account mutation runs under one write lock, which gives the
//! same atomic read-modify-write guarantee as the RocksDB merge operator.

use crate::{
    errors::LuckyResult,
    game_store::{AccountOp, GameStore},
    games::{LeaderboardRow, PlayerAccount, SpinRecord, SpinUpdate, WalletAddress},
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
struct Tables {
    accounts: HashMap<WalletAddress, PlayerAccount>,
    spins: HashMap<WalletAddress, Vec<SpinRecord>>,
    leaderboard: Vec<LeaderboardRow>,
    ranks: HashMap<WalletAddress, u64>,
}

#[derive(Default)]
pub struct MemoryGameStore {
    tables: RwLock<Tables>,
}

impl MemoryGameStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn apply(&self, wallet: &WalletAddress, op: AccountOp) -> LuckyResult<()> {
        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
        let mut account = tables.accounts.remove(wallet);
        op.apply(wallet, &mut account);
        if let Some(account) = account {
            tables.accounts.insert(wallet.clone(), account);
        }
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl GameStore for MemoryGameStore {
    async fn ping(&self) -> LuckyResult<()> {
        Ok(())
    }

    async fn ensure_account(&self, wallet: &WalletAddress, at: DateTime<Utc>) -> LuckyResult<()> {
        self.apply(wallet, AccountOp::Ensure { at })
    }

    async fn load_account(&self, wallet: &WalletAddress) -> LuckyResult<Option<PlayerAccount>> {
        Ok(self.read().accounts.get(wallet).cloned())
    }

    async fn reset_daily_spins(
        &self,
        wallet: &WalletAddress,
        today: NaiveDate,
        at: DateTime<Utc>,
    ) -> LuckyResult<()> {
        self.apply(wallet, AccountOp::ResetDaily { today, at })
    }

    async fn append_spin(&self, record: &SpinRecord) -> LuckyResult<()> {
        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
        tables
            .spins
            .entry(record.wallet_address.clone())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn apply_spin(&self, wallet: &WalletAddress, update: &SpinUpdate) -> LuckyResult<()> {
        self.apply(wallet, AccountOp::Spin { update: *update })
    }

    async fn recent_spins(&self, wallet: &WalletAddress, limit: usize) -> LuckyResult<Vec<SpinRecord>> {
        let tables = self.read();
        let Some(spins) = tables.spins.get(wallet) else {
            return Ok(Vec::new());
        };
        let mut recent: Vec<SpinRecord> = spins.iter().rev().cloned().collect();
        // Stable sort keeps insertion order (newest first) for equal timestamps
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recent.truncate(limit);
        Ok(recent)
    }

    async fn load_accounts(&self) -> LuckyResult<Vec<PlayerAccount>> {
        Ok(self.read().accounts.values().cloned().collect())
    }

    async fn replace_leaderboard(&self, rows: &[LeaderboardRow]) -> LuckyResult<()> {
        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
        tables.ranks = rows.iter().map(|row| (row.address.clone(), row.rank)).collect();
        tables.leaderboard = rows.to_vec();
        Ok(())
    }

    async fn leaderboard_page(&self, limit: usize, offset: usize) -> LuckyResult<Vec<LeaderboardRow>> {
        Ok(self.read().leaderboard.iter().skip(offset).take(limit).cloned().collect())
    }

    async fn leaderboard_rank(&self, wallet: &WalletAddress) -> LuckyResult<Option<u64>> {
        Ok(self.read().ranks.get(wallet).copied())
    }

    async fn leaderboard_size(&self) -> LuckyResult<u64> {
        Ok(self.read().leaderboard.len() as u64)
    }
}
