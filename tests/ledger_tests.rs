//! Player ledger behavior against the in-memory and RocksDB stores

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use luckyreels::{
    errors::{LuckyError, LuckyResult, StorageError},
    games::{LeaderboardRow, PlayerAccount, SpinRecord, SpinUpdate},
    storage::OptimizedStorage,
    Clock, GameMetrics, GameStore, LeaderboardRanker, MemoryGameStore, PlayerLedger, ReelSource, RocksGameStore,
    SpinOutcome, Symbol, WalletAddress,
};
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};
use tempfile::TempDir;

struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    fn at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self(Mutex::new(now)))
    }

    fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap();
        *now = *now + by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// Plays back fixed reels, then a losing spin once the script runs out
struct ScriptedReels(Mutex<VecDeque<[Symbol; 3]>>);

impl ScriptedReels {
    fn new(script: Vec<[Symbol; 3]>) -> Arc<Self> {
        Arc::new(Self(Mutex::new(script.into())))
    }
}

impl ReelSource for ScriptedReels {
    fn draw(&self) -> [Symbol; 3] {
        self.0
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or([Symbol::Lemon, Symbol::Bell, Symbol::Star])
    }
}

fn wallet(n: u8) -> WalletAddress {
    WalletAddress::parse(&format!("0x{:040x}", n)).unwrap()
}

fn noon(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, day, 12, 0, 0).unwrap()
}

fn ledger_over(store: Arc<dyn GameStore>, clock: Arc<FixedClock>) -> (PlayerLedger, GameMetrics) {
    let metrics = GameMetrics::new();
    let ranker = Arc::new(LeaderboardRanker::new(store.clone(), metrics.clone()));
    let ledger = PlayerLedger::new(store, ranker, metrics.clone(), 50).with_clock(clock);
    (ledger, metrics)
}

#[tokio::test]
async fn test_unknown_wallet_gets_default_state_and_account() {
    let store = Arc::new(MemoryGameStore::new());
    let (ledger, _) = ledger_over(store.clone(), FixedClock::at(noon(1)));
    let w = wallet(1);

    let state = ledger.load_state(&w).await;
    assert_eq!(state, Default::default());

    let account = store.load_account(&w).await.unwrap().expect("account created on first load");
    assert_eq!(account.total_points, 0);
    assert_eq!(account.spins_today, 0);
    assert_eq!(account.last_spin_date, None);
    assert_eq!(account.created_at, noon(1));

    // Loading again is harmless
    assert_eq!(ledger.load_state(&w).await, Default::default());
}

#[tokio::test]
async fn test_aggregates_track_every_spin() {
    let store = Arc::new(MemoryGameStore::new());
    let (ledger, metrics) = ledger_over(store.clone(), FixedClock::at(noon(2)));
    let w = wallet(2);

    let mut outcomes = Vec::new();
    for _ in 0..30 {
        outcomes.push(ledger.record_spin(&w, None).await);
    }

    let state = ledger.load_state(&w).await;
    let expected_total: u64 = outcomes.iter().map(|o| o.points()).sum();
    let expected_max = outcomes.iter().map(|o| o.points()).max().unwrap();
    let expected_jackpots = outcomes.iter().filter(|o| o.is_jackpot()).count() as u64;

    assert_eq!(state.total_points, expected_total);
    assert_eq!(state.highest_win, expected_max);
    assert_eq!(state.jackpot_count, expected_jackpots);
    assert_eq!(state.spins_today, 30);
    assert_eq!(state.last_spin_date, Some(noon(2).date_naive()));
    assert_eq!(metrics.spins_total.get(), 30);

    // History is newest first
    let newest_first: Vec<SpinOutcome> = outcomes.iter().rev().cloned().collect();
    assert_eq!(state.spin_history, newest_first);
}

#[tokio::test]
async fn test_history_is_capped_at_fifty() {
    let store = Arc::new(MemoryGameStore::new());
    let clock = FixedClock::at(noon(3));
    let (ledger, _) = ledger_over(store.clone(), clock.clone());
    let w = wallet(3);

    let mut last = None;
    for _ in 0..60 {
        last = Some(ledger.record_spin(&w, None).await);
        clock.advance(Duration::seconds(6));
    }

    let state = ledger.load_state(&w).await;
    assert_eq!(state.spin_history.len(), 50);
    assert_eq!(state.spin_history.first(), last.as_ref());
    assert_eq!(state.spins_today, 60);
}

#[tokio::test]
async fn test_fixed_outcome_is_folded_exactly() {
    let store = Arc::new(MemoryGameStore::new());
    let (ledger, metrics) = ledger_over(store.clone(), FixedClock::at(noon(4)));
    let ledger = ledger.with_reels(ScriptedReels::new(vec![
        [Symbol::Seven; 3],
        [Symbol::Diamond, Symbol::Diamond, Symbol::Lemon],
        [Symbol::Cherry, Symbol::Lemon, Symbol::Bell],
    ]));
    let w = wallet(4);

    let jackpot = ledger.record_spin(&w, None).await;
    assert!(jackpot.is_jackpot());
    assert_eq!(jackpot.symbols(), [Symbol::Seven; 3]);
    ledger.record_spin(&w, None).await;
    ledger.record_spin(&w, None).await;

    let account = store.load_account(&w).await.unwrap().unwrap();
    assert_eq!(account.total_points, 777 + 15);
    assert_eq!(account.highest_win, 777);
    assert_eq!(account.jackpot_count, 1);
    assert_eq!(account.spins_today, 3);
    assert_eq!(metrics.jackpots_total.get(), 1);
}

#[tokio::test]
async fn test_daily_counter_resets_on_new_day() {
    let store = Arc::new(MemoryGameStore::new());
    let clock = FixedClock::at(noon(5));
    let (ledger, _) = ledger_over(store.clone(), clock.clone());
    let w = wallet(5);

    for _ in 0..3 {
        ledger.record_spin(&w, None).await;
    }
    let before = ledger.load_state(&w).await;
    assert_eq!(before.spins_today, 3);

    // Same day: loading does not touch the counter
    assert_eq!(ledger.load_state(&w).await.spins_today, 3);

    clock.advance(Duration::days(1));
    let after = ledger.load_state(&w).await;
    assert_eq!(after.spins_today, 0);
    assert_eq!(after.total_points, before.total_points);
    assert_eq!(after.spin_history.len(), 3);

    // The reset was persisted and repeating it changes nothing
    let stored = store.load_account(&w).await.unwrap().unwrap();
    assert_eq!(stored.spins_today, 0);
    assert_eq!(ledger.load_state(&w).await.spins_today, 0);

    ledger.record_spin(&w, None).await;
    let next = ledger.load_state(&w).await;
    assert_eq!(next.spins_today, 1);
    assert_eq!(next.last_spin_date, Some(noon(6).date_naive()));
}

#[tokio::test]
async fn test_rocksdb_ledger_round_trip() {
    let temp = TempDir::new().unwrap();
    let store: Arc<dyn GameStore> = Arc::new(RocksGameStore::new(OptimizedStorage::new(temp.path()).unwrap()));
    let clock = FixedClock::at(noon(7));
    let (ledger, _) = ledger_over(store.clone(), clock.clone());
    let w = wallet(7);

    let signature = format!("0x{}", "ab".repeat(65));
    let first = ledger.record_spin(&w, Some(signature.clone())).await;
    clock.advance(Duration::seconds(10));
    let second = ledger.record_spin(&w, None).await;

    let state = ledger.load_state(&w).await;
    assert_eq!(state.total_points, first.points() + second.points());
    assert_eq!(state.spin_history, vec![second, first]);

    let records = store.recent_spins(&w, 10).await.unwrap();
    assert_eq!(records[1].signature.as_deref(), Some(signature.as_str()));
    assert_eq!(records[0].signature, None);
}

/// Delegating store that fails selected operations on demand
#[derive(Default)]
struct FlakyStore {
    inner: MemoryGameStore,
    fail_reads: AtomicBool,
    fail_history: AtomicBool,
    fail_append: AtomicBool,
    fail_apply: AtomicBool,
    fail_ensure: AtomicBool,
}

impl FlakyStore {
    fn check(flag: &AtomicBool) -> LuckyResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(LuckyError::Storage(StorageError::Unavailable("injected failure".to_string())));
        }
        Ok(())
    }
}

#[async_trait]
impl GameStore for FlakyStore {
    async fn ping(&self) -> LuckyResult<()> {
        Self::check(&self.fail_reads)
    }

    async fn ensure_account(&self, wallet: &WalletAddress, at: DateTime<Utc>) -> LuckyResult<()> {
        Self::check(&self.fail_ensure)?;
        self.inner.ensure_account(wallet, at).await
    }

    async fn load_account(&self, wallet: &WalletAddress) -> LuckyResult<Option<PlayerAccount>> {
        Self::check(&self.fail_reads)?;
        self.inner.load_account(wallet).await
    }

    async fn reset_daily_spins(&self, wallet: &WalletAddress, today: NaiveDate, at: DateTime<Utc>) -> LuckyResult<()> {
        self.inner.reset_daily_spins(wallet, today, at).await
    }

    async fn append_spin(&self, record: &SpinRecord) -> LuckyResult<()> {
        Self::check(&self.fail_append)?;
        self.inner.append_spin(record).await
    }

    async fn apply_spin(&self, wallet: &WalletAddress, update: &SpinUpdate) -> LuckyResult<()> {
        Self::check(&self.fail_apply)?;
        self.inner.apply_spin(wallet, update).await
    }

    async fn recent_spins(&self, wallet: &WalletAddress, limit: usize) -> LuckyResult<Vec<SpinRecord>> {
        Self::check(&self.fail_reads)?;
        Self::check(&self.fail_history)?;
        self.inner.recent_spins(wallet, limit).await
    }

    async fn load_accounts(&self) -> LuckyResult<Vec<PlayerAccount>> {
        Self::check(&self.fail_reads)?;
        self.inner.load_accounts().await
    }

    async fn replace_leaderboard(&self, rows: &[LeaderboardRow]) -> LuckyResult<()> {
        self.inner.replace_leaderboard(rows).await
    }

    async fn leaderboard_page(&self, limit: usize, offset: usize) -> LuckyResult<Vec<LeaderboardRow>> {
        Self::check(&self.fail_reads)?;
        self.inner.leaderboard_page(limit, offset).await
    }

    async fn leaderboard_rank(&self, wallet: &WalletAddress) -> LuckyResult<Option<u64>> {
        Self::check(&self.fail_reads)?;
        self.inner.leaderboard_rank(wallet).await
    }

    async fn leaderboard_size(&self) -> LuckyResult<u64> {
        Self::check(&self.fail_reads)?;
        self.inner.leaderboard_size().await
    }
}

#[tokio::test]
async fn test_spin_survives_history_write_failure() {
    let store = Arc::new(FlakyStore::default());
    let (ledger, metrics) = ledger_over(store.clone(), FixedClock::at(noon(8)));
    let ledger = ledger.with_reels(ScriptedReels::new(vec![[Symbol::Bell; 3]]));
    let w = wallet(8);

    store.fail_append.store(true, Ordering::SeqCst);
    let outcome = ledger.record_spin(&w, None).await;
    assert_eq!(outcome.points(), 50);

    // Aggregates still moved even though the history row is missing
    let state = ledger.load_state(&w).await;
    assert_eq!(state.total_points, 50);
    assert!(state.spin_history.is_empty());
    assert_eq!(
        metrics.storage_failures_total.with_label_values(&["append_spin"]).get(),
        1
    );
}

#[tokio::test]
async fn test_spin_survives_every_write_failing() {
    let store = Arc::new(FlakyStore::default());
    let (ledger, metrics) = ledger_over(store.clone(), FixedClock::at(noon(9)));
    let w = wallet(9);

    store.fail_ensure.store(true, Ordering::SeqCst);
    store.fail_append.store(true, Ordering::SeqCst);
    store.fail_apply.store(true, Ordering::SeqCst);

    let outcome = ledger.record_spin(&w, None).await;
    assert_eq!(outcome, SpinOutcome::resolve(outcome.symbols()));

    for step in ["ensure_account", "append_spin", "apply_spin"] {
        assert_eq!(metrics.storage_failures_total.with_label_values(&[step]).get(), 1);
    }
    assert!(store.inner.load_account(&w).await.unwrap().is_none());
}

#[tokio::test]
async fn test_load_failure_degrades_to_default() {
    let store = Arc::new(FlakyStore::default());
    let (ledger, metrics) = ledger_over(store.clone(), FixedClock::at(noon(10)));
    let ledger = ledger.with_reels(ScriptedReels::new(vec![[Symbol::Seven; 3]]));
    let w = wallet(10);

    ledger.record_spin(&w, None).await;
    store.fail_reads.store(true, Ordering::SeqCst);

    assert_eq!(ledger.load_state(&w).await, Default::default());
    assert_eq!(
        metrics.storage_failures_total.with_label_values(&["load_account"]).get(),
        1
    );
}

#[tokio::test]
async fn test_history_failure_keeps_account() {
    let store = Arc::new(FlakyStore::default());
    let (ledger, metrics) = ledger_over(store.clone(), FixedClock::at(noon(11)));
    let ledger = ledger.with_reels(ScriptedReels::new(vec![[Symbol::Seven; 3], [Symbol::Bell; 3]]));
    let w = wallet(11);

    ledger.record_spin(&w, None).await;
    ledger.record_spin(&w, None).await;
    store.fail_history.store(true, Ordering::SeqCst);

    let state = ledger.load_state(&w).await;
    assert_eq!(state.total_points, 777 + 50);
    assert_eq!(state.highest_win, 777);
    assert_eq!(state.jackpot_count, 1);
    assert_eq!(state.spins_today, 2);
    assert!(state.spin_history.is_empty());
    assert_eq!(
        metrics.storage_failures_total.with_label_values(&["load_history"]).get(),
        1
    );
    assert_eq!(
        metrics.storage_failures_total.with_label_values(&["load_account"]).get(),
        0
    );
}

const RACING_SPINS: usize = 200;

async fn racing_spins_keep_every_increment(store: Arc<dyn GameStore>) {
    let (ledger, _) = ledger_over(store.clone(), FixedClock::at(noon(12)));
    let ledger = Arc::new(ledger);
    let w = wallet(12);

    let handles: Vec<_> = (0..RACING_SPINS)
        .map(|_| {
            let ledger = Arc::clone(&ledger);
            let w = w.clone();
            tokio::spawn(async move { ledger.record_spin(&w, None).await })
        })
        .collect();

    let mut outcomes = Vec::with_capacity(RACING_SPINS);
    for handle in handles {
        outcomes.push(handle.await.unwrap());
    }

    let account = store.load_account(&w).await.unwrap().unwrap();
    assert_eq!(account.total_points, outcomes.iter().map(|o| o.points()).sum::<u64>());
    assert_eq!(account.spins_today as usize, RACING_SPINS);
    assert_eq!(
        account.jackpot_count,
        outcomes.iter().filter(|o| o.is_jackpot()).count() as u64
    );
    assert_eq!(account.highest_win, outcomes.iter().map(|o| o.points()).max().unwrap());
    assert_eq!(store.recent_spins(&w, RACING_SPINS * 2).await.unwrap().len(), RACING_SPINS);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_racing_spins_on_rocksdb() {
    let temp = TempDir::new().unwrap();
    let store: Arc<dyn GameStore> = Arc::new(RocksGameStore::new(OptimizedStorage::new(temp.path()).unwrap()));
    racing_spins_keep_every_increment(store).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_racing_spins_in_memory() {
    racing_spins_keep_every_increment(Arc::new(MemoryGameStore::new())).await;
}
