//! Persistent player ledger records stored in RocksDB.
//!
//! Key layout:
//! - `account:{wallet}`                      merge-operated `PlayerAccount` JSON
//! - `spin:{wallet}:{inv_millis}{uuid}`      `SpinRecord` JSON, newest first per wallet
//! - `leaderboard:rank:{rank}`               `LeaderboardRow` JSON, big-endian rank
//! - `leaderboard:wallet:{wallet}`           big-endian rank
//! - `leaderboard:size`                      big-endian row count

use crate::{
    config::{StorageBackend, StorageConfig},
    errors::{LuckyError, LuckyResult, StorageError},
    games::{LeaderboardRow, PlayerAccount, SpinRecord, SpinUpdate, WalletAddress},
    memory_store::MemoryGameStore,
    storage::OptimizedStorage,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const ACCOUNT_PREFIX: &[u8] = b"account:";
const SPIN_PREFIX: &[u8] = b"spin:";
const LEADERBOARD_RANK_PREFIX: &[u8] = b"leaderboard:rank:";
const LEADERBOARD_WALLET_PREFIX: &[u8] = b"leaderboard:wallet:";
const LEADERBOARD_SIZE_KEY: &[u8] = b"leaderboard:size";
const HEALTH_PROBE_KEY: &[u8] = b"health:probe";

/// Persistence collaborator for the ledger and leaderboard.
///
/// Aggregate updates (`ensure_account`, `reset_daily_spins`, `apply_spin`)
/// must each be a single atomic read-modify-write inside the store so
/// concurrent spins for one wallet never lose increments.
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Cheap connectivity probe
    async fn ping(&self) -> LuckyResult<()>;

    /// Create a zeroed account if none exists
    async fn ensure_account(&self, wallet: &WalletAddress, at: DateTime<Utc>) -> LuckyResult<()>;

    async fn load_account(&self, wallet: &WalletAddress) -> LuckyResult<Option<PlayerAccount>>;

    /// Zero `spins_today` unless the stored last spin date is `today`
    async fn reset_daily_spins(&self, wallet: &WalletAddress, today: NaiveDate, at: DateTime<Utc>)
        -> LuckyResult<()>;

    async fn append_spin(&self, record: &SpinRecord) -> LuckyResult<()>;

    /// Fold one spin into the account aggregates
    async fn apply_spin(&self, wallet: &WalletAddress, update: &SpinUpdate) -> LuckyResult<()>;

    /// Most recent spins for a wallet, newest first
    async fn recent_spins(&self, wallet: &WalletAddress, limit: usize) -> LuckyResult<Vec<SpinRecord>>;

    async fn load_accounts(&self) -> LuckyResult<Vec<PlayerAccount>>;

    /// Swap in a freshly computed leaderboard projection
    async fn replace_leaderboard(&self, rows: &[LeaderboardRow]) -> LuckyResult<()>;

    async fn leaderboard_page(&self, limit: usize, offset: usize) -> LuckyResult<Vec<LeaderboardRow>>;

    async fn leaderboard_rank(&self, wallet: &WalletAddress) -> LuckyResult<Option<u64>>;

    async fn leaderboard_size(&self) -> LuckyResult<u64>;
}

/// Atomic account mutation, applied by the store in arrival order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum AccountOp {
    Ensure { at: DateTime<Utc> },
    ResetDaily { today: NaiveDate, at: DateTime<Utc> },
    Spin { update: SpinUpdate },
}

impl AccountOp {
    /// Apply to the current record, creating it on first contact
    pub fn apply(&self, wallet: &WalletAddress, account: &mut Option<PlayerAccount>) {
        let created_at = match self {
            AccountOp::Ensure { at } | AccountOp::ResetDaily { at, .. } => *at,
            AccountOp::Spin { update } => update.at,
        };
        let account = account.get_or_insert_with(|| PlayerAccount::new(wallet.clone(), created_at));

        match self {
            AccountOp::Ensure { .. } => {}
            AccountOp::ResetDaily { today, .. } => account.reset_daily_if_stale(*today),
            AccountOp::Spin { update } => account.apply_spin(update),
        }
    }
}

fn account_key(wallet: &WalletAddress) -> Vec<u8> {
    [ACCOUNT_PREFIX, wallet.as_str().as_bytes()].concat()
}

fn wallet_spin_prefix(wallet: &WalletAddress) -> Vec<u8> {
    [SPIN_PREFIX, wallet.as_str().as_bytes(), &b":"[..]].concat()
}

fn spin_key(record: &SpinRecord) -> Vec<u8> {
    // Newest first within a wallet: invert the timestamp, uuid breaks ties
    let millis = record.created_at.timestamp_millis().max(0) as u64;
    let mut key = wallet_spin_prefix(&record.wallet_address);
    key.extend_from_slice(&(u64::MAX - millis).to_be_bytes());
    key.extend_from_slice(record.id.as_bytes());
    key
}

fn leaderboard_rank_key(rank: u64) -> Vec<u8> {
    [LEADERBOARD_RANK_PREFIX, &rank.to_be_bytes()[..]].concat()
}

fn leaderboard_wallet_key(wallet: &WalletAddress) -> Vec<u8> {
    [LEADERBOARD_WALLET_PREFIX, wallet.as_str().as_bytes()].concat()
}

fn decode_u64(bytes: &[u8], what: &str) -> LuckyResult<u64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StorageError::CorruptedData(format!("Invalid {} bytes", what)))?;
    Ok(u64::from_be_bytes(raw))
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8], what: &str) -> LuckyResult<T> {
    serde_json::from_slice(bytes).map_err(|e| {
        LuckyError::Storage(StorageError::CorruptedData(format!("Failed to decode {}: {}", what, e)))
    })
}

fn encode<T: Serialize>(value: &T, what: &str) -> LuckyResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| {
        LuckyError::Storage(StorageError::WriteFailed(format!("Failed to encode {}: {}", what, e)))
    })
}

/// RocksDB full-merge callback for `account:` keys.
///
/// A record that cannot be decoded is kept as-is and the operands are
/// dropped, since returning `None` would poison every later read of the key.
pub fn merge_account_record(
    key: &[u8],
    existing: Option<&[u8]>,
    operands: &rocksdb::MergeOperands,
) -> Option<Vec<u8>> {
    let wallet = key
        .strip_prefix(ACCOUNT_PREFIX)
        .and_then(|raw| std::str::from_utf8(raw).ok())
        .and_then(WalletAddress::parse);
    let Some(wallet) = wallet else {
        tracing::error!(key = %String::from_utf8_lossy(key), "merge on non-account key");
        return existing.map(|bytes| bytes.to_vec());
    };

    let mut account: Option<PlayerAccount> = match existing {
        Some(bytes) => match serde_json::from_slice(bytes) {
            Ok(account) => Some(account),
            Err(e) => {
                tracing::error!(wallet = %wallet, error = %e, "corrupted account record, skipping merge");
                return Some(bytes.to_vec());
            }
        },
        None => None,
    };

    for operand in operands.iter() {
        match serde_json::from_slice::<AccountOp>(operand) {
            Ok(op) => op.apply(&wallet, &mut account),
            Err(e) => tracing::error!(wallet = %wallet, error = %e, "undecodable account operand"),
        }
    }

    match account {
        Some(account) => serde_json::to_vec(&account).ok(),
        None => existing.map(|bytes| bytes.to_vec()),
    }
}

/// Open the store selected by `storage.backend`
pub fn open_game_store(config: &StorageConfig) -> LuckyResult<Arc<dyn GameStore>> {
    match config.backend {
        StorageBackend::RocksDb => {
            let storage = OptimizedStorage::new_with_config(config)?;
            tracing::info!(path = %config.data_directory, "opened RocksDB game store");
            Ok(Arc::new(RocksGameStore::new(storage)))
        }
        StorageBackend::Memory => {
            tracing::warn!("using in-memory game store, progress is lost on restart");
            Ok(Arc::new(MemoryGameStore::new()))
        }
    }
}

/// `GameStore` backed by the RocksDB `OptimizedStorage`
#[derive(Clone)]
pub struct RocksGameStore {
    storage: OptimizedStorage,
}

impl RocksGameStore {
    pub fn new(storage: OptimizedStorage) -> Self {
        Self { storage }
    }

    fn merge_op(&self, wallet: &WalletAddress, op: &AccountOp) -> LuckyResult<()> {
        let operand = encode(op, "account operand")?;
        self.storage.merge(&account_key(wallet), &operand)
    }
}

#[async_trait]
impl GameStore for RocksGameStore {
    async fn ping(&self) -> LuckyResult<()> {
        self.storage.get(HEALTH_PROBE_KEY).map(|_| ())
    }

    async fn ensure_account(&self, wallet: &WalletAddress, at: DateTime<Utc>) -> LuckyResult<()> {
        self.merge_op(wallet, &AccountOp::Ensure { at })
    }

    async fn load_account(&self, wallet: &WalletAddress) -> LuckyResult<Option<PlayerAccount>> {
        match self.storage.get(&account_key(wallet))? {
            Some(bytes) => Ok(Some(decode(&bytes, "account")?)),
            None => Ok(None),
        }
    }

    async fn reset_daily_spins(
        &self,
        wallet: &WalletAddress,
        today: NaiveDate,
        at: DateTime<Utc>,
    ) -> LuckyResult<()> {
        self.merge_op(wallet, &AccountOp::ResetDaily { today, at })
    }

    async fn append_spin(&self, record: &SpinRecord) -> LuckyResult<()> {
        let bytes = encode(record, "spin record")?;
        self.storage.put(&spin_key(record), &bytes)
    }

    async fn apply_spin(&self, wallet: &WalletAddress, update: &SpinUpdate) -> LuckyResult<()> {
        self.merge_op(wallet, &AccountOp::Spin { update: *update })
    }

    async fn recent_spins(&self, wallet: &WalletAddress, limit: usize) -> LuckyResult<Vec<SpinRecord>> {
        let rows = self.storage.scan_prefix(&wallet_spin_prefix(wallet), None, limit)?;
        rows.iter().map(|(_, value)| decode(value, "spin record")).collect()
    }

    async fn load_accounts(&self) -> LuckyResult<Vec<PlayerAccount>> {
        let rows = self.storage.scan_prefix(ACCOUNT_PREFIX, None, usize::MAX)?;
        let mut accounts = Vec::with_capacity(rows.len());
        for (key, value) in rows {
            match decode::<PlayerAccount>(&value, "account") {
                Ok(account) => accounts.push(account),
                Err(e) => tracing::warn!(key = %String::from_utf8_lossy(&key), error = %e, "skipping account"),
            }
        }
        Ok(accounts)
    }

    async fn replace_leaderboard(&self, rows: &[LeaderboardRow]) -> LuckyResult<()> {
        let previous_size = self.leaderboard_size().await?;
        let new_size = rows.len() as u64;

        let mut puts: Vec<(Vec<u8>, Vec<u8>)> = Vec::with_capacity(rows.len() * 2 + 1);
        for row in rows {
            puts.push((leaderboard_rank_key(row.rank), encode(row, "leaderboard row")?));
            puts.push((leaderboard_wallet_key(&row.address), row.rank.to_be_bytes().to_vec()));
        }
        puts.push((LEADERBOARD_SIZE_KEY.to_vec(), new_size.to_be_bytes().to_vec()));

        let deletes: Vec<Vec<u8>> = (new_size + 1..=previous_size).map(leaderboard_rank_key).collect();

        self.storage.batch_write(&puts, &deletes)
    }

    async fn leaderboard_page(&self, limit: usize, offset: usize) -> LuckyResult<Vec<LeaderboardRow>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let size = self.leaderboard_size().await?;
        let first_rank = match (offset as u64).checked_add(1) {
            Some(rank) if rank <= size => rank,
            _ => return Ok(Vec::new()),
        };
        let remaining = (size - first_rank + 1) as usize;
        let start = leaderboard_rank_key(first_rank);
        let rows = self
            .storage
            .scan_prefix(LEADERBOARD_RANK_PREFIX, Some(start.as_slice()), limit.min(remaining))?;
        rows.iter().map(|(_, value)| decode(value, "leaderboard row")).collect()
    }

    async fn leaderboard_rank(&self, wallet: &WalletAddress) -> LuckyResult<Option<u64>> {
        match self.storage.get(&leaderboard_wallet_key(wallet))? {
            Some(bytes) => Ok(Some(decode_u64(&bytes, "leaderboard rank")?)),
            None => Ok(None),
        }
    }

    async fn leaderboard_size(&self) -> LuckyResult<u64> {
        match self.storage.get(LEADERBOARD_SIZE_KEY)? {
            Some(bytes) => decode_u64(&bytes, "leaderboard size"),
            None => Ok(0),
        }
    }
}
