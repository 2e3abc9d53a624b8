//! Optimized storage layer using RocksDB
//!
//! Account records are updated through a merge operator so every aggregate
//! change is an atomic read-modify-write inside the database rather than a
//! read-then-write in application code.

use crate::{
    config::{CompressionType, StorageConfig},
    errors::{LuckyError, LuckyResult, StorageError},
    game_store::merge_account_record,
};
use rocksdb::{DBCompressionType, Direction, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use std::sync::Arc;

const ACCOUNT_MERGE_OPERATOR: &str = "luckyreels.account.v1";

#[derive(Clone)]
pub struct OptimizedStorage {
    db: Arc<DB>,
}

impl OptimizedStorage {
    /// Open (or create) a database with default tuning
    pub fn new<P: AsRef<Path>>(path: P) -> LuckyResult<Self> {
        let config = StorageConfig {
            data_directory: path.as_ref().to_string_lossy().to_string(),
            ..Default::default()
        };
        Self::new_with_config(&config)
    }

    pub fn new_with_config(config: &StorageConfig) -> LuckyResult<Self> {
        let opts = Self::options(config);

        if config.clear_on_start && Path::new(&config.data_directory).exists() {
            tracing::warn!(path = %config.data_directory, "clearing database on start");
            DB::destroy(&opts, &config.data_directory)
                .map_err(|e| StorageError::DatabaseOpenFailed(e.to_string()))?;
        }

        let db = DB::open(&opts, &config.data_directory).map_err(|e| {
            LuckyError::Storage(StorageError::DatabaseOpenFailed(format!(
                "{}: {}",
                config.data_directory, e
            )))
        })?;

        Ok(Self { db: Arc::new(db) })
    }

    fn options(config: &StorageConfig) -> Options {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(config.write_buffer_size_mb * 1024 * 1024);
        opts.set_max_write_buffer_number(config.max_write_buffer_number);
        opts.set_compression_type(match config.compression_type {
            CompressionType::None => DBCompressionType::None,
            CompressionType::Snappy => DBCompressionType::Snappy,
            CompressionType::Lz4 => DBCompressionType::Lz4,
            CompressionType::Zstd => DBCompressionType::Zstd,
        });
        opts.set_merge_operator(ACCOUNT_MERGE_OPERATOR, merge_account_record, merge_account_record_partial);
        opts
    }

    pub fn get(&self, key: &[u8]) -> LuckyResult<Option<Vec<u8>>> {
        self.db
            .get(key)
            .map_err(|e| StorageError::ReadFailed(e.to_string()).into())
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> LuckyResult<()> {
        self.db
            .put(key, value)
            .map_err(|e| StorageError::WriteFailed(e.to_string()).into())
    }

    /// Queue an operand for the account merge operator
    pub fn merge(&self, key: &[u8], operand: &[u8]) -> LuckyResult<()> {
        self.db
            .merge(key, operand)
            .map_err(|e| StorageError::WriteFailed(e.to_string()).into())
    }

    pub fn batch_write<K, V>(&self, puts: &[(K, V)], deletes: &[Vec<u8>]) -> LuckyResult<()>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let mut batch = WriteBatch::default();
        for (key, value) in puts {
            batch.put(key, value);
        }
        for key in deletes {
            batch.delete(key);
        }
        self.db
            .write(batch)
            .map_err(|e| StorageError::WriteFailed(e.to_string()).into())
    }

    /// Ordered scan of keys under `prefix`, starting at `from` (inclusive) when given
    pub fn scan_prefix(
        &self,
        prefix: &[u8],
        from: Option<&[u8]>,
        limit: usize,
    ) -> LuckyResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let start = from.unwrap_or(prefix);
        let mut rows = Vec::new();

        for item in self.db.iterator(IteratorMode::From(start, Direction::Forward)) {
            if rows.len() >= limit {
                break;
            }
            let (key, value) = item.map_err(|e| StorageError::ReadFailed(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            rows.push((key.to_vec(), value.to_vec()));
        }

        Ok(rows)
    }
}

// Operands are not combinable on their own; returning None keeps them queued
// until a full merge against the base record.
fn merge_account_record_partial(
    _key: &[u8],
    _existing: Option<&[u8]>,
    _operands: &rocksdb::MergeOperands,
) -> Option<Vec<u8>> {
    None
}
