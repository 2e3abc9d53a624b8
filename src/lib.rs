//! LuckyReels - wallet-gated three-reel slot machine backend
//!
//! Outcomes are generated and scored on the server. Each spin is appended to
//! a per-wallet history, folded into the player's aggregates, and feeds a
//! leaderboard projection that is refreshed in the background.

pub mod api;
pub mod config;
pub mod errors;
pub mod game_store;
pub mod games;
pub mod leaderboard;
pub mod ledger;
pub mod memory_store;
pub mod metrics;
pub mod signature;
pub mod storage;

pub use config::{ConfigLoader, LuckyConfig};
pub use errors::{LuckyError, LuckyResult};
pub use game_store::{open_game_store, GameStore, RocksGameStore};
pub use games::{GameState, OutcomeGenerator, SpinOutcome, Symbol, WalletAddress};
pub use leaderboard::LeaderboardRanker;
pub use ledger::{Clock, PlayerLedger, ReelSource, SystemClock};
pub use memory_store::MemoryGameStore;
pub use metrics::GameMetrics;
