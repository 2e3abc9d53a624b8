use super::{
    payout::{resolve, Payout},
    symbols::Symbol,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Resolved result of one spin.
///
/// Built only through [`SpinOutcome::resolve`] or [`SpinOutcome::from_parts`],
/// so `is_jackpot` always equals "every reel shows the lucky mark".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinOutcome {
    symbols: [Symbol; 3],
    points: u64,
    match_type: String,
    is_jackpot: bool,
}

impl SpinOutcome {
    pub fn resolve(symbols: [Symbol; 3]) -> Self {
        let Payout { points, match_type } = resolve(&symbols);
        Self::from_parts(symbols, points, match_type)
    }

    /// Rebuild a persisted outcome; the jackpot flag is re-derived.
    pub fn from_parts(symbols: [Symbol; 3], points: u64, match_type: String) -> Self {
        Self {
            symbols,
            points,
            match_type,
            is_jackpot: symbols.iter().all(|s| s.is_lucky()),
        }
    }

    pub fn symbols(&self) -> [Symbol; 3] {
        self.symbols
    }

    pub fn points(&self) -> u64 {
        self.points
    }

    pub fn match_type(&self) -> &str {
        &self.match_type
    }

    pub fn is_jackpot(&self) -> bool {
        self.is_jackpot
    }
}

/// Lower-cased `0x`-prefixed 20-byte hex wallet address
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress(String);

impl WalletAddress {
    pub const LEN: usize = 42;

    /// Validate and normalize a caller-supplied address
    pub fn parse(raw: &str) -> Option<Self> {
        let hex = raw.strip_prefix("0x")?;
        if raw.len() != Self::LEN || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self(raw.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        WalletAddress::parse(&value).ok_or_else(|| format!("invalid wallet address: {}", value))
    }
}

impl From<WalletAddress> for String {
    fn from(wallet: WalletAddress) -> Self {
        wallet.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Durable per-wallet progress record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerAccount {
    pub wallet_address: WalletAddress,
    pub total_points: u64,
    pub spins_today: u32,
    pub last_spin_date: Option<NaiveDate>,
    pub highest_win: u64,
    pub jackpot_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlayerAccount {
    pub fn new(wallet_address: WalletAddress, now: DateTime<Utc>) -> Self {
        Self {
            wallet_address,
            total_points: 0,
            spins_today: 0,
            last_spin_date: None,
            highest_win: 0,
            jackpot_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Clear the daily counter unless the last spin happened on `today`
    pub fn reset_daily_if_stale(&mut self, today: NaiveDate) {
        if self.last_spin_date != Some(today) {
            self.spins_today = 0;
        }
    }

    /// Fold one spin into the aggregates
    pub fn apply_spin(&mut self, update: &SpinUpdate) {
        if self.last_spin_date != Some(update.day) {
            self.spins_today = 0;
        }
        self.total_points = self.total_points.saturating_add(update.points);
        self.spins_today = self.spins_today.saturating_add(1);
        self.last_spin_date = Some(update.day);
        self.highest_win = self.highest_win.max(update.points);
        if update.jackpot {
            self.jackpot_count += 1;
        }
        self.updated_at = update.at;
    }
}

/// Aggregate delta produced by one spin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinUpdate {
    pub points: u64,
    pub jackpot: bool,
    pub day: NaiveDate,
    pub at: DateTime<Utc>,
}

impl SpinUpdate {
    pub fn from_outcome(outcome: &SpinOutcome, at: DateTime<Utc>) -> Self {
        Self {
            points: outcome.points(),
            jackpot: outcome.is_jackpot(),
            day: at.date_naive(),
            at,
        }
    }
}

/// Append-only spin log row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinRecord {
    pub id: uuid::Uuid,
    pub wallet_address: WalletAddress,
    pub symbols: [Symbol; 3],
    pub points_earned: u64,
    pub match_type: String,
    pub signature: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SpinRecord {
    pub fn new(
        wallet_address: WalletAddress,
        outcome: &SpinOutcome,
        signature: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            wallet_address,
            symbols: outcome.symbols(),
            points_earned: outcome.points(),
            match_type: outcome.match_type().to_string(),
            signature,
            created_at,
        }
    }

    pub fn outcome(&self) -> SpinOutcome {
        SpinOutcome::from_parts(self.symbols, self.points_earned, self.match_type.clone())
    }
}

/// One position in the materialized leaderboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub address: WalletAddress,
    pub points: u64,
    pub rank: u64,
    pub jackpots: u64,
}

/// Owner-facing view returned by a state load
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub total_points: u64,
    pub spins_today: u32,
    pub last_spin_date: Option<NaiveDate>,
    pub spin_history: Vec<SpinOutcome>,
    pub highest_win: u64,
    pub jackpot_count: u64,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            total_points: 0,
            spins_today: 0,
            last_spin_date: None,
            spin_history: Vec::new(),
            highest_win: 0,
            jackpot_count: 0,
        }
    }
}

impl GameState {
    pub fn from_account(account: &PlayerAccount, spin_history: Vec<SpinOutcome>) -> Self {
        Self {
            total_points: account.total_points,
            spins_today: account.spins_today,
            last_spin_date: account.last_spin_date,
            spin_history,
            highest_win: account.highest_win,
            jackpot_count: account.jackpot_count,
        }
    }
}
