//! Operator tool: dump one player's ledger or the leaderboard from a RocksDB directory.
//! The server must be stopped, RocksDB allows a single writer process.

use clap::Parser;
use luckyreels::{
    config::StorageConfig, storage::OptimizedStorage, GameMetrics, GameStore, LeaderboardRanker,
    RocksGameStore, WalletAddress,
};
use std::{path::Path, sync::Arc};

#[derive(Parser, Debug)]
#[command(name = "inspect-ledger")]
#[command(about = "Inspect LuckyReels player records", long_about = None)]
struct Args {
    /// Database directory
    #[arg(long, default_value = "./DB/luckyreels")]
    db_path: String,

    /// Show this wallet's account and recent spins instead of the leaderboard
    #[arg(long)]
    wallet: Option<String>,

    /// Rows to print
    #[arg(long, default_value = "20")]
    limit: usize,

    /// Recompute the leaderboard projection before printing it
    #[arg(long)]
    refresh: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if !Path::new(&args.db_path).exists() {
        println!("❌ No ledger data found at {}", args.db_path);
        return Ok(());
    }

    let storage = OptimizedStorage::new_with_config(&StorageConfig {
        data_directory: args.db_path.clone(),
        ..Default::default()
    })?;
    let store: Arc<dyn GameStore> = Arc::new(RocksGameStore::new(storage));

    println!("🔍 LuckyReels Ledger Inspector");
    println!("==============================");

    match args.wallet {
        Some(raw) => {
            let wallet = WalletAddress::parse(&raw).ok_or("wallet must be 0x followed by 40 hex characters")?;
            inspect_wallet(store.as_ref(), &wallet, args.limit).await?;
        }
        None => inspect_leaderboard(store, args.limit, args.refresh).await?,
    }

    Ok(())
}

async fn inspect_wallet(
    store: &dyn GameStore,
    wallet: &WalletAddress,
    limit: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(account) = store.load_account(wallet).await? else {
        println!("⚠️  No account for {}", wallet);
        return Ok(());
    };

    println!("👛 {}", account.wallet_address);
    println!("   Total points:   {}", account.total_points);
    println!("   Spins today:    {}", account.spins_today);
    println!(
        "   Last spin date: {}",
        account
            .last_spin_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "never".to_string())
    );
    println!("   Highest win:    {}", account.highest_win);
    println!("   Jackpots:       {}", account.jackpot_count);
    println!("   Created:        {}", account.created_at);
    println!("   Updated:        {}", account.updated_at);

    if let Some(rank) = store.leaderboard_rank(wallet).await? {
        println!("   Rank:           #{}", rank);
    }

    let spins = store.recent_spins(wallet, limit).await?;
    println!("\n🎰 Last {} spins:", spins.len());
    for spin in spins {
        let reels: Vec<&str> = spin.symbols.iter().map(|s| s.glyph()).collect();
        println!(
            "   {}  {}  +{:<4} {}{}",
            spin.created_at.format("%Y-%m-%d %H:%M:%S"),
            reels.join(" "),
            spin.points_earned,
            spin.match_type,
            if spin.signature.is_some() { "  (signed)" } else { "" }
        );
    }

    Ok(())
}

async fn inspect_leaderboard(
    store: Arc<dyn GameStore>,
    limit: usize,
    refresh: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let ranker = LeaderboardRanker::new(store.clone(), GameMetrics::new());
    if refresh {
        let ranked = ranker.refresh().await?;
        println!("🔄 Recomputed projection over {} accounts", ranked);
    }

    let total = store.leaderboard_size().await?;
    println!("🏆 Leaderboard ({} ranked)", total);
    for row in ranker.rank(limit, 0).await {
        println!(
            "   #{:<4} {}  {:>8} pts  {} jackpots",
            row.rank, row.address, row.points, row.jackpots
        );
    }

    Ok(())
}
