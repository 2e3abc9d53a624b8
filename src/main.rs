//! LuckyReels API Server Binary

use clap::Parser;
use luckyreels::{
    api::{init_tracing, ApiServer},
    config::{generate_sample_config, StorageBackend},
    open_game_store, ConfigLoader,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "luckyreels-api")]
#[command(about = "LuckyReels slot machine API server", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// API server host
    #[arg(long)]
    host: Option<String>,

    /// API server port
    #[arg(long)]
    port: Option<u16>,

    /// Database directory
    #[arg(long)]
    db_path: Option<String>,

    /// Keep all state in memory (development only)
    #[arg(long)]
    memory: bool,

    /// Write a sample configuration file and exit
    #[arg(long, value_name = "PATH")]
    generate_config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if let Some(path) = args.generate_config {
        generate_sample_config(&path)?;
        println!("✅ Sample configuration written to {}", path);
        return Ok(());
    }

    init_tracing();

    let loader = match &args.config {
        Some(path) => ConfigLoader::new().with_path(path),
        None => ConfigLoader::new(),
    };
    let mut config = loader.load()?;

    // CLI flags win over file and environment
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(db_path) = args.db_path {
        config.storage.data_directory = db_path;
    }
    if args.memory {
        config.storage.backend = StorageBackend::Memory;
    }
    loader.validate(&config)?;

    info!(environment = ?config.environment, "📂 Opening game store");
    let store = open_game_store(&config.storage)?;

    ApiServer::new(config, store).run().await?;
    Ok(())
}
