//! Configuration management with validation and defaults
//!
//! Settings load from an optional TOML file, then environment variables
//! override individual fields, then the result is validated.

use crate::errors::{ConfigurationError, LuckyResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Deployment environment, mirrors `APP_ENV` / `NODE_ENV`
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl std::str::FromStr for Environment {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ConfigurationError::InvalidValue {
                field: "environment".to_string(),
                value: other.to_string(),
                reason: "expected 'development' or 'production'".to_string(),
            }),
        }
    }
}

/// Top-level server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LuckyConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub game: GameConfig,
    pub rate_limit: RateLimitConfig,
}

impl Default for LuckyConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            game: GameConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// HTTP listener configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    /// Deployed frontend origin, added to the CORS allow-list
    pub frontend_url: Option<String>,
    /// Extra CORS origins; `*` allows everything
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            request_timeout_secs: 30,
            frontend_url: None,
            allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:5174".to_string(),
                "http://127.0.0.1:5173".to_string(),
                "http://127.0.0.1:5174".to_string(),
            ],
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Persistent RocksDB database
    RocksDb,
    /// Process-local store, lost on restart (development only)
    Memory,
}

/// Storage configuration with RocksDB tuning
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_directory: String,
    pub write_buffer_size_mb: usize,
    pub max_write_buffer_number: i32,
    pub compression_type: CompressionType,
    /// Whether to clear database on startup (testing only!)
    pub clear_on_start: bool,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub enum CompressionType {
    None,
    Snappy,
    Lz4,
    Zstd,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::RocksDb,
            data_directory: "./DB/luckyreels".to_string(),
            write_buffer_size_mb: 64,
            max_write_buffer_number: 4,
            compression_type: CompressionType::Lz4,
            clear_on_start: false,
        }
    }
}

/// Gameplay limits
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameConfig {
    /// Number of history rows surfaced to the owner
    pub history_limit: usize,
    pub leaderboard_default_limit: usize,
    pub leaderboard_max_limit: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            history_limit: 50,
            leaderboard_default_limit: 50,
            leaderboard_max_limit: 100,
        }
    }
}

/// Request shaping at the API edge
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub api_window_secs: u64,
    pub api_max_requests_production: u32,
    pub api_max_requests_development: u32,
    pub spin_window_secs: u64,
    pub spin_max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            api_window_secs: 60,
            api_max_requests_production: 100,
            api_max_requests_development: 1000,
            spin_window_secs: 5,
            spin_max_requests: 1,
        }
    }
}

impl RateLimitConfig {
    pub fn api_max_requests(&self, environment: Environment) -> u32 {
        match environment {
            Environment::Production => self.api_max_requests_production,
            Environment::Development => self.api_max_requests_development,
        }
    }

    pub fn api_window(&self) -> Duration {
        Duration::from_secs(self.api_window_secs)
    }

    pub fn spin_window(&self) -> Duration {
        Duration::from_secs(self.spin_window_secs)
    }
}

impl LuckyConfig {
    /// Internal error details are only shown to callers outside production
    pub fn expose_error_details(&self) -> bool {
        self.environment == Environment::Development
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Origins accepted by the CORS layer
    pub fn cors_origins(&self) -> Vec<String> {
        if self.environment == Environment::Development {
            return vec!["*".to_string()];
        }
        let mut origins = self.server.allowed_origins.clone();
        if let Some(url) = &self.server.frontend_url {
            origins.push(url.clone());
        }
        origins
    }
}

/// Configuration loader with environment variable support
#[derive(Default)]
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> LuckyResult<LuckyConfig> {
        let mut config = if let Some(ref path) = self.config_path {
            self.load_from_file(path)?
        } else {
            LuckyConfig::default()
        };

        self.apply_env_overrides(&mut config)?;
        self.validate(&config)?;

        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> LuckyResult<LuckyConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into())
    }

    fn apply_env_overrides(&self, config: &mut LuckyConfig) -> LuckyResult<()> {
        if let Some(value) = env::var("LUCKYREELS_ENV").ok().or_else(|| env::var("APP_ENV").ok()) {
            config.environment = value.parse()?;
        }
        if let Ok(host) = env::var("LUCKYREELS_HOST") {
            config.server.host = host;
        }
        if let Some(port) = env::var("LUCKYREELS_PORT").ok().or_else(|| env::var("PORT").ok()) {
            config.server.port = port.parse().map_err(|_| ConfigurationError::InvalidValue {
                field: "PORT".to_string(),
                value: port,
                reason: "Invalid port number".to_string(),
            })?;
        }
        if let Ok(url) = env::var("FRONTEND_URL") {
            config.server.frontend_url = Some(url);
        }
        if let Some(path) = env::var("LUCKYREELS_DATA_DIR")
            .ok()
            .or_else(|| env::var("DATABASE_PATH").ok())
        {
            config.storage.data_directory = path;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self, config: &LuckyConfig) -> LuckyResult<()> {
        if config.server.port == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "server.port".to_string(),
                value: "0".to_string(),
                reason: "Port cannot be zero".to_string(),
            }
            .into());
        }

        if config.storage.backend == StorageBackend::RocksDb && config.storage.data_directory.is_empty() {
            return Err(ConfigurationError::MissingRequired("storage.data_directory".to_string()).into());
        }

        if config.game.history_limit == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "game.history_limit".to_string(),
                value: "0".to_string(),
                reason: "History limit must be at least 1".to_string(),
            }
            .into());
        }

        let game = &config.game;
        if game.leaderboard_default_limit == 0 || game.leaderboard_default_limit > game.leaderboard_max_limit {
            return Err(ConfigurationError::InvalidValue {
                field: "game.leaderboard_default_limit".to_string(),
                value: game.leaderboard_default_limit.to_string(),
                reason: format!("Must be between 1 and {}", game.leaderboard_max_limit),
            }
            .into());
        }

        if config.rate_limit.spin_max_requests == 0 || config.rate_limit.spin_window_secs == 0 {
            return Err(ConfigurationError::ValidationFailed(
                "rate_limit.spin_* must allow at least one spin per non-empty window".to_string(),
            )
            .into());
        }

        if config.rate_limit.api_max_requests(config.environment) == 0 || config.rate_limit.api_window_secs == 0 {
            return Err(ConfigurationError::ValidationFailed(
                "rate_limit.api_* must allow at least one request per non-empty window".to_string(),
            )
            .into());
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, config: &LuckyConfig, path: &str) -> LuckyResult<()> {
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path, e)).into())
    }
}

/// Generate a sample configuration file
pub fn generate_sample_config(path: &str) -> LuckyResult<()> {
    ConfigLoader::new().save(&LuckyConfig::default(), path)
}
