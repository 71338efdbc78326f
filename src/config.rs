use crate::error::{EngineError, Result};

/// Default liquidity seeded on each side of a lazily created outcome pool.
pub const DEFAULT_OUTCOME_POOL: f64 = 2000.0;

/// Fee applied when a market carries no AMM config (basis points).
pub const DEFAULT_FEE_BPS: u32 = 100;

/// Upper bound for a configured fee (basis points).
pub const MAX_FEE_BPS: u32 = 1000;

/// Slippage cap substituted by the HTTP layer when the caller omits one.
/// 2000 bps = 20%.
pub const DEFAULT_MAX_SLIPPAGE_BPS: u32 = 2000;

/// Balance granted to a freshly provisioned wallet (play money).
pub const STARTING_BALANCE: f64 = 1000.0;

/// How many times a transaction is re-run on SQLITE_BUSY before the
/// operation surfaces a StorageConflict.
pub const TX_MAX_RETRIES: u32 = 3;

/// SQLite busy timeout (milliseconds) before a lock attempt errors out.
pub const DB_BUSY_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub log_level: String,
    pub api_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "engine.db".to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| {
                    EngineError::Config("API_PORT must be a valid port number".to_string())
                })?,
        })
    }
}
