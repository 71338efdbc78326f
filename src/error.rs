use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("market not found")]
    MarketNotFound,

    #[error("invalid outcome for market")]
    InvalidOutcome,

    #[error("order not found")]
    OrderNotFound,

    #[error("wallet not found")]
    WalletNotFound,

    #[error("market is not open")]
    MarketNotOpen,

    #[error("market is closed for betting")]
    MarketClosed,

    #[error("{0}")]
    InvalidState(String),

    #[error("forbidden")]
    Forbidden,

    #[error("{0}")]
    Validation(String),

    #[error("amount too low after fees")]
    AmountTooLow,

    #[error("slippage {actual_bps:.0} bps exceeds limit {max_bps} bps")]
    SlippageExceeded { actual_bps: f64, max_bps: u32 },

    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("invalid AMM liquidity state")]
    InvalidLiquidityState,

    #[error("invalid quote price")]
    InvalidQuotePrice,

    #[error("storage conflict after {0} retries")]
    StorageConflict(u32),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl IntoResponse for EngineError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            EngineError::MarketNotFound
            | EngineError::OrderNotFound
            | EngineError::WalletNotFound => StatusCode::NOT_FOUND,
            EngineError::Forbidden => StatusCode::FORBIDDEN,
            EngineError::InvalidState(_)
            | EngineError::MarketNotOpen
            | EngineError::MarketClosed
            | EngineError::SlippageExceeded { .. }
            | EngineError::StorageConflict(_) => StatusCode::CONFLICT,
            EngineError::InvalidOutcome
            | EngineError::Validation(_)
            | EngineError::AmountTooLow
            | EngineError::InsufficientBalance
            | EngineError::InvalidLiquidityState
            | EngineError::InvalidQuotePrice => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::Database(_)
            | EngineError::Migration(_)
            | EngineError::Config(_)
            | EngineError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
