use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

// ---------------------------------------------------------------------------
// Market
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketStatus {
    Open,
    Closed,
    Resolved,
    Cancelled,
}

impl std::fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MarketStatus::Open => "OPEN",
            MarketStatus::Closed => "CLOSED",
            MarketStatus::Resolved => "RESOLVED",
            MarketStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{s}")
    }
}

impl MarketStatus {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "OPEN" => Ok(MarketStatus::Open),
            "CLOSED" => Ok(MarketStatus::Closed),
            "RESOLVED" => Ok(MarketStatus::Resolved),
            "CANCELLED" => Ok(MarketStatus::Cancelled),
            other => Err(EngineError::Validation(format!(
                "invalid market status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketType {
    Binary,
    MultiChoice,
}

impl std::fmt::Display for MarketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MarketType::Binary => "BINARY",
            MarketType::MultiChoice => "MULTI_CHOICE",
        };
        write!(f, "{s}")
    }
}

impl MarketType {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "BINARY" => Ok(MarketType::Binary),
            "MULTI_CHOICE" => Ok(MarketType::MultiChoice),
            other => Err(EngineError::Validation(format!(
                "invalid market type: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Market {
    pub id: String,
    pub question: String,
    pub description: Option<String>,
    pub status: MarketStatus,
    pub market_type: MarketType,
    /// Epoch millis after which no more bets are accepted.
    pub betting_close_at: i64,
    pub resolve_at: Option<i64>,
    pub resolved_outcome_id: Option<String>,
    pub resolved_position: Option<Position>,
    pub created_by: String,
    pub created_at: i64,
    /// Sorted by position ascending.
    pub outcomes: Vec<Outcome>,
    pub amm_config: Option<AmmConfig>,
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeStatus {
    Active,
    Inactive,
    Resolved,
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OutcomeStatus::Active => "ACTIVE",
            OutcomeStatus::Inactive => "INACTIVE",
            OutcomeStatus::Resolved => "RESOLVED",
        };
        write!(f, "{s}")
    }
}

impl OutcomeStatus {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "ACTIVE" => Ok(OutcomeStatus::Active),
            "INACTIVE" => Ok(OutcomeStatus::Inactive),
            "RESOLVED" => Ok(OutcomeStatus::Resolved),
            other => Err(EngineError::Validation(format!(
                "invalid outcome status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub id: String,
    pub market_id: String,
    pub slug: String,
    pub label: String,
    /// Display / tie-break order, unique within a market.
    pub position: i64,
    pub status: OutcomeStatus,
    pub created_at: i64,
}

// ---------------------------------------------------------------------------
// AMM config & liquidity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AmmCurve {
    Cpmm,
    Lmsr,
}

impl std::fmt::Display for AmmCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AmmCurve::Cpmm => "CPMM",
            AmmCurve::Lmsr => "LMSR",
        };
        write!(f, "{s}")
    }
}

impl AmmCurve {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "CPMM" => Ok(AmmCurve::Cpmm),
            "LMSR" => Ok(AmmCurve::Lmsr),
            other => Err(EngineError::Validation(format!(
                "invalid AMM curve: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AmmConfig {
    pub id: String,
    pub market_id: String,
    pub curve: AmmCurve,
    /// Fee in basis points, 0..=1000.
    pub fee_bps: u32,
    /// Required positive when curve = LMSR; unused for CPMM.
    pub lmsr_b: Option<f64>,
    pub created_at: i64,
}

/// YES/NO reserves of one outcome's pool. Prices derive from the split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolState {
    pub yes_pool: f64,
    pub no_pool: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutcomeLiquidity {
    pub outcome_id: String,
    pub yes_pool: f64,
    pub no_pool: f64,
    pub updated_at: i64,
}

impl OutcomeLiquidity {
    pub fn pool(&self) -> PoolState {
        PoolState {
            yes_pool: self.yes_pool,
            no_pool: self.no_pool,
        }
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// Which side of an outcome a bet is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Position {
    Yes,
    No,
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Position::Yes => "YES",
            Position::No => "NO",
        };
        write!(f, "{s}")
    }
}

impl Position {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "YES" => Ok(Position::Yes),
            "NO" => Ok(Position::No),
            other => Err(EngineError::Validation(format!(
                "invalid position: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        };
        write!(f, "{s}")
    }
}

impl OrderSide {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "BUY" => Ok(OrderSide::Buy),
            "SELL" => Ok(OrderSide::Sell),
            other => Err(EngineError::Validation(format!(
                "invalid order side: {other}"
            ))),
        }
    }
}

/// FILLED means "settled at resolution", winner or loser alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Open,
    Filled,
    Cancelled,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Open => "OPEN",
            OrderStatus::Filled => "FILLED",
            OrderStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{s}")
    }
}

impl OrderStatus {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "OPEN" => Ok(OrderStatus::Open),
            "FILLED" => Ok(OrderStatus::Filled),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(EngineError::Validation(format!(
                "invalid order status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub market_id: String,
    pub outcome_id: String,
    pub position: Position,
    pub side: OrderSide,
    /// Per-share execution price at placement, 0 < price < 1.
    pub price: f64,
    /// Stake amount locked from the wallet.
    pub amount: f64,
    pub status: OrderStatus,
    pub created_at: i64,
}

// ---------------------------------------------------------------------------
// Wallet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Wallet {
    pub user_id: String,
    /// Spendable funds.
    pub balance: f64,
    /// Funds reserved against OPEN orders.
    pub locked: f64,
    pub created_at: i64,
}

// ---------------------------------------------------------------------------
// Quote
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct QuoteResult {
    pub market_id: String,
    pub outcome_id: String,
    pub position: Position,
    pub amount: f64,
    pub fee: f64,
    pub net_amount: f64,
    pub execution_price: f64,
    pub estimated_shares: f64,
    pub slippage_bps: f64,
}

// ---------------------------------------------------------------------------
// Market stats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct MarketStats {
    pub total_bets: i64,
    pub total_volume: f64,
    pub user_bets: i64,
    pub user_volume: f64,
}
