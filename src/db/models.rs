//! Database row types matching the schema in migrations/0001_init.sql.
//! Rows carry enums as TEXT; `into_domain` parses them into the typed
//! domain structs and rejects anything the schema should never hold.

use crate::error::Result;
use crate::types::{
    AmmConfig, AmmCurve, Market, MarketStatus, MarketType, Order, OrderSide, OrderStatus, Outcome,
    OutcomeLiquidity, OutcomeStatus, Position, Wallet,
};

#[derive(Debug, sqlx::FromRow)]
pub struct MarketRow {
    pub id: String,
    pub question: String,
    pub description: Option<String>,
    pub status: String,
    pub market_type: String,
    pub betting_close_at: i64,
    pub resolve_at: Option<i64>,
    pub resolved_outcome_id: Option<String>,
    pub resolved_position: Option<String>,
    pub created_by: String,
    pub created_at: i64,
}

impl MarketRow {
    pub fn into_domain(
        self,
        outcomes: Vec<Outcome>,
        amm_config: Option<AmmConfig>,
    ) -> Result<Market> {
        Ok(Market {
            status: MarketStatus::parse(&self.status)?,
            market_type: MarketType::parse(&self.market_type)?,
            resolved_position: self
                .resolved_position
                .as_deref()
                .map(Position::parse)
                .transpose()?,
            id: self.id,
            question: self.question,
            description: self.description,
            betting_close_at: self.betting_close_at,
            resolve_at: self.resolve_at,
            resolved_outcome_id: self.resolved_outcome_id,
            created_by: self.created_by,
            created_at: self.created_at,
            outcomes,
            amm_config,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct OutcomeRow {
    pub id: String,
    pub market_id: String,
    pub slug: String,
    pub label: String,
    pub position: i64,
    pub status: String,
    pub created_at: i64,
}

impl OutcomeRow {
    pub fn into_domain(self) -> Result<Outcome> {
        Ok(Outcome {
            status: OutcomeStatus::parse(&self.status)?,
            id: self.id,
            market_id: self.market_id,
            slug: self.slug,
            label: self.label,
            position: self.position,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct AmmConfigRow {
    pub id: String,
    pub market_id: String,
    pub curve: String,
    pub fee_bps: i64,
    pub lmsr_b: Option<f64>,
    pub created_at: i64,
}

impl AmmConfigRow {
    pub fn into_domain(self) -> Result<AmmConfig> {
        Ok(AmmConfig {
            curve: AmmCurve::parse(&self.curve)?,
            fee_bps: self.fee_bps as u32,
            id: self.id,
            market_id: self.market_id,
            lmsr_b: self.lmsr_b,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct LiquidityRow {
    pub outcome_id: String,
    pub yes_pool: f64,
    pub no_pool: f64,
    pub updated_at: i64,
}

impl LiquidityRow {
    pub fn into_domain(self) -> OutcomeLiquidity {
        OutcomeLiquidity {
            outcome_id: self.outcome_id,
            yes_pool: self.yes_pool,
            no_pool: self.no_pool,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct OrderRow {
    pub id: String,
    pub user_id: String,
    pub market_id: String,
    pub outcome_id: String,
    pub position: String,
    pub side: String,
    pub price: f64,
    pub amount: f64,
    pub status: String,
    pub created_at: i64,
}

impl OrderRow {
    pub fn into_domain(self) -> Result<Order> {
        Ok(Order {
            position: Position::parse(&self.position)?,
            side: OrderSide::parse(&self.side)?,
            status: OrderStatus::parse(&self.status)?,
            id: self.id,
            user_id: self.user_id,
            market_id: self.market_id,
            outcome_id: self.outcome_id,
            price: self.price,
            amount: self.amount,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct WalletRow {
    pub user_id: String,
    pub balance: f64,
    pub locked: f64,
    pub created_at: i64,
}

impl WalletRow {
    pub fn into_domain(self) -> Wallet {
        Wallet {
            user_id: self.user_id,
            balance: self.balance,
            locked: self.locked,
            created_at: self.created_at,
        }
    }
}
