use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};

use crate::amm;
use crate::config::{DEFAULT_FEE_BPS, DEFAULT_OUTCOME_POOL};
use crate::db::{liquidity, markets, now_ms};
use crate::error::{EngineError, Result};
use crate::types::{MarketStatus, PoolState, Position, QuoteResult};

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteInput {
    pub market_id: String,
    pub outcome_id: String,
    pub position: Position,
    pub amount: f64,
}

/// Side-effect-free quote against the current pool state. Safe to call
/// repeatedly and concurrently.
pub async fn quote(pool: &SqlitePool, input: &QuoteInput) -> Result<QuoteResult> {
    let mut conn = pool.acquire().await?;
    quote_on(&mut conn, input).await
}

/// Quote on an explicit connection. Place-order calls this inside its
/// own transaction so the numbers it commits can never be stale.
pub async fn quote_on(conn: &mut SqliteConnection, input: &QuoteInput) -> Result<QuoteResult> {
    if input.amount <= 0.0 {
        return Err(EngineError::Validation(
            "amount must be greater than 0".to_string(),
        ));
    }

    let market = markets::find_by_id(&mut *conn, &input.market_id)
        .await?
        .ok_or(EngineError::MarketNotFound)?;

    if market.status != MarketStatus::Open {
        return Err(EngineError::MarketNotOpen);
    }
    if market.betting_close_at <= now_ms() {
        return Err(EngineError::MarketClosed);
    }

    markets::ensure_outcome_belongs(&mut *conn, &input.market_id, &input.outcome_id).await?;

    let fee_bps = market
        .amm_config
        .as_ref()
        .map(|c| c.fee_bps)
        .unwrap_or(DEFAULT_FEE_BPS);

    let fee = amm::fee(input.amount, fee_bps);
    let net_amount = input.amount - fee;
    if net_amount <= 0.0 {
        return Err(EngineError::AmountTooLow);
    }

    // A pool that was never traded quotes at the default seed.
    let before_pool = liquidity::find_liquidity(&mut *conn, &input.outcome_id)
        .await?
        .map(|l| l.pool())
        .unwrap_or(PoolState {
            yes_pool: DEFAULT_OUTCOME_POOL,
            no_pool: DEFAULT_OUTCOME_POOL,
        });

    let execution_price = amm::execution_price(before_pool, input.position)?;
    let after_pool = amm::apply_net_amount(before_pool, input.position, net_amount);
    let after_price = amm::execution_price(after_pool, input.position)?;
    let slippage_bps = amm::slippage_bps(execution_price, after_price)?;

    Ok(QuoteResult {
        market_id: input.market_id.clone(),
        outcome_id: input.outcome_id.clone(),
        position: input.position,
        amount: input.amount,
        fee,
        net_amount,
        execution_price,
        estimated_shares: net_amount / execution_price,
        slippage_bps,
    })
}
