//! AMM config and outcome liquidity pools.
//!
//! Pools are increment-only: placement adds stake to the bought side
//! and nothing in the engine ever shrinks them (order cancellation
//! deliberately leaves the pool shifted).

use sqlx::SqliteConnection;

use crate::config::DEFAULT_OUTCOME_POOL;
use crate::db::models::{AmmConfigRow, LiquidityRow};
use crate::db::now_ms;
use crate::error::Result;
use crate::types::{AmmConfig, OutcomeLiquidity, Position};

pub async fn find_config(
    conn: &mut SqliteConnection,
    market_id: &str,
) -> Result<Option<AmmConfig>> {
    let row = sqlx::query_as::<_, AmmConfigRow>("SELECT * FROM market_amm_config WHERE market_id = ?")
        .bind(market_id)
        .fetch_optional(conn)
        .await?;

    row.map(AmmConfigRow::into_domain).transpose()
}

pub async fn insert_config(conn: &mut SqliteConnection, config: &AmmConfig) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO market_amm_config (id, market_id, curve, fee_bps, lmsr_b, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&config.id)
    .bind(&config.market_id)
    .bind(config.curve.to_string())
    .bind(config.fee_bps as i64)
    .bind(config.lmsr_b)
    .bind(config.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn find_liquidity(
    conn: &mut SqliteConnection,
    outcome_id: &str,
) -> Result<Option<OutcomeLiquidity>> {
    let row = sqlx::query_as::<_, LiquidityRow>("SELECT * FROM outcome_liquidity WHERE outcome_id = ?")
        .bind(outcome_id)
        .fetch_optional(conn)
        .await?;

    Ok(row.map(LiquidityRow::into_domain))
}

/// Adds the net stake to the bought side. A missing row is created
/// seeded with the default pool on both sides, so the first buy leaves
/// the same state a quote against the defaults predicted.
pub async fn apply_buy(
    conn: &mut SqliteConnection,
    outcome_id: &str,
    position: Position,
    net_amount: f64,
) -> Result<()> {
    let (yes_delta, no_delta) = match position {
        Position::Yes => (net_amount, 0.0),
        Position::No => (0.0, net_amount),
    };
    let now = now_ms();

    sqlx::query(
        r#"
        INSERT INTO outcome_liquidity (outcome_id, yes_pool, no_pool, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(outcome_id) DO UPDATE SET
            yes_pool = yes_pool + ?,
            no_pool = no_pool + ?,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(outcome_id)
    .bind(DEFAULT_OUTCOME_POOL + yes_delta)
    .bind(DEFAULT_OUTCOME_POOL + no_delta)
    .bind(now)
    .bind(yes_delta)
    .bind(no_delta)
    .execute(conn)
    .await?;

    Ok(())
}
