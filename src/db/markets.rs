//! Market + outcome repository. Every function takes the caller's
//! connection so it participates in whatever transaction is in flight.

use sqlx::SqliteConnection;

use crate::db::models::{MarketRow, OutcomeRow};
use crate::error::{EngineError, Result};
use crate::types::{Market, MarketStatus, Outcome, Position};

pub async fn insert(conn: &mut SqliteConnection, market: &Market) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO markets (
            id, question, description, status, market_type,
            betting_close_at, resolve_at, resolved_outcome_id, resolved_position,
            created_by, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&market.id)
    .bind(&market.question)
    .bind(&market.description)
    .bind(market.status.to_string())
    .bind(market.market_type.to_string())
    .bind(market.betting_close_at)
    .bind(market.resolve_at)
    .bind(&market.resolved_outcome_id)
    .bind(market.resolved_position.map(|p| p.to_string()))
    .bind(&market.created_by)
    .bind(market.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn insert_outcome(conn: &mut SqliteConnection, outcome: &Outcome) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO outcomes (id, market_id, slug, label, position, status, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&outcome.id)
    .bind(&outcome.market_id)
    .bind(&outcome.slug)
    .bind(&outcome.label)
    .bind(outcome.position)
    .bind(outcome.status.to_string())
    .bind(outcome.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Loads a market with its outcomes (position order) and AMM config.
pub async fn find_by_id(conn: &mut SqliteConnection, id: &str) -> Result<Option<Market>> {
    let row = sqlx::query_as::<_, MarketRow>("SELECT * FROM markets WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let outcomes = outcomes_by_market(&mut *conn, id).await?;
    let amm_config = crate::db::liquidity::find_config(&mut *conn, id).await?;

    Ok(Some(row.into_domain(outcomes, amm_config)?))
}

/// Newest first. Outcomes and config are not loaded for listings.
pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Market>> {
    let rows = sqlx::query_as::<_, MarketRow>("SELECT * FROM markets ORDER BY created_at DESC")
        .fetch_all(conn)
        .await?;

    rows.into_iter()
        .map(|r| r.into_domain(Vec::new(), None))
        .collect()
}

pub async fn outcomes_by_market(
    conn: &mut SqliteConnection,
    market_id: &str,
) -> Result<Vec<Outcome>> {
    let rows = sqlx::query_as::<_, OutcomeRow>(
        "SELECT * FROM outcomes WHERE market_id = ? ORDER BY position ASC",
    )
    .bind(market_id)
    .fetch_all(conn)
    .await?;

    rows.into_iter().map(OutcomeRow::into_domain).collect()
}

/// Fails with InvalidOutcome unless the outcome exists under the market.
pub async fn ensure_outcome_belongs(
    conn: &mut SqliteConnection,
    market_id: &str,
    outcome_id: &str,
) -> Result<Outcome> {
    let row =
        sqlx::query_as::<_, OutcomeRow>("SELECT * FROM outcomes WHERE id = ? AND market_id = ?")
            .bind(outcome_id)
            .bind(market_id)
            .fetch_optional(conn)
            .await?;

    row.ok_or(EngineError::InvalidOutcome)?.into_domain()
}

pub async fn update_status(
    conn: &mut SqliteConnection,
    id: &str,
    status: MarketStatus,
) -> Result<()> {
    sqlx::query("UPDATE markets SET status = ? WHERE id = ?")
        .bind(status.to_string())
        .bind(id)
        .execute(conn)
        .await?;

    Ok(())
}

/// Records the winning outcome/position alongside the RESOLVED status.
pub async fn mark_resolved(
    conn: &mut SqliteConnection,
    id: &str,
    outcome_id: &str,
    position: Position,
    resolve_at: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE markets
        SET status = 'RESOLVED', resolved_outcome_id = ?, resolved_position = ?, resolve_at = ?
        WHERE id = ?
        "#,
    )
    .bind(outcome_id)
    .bind(position.to_string())
    .bind(resolve_at)
    .bind(id)
    .execute(conn)
    .await?;

    Ok(())
}
