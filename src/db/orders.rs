//! Order ledger: append-mostly rows whose only mutable field is status.

use sqlx::SqliteConnection;

use crate::db::models::OrderRow;
use crate::error::{EngineError, Result};
use crate::types::{MarketStats, Order, OrderStatus};

pub async fn insert(conn: &mut SqliteConnection, order: &Order) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO orders (
            id, user_id, market_id, outcome_id, position, side,
            price, amount, status, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&order.id)
    .bind(&order.user_id)
    .bind(&order.market_id)
    .bind(&order.outcome_id)
    .bind(order.position.to_string())
    .bind(order.side.to_string())
    .bind(order.price)
    .bind(order.amount)
    .bind(order.status.to_string())
    .bind(order.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: &str) -> Result<Option<Order>> {
    let row = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await?;

    row.map(OrderRow::into_domain).transpose()
}

pub async fn update_status(
    conn: &mut SqliteConnection,
    id: &str,
    status: OrderStatus,
) -> Result<Order> {
    let result = sqlx::query("UPDATE orders SET status = ? WHERE id = ?")
        .bind(status.to_string())
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(EngineError::OrderNotFound);
    }

    find_by_id(conn, id).await?.ok_or(EngineError::OrderNotFound)
}

/// Orders a market cancellation must refund: OPEN or FILLED.
pub async fn refundable_by_market(
    conn: &mut SqliteConnection,
    market_id: &str,
) -> Result<Vec<Order>> {
    let rows = sqlx::query_as::<_, OrderRow>(
        "SELECT * FROM orders WHERE market_id = ? AND status IN ('OPEN', 'FILLED')",
    )
    .bind(market_id)
    .fetch_all(conn)
    .await?;

    rows.into_iter().map(OrderRow::into_domain).collect()
}

/// Orders a resolution must settle: everything not already CANCELLED.
pub async fn settleable_by_market(
    conn: &mut SqliteConnection,
    market_id: &str,
) -> Result<Vec<Order>> {
    let rows = sqlx::query_as::<_, OrderRow>(
        "SELECT * FROM orders WHERE market_id = ? AND status != 'CANCELLED'",
    )
    .bind(market_id)
    .fetch_all(conn)
    .await?;

    rows.into_iter().map(OrderRow::into_domain).collect()
}

pub async fn find_by_user(conn: &mut SqliteConnection, user_id: &str) -> Result<Vec<Order>> {
    let rows = sqlx::query_as::<_, OrderRow>(
        "SELECT * FROM orders WHERE user_id = ? ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;

    rows.into_iter().map(OrderRow::into_domain).collect()
}

/// Bulk transition for market cancellation: OPEN|FILLED → CANCELLED.
pub async fn cancel_refundable(conn: &mut SqliteConnection, market_id: &str) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE orders SET status = 'CANCELLED' WHERE market_id = ? AND status IN ('OPEN', 'FILLED')",
    )
    .bind(market_id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// Bulk transition for resolution: every non-CANCELLED order → FILLED.
pub async fn fill_settleable(conn: &mut SqliteConnection, market_id: &str) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE orders SET status = 'FILLED' WHERE market_id = ? AND status != 'CANCELLED'",
    )
    .bind(market_id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

#[derive(Debug, sqlx::FromRow)]
struct StatsRow {
    bets: i64,
    volume: Option<f64>,
}

/// Bet count and summed stake over non-CANCELLED orders, whole market
/// plus one user's share.
pub async fn market_stats(
    conn: &mut SqliteConnection,
    market_id: &str,
    user_id: Option<&str>,
) -> Result<MarketStats> {
    let total = sqlx::query_as::<_, StatsRow>(
        r#"
        SELECT COUNT(*) AS bets, SUM(amount) AS volume
        FROM orders WHERE market_id = ? AND status != 'CANCELLED'
        "#,
    )
    .bind(market_id)
    .fetch_one(&mut *conn)
    .await?;

    let user = match user_id {
        Some(user_id) => {
            sqlx::query_as::<_, StatsRow>(
                r#"
                SELECT COUNT(*) AS bets, SUM(amount) AS volume
                FROM orders WHERE market_id = ? AND status != 'CANCELLED' AND user_id = ?
                "#,
            )
            .bind(market_id)
            .bind(user_id)
            .fetch_one(conn)
            .await?
        }
        None => StatsRow {
            bets: 0,
            volume: None,
        },
    };

    Ok(MarketStats {
        total_bets: total.bets,
        total_volume: total.volume.unwrap_or(0.0),
        user_bets: user.bets,
        user_volume: user.volume.unwrap_or(0.0),
    })
}
