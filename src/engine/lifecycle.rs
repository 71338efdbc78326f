//! Market lifecycle state machine: OPEN → CLOSED → RESOLVED, with
//! OPEN|CLOSED → CANCELLED as the no-fault unwind. RESOLVED and
//! CANCELLED are terminal. Cancel and resolve settle every outstanding
//! order in the same transaction that flips the market status.

use std::collections::BTreeMap;

use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::db::{self, markets, now_ms, orders, wallets};
use crate::error::{EngineError, Result};
use crate::types::{Market, MarketStatus, Position};

/// OPEN → CLOSED. No fund movement.
pub async fn close_market(pool: &SqlitePool, market_id: &str) -> Result<Market> {
    let market = db::with_tx(pool, |conn| {
        let market_id = market_id.to_owned();
        Box::pin(async move { close_market_tx(conn, &market_id).await })
    })
    .await?;

    info!(market_id = %market.id, "market closed");

    Ok(market)
}

async fn close_market_tx(conn: &mut SqliteConnection, market_id: &str) -> Result<Market> {
    let market = markets::find_by_id(&mut *conn, market_id)
        .await?
        .ok_or(EngineError::MarketNotFound)?;

    if market.status != MarketStatus::Open {
        return Err(EngineError::InvalidState(
            "only OPEN markets can be closed".to_string(),
        ));
    }

    markets::update_status(&mut *conn, market_id, MarketStatus::Closed).await?;

    markets::find_by_id(conn, market_id)
        .await?
        .ok_or(EngineError::MarketNotFound)
}

/// OPEN|CLOSED → CANCELLED. Refunds every OPEN or FILLED order's stake
/// in full and cancels the orders — a complete no-fault unwind.
pub async fn cancel_market(pool: &SqlitePool, market_id: &str) -> Result<Market> {
    let market = db::with_tx(pool, |conn| {
        let market_id = market_id.to_owned();
        Box::pin(async move { cancel_market_tx(conn, &market_id).await })
    })
    .await?;

    info!(market_id = %market.id, "market cancelled, all stakes refunded");

    Ok(market)
}

async fn cancel_market_tx(conn: &mut SqliteConnection, market_id: &str) -> Result<Market> {
    let market = markets::find_by_id(&mut *conn, market_id)
        .await?
        .ok_or(EngineError::MarketNotFound)?;

    if market.status != MarketStatus::Open && market.status != MarketStatus::Closed {
        return Err(EngineError::InvalidState(
            "only OPEN or CLOSED markets can be cancelled".to_string(),
        ));
    }

    // One wallet update per user, not one per order.
    let mut refunds: BTreeMap<String, f64> = BTreeMap::new();
    for order in orders::refundable_by_market(&mut *conn, market_id).await? {
        *refunds.entry(order.user_id).or_insert(0.0) += order.amount;
    }

    for (user_id, amount) in &refunds {
        if *amount > 0.0 {
            wallets::unlock_funds(&mut *conn, user_id, *amount).await?;
        }
    }

    orders::cancel_refundable(&mut *conn, market_id).await?;
    markets::update_status(&mut *conn, market_id, MarketStatus::Cancelled).await?;

    markets::find_by_id(conn, market_id)
        .await?
        .ok_or(EngineError::MarketNotFound)
}

#[derive(Debug, Default)]
struct Settlement {
    /// Total stake to release from `locked`.
    locked: f64,
    /// Winning shares redeemed at 1 per share, credited to `balance`.
    payout: f64,
}

/// CLOSED → RESOLVED. Every non-CANCELLED order is settled: stakes are
/// unlocked for winners and losers alike, and orders on the winning
/// (outcome, position) pair pay out `amount / price` shares. Losers'
/// stakes are forfeited — released from `locked` with no balance
/// credit. Double resolution is rejected by the CLOSED-only
/// precondition.
pub async fn resolve_market(
    pool: &SqlitePool,
    market_id: &str,
    outcome_id: &str,
    position: Position,
) -> Result<Market> {
    let market = db::with_tx(pool, |conn| {
        let market_id = market_id.to_owned();
        let outcome_id = outcome_id.to_owned();
        Box::pin(async move { resolve_market_tx(conn, &market_id, &outcome_id, position).await })
    })
    .await?;

    info!(
        market_id = %market.id,
        outcome_id,
        position = %position,
        "market resolved"
    );

    Ok(market)
}

async fn resolve_market_tx(
    conn: &mut SqliteConnection,
    market_id: &str,
    outcome_id: &str,
    position: Position,
) -> Result<Market> {
    let market = markets::find_by_id(&mut *conn, market_id)
        .await?
        .ok_or(EngineError::MarketNotFound)?;

    if market.status != MarketStatus::Closed {
        return Err(EngineError::InvalidState(
            "only CLOSED markets can be resolved".to_string(),
        ));
    }

    markets::ensure_outcome_belongs(&mut *conn, market_id, outcome_id).await?;

    let mut settlements: BTreeMap<String, Settlement> = BTreeMap::new();
    for order in orders::settleable_by_market(&mut *conn, market_id).await? {
        let entry = settlements.entry(order.user_id.clone()).or_default();
        entry.locked += order.amount;

        if order.outcome_id == outcome_id && order.position == position {
            // Redemption value is 1 per share; price was fixed at placement.
            entry.payout += order.amount / order.price;
        }
    }

    for (user_id, totals) in &settlements {
        if totals.locked > 0.0 || totals.payout > 0.0 {
            wallets::apply_delta(&mut *conn, user_id, totals.payout, -totals.locked).await?;
        }
    }

    orders::fill_settleable(&mut *conn, market_id).await?;
    markets::mark_resolved(&mut *conn, market_id, outcome_id, position, now_ms()).await?;

    markets::find_by_id(conn, market_id)
        .await?
        .ok_or(EngineError::MarketNotFound)
}
