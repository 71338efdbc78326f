use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

use crate::db::{self, liquidity, now_ms, orders, wallets};
use crate::engine::quote::{quote_on, QuoteInput};
use crate::error::{EngineError, Result};
use crate::types::{Order, OrderSide, OrderStatus, Position};

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderInput {
    pub user_id: String,
    pub market_id: String,
    pub outcome_id: String,
    pub position: Position,
    pub amount: f64,
    pub max_slippage_bps: Option<u32>,
}

/// Places a BUY order: re-quotes, checks the slippage cap, locks the
/// stake, shifts the pool and persists the order — one transaction,
/// all or nothing.
pub async fn place_order(pool: &SqlitePool, input: &PlaceOrderInput) -> Result<Order> {
    let order = db::with_tx(pool, |conn| {
        let input = input.clone();
        Box::pin(async move { place_order_tx(conn, &input).await })
    })
    .await?;

    info!(
        order_id = %order.id,
        market_id = %order.market_id,
        position = %order.position,
        amount = order.amount,
        price = order.price,
        "order placed"
    );

    Ok(order)
}

async fn place_order_tx(conn: &mut SqliteConnection, input: &PlaceOrderInput) -> Result<Order> {
    // Never trust a caller-supplied quote: price and slippage are
    // recomputed against the pool state this transaction sees.
    let quote = quote_on(
        &mut *conn,
        &QuoteInput {
            market_id: input.market_id.clone(),
            outcome_id: input.outcome_id.clone(),
            position: input.position,
            amount: input.amount,
        },
    )
    .await?;

    if let Some(max_bps) = input.max_slippage_bps {
        if quote.slippage_bps > max_bps as f64 {
            return Err(EngineError::SlippageExceeded {
                actual_bps: quote.slippage_bps,
                max_bps,
            });
        }
    }

    let wallet = wallets::find(&mut *conn, &input.user_id).await?;
    match wallet {
        Some(w) if w.balance >= input.amount => {}
        _ => return Err(EngineError::InsufficientBalance),
    }

    wallets::lock_funds(&mut *conn, &input.user_id, input.amount).await?;
    liquidity::apply_buy(&mut *conn, &input.outcome_id, input.position, quote.net_amount).await?;

    let order = Order {
        id: Uuid::new_v4().to_string(),
        user_id: input.user_id.clone(),
        market_id: input.market_id.clone(),
        outcome_id: input.outcome_id.clone(),
        position: input.position,
        side: OrderSide::Buy,
        price: quote.execution_price,
        amount: input.amount,
        status: OrderStatus::Open,
        created_at: now_ms(),
    };
    orders::insert(conn, &order).await?;

    Ok(order)
}

/// Cancels an OPEN order and releases its stake. The pool shift from
/// placement stays in place.
pub async fn cancel_order(pool: &SqlitePool, order_id: &str, user_id: &str) -> Result<Order> {
    let order = db::with_tx(pool, |conn| {
        let order_id = order_id.to_owned();
        let user_id = user_id.to_owned();
        Box::pin(async move { cancel_order_tx(conn, &order_id, &user_id).await })
    })
    .await?;

    info!(order_id = %order.id, user_id = %order.user_id, "order cancelled");

    Ok(order)
}

async fn cancel_order_tx(
    conn: &mut SqliteConnection,
    order_id: &str,
    user_id: &str,
) -> Result<Order> {
    let order = orders::find_by_id(&mut *conn, order_id)
        .await?
        .ok_or(EngineError::OrderNotFound)?;

    if order.user_id != user_id {
        return Err(EngineError::Forbidden);
    }
    if order.status != OrderStatus::Open {
        return Err(EngineError::InvalidState(
            "only OPEN orders can be cancelled".to_string(),
        ));
    }

    wallets::unlock_funds(&mut *conn, &order.user_id, order.amount).await?;
    orders::update_status(conn, &order.id, OrderStatus::Cancelled).await
}

/// A user's order history, newest first.
pub async fn list_user_orders(pool: &SqlitePool, user_id: &str) -> Result<Vec<Order>> {
    let mut conn = pool.acquire().await?;
    orders::find_by_user(&mut conn, user_id).await
}
