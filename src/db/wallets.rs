//! Wallet ledger. Balance/locked moves are paired signed deltas so a
//! lock, an unlock, and a resolution payout are all the same update.

use sqlx::SqliteConnection;

use crate::db::models::WalletRow;
use crate::db::now_ms;
use crate::error::{EngineError, Result};
use crate::types::Wallet;

pub async fn find(conn: &mut SqliteConnection, user_id: &str) -> Result<Option<Wallet>> {
    let row = sqlx::query_as::<_, WalletRow>("SELECT * FROM wallets WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(conn)
        .await?;

    Ok(row.map(WalletRow::into_domain))
}

pub async fn create(
    conn: &mut SqliteConnection,
    user_id: &str,
    starting_balance: f64,
) -> Result<Wallet> {
    let wallet = Wallet {
        user_id: user_id.to_string(),
        balance: starting_balance,
        locked: 0.0,
        created_at: now_ms(),
    };

    sqlx::query("INSERT INTO wallets (user_id, balance, locked, created_at) VALUES (?, ?, ?, ?)")
        .bind(&wallet.user_id)
        .bind(wallet.balance)
        .bind(wallet.locked)
        .bind(wallet.created_at)
        .execute(conn)
        .await?;

    Ok(wallet)
}

pub async fn find_or_create(
    conn: &mut SqliteConnection,
    user_id: &str,
    starting_balance: f64,
) -> Result<Wallet> {
    if let Some(wallet) = find(&mut *conn, user_id).await? {
        return Ok(wallet);
    }
    create(conn, user_id, starting_balance).await
}

/// Applies signed deltas to both columns atomically and returns the
/// updated wallet. Fails with WalletNotFound if no row was touched.
pub async fn apply_delta(
    conn: &mut SqliteConnection,
    user_id: &str,
    balance_delta: f64,
    locked_delta: f64,
) -> Result<Wallet> {
    let result = sqlx::query("UPDATE wallets SET balance = balance + ?, locked = locked + ? WHERE user_id = ?")
        .bind(balance_delta)
        .bind(locked_delta)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(EngineError::WalletNotFound);
    }

    find(conn, user_id)
        .await?
        .ok_or(EngineError::WalletNotFound)
}

/// Reserve stake against an order: spendable down, locked up.
pub async fn lock_funds(conn: &mut SqliteConnection, user_id: &str, amount: f64) -> Result<Wallet> {
    apply_delta(conn, user_id, -amount, amount).await
}

/// Release reserved stake back to spendable.
pub async fn unlock_funds(
    conn: &mut SqliteConnection,
    user_id: &str,
    amount: f64,
) -> Result<Wallet> {
    apply_delta(conn, user_id, amount, -amount).await
}
