//! Wallet provisioning and lookup for the request layer.

use sqlx::SqlitePool;

use crate::config::STARTING_BALANCE;
use crate::db::{self, wallets};
use crate::error::{EngineError, Result};
use crate::types::Wallet;

pub async fn get_wallet(pool: &SqlitePool, user_id: &str) -> Result<Wallet> {
    let mut conn = pool.acquire().await?;
    wallets::find(&mut conn, user_id)
        .await?
        .ok_or(EngineError::WalletNotFound)
}

/// Idempotent: returns the existing wallet or creates one with the
/// starting balance.
pub async fn provision_wallet(pool: &SqlitePool, user_id: &str) -> Result<Wallet> {
    db::with_tx(pool, |conn| {
        let user_id = user_id.to_owned();
        Box::pin(async move { wallets::find_or_create(conn, &user_id, STARTING_BALANCE).await })
    })
    .await
}
