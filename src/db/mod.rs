pub mod liquidity;
pub mod markets;
pub mod models;
pub mod orders;
pub mod wallets;

use std::time::{SystemTime, UNIX_EPOCH};

use futures_util::future::BoxFuture;
use sqlx::{SqliteConnection, SqlitePool};

use crate::config::TX_MAX_RETRIES;
use crate::error::{EngineError, Result};

/// Current epoch millis — all persisted timestamps use this clock.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// SQLITE_BUSY and friends — the one error class worth re-running the
/// whole transaction for.
fn is_busy(err: &EngineError) -> bool {
    match err {
        EngineError::Database(sqlx::Error::Database(db)) => {
            matches!(db.code().as_deref(), Some("5") | Some("261") | Some("517"))
                || db.message().contains("database is locked")
        }
        _ => false,
    }
}

/// Runs `op` inside a single transaction: every read and write of one
/// engine operation goes through the same `SqliteConnection`, so the
/// quote-then-mutate sequence can never interleave with a concurrent
/// writer. Commits on success, rolls back on error, retries busy
/// conflicts a bounded number of times before surfacing StorageConflict.
pub async fn with_tx<T, F>(pool: &SqlitePool, op: F) -> Result<T>
where
    F: for<'c> Fn(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        let mut tx = pool.begin().await?;
        let result = op(&mut tx).await;
        match result {
            Ok(value) => {
                tx.commit().await?;
                return Ok(value);
            }
            Err(err) => {
                tx.rollback().await.ok();
                if is_busy(&err) {
                    if attempt < TX_MAX_RETRIES {
                        attempt += 1;
                        continue;
                    }
                    return Err(EngineError::StorageConflict(TX_MAX_RETRIES));
                }
                return Err(err);
            }
        }
    }
}
