//! End-to-end settlement tests against an in-memory SQLite database.

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use predmarket_engine::db;
use predmarket_engine::engine::lifecycle::{cancel_market, close_market, resolve_market};
use predmarket_engine::engine::markets::{
    create_market, market_stats, CreateAmmConfigInput, CreateMarketInput, CreateOutcomeInput,
};
use predmarket_engine::engine::orders::{cancel_order, place_order, PlaceOrderInput};
use predmarket_engine::engine::quote::{quote, QuoteInput};
use predmarket_engine::engine::wallets::provision_wallet;
use predmarket_engine::error::EngineError;
use predmarket_engine::types::{Market, MarketStatus, OrderStatus, Position};

const EPS: f64 = 1e-9;

async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");
    pool
}

async fn make_market(pool: &SqlitePool, fee_bps: u32) -> Market {
    let input = CreateMarketInput {
        question: "Will it rain tomorrow?".to_string(),
        description: None,
        betting_close_at: db::now_ms() + 86_400_000,
        created_by: "admin".to_string(),
        market_type: None,
        outcomes: Some(vec![
            CreateOutcomeInput {
                slug: "rain".to_string(),
                label: "Rain".to_string(),
                position: Some(0),
                status: None,
            },
            CreateOutcomeInput {
                slug: "dry".to_string(),
                label: "Dry".to_string(),
                position: Some(1),
                status: None,
            },
        ]),
        amm_config: Some(CreateAmmConfigInput {
            curve: None,
            fee_bps: Some(fee_bps),
            lmsr_b: None,
        }),
    };
    create_market(pool, &input).await.expect("create market")
}

fn quote_input(market: &Market, outcome_idx: usize, position: Position, amount: f64) -> QuoteInput {
    QuoteInput {
        market_id: market.id.clone(),
        outcome_id: market.outcomes[outcome_idx].id.clone(),
        position,
        amount,
    }
}

fn order_input(
    market: &Market,
    user_id: &str,
    outcome_idx: usize,
    position: Position,
    amount: f64,
) -> PlaceOrderInput {
    PlaceOrderInput {
        user_id: user_id.to_string(),
        market_id: market.id.clone(),
        outcome_id: market.outcomes[outcome_idx].id.clone(),
        position,
        amount,
        max_slippage_bps: None,
    }
}

// ---------------------------------------------------------------------------
// Quote
// ---------------------------------------------------------------------------

#[tokio::test]
async fn quote_matches_reference_scenario() {
    let pool = test_pool().await;
    let market = make_market(&pool, 100).await;

    let q = quote(&pool, &quote_input(&market, 0, Position::Yes, 100.0))
        .await
        .unwrap();

    assert!((q.fee - 1.0).abs() < EPS);
    assert!((q.net_amount - 99.0).abs() < EPS);
    assert!((q.execution_price - 0.5).abs() < EPS);
    assert!((q.estimated_shares - 198.0).abs() < EPS);
    let expected_slippage = (2099.0 / 4099.0 - 0.5) / 0.5 * 10_000.0;
    assert!((q.slippage_bps - expected_slippage).abs() < EPS);
}

#[tokio::test]
async fn quote_rejects_bad_input() {
    let pool = test_pool().await;
    let market = make_market(&pool, 100).await;

    let err = quote(&pool, &quote_input(&market, 0, Position::Yes, 0.0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = quote(
        &pool,
        &QuoteInput {
            market_id: "nope".to_string(),
            outcome_id: market.outcomes[0].id.clone(),
            position: Position::Yes,
            amount: 10.0,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, EngineError::MarketNotFound));

    // Outcome from a different market is not a valid target.
    let other = make_market(&pool, 100).await;
    let err = quote(
        &pool,
        &QuoteInput {
            market_id: market.id.clone(),
            outcome_id: other.outcomes[0].id.clone(),
            position: Position::Yes,
            amount: 10.0,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, EngineError::InvalidOutcome));
}

#[tokio::test]
async fn quote_rejects_expired_betting_window() {
    let pool = test_pool().await;
    let market = make_market(&pool, 100).await;

    sqlx::query("UPDATE markets SET betting_close_at = ? WHERE id = ?")
        .bind(db::now_ms() - 1000)
        .bind(&market.id)
        .execute(&pool)
        .await
        .unwrap();

    let err = quote(&pool, &quote_input(&market, 0, Position::Yes, 10.0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::MarketClosed));
}

// ---------------------------------------------------------------------------
// Place order
// ---------------------------------------------------------------------------

#[tokio::test]
async fn place_order_locks_stake_and_shifts_pool() {
    let pool = test_pool().await;
    let market = make_market(&pool, 100).await;
    provision_wallet(&pool, "alice").await.unwrap();

    let order = place_order(&pool, &order_input(&market, "alice", 0, Position::Yes, 100.0))
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Open);
    assert!((order.price - 0.5).abs() < EPS);

    let wallet = predmarket_engine::engine::wallets::get_wallet(&pool, "alice")
        .await
        .unwrap();
    assert!((wallet.balance - 900.0).abs() < EPS);
    assert!((wallet.locked - 100.0).abs() < EPS);
    // balance + locked is conserved by placement.
    assert!((wallet.balance + wallet.locked - 1000.0).abs() < EPS);

    // Bought side grew by exactly the net amount over the default seed.
    let mut conn = pool.acquire().await.unwrap();
    let liq = db::liquidity::find_liquidity(&mut conn, &market.outcomes[0].id)
        .await
        .unwrap()
        .expect("liquidity row created on first buy");
    assert!((liq.yes_pool - 2099.0).abs() < EPS);
    assert!((liq.no_pool - 2000.0).abs() < EPS);
}

#[tokio::test]
async fn place_order_rejects_insufficient_balance() {
    let pool = test_pool().await;
    let market = make_market(&pool, 100).await;
    provision_wallet(&pool, "alice").await.unwrap();

    let err = place_order(&pool, &order_input(&market, "alice", 0, Position::Yes, 5000.0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientBalance));

    // Nothing moved.
    let wallet = predmarket_engine::engine::wallets::get_wallet(&pool, "alice")
        .await
        .unwrap();
    assert!((wallet.balance - 1000.0).abs() < EPS);
    assert!((wallet.locked).abs() < EPS);

    let mut conn = pool.acquire().await.unwrap();
    let liq = db::liquidity::find_liquidity(&mut conn, &market.outcomes[0].id)
        .await
        .unwrap();
    assert!(liq.is_none());
}

#[tokio::test]
async fn place_order_rejects_excess_slippage_without_mutation() {
    let pool = test_pool().await;
    let market = make_market(&pool, 100).await;
    provision_wallet(&pool, "alice").await.unwrap();

    let mut input = order_input(&market, "alice", 0, Position::Yes, 100.0);
    input.max_slippage_bps = Some(100); // actual is roughly 241 bps

    let err = place_order(&pool, &input).await.unwrap_err();
    assert!(matches!(err, EngineError::SlippageExceeded { .. }));

    let wallet = predmarket_engine::engine::wallets::get_wallet(&pool, "alice")
        .await
        .unwrap();
    assert!((wallet.balance - 1000.0).abs() < EPS);

    let mut conn = pool.acquire().await.unwrap();
    assert!(db::liquidity::find_liquidity(&mut conn, &market.outcomes[0].id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn place_order_rejects_closed_market() {
    let pool = test_pool().await;
    let market = make_market(&pool, 100).await;
    provision_wallet(&pool, "alice").await.unwrap();

    close_market(&pool, &market.id).await.unwrap();

    let err = place_order(&pool, &order_input(&market, "alice", 0, Position::Yes, 50.0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::MarketNotOpen));
}

// ---------------------------------------------------------------------------
// Cancel order
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancel_order_restores_funds_once() {
    let pool = test_pool().await;
    let market = make_market(&pool, 100).await;
    provision_wallet(&pool, "alice").await.unwrap();

    let order = place_order(&pool, &order_input(&market, "alice", 0, Position::Yes, 100.0))
        .await
        .unwrap();

    let cancelled = cancel_order(&pool, &order.id, "alice").await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let wallet = predmarket_engine::engine::wallets::get_wallet(&pool, "alice")
        .await
        .unwrap();
    assert!((wallet.balance - 1000.0).abs() < EPS);
    assert!((wallet.locked).abs() < EPS);

    // The pool shift from placement is deliberately not reversed.
    let mut conn = pool.acquire().await.unwrap();
    let liq = db::liquidity::find_liquidity(&mut conn, &market.outcomes[0].id)
        .await
        .unwrap()
        .unwrap();
    assert!((liq.yes_pool - 2099.0).abs() < EPS);
    drop(conn);

    // Second cancel is rejected, not replayed.
    let err = cancel_order(&pool, &order.id, "alice").await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
}

#[tokio::test]
async fn cancel_order_enforces_ownership() {
    let pool = test_pool().await;
    let market = make_market(&pool, 100).await;
    provision_wallet(&pool, "alice").await.unwrap();

    let order = place_order(&pool, &order_input(&market, "alice", 0, Position::Yes, 10.0))
        .await
        .unwrap();

    let err = cancel_order(&pool, &order.id, "mallory").await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden));

    let err = cancel_order(&pool, "missing-order", "alice").await.unwrap_err();
    assert!(matches!(err, EngineError::OrderNotFound));
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn close_requires_open() {
    let pool = test_pool().await;
    let market = make_market(&pool, 100).await;

    let closed = close_market(&pool, &market.id).await.unwrap();
    assert_eq!(closed.status, MarketStatus::Closed);

    let err = close_market(&pool, &market.id).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
}

#[tokio::test]
async fn resolve_settles_winner_and_loser() {
    let pool = test_pool().await;
    let market = make_market(&pool, 100).await;
    provision_wallet(&pool, "alice").await.unwrap();
    provision_wallet(&pool, "bob").await.unwrap();

    let winning = place_order(&pool, &order_input(&market, "alice", 0, Position::Yes, 50.0))
        .await
        .unwrap();
    place_order(&pool, &order_input(&market, "bob", 0, Position::No, 50.0))
        .await
        .unwrap();

    close_market(&pool, &market.id).await.unwrap();
    let resolved = resolve_market(&pool, &market.id, &market.outcomes[0].id, Position::Yes)
        .await
        .unwrap();

    assert_eq!(resolved.status, MarketStatus::Resolved);
    assert_eq!(
        resolved.resolved_outcome_id.as_deref(),
        Some(market.outcomes[0].id.as_str())
    );
    assert_eq!(resolved.resolved_position, Some(Position::Yes));
    assert!(resolved.resolve_at.is_some());

    // Winner: stake unlocked, payout amount/price credited.
    let alice = predmarket_engine::engine::wallets::get_wallet(&pool, "alice")
        .await
        .unwrap();
    let expected_payout = 50.0 / winning.price;
    assert!((alice.balance - (950.0 + expected_payout)).abs() < EPS);
    assert!(alice.locked.abs() < EPS);

    // Loser: stake released from locked with no balance credit — a net loss.
    let bob = predmarket_engine::engine::wallets::get_wallet(&pool, "bob")
        .await
        .unwrap();
    assert!((bob.balance - 950.0).abs() < EPS);
    assert!(bob.locked.abs() < EPS);

    // Every settled order is FILLED, winner and loser alike.
    let mut conn = pool.acquire().await.unwrap();
    for order in db::orders::settleable_by_market(&mut conn, &market.id)
        .await
        .unwrap()
    {
        assert_eq!(order.status, OrderStatus::Filled);
    }
}

#[tokio::test]
async fn resolve_requires_closed() {
    let pool = test_pool().await;
    let market = make_market(&pool, 100).await;

    let err = resolve_market(&pool, &market.id, &market.outcomes[0].id, Position::Yes)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));

    close_market(&pool, &market.id).await.unwrap();
    resolve_market(&pool, &market.id, &market.outcomes[0].id, Position::Yes)
        .await
        .unwrap();

    // Second resolution hits the CLOSED-only precondition.
    let err = resolve_market(&pool, &market.id, &market.outcomes[0].id, Position::Yes)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
}

#[tokio::test]
async fn resolve_rejects_foreign_outcome() {
    let pool = test_pool().await;
    let market = make_market(&pool, 100).await;
    let other = make_market(&pool, 100).await;

    close_market(&pool, &market.id).await.unwrap();
    let err = resolve_market(&pool, &market.id, &other.outcomes[0].id, Position::Yes)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidOutcome));
}

#[tokio::test]
async fn cancel_market_refunds_all_stakes() {
    let pool = test_pool().await;
    let market = make_market(&pool, 100).await;
    provision_wallet(&pool, "alice").await.unwrap();
    provision_wallet(&pool, "bob").await.unwrap();

    place_order(&pool, &order_input(&market, "alice", 0, Position::Yes, 120.0))
        .await
        .unwrap();
    place_order(&pool, &order_input(&market, "alice", 1, Position::No, 30.0))
        .await
        .unwrap();
    place_order(&pool, &order_input(&market, "bob", 0, Position::No, 80.0))
        .await
        .unwrap();

    let cancelled = cancel_market(&pool, &market.id).await.unwrap();
    assert_eq!(cancelled.status, MarketStatus::Cancelled);

    // Full no-fault unwind: both wallets back to the pre-market total.
    for user in ["alice", "bob"] {
        let wallet = predmarket_engine::engine::wallets::get_wallet(&pool, user)
            .await
            .unwrap();
        assert!((wallet.balance - 1000.0).abs() < EPS);
        assert!(wallet.locked.abs() < EPS);
    }

    // Terminal: cancelling again is rejected.
    let err = cancel_market(&pool, &market.id).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));

    // No further bets on a cancelled market.
    let err = place_order(&pool, &order_input(&market, "bob", 0, Position::Yes, 10.0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::MarketNotOpen));
}

#[tokio::test]
async fn cancel_market_works_after_close() {
    let pool = test_pool().await;
    let market = make_market(&pool, 100).await;
    provision_wallet(&pool, "alice").await.unwrap();

    place_order(&pool, &order_input(&market, "alice", 0, Position::Yes, 200.0))
        .await
        .unwrap();
    close_market(&pool, &market.id).await.unwrap();

    let cancelled = cancel_market(&pool, &market.id).await.unwrap();
    assert_eq!(cancelled.status, MarketStatus::Cancelled);

    let wallet = predmarket_engine::engine::wallets::get_wallet(&pool, "alice")
        .await
        .unwrap();
    assert!((wallet.balance - 1000.0).abs() < EPS);
}

// ---------------------------------------------------------------------------
// Market creation & stats
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_market_validates_input() {
    let pool = test_pool().await;

    let base = CreateMarketInput {
        question: "  ".to_string(),
        description: None,
        betting_close_at: db::now_ms() + 60_000,
        created_by: "admin".to_string(),
        market_type: None,
        outcomes: None,
        amm_config: None,
    };
    let err = create_market(&pool, &base).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let mut past_close = base.clone();
    past_close.question = "q".to_string();
    past_close.betting_close_at = db::now_ms() - 1;
    let err = create_market(&pool, &past_close).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    // BINARY market cannot carry three outcomes.
    let mut too_many = base.clone();
    too_many.question = "q".to_string();
    too_many.outcomes = Some(
        ["a", "b", "c"]
            .iter()
            .enumerate()
            .map(|(i, slug)| CreateOutcomeInput {
                slug: slug.to_string(),
                label: slug.to_uppercase(),
                position: Some(i as i64),
                status: None,
            })
            .collect(),
    );
    let err = create_market(&pool, &too_many).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    // LMSR needs a positive liquidity parameter.
    let mut lmsr = base.clone();
    lmsr.question = "q".to_string();
    lmsr.amm_config = Some(CreateAmmConfigInput {
        curve: Some(predmarket_engine::types::AmmCurve::Lmsr),
        fee_bps: None,
        lmsr_b: None,
    });
    let err = create_market(&pool, &lmsr).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn market_stats_counts_non_cancelled_orders() {
    let pool = test_pool().await;
    let market = make_market(&pool, 100).await;
    provision_wallet(&pool, "alice").await.unwrap();
    provision_wallet(&pool, "bob").await.unwrap();

    place_order(&pool, &order_input(&market, "alice", 0, Position::Yes, 100.0))
        .await
        .unwrap();
    place_order(&pool, &order_input(&market, "bob", 0, Position::No, 50.0))
        .await
        .unwrap();
    let cancelled = place_order(&pool, &order_input(&market, "bob", 1, Position::Yes, 25.0))
        .await
        .unwrap();
    cancel_order(&pool, &cancelled.id, "bob").await.unwrap();

    let stats = market_stats(&pool, &market.id, Some("bob")).await.unwrap();
    assert_eq!(stats.total_bets, 2);
    assert!((stats.total_volume - 150.0).abs() < EPS);
    assert_eq!(stats.user_bets, 1);
    assert!((stats.user_volume - 50.0).abs() < EPS);
}

#[tokio::test]
async fn provision_wallet_is_idempotent() {
    let pool = test_pool().await;
    let market = make_market(&pool, 100).await;

    let wallet = provision_wallet(&pool, "alice").await.unwrap();
    assert!((wallet.balance - 1000.0).abs() < EPS);

    place_order(&pool, &order_input(&market, "alice", 0, Position::Yes, 100.0))
        .await
        .unwrap();

    // A second provision call must not reset the ledger.
    let wallet = provision_wallet(&pool, "alice").await.unwrap();
    assert!((wallet.balance - 900.0).abs() < EPS);
    assert!((wallet.locked - 100.0).abs() < EPS);
}
