//! Pure AMM pricing math. No I/O — every function is deterministic over
//! its arguments, which is what makes the quote path safe to re-run
//! inside the place-order transaction.

use crate::error::{EngineError, Result};
use crate::types::{PoolState, Position};

/// Fee taken off the stake before it hits the pool.
pub fn fee(amount: f64, fee_bps: u32) -> f64 {
    amount * (fee_bps as f64 / 10_000.0)
}

/// Per-share price implied by the pool split. Price of YES is the YES
/// share of the total pool; NO is its complement.
pub fn execution_price(pool: PoolState, position: Position) -> Result<f64> {
    let total = pool.yes_pool + pool.no_pool;

    if total <= 0.0 {
        return Err(EngineError::InvalidLiquidityState);
    }

    let yes_probability = pool.yes_pool / total;
    let price = match position {
        Position::Yes => yes_probability,
        Position::No => 1.0 - yes_probability,
    };

    if price <= 0.0 || price >= 1.0 {
        return Err(EngineError::InvalidQuotePrice);
    }

    Ok(price)
}

/// Stake lands on the *same-side* pool: buying YES grows the YES pool.
/// This additive rule is the pricing model, not a constant-product swap.
pub fn apply_net_amount(pool: PoolState, position: Position, net_amount: f64) -> PoolState {
    match position {
        Position::Yes => PoolState {
            yes_pool: pool.yes_pool + net_amount,
            no_pool: pool.no_pool,
        },
        Position::No => PoolState {
            yes_pool: pool.yes_pool,
            no_pool: pool.no_pool + net_amount,
        },
    }
}

/// Relative price movement caused by the trade's own pool impact, in bps.
pub fn slippage_bps(before_price: f64, after_price: f64) -> Result<f64> {
    if before_price <= 0.0 {
        return Err(EngineError::InvalidQuotePrice);
    }

    Ok(((after_price - before_price).abs() / before_price) * 10_000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn pool(yes: f64, no: f64) -> PoolState {
        PoolState {
            yes_pool: yes,
            no_pool: no,
        }
    }

    #[test]
    fn yes_and_no_prices_sum_to_one() {
        for (yes, no) in [(2000.0, 2000.0), (100.0, 900.0), (3.5, 1.5), (1.0, 9999.0)] {
            let p = pool(yes, no);
            let yes_price = execution_price(p, Position::Yes).unwrap();
            let no_price = execution_price(p, Position::No).unwrap();
            assert!((yes_price + no_price - 1.0).abs() < EPS);
        }
    }

    #[test]
    fn fee_plus_net_equals_amount() {
        for amount in [1.0, 100.0, 2500.0] {
            for fee_bps in [0, 100, 1000] {
                let f = fee(amount, fee_bps);
                let net = amount - f;
                assert!((f + net - amount).abs() < EPS);
            }
        }
    }

    #[test]
    fn empty_pool_is_rejected() {
        assert!(matches!(
            execution_price(pool(0.0, 0.0), Position::Yes),
            Err(EngineError::InvalidLiquidityState)
        ));
    }

    #[test]
    fn one_sided_pool_is_a_degenerate_price() {
        assert!(matches!(
            execution_price(pool(500.0, 0.0), Position::Yes),
            Err(EngineError::InvalidQuotePrice)
        ));
        assert!(matches!(
            execution_price(pool(0.0, 500.0), Position::Yes),
            Err(EngineError::InvalidQuotePrice)
        ));
    }

    #[test]
    fn buy_grows_only_the_bought_side() {
        let before = pool(2000.0, 2000.0);
        let after = apply_net_amount(before, Position::Yes, 99.0);
        assert!((after.yes_pool - 2099.0).abs() < EPS);
        assert!((after.no_pool - 2000.0).abs() < EPS);

        let after = apply_net_amount(before, Position::No, 42.0);
        assert!((after.yes_pool - 2000.0).abs() < EPS);
        assert!((after.no_pool - 2042.0).abs() < EPS);
    }

    #[test]
    fn slippage_rejects_non_positive_before_price() {
        assert!(matches!(
            slippage_bps(0.0, 0.5),
            Err(EngineError::InvalidQuotePrice)
        ));
    }

    // Reference scenario: 50/50 pool of 2000/2000, stake 100 at 100 bps fee.
    // fee=1, net=99, price=0.5, after pool 2099/2000, after price 2099/4099,
    // slippage just over 240 bps.
    #[test]
    fn reference_quote_scenario() {
        let before = pool(2000.0, 2000.0);
        let f = fee(100.0, 100);
        assert!((f - 1.0).abs() < EPS);
        let net = 100.0 - f;
        assert!((net - 99.0).abs() < EPS);

        let before_price = execution_price(before, Position::Yes).unwrap();
        assert!((before_price - 0.5).abs() < EPS);

        let after = apply_net_amount(before, Position::Yes, net);
        let after_price = execution_price(after, Position::Yes).unwrap();
        assert!((after_price - 2099.0 / 4099.0).abs() < EPS);

        let expected = (2099.0 / 4099.0 - 0.5) / 0.5 * 10_000.0;
        let slippage = slippage_bps(before_price, after_price).unwrap();
        assert!((slippage - expected).abs() < EPS);
        assert!((slippage - 241.5).abs() < 0.1);
    }
}
