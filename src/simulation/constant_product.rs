//! Post-Trade Price Projection: constant-product pools
//!
//! Projects the reserves left behind by a quoted trade and derives the new
//! marginal price. Fees are already folded into the quoted `amount_out`.
//!
//! Created: 2026-01-27

use rust_decimal::Decimal;
use tracing::debug;

use super::SimulationError;
use crate::types::{PoolReserves, TokenRef};

/// Reserves after the trade settles, as (reserve0, reserve1)
pub fn project_reserves(
    pool: &PoolReserves,
    token_in: &TokenRef,
    amount_in: Decimal,
    amount_out: Decimal,
) -> Result<(Decimal, Decimal), SimulationError> {
    let credit = |reserve: Decimal| {
        reserve.checked_add(amount_in).ok_or_else(|| {
            SimulationError::overflow(format!("reserve {} + input {}", reserve, amount_in))
        })
    };

    let (new_reserve0, new_reserve1) = if token_in.same_token(&pool.token0) {
        if amount_out > pool.reserve1 {
            return Err(reserve_underflow(&pool.token1, amount_out, pool.reserve1));
        }
        (credit(pool.reserve0)?, pool.reserve1 - amount_out)
    } else if token_in.same_token(&pool.token1) {
        if amount_out > pool.reserve0 {
            return Err(reserve_underflow(&pool.token0, amount_out, pool.reserve0));
        }
        (pool.reserve0 - amount_out, credit(pool.reserve1)?)
    } else {
        return Err(SimulationError::ComputationInvariant(format!(
            "input token {} is not part of pool {}",
            token_in.address, pool.address
        )));
    };

    Ok((new_reserve0, new_reserve1))
}

/// Marginal price once the trade has settled, in output-per-input
/// orientation like the trade's own price
///
/// Input token0: `newR1 / newR0`. Input token1: `newR0 / newR1`.
pub fn project_final_price(
    pool: &PoolReserves,
    token_in: &TokenRef,
    amount_in: Decimal,
    amount_out: Decimal,
) -> Result<Decimal, SimulationError> {
    let (new_reserve0, new_reserve1) = project_reserves(pool, token_in, amount_in, amount_out)?;
    let (reserve_in, reserve_out) = if token_in.same_token(&pool.token0) {
        (new_reserve0, new_reserve1)
    } else {
        (new_reserve1, new_reserve0)
    };

    if reserve_in.is_zero() {
        return Err(SimulationError::ComputationInvariant(format!(
            "projected input reserve of pool {} is zero",
            pool.address
        )));
    }
    let final_price = reserve_out.checked_div(reserve_in).ok_or_else(|| {
        SimulationError::overflow(format!(
            "final price {} / {} of pool {}",
            reserve_out, reserve_in, pool.address
        ))
    })?;

    debug!(
        "CP projection {}: reserves ({}, {}) -> ({}, {}), final price {}",
        pool.address, pool.reserve0, pool.reserve1, new_reserve0, new_reserve1, final_price
    );

    Ok(final_price)
}

fn reserve_underflow(token: &TokenRef, amount_out: Decimal, reserve: Decimal) -> SimulationError {
    SimulationError::ComputationInvariant(format!(
        "quoted output {} {} exceeds pool reserve {}",
        amount_out, token.symbol, reserve
    ))
}
