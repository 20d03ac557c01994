//! Post-Trade Price Projection: concentrated-liquidity pools
//!
//! The quoting library has already walked the ticks, so the trade's own
//! execution price is the primary final price. When the route can re-query
//! the pool, the post-trade pool state refines it. A failed refinement is
//! logged and degrades to the execution price, it never fails the request.
//!
//! Created: 2026-01-28
//! Modified: 2026-02-03 (trade shape adapters, refinement status)

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::decimal::normalize;
use super::price::price;
use super::{FinalPriceSource, SimulationError};
use crate::types::{TokenRef, TradeSide};

/// Trade result as handed back by the different CLMM quoting libraries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClmmTradeResult {
    /// Uniswap V3 style: both sides settled as currency amounts,
    /// execution price is the average price realized along the route
    Trade {
        input_amount: Decimal,
        output_amount: Decimal,
        execution_price: Decimal,
    },
    /// Raydium exact-input: real input and output as token amounts
    BaseIn {
        real_amount_in: Decimal,
        amount_out: Decimal,
        execution_price: Option<Decimal>,
    },
    /// Raydium exact-output: raw on-chain integers
    BaseOut {
        amount_in: u128,
        real_amount_out: u128,
        execution_price: Option<Decimal>,
    },
}

/// The one shape the rest of the pipeline works with
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalTrade {
    pub amount_in: Decimal,
    pub amount_out: Decimal,
    pub execution_price: Option<Decimal>,
}

/// Flatten any upstream trade shape into human-scale amounts
pub fn canonicalize(
    trade: &ClmmTradeResult,
    token_in: &TokenRef,
    token_out: &TokenRef,
) -> Result<CanonicalTrade, SimulationError> {
    let canonical = match trade {
        ClmmTradeResult::Trade {
            input_amount,
            output_amount,
            execution_price,
        } => CanonicalTrade {
            amount_in: *input_amount,
            amount_out: *output_amount,
            execution_price: Some(*execution_price),
        },
        ClmmTradeResult::BaseIn {
            real_amount_in,
            amount_out,
            execution_price,
        } => CanonicalTrade {
            amount_in: *real_amount_in,
            amount_out: *amount_out,
            execution_price: *execution_price,
        },
        ClmmTradeResult::BaseOut {
            amount_in,
            real_amount_out,
            execution_price,
        } => CanonicalTrade {
            amount_in: normalize(*amount_in, token_in.decimals)?,
            amount_out: normalize(*real_amount_out, token_out.decimals)?,
            execution_price: *execution_price,
        },
    };
    Ok(canonical)
}

/// Pool re-query failures. Always recoverable.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PoolQueryError {
    #[error("token {0} is not part of the pool")]
    UnknownToken(String),
    #[error("trade leaves the active liquidity range: {0}")]
    RangeExceeded(String),
    #[error("pool has no active liquidity")]
    NoLiquidity,
    #[error("pool lookup failed: {0}")]
    Lookup(String),
    #[error("pool math overflowed: {0}")]
    Overflow(String),
}

/// Read access to a concentrated-liquidity pool plus the ability to compute
/// the state that would follow a trade. Pure: querying never changes the pool.
pub trait ConcentratedPool: Send + Sync + std::fmt::Debug {
    fn address(&self) -> &str;
    fn token0(&self) -> &TokenRef;
    fn token1(&self) -> &TokenRef;
    /// Price of token0 in token1
    fn token0_price(&self) -> Decimal;
    /// Price of token1 in token0
    fn token1_price(&self) -> Decimal;
    /// Output for an exact input, and the pool after the trade
    fn get_output_amount(
        &self,
        token_in: &TokenRef,
        amount_in: Decimal,
    ) -> Result<(Decimal, Box<dyn ConcentratedPool>), PoolQueryError>;
    /// Input needed for an exact output, and the pool after the trade
    fn get_input_amount(
        &self,
        token_out: &TokenRef,
        amount_out: Decimal,
    ) -> Result<(Decimal, Box<dyn ConcentratedPool>), PoolQueryError>;
}

/// What the route could offer for refining the final price
#[derive(Debug, Clone)]
pub enum Refinement<'a> {
    /// The route has no way to re-query pools
    Unsupported,
    /// The lookup ran but found no pool at the address
    PoolUnavailable,
    /// The lookup itself failed
    LookupFailed(String),
    Pool(&'a dyn ConcentratedPool),
}

/// Final price for a concentrated-liquidity trade, with its provenance
///
/// Refinement failures degrade to the primary price; only a nominal price
/// that does not fit a `Decimal` is an error.
pub fn project_final_price(
    trade: &CanonicalTrade,
    side: TradeSide,
    token_in: &TokenRef,
    token_out: &TokenRef,
    refinement: Refinement<'_>,
) -> Result<(Decimal, FinalPriceSource), SimulationError> {
    let (primary, primary_source) = match trade.execution_price {
        Some(execution_price) => (execution_price, FinalPriceSource::ExecutionPrice),
        None => {
            let nominal = price(trade.amount_in, trade.amount_out).ok_or_else(|| {
                SimulationError::overflow(format!(
                    "nominal price {} / {}",
                    trade.amount_out, trade.amount_in
                ))
            })?;
            (nominal, FinalPriceSource::NominalPrice)
        }
    };
    let fallback_source = match primary_source {
        FinalPriceSource::ExecutionPrice => FinalPriceSource::ExecutionPriceFallback,
        other => other,
    };

    let projected = match refinement {
        Refinement::Unsupported | Refinement::PoolUnavailable => (primary, primary_source),
        Refinement::LookupFailed(reason) => {
            warn!(
                "Failed to load pool for post-swap price, falling back to execution price: {}",
                reason
            );
            (primary, fallback_source)
        }
        Refinement::Pool(pool) => match post_trade_price(pool, trade, side, token_in, token_out) {
            Ok(final_price) => {
                debug!(
                    "CLMM refinement {}: execution price {} -> post-trade price {}",
                    pool.address(),
                    primary,
                    final_price
                );
                (final_price, FinalPriceSource::PostTradePool)
            }
            Err(err) => {
                warn!(
                    "Failed to derive post-swap price from pool {}, falling back to execution price: {}",
                    pool.address(),
                    err
                );
                (primary, fallback_source)
            }
        },
    };
    Ok(projected)
}

/// Re-run the trade against the pool and read the resulting price in
/// output-per-input orientation, matching the execution price.
fn post_trade_price(
    pool: &dyn ConcentratedPool,
    trade: &CanonicalTrade,
    side: TradeSide,
    token_in: &TokenRef,
    token_out: &TokenRef,
) -> Result<Decimal, PoolQueryError> {
    let (_, pool_after) = match side {
        TradeSide::Sell => pool.get_output_amount(token_in, trade.amount_in)?,
        TradeSide::Buy => pool.get_input_amount(token_out, trade.amount_out)?,
    };

    if token_in.same_token(pool_after.token0()) {
        Ok(pool_after.token0_price())
    } else if token_in.same_token(pool_after.token1()) {
        Ok(pool_after.token1_price())
    } else {
        Err(PoolQueryError::UnknownToken(token_in.address.clone()))
    }
}
