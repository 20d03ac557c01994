//! Concentrated-liquidity quote source
//!
//! Quotes Uniswap V3 and Raydium CLMM swaps against registered range pools
//! and attaches the trade object in the shape each library hands back:
//! Uniswap settles currency amounts with an average execution price,
//! Raydium reports exact-input results as token amounts and exact-output
//! results as raw integers, with the post-swap pool price.
//!
//! Created: 2026-01-29

use async_trait::async_trait;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

use super::{
    slippage_bounds, to_raw, upstream_impact, Quote, QuoteError, QuoteSource, ResolvedSwap,
    TradeRoute,
};
use crate::pool::{PoolRegistry, RangePool};
use crate::simulation::price::impact_fraction;
use crate::simulation::{price, ClmmTradeResult, ConcentratedPool, PoolQueryError};
use crate::types::{ConnectorRoute, TokenRef, TradeSide};

pub struct ClmmQuoteSource {
    registry: PoolRegistry,
}

impl ClmmQuoteSource {
    pub fn new(registry: PoolRegistry) -> Self {
        Self { registry }
    }
}

/// Pool price as output per unit of `token_in`
fn oriented_price(pool: &RangePool, token_in: &TokenRef) -> Decimal {
    if token_in.same_token(pool.token0()) {
        pool.token0_price()
    } else {
        pool.token1_price()
    }
}

#[async_trait]
impl QuoteSource for ClmmQuoteSource {
    async fn quote(&self, swap: &ResolvedSwap) -> Result<Quote, QuoteError> {
        let address = swap
            .pool_address
            .as_deref()
            .ok_or_else(|| QuoteError::PoolNotFound("no pool address".to_string()))?;
        let pool = self
            .registry
            .get_range_pool(swap.route.connector(), &swap.network, address)
            .ok_or_else(|| QuoteError::PoolNotFound(address.to_string()))?;

        let token_in = swap.token_in();
        let token_out = swap.token_out();
        for token in [token_in, token_out] {
            if !(token.same_token(&pool.token0) || token.same_token(&pool.token1)) {
                return Err(QuoteError::TokenMismatch {
                    token: token.address.clone(),
                    pool: pool.address.clone(),
                });
            }
        }

        let liquidity_error = |err: PoolQueryError| match err {
            PoolQueryError::Overflow(_) => QuoteError::InvalidAmount(err.to_string()),
            other => QuoteError::InsufficientLiquidity(other.to_string()),
        };
        let (amount_in, amount_out, pool_after) = match swap.side {
            TradeSide::Sell => {
                let (amount_out, after) = pool
                    .swap_exact_in(token_in, swap.amount)
                    .map_err(liquidity_error)?;
                (swap.amount, amount_out, after)
            }
            TradeSide::Buy => {
                let (amount_in, after) = pool
                    .swap_exact_out(token_out, swap.amount)
                    .map_err(liquidity_error)?;
                (amount_in, swap.amount, after)
            }
        };

        let in_rounding = match swap.side {
            TradeSide::Sell => RoundingStrategy::ToZero,
            TradeSide::Buy => RoundingStrategy::AwayFromZero,
        };
        let raw_in = to_raw(amount_in, token_in, in_rounding)?;
        let raw_out = to_raw(amount_out, token_out, RoundingStrategy::ToZero)?;

        let overflow = |what: &str| {
            QuoteError::InvalidAmount(format!("{} overflowed on pool {}", what, pool.address))
        };
        let execution_price = price(amount_in, amount_out).ok_or_else(|| overflow("price"))?;
        let spot_price = oriented_price(&pool, token_in);
        let post_trade_price = oriented_price(&pool_after, token_in);
        let impact = impact_fraction(spot_price, execution_price)
            .ok_or_else(|| overflow("price impact"))?;

        let trade = match (swap.route, swap.side) {
            (ConnectorRoute::RaydiumClmm, TradeSide::Sell) => ClmmTradeResult::BaseIn {
                real_amount_in: amount_in,
                amount_out,
                execution_price: Some(post_trade_price),
            },
            (ConnectorRoute::RaydiumClmm, TradeSide::Buy) => ClmmTradeResult::BaseOut {
                amount_in: raw_in,
                real_amount_out: raw_out,
                execution_price: Some(post_trade_price),
            },
            _ => ClmmTradeResult::Trade {
                input_amount: amount_in,
                output_amount: amount_out,
                execution_price,
            },
        };

        let (min_amount_out, max_amount_in) =
            slippage_bounds(swap.side, raw_in, raw_out, swap.slippage_pct)?;

        debug!(
            "{} quote on {}: {} {} -> {} {}, spot {}, exec {}, post {}",
            swap.route,
            pool.address,
            amount_in,
            token_in.symbol,
            amount_out,
            token_out.symbol,
            spot_price,
            execution_price,
            post_trade_price
        );

        Ok(Quote {
            token_in: token_in.clone(),
            token_out: token_out.clone(),
            amount_in: raw_in,
            amount_out: raw_out,
            price: execution_price,
            price_impact: upstream_impact(impact, swap.route.impact_scale()),
            min_amount_out: Some(min_amount_out),
            max_amount_in: Some(max_amount_in),
            route: Some(TradeRoute::Concentrated(trade)),
        })
    }
}
