//! Constant-product quote source
//!
//! Quotes Uniswap V2 and Raydium AMM swaps against the registered reserve
//! snapshot. SELL is exact-input, BUY is exact-output. Price impact is
//! reported in the scale the route's library uses.
//!
//! Created: 2026-01-29

use async_trait::async_trait;
use rust_decimal::RoundingStrategy;
use tracing::debug;

use super::{
    slippage_bounds, to_raw, upstream_impact, Quote, QuoteError, QuoteSource, ResolvedSwap,
    TradeRoute,
};
use crate::pool::{CalculatorError, PoolRegistry, PriceCalculator};
use crate::simulation::price;
use crate::types::TradeSide;

pub struct AmmQuoteSource {
    registry: PoolRegistry,
}

impl AmmQuoteSource {
    pub fn new(registry: PoolRegistry) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl QuoteSource for AmmQuoteSource {
    async fn quote(&self, swap: &ResolvedSwap) -> Result<Quote, QuoteError> {
        let address = swap
            .pool_address
            .as_deref()
            .ok_or_else(|| QuoteError::PoolNotFound("no pool address".to_string()))?;
        let reserves = self
            .registry
            .get_pair(swap.route.connector(), &swap.network, address)
            .ok_or_else(|| QuoteError::PoolNotFound(address.to_string()))?;

        let token_in = swap.token_in();
        let token_out = swap.token_out();
        let mismatch = |token: &str| QuoteError::TokenMismatch {
            token: token.to_string(),
            pool: reserves.address.clone(),
        };
        if !reserves.contains(token_out) || token_in.same_token(token_out) {
            return Err(mismatch(&token_out.address));
        }
        let (reserve_in, reserve_out) = reserves
            .oriented(token_in)
            .ok_or_else(|| mismatch(&token_in.address))?;

        let calculator_error = |err: CalculatorError| match err {
            CalculatorError::InsufficientReserve(requested) => {
                QuoteError::InsufficientLiquidity(format!(
                    "pool {} holds {} {}, requested {}",
                    reserves.address, reserve_out, token_out.symbol, requested
                ))
            }
            CalculatorError::Overflow(what) => QuoteError::InvalidAmount(format!(
                "{} overflowed for {} {} on pool {}",
                what, swap.amount, swap.base_token.symbol, reserves.address
            )),
        };
        let (amount_in, amount_out) = match swap.side {
            TradeSide::Sell => {
                let amount_out = PriceCalculator::get_amount_out(
                    swap.amount,
                    reserve_in,
                    reserve_out,
                    reserves.fee_bps,
                )
                .map_err(calculator_error)?;
                (swap.amount, amount_out)
            }
            TradeSide::Buy => {
                let amount_in = PriceCalculator::get_amount_in(
                    swap.amount,
                    reserve_in,
                    reserve_out,
                    reserves.fee_bps,
                )
                .map_err(calculator_error)?;
                (amount_in, swap.amount)
            }
        };

        // Exact side keeps the request's resolution; the computed side rounds
        // against the trader.
        let (raw_in, raw_out) = match swap.side {
            TradeSide::Sell => (
                to_raw(amount_in, token_in, RoundingStrategy::ToZero)?,
                to_raw(amount_out, token_out, RoundingStrategy::ToZero)?,
            ),
            TradeSide::Buy => (
                to_raw(amount_in, token_in, RoundingStrategy::AwayFromZero)?,
                to_raw(amount_out, token_out, RoundingStrategy::ToZero)?,
            ),
        };

        let impact = PriceCalculator::price_impact(amount_in, amount_out, reserve_in, reserve_out)
            .map_err(calculator_error)?;
        let (min_amount_out, max_amount_in) =
            slippage_bounds(swap.side, raw_in, raw_out, swap.slippage_pct)?;

        debug!(
            "{} quote on {}: {} {} -> {} {}, impact {}",
            swap.route,
            reserves.address,
            amount_in,
            token_in.symbol,
            amount_out,
            token_out.symbol,
            impact
        );

        Ok(Quote {
            token_in: token_in.clone(),
            token_out: token_out.clone(),
            amount_in: raw_in,
            amount_out: raw_out,
            price: price(amount_in, amount_out).ok_or_else(|| {
                QuoteError::InvalidAmount(format!("price {} / {}", amount_out, amount_in))
            })?,
            price_impact: upstream_impact(impact, swap.route.impact_scale()),
            min_amount_out: Some(min_amount_out),
            max_amount_in: Some(max_amount_in),
            route: Some(TradeRoute::Pair(reserves)),
        })
    }
}
