//! Quote Acquisition
//!
//! Quote sources resolve a swap into a `Quote`: token identities, raw
//! amounts, upstream price impact and the trade/route object the projection
//! needs. Sources are collaborators behind an async trait so the service
//! never depends on a concrete quoting library.
//!
//! Created: 2026-01-28

pub mod amm;
pub mod clmm;
pub mod jupiter;

pub use amm::AmmQuoteSource;
pub use clmm::ClmmQuoteSource;
pub use jupiter::{JupiterConfig, JupiterQuoteSource};

use async_trait::async_trait;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::simulation::{denormalize, ClmmTradeResult, ImpactScale};
use crate::types::{ConnectorRoute, PoolReserves, TokenRef, TradeSide};

/// One leg of an aggregated route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteHop {
    pub amm_key: String,
    pub label: String,
}

/// Trade/route object attached by the quoting library
#[derive(Debug, Clone)]
pub enum TradeRoute {
    /// Reserve snapshot the quote was computed against
    Pair(PoolReserves),
    Concentrated(ClmmTradeResult),
    Aggregated(Vec<RouteHop>),
}

/// Quote produced by a source. Read-only once built.
#[derive(Debug, Clone)]
pub struct Quote {
    pub token_in: TokenRef,
    pub token_out: TokenRef,
    /// Raw integer amounts
    pub amount_in: u128,
    pub amount_out: u128,
    /// Nominal price as reported upstream
    pub price: Decimal,
    /// Price impact in the route's upstream scale
    pub price_impact: Decimal,
    pub min_amount_out: Option<u128>,
    pub max_amount_in: Option<u128>,
    pub route: Option<TradeRoute>,
}

/// A swap with every identity resolved, ready to quote
#[derive(Debug, Clone)]
pub struct ResolvedSwap {
    pub route: ConnectorRoute,
    pub network: String,
    /// Always set for single-pool routes
    pub pool_address: Option<String>,
    pub base_token: TokenRef,
    pub quote_token: TokenRef,
    /// Human-scale amount of the base token
    pub amount: Decimal,
    pub side: TradeSide,
    pub slippage_pct: Decimal,
}

impl ResolvedSwap {
    /// SELL spends base, BUY spends quote
    pub fn token_in(&self) -> &TokenRef {
        match self.side {
            TradeSide::Sell => &self.base_token,
            TradeSide::Buy => &self.quote_token,
        }
    }

    pub fn token_out(&self) -> &TokenRef {
        match self.side {
            TradeSide::Sell => &self.quote_token,
            TradeSide::Buy => &self.base_token,
        }
    }
}

/// Quote acquisition failures
#[derive(Debug, thiserror::Error)]
pub enum QuoteError {
    #[error("pool {0} is not available")]
    PoolNotFound(String),
    #[error("token {token} is not part of pool {pool}")]
    TokenMismatch { token: String, pool: String },
    #[error("insufficient liquidity: {0}")]
    InsufficientLiquidity(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed upstream response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn quote(&self, swap: &ResolvedSwap) -> Result<Quote, QuoteError>;
}

/// Slippage bounds for a quoted trade, as (min_amount_out, max_amount_in)
///
/// Exact-input (SELL) bounds the output, exact-output (BUY) bounds the input.
pub fn slippage_bounds(
    side: TradeSide,
    amount_in: u128,
    amount_out: u128,
    slippage_pct: Decimal,
) -> Result<(u128, u128), QuoteError> {
    let factor = slippage_pct / Decimal::ONE_HUNDRED;
    match side {
        TradeSide::Sell => {
            let min_out = scale_raw(amount_out, Decimal::ONE - factor)?;
            Ok((min_out, amount_in))
        }
        TradeSide::Buy => {
            let max_in = scale_raw(amount_in, Decimal::ONE + factor)?;
            Ok((amount_out, max_in))
        }
    }
}

/// Multiply a raw amount by a factor, truncating toward zero
fn scale_raw(raw: u128, factor: Decimal) -> Result<u128, QuoteError> {
    let overflow = || QuoteError::InvalidAmount(format!("{} x {} out of range", raw, factor));
    let amount = Decimal::from_u128(raw).ok_or_else(overflow)?;
    let scaled = amount.checked_mul(factor).ok_or_else(overflow)?.trunc();
    if scaled.is_sign_negative() {
        return Ok(0);
    }
    scaled.to_u128().ok_or_else(overflow)
}

/// Raw amount of `token`, rounded to the token's resolution with `strategy`
pub(crate) fn to_raw(
    amount: Decimal,
    token: &TokenRef,
    strategy: RoundingStrategy,
) -> Result<u128, QuoteError> {
    let rounded = amount.round_dp_with_strategy(u32::from(token.decimals), strategy);
    denormalize(rounded, token.decimals).map_err(|err| QuoteError::InvalidAmount(err.to_string()))
}

/// Express a 0-1 impact fraction in the scale the route's library reports
pub(crate) fn upstream_impact(fraction: Decimal, scale: ImpactScale) -> Decimal {
    match scale {
        ImpactScale::Fraction => fraction,
        ImpactScale::Percent => fraction * Decimal::ONE_HUNDRED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sell_bounds_output() {
        let (min_out, max_in) =
            slippage_bounds(TradeSide::Sell, 1_000_000, 2_000_000, dec!(1)).unwrap();
        assert_eq!(min_out, 1_980_000);
        assert_eq!(max_in, 1_000_000);
    }

    #[test]
    fn test_buy_bounds_input() {
        let (min_out, max_in) =
            slippage_bounds(TradeSide::Buy, 1_000_000, 2_000_000, dec!(0.5)).unwrap();
        assert_eq!(min_out, 2_000_000);
        assert_eq!(max_in, 1_005_000);
    }

    #[test]
    fn test_to_raw_rounding() {
        let usdc = TokenRef::new("USDC", "0x0b", 6);
        assert_eq!(
            to_raw(dec!(1.2345678), &usdc, RoundingStrategy::ToZero).unwrap(),
            1_234_567
        );
        assert_eq!(
            to_raw(dec!(1.2345671), &usdc, RoundingStrategy::AwayFromZero).unwrap(),
            1_234_568
        );
    }

    #[test]
    fn test_upstream_impact_scale() {
        assert_eq!(upstream_impact(dec!(0.015), ImpactScale::Fraction), dec!(0.015));
        assert_eq!(upstream_impact(dec!(0.015), ImpactScale::Percent), dec!(1.5));
    }

    #[test]
    fn test_resolved_swap_orientation() {
        let base = TokenRef::new("SOL", "So11111111111111111111111111111111111111112", 9);
        let quote = TokenRef::new("USDC", "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v", 6);
        let mut swap = ResolvedSwap {
            route: ConnectorRoute::RaydiumAmm,
            network: "mainnet-beta".to_string(),
            pool_address: None,
            base_token: base.clone(),
            quote_token: quote.clone(),
            amount: dec!(1),
            side: TradeSide::Sell,
            slippage_pct: dec!(1),
        };
        assert_eq!(swap.token_in(), &base);
        swap.side = TradeSide::Buy;
        assert_eq!(swap.token_in(), &quote);
        assert_eq!(swap.token_out(), &base);
    }
}
