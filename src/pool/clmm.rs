//! Single-range concentrated-liquidity pool
//!
//! Within-range sqrtPrice math (Uniswap SqrtPriceMath), in human-scale
//! `Decimal` units: price is token1 per token0, virtual reserves are
//! `x = L / sqrtP` and `y = L * sqrtP`. Trades that would leave the active
//! range are rejected rather than approximated.
//!
//! Fee is in millionths (500 = 0.05%, 3000 = 0.30%).
//!
//! Created: 2026-01-29

use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::simulation::{ConcentratedPool, PoolQueryError};
use crate::types::TokenRef;

const FEE_DENOMINATOR: u32 = 1_000_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangePool {
    pub address: String,
    pub token0: TokenRef,
    pub token1: TokenRef,
    pub sqrt_price: Decimal,
    pub liquidity: Decimal,
    pub sqrt_price_lower: Decimal,
    pub sqrt_price_upper: Decimal,
    pub fee: u32,
}

impl RangePool {
    /// Build a pool from human-scale prices (token1 per token0)
    pub fn new(
        address: impl Into<String>,
        token0: TokenRef,
        token1: TokenRef,
        price: Decimal,
        liquidity: Decimal,
        price_range: (Decimal, Decimal),
        fee: u32,
    ) -> Result<Self, PoolQueryError> {
        let address = address.into();
        let (price_lower, price_upper) = price_range;

        if liquidity <= Decimal::ZERO {
            return Err(PoolQueryError::NoLiquidity);
        }
        if fee >= FEE_DENOMINATOR {
            return Err(PoolQueryError::Lookup(format!(
                "pool {} fee {} out of range",
                address, fee
            )));
        }
        if !(price_lower <= price && price <= price_upper) {
            return Err(PoolQueryError::RangeExceeded(format!(
                "price {} outside [{}, {}]",
                price, price_lower, price_upper
            )));
        }

        let sqrt = |value: Decimal| {
            value.sqrt().ok_or_else(|| {
                PoolQueryError::Lookup(format!("cannot take square root of price {}", value))
            })
        };
        let sqrt_price_upper = sqrt(price_upper)?;
        // Every in-range sqrtPrice must square back into a Decimal
        if sqrt_price_upper.checked_mul(sqrt_price_upper).is_none() {
            return Err(PoolQueryError::Overflow(format!(
                "upper price {} of pool {}",
                price_upper, address
            )));
        }

        Ok(Self {
            sqrt_price: sqrt(price)?,
            sqrt_price_lower: sqrt(price_lower)?,
            sqrt_price_upper,
            address,
            token0,
            token1,
            liquidity,
            fee,
        })
    }

    fn with_sqrt_price(&self, sqrt_price: Decimal) -> Result<Self, PoolQueryError> {
        if sqrt_price < self.sqrt_price_lower || sqrt_price > self.sqrt_price_upper {
            return Err(PoolQueryError::RangeExceeded(format!(
                "pool {} would move to sqrtPrice {} outside [{}, {}]",
                self.address, sqrt_price, self.sqrt_price_lower, self.sqrt_price_upper
            )));
        }
        Ok(Self {
            sqrt_price,
            ..self.clone()
        })
    }

    /// True when the trade sells token0 for token1
    fn zero_for_one(&self, token_in: &TokenRef) -> Result<bool, PoolQueryError> {
        if token_in.same_token(&self.token0) {
            Ok(true)
        } else if token_in.same_token(&self.token1) {
            Ok(false)
        } else {
            Err(PoolQueryError::UnknownToken(token_in.address.clone()))
        }
    }

    fn fee_multiplier(&self) -> Decimal {
        Decimal::from(FEE_DENOMINATOR - self.fee) / Decimal::from(FEE_DENOMINATOR)
    }

    fn overflow(&self, amount: Decimal, token: &TokenRef) -> PoolQueryError {
        PoolQueryError::Overflow(format!(
            "{} {} against pool {}",
            amount, token.symbol, self.address
        ))
    }

    /// Exact input: (amount_out, pool after the trade)
    pub fn swap_exact_in(
        &self,
        token_in: &TokenRef,
        amount_in: Decimal,
    ) -> Result<(Decimal, RangePool), PoolQueryError> {
        let zero_for_one = self.zero_for_one(token_in)?;
        if amount_in <= Decimal::ZERO {
            return Ok((Decimal::ZERO, self.clone()));
        }

        let overflow = || self.overflow(amount_in, token_in);
        let amount_after_fee = amount_in
            .checked_mul(self.fee_multiplier())
            .ok_or_else(overflow)?;
        let (liquidity, sqrt_price) = (self.liquidity, self.sqrt_price);

        let (amount_out, next_sqrt_price) = if zero_for_one {
            // Adding token0 pushes sqrtPrice down: L * sqrtP / (L + in * sqrtP)
            let denominator = amount_after_fee
                .checked_mul(sqrt_price)
                .and_then(|delta| liquidity.checked_add(delta))
                .ok_or_else(overflow)?;
            let next = liquidity
                .checked_mul(sqrt_price)
                .and_then(|numerator| numerator.checked_div(denominator))
                .ok_or_else(overflow)?;
            let out = liquidity
                .checked_mul(sqrt_price - next)
                .ok_or_else(overflow)?;
            (out, next)
        } else {
            // Adding token1 pushes sqrtPrice up: sqrtP + in / L
            let next = amount_after_fee
                .checked_div(liquidity)
                .and_then(|delta| sqrt_price.checked_add(delta))
                .ok_or_else(overflow)?;
            let out = liquidity
                .checked_mul(next - sqrt_price)
                .and_then(|numerator| {
                    sqrt_price
                        .checked_mul(next)
                        .and_then(|denominator| numerator.checked_div(denominator))
                })
                .ok_or_else(overflow)?;
            (out, next)
        };

        let after = self.with_sqrt_price(next_sqrt_price)?;
        debug!(
            "Range pool {} exact-in {} {}: out {}, sqrtP {} -> {}",
            self.address, amount_in, token_in.symbol, amount_out, sqrt_price, next_sqrt_price
        );
        Ok((amount_out, after))
    }

    /// Exact output: (amount_in including fee, pool after the trade)
    pub fn swap_exact_out(
        &self,
        token_out: &TokenRef,
        amount_out: Decimal,
    ) -> Result<(Decimal, RangePool), PoolQueryError> {
        // Paying out token1 means token0 comes in
        let zero_for_one = !self.zero_for_one(token_out)?;
        if amount_out <= Decimal::ZERO {
            return Ok((Decimal::ZERO, self.clone()));
        }

        let overflow = || self.overflow(amount_out, token_out);
        let drained = || {
            PoolQueryError::RangeExceeded(format!(
                "output {} {} drains the pool",
                amount_out, token_out.symbol
            ))
        };
        let (liquidity, sqrt_price) = (self.liquidity, self.sqrt_price);

        let (amount_in_net, next_sqrt_price) = if zero_for_one {
            let next = amount_out
                .checked_div(liquidity)
                .and_then(|delta| sqrt_price.checked_sub(delta))
                .ok_or_else(overflow)?;
            if next <= Decimal::ZERO {
                return Err(drained());
            }
            let amount_in = liquidity
                .checked_mul(sqrt_price - next)
                .and_then(|numerator| {
                    sqrt_price
                        .checked_mul(next)
                        .and_then(|denominator| numerator.checked_div(denominator))
                })
                .ok_or_else(overflow)?;
            (amount_in, next)
        } else {
            let denominator = amount_out
                .checked_mul(sqrt_price)
                .and_then(|delta| liquidity.checked_sub(delta))
                .ok_or_else(overflow)?;
            if denominator <= Decimal::ZERO {
                return Err(drained());
            }
            let next = liquidity
                .checked_mul(sqrt_price)
                .and_then(|numerator| numerator.checked_div(denominator))
                .ok_or_else(overflow)?;
            let amount_in = liquidity
                .checked_mul(next - sqrt_price)
                .ok_or_else(overflow)?;
            (amount_in, next)
        };

        let after = self.with_sqrt_price(next_sqrt_price)?;
        let amount_in = amount_in_net
            .checked_div(self.fee_multiplier())
            .ok_or_else(overflow)?;
        debug!(
            "Range pool {} exact-out {} {}: in {}, sqrtP {} -> {}",
            self.address, amount_out, token_out.symbol, amount_in, sqrt_price, next_sqrt_price
        );
        Ok((amount_in, after))
    }
}

impl ConcentratedPool for RangePool {
    fn address(&self) -> &str {
        &self.address
    }

    fn token0(&self) -> &TokenRef {
        &self.token0
    }

    fn token1(&self) -> &TokenRef {
        &self.token1
    }

    fn token0_price(&self) -> Decimal {
        self.sqrt_price * self.sqrt_price
    }

    fn token1_price(&self) -> Decimal {
        let price = self.token0_price();
        if price.is_zero() {
            Decimal::ZERO
        } else {
            Decimal::ONE / price
        }
    }

    fn get_output_amount(
        &self,
        token_in: &TokenRef,
        amount_in: Decimal,
    ) -> Result<(Decimal, Box<dyn ConcentratedPool>), PoolQueryError> {
        let (amount_out, after) = self.swap_exact_in(token_in, amount_in)?;
        Ok((amount_out, Box::new(after)))
    }

    fn get_input_amount(
        &self,
        token_out: &TokenRef,
        amount_out: Decimal,
    ) -> Result<(Decimal, Box<dyn ConcentratedPool>), PoolQueryError> {
        let (amount_in, after) = self.swap_exact_out(token_out, amount_out)?;
        Ok((amount_in, Box::new(after)))
    }
}
