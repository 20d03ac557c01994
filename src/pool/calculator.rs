//! Price Calculator
//!
//! Constant product (x * y = k) trade amounts from human-scale reserves.
//! Fees are charged on the input side in basis points, the way Uniswap V2
//! (30 bps) and Raydium AMM (25 bps) pools charge them.
//!
//! Created: 2026-01-27
//! Modified: 2026-01-29 (Decimal reserves, per-pool fee)
//! Modified: 2026-02-04 (checked arithmetic)

use rust_decimal::Decimal;

use crate::simulation::price::impact_fraction;

const BPS_DENOMINATOR: u32 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalculatorError {
    #[error("pool cannot pay out {0}")]
    InsufficientReserve(Decimal),
    #[error("{0} does not fit a Decimal")]
    Overflow(&'static str),
}

/// Constant-product pool math
pub struct PriceCalculator;

impl PriceCalculator {
    /// Input multiplier after the LP fee, e.g. 0.997 for 30 bps
    fn fee_multiplier(fee_bps: u32) -> Decimal {
        Decimal::from(BPS_DENOMINATOR.saturating_sub(fee_bps)) / Decimal::from(BPS_DENOMINATOR)
    }

    /// Output for an exact input
    ///
    /// Formula: amount_out = (amount_in * f * reserve_out) / (reserve_in + amount_in * f)
    pub fn get_amount_out(
        amount_in: Decimal,
        reserve_in: Decimal,
        reserve_out: Decimal,
        fee_bps: u32,
    ) -> Result<Decimal, CalculatorError> {
        if amount_in <= Decimal::ZERO
            || reserve_in <= Decimal::ZERO
            || reserve_out <= Decimal::ZERO
        {
            return Ok(Decimal::ZERO);
        }

        let amount_in_with_fee = amount_in
            .checked_mul(Self::fee_multiplier(fee_bps))
            .ok_or(CalculatorError::Overflow("input after fee"))?;
        let denominator = reserve_in
            .checked_add(amount_in_with_fee)
            .ok_or(CalculatorError::Overflow("input reserve"))?;

        // out = reserve_out * (in_f / (reserve_in + in_f)); the share is at
        // most 1, so only the share itself can overflow
        let share = amount_in_with_fee
            .checked_div(denominator)
            .ok_or(CalculatorError::Overflow("output share"))?;
        reserve_out
            .checked_mul(share)
            .ok_or(CalculatorError::Overflow("output amount"))
    }

    /// Input required for an exact output
    ///
    /// Formula: amount_in = (reserve_in * amount_out) / ((reserve_out - amount_out) * f)
    pub fn get_amount_in(
        amount_out: Decimal,
        reserve_in: Decimal,
        reserve_out: Decimal,
        fee_bps: u32,
    ) -> Result<Decimal, CalculatorError> {
        if amount_out <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }
        let fee_multiplier = Self::fee_multiplier(fee_bps);
        if reserve_in <= Decimal::ZERO || amount_out >= reserve_out || fee_multiplier.is_zero() {
            return Err(CalculatorError::InsufficientReserve(amount_out));
        }

        let numerator = reserve_in
            .checked_mul(amount_out)
            .ok_or(CalculatorError::Overflow("input numerator"))?;
        let denominator = (reserve_out - amount_out)
            .checked_mul(fee_multiplier)
            .ok_or(CalculatorError::Overflow("input denominator"))?;

        numerator
            .checked_div(denominator)
            .ok_or(CalculatorError::Overflow("input amount"))
    }

    /// Price impact of a trade against the pre-trade spot price, as a fraction
    pub fn price_impact(
        amount_in: Decimal,
        amount_out: Decimal,
        reserve_in: Decimal,
        reserve_out: Decimal,
    ) -> Result<Decimal, CalculatorError> {
        if reserve_in <= Decimal::ZERO
            || reserve_out <= Decimal::ZERO
            || amount_in <= Decimal::ZERO
        {
            return Ok(Decimal::ONE);
        }

        let spot_price = reserve_out
            .checked_div(reserve_in)
            .ok_or(CalculatorError::Overflow("spot price"))?;
        let execution_price = amount_out
            .checked_div(amount_in)
            .ok_or(CalculatorError::Overflow("execution price"))?;

        impact_fraction(spot_price, execution_price)
            .ok_or(CalculatorError::Overflow("price impact"))
    }
}
