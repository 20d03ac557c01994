//! Price & Impact Derivation
//!
//! Nominal execution price and price-impact percentage, shared by every
//! pool model.
//!
//! Created: 2026-01-27

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Scale an upstream quoting library uses for price impact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImpactScale {
    /// 0-1 fraction (0.015 = 1.5%)
    Fraction,
    /// Already a percentage (1.5 = 1.5%)
    Percent,
}

/// Output per unit of input; zero when nothing goes in
///
/// `None` when the ratio does not fit a `Decimal`.
pub fn price(amount_in: Decimal, amount_out: Decimal) -> Option<Decimal> {
    if amount_in > Decimal::ZERO {
        amount_out.checked_div(amount_in)
    } else {
        Some(Decimal::ZERO)
    }
}

/// Price impact as a percentage, whatever scale the quote used
pub fn impact_pct(raw: Decimal, scale: ImpactScale) -> Option<Decimal> {
    match scale {
        ImpactScale::Fraction => raw.checked_mul(Decimal::ONE_HUNDRED),
        ImpactScale::Percent => Some(raw),
    }
}

/// Impact of a trade relative to the pre-trade marginal price, as a fraction
///
/// Both prices must share the output-per-input orientation.
pub fn impact_fraction(spot_price: Decimal, execution_price: Decimal) -> Option<Decimal> {
    if spot_price.is_zero() {
        return Some(Decimal::ONE);
    }
    let impact = spot_price
        .checked_sub(execution_price)?
        .checked_div(spot_price)?;
    Some(impact.max(Decimal::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_ratio() {
        assert_eq!(price(dec!(10), dec!(9.066)), Some(dec!(0.9066)));
    }

    #[test]
    fn test_price_zero_input_is_zero() {
        assert_eq!(price(Decimal::ZERO, dec!(5)), Some(Decimal::ZERO));
    }

    #[test]
    fn test_impact_fraction_to_percent() {
        assert_eq!(impact_pct(dec!(0.015), ImpactScale::Fraction), Some(dec!(1.5)));
    }

    #[test]
    fn test_impact_percent_passthrough() {
        assert_eq!(impact_pct(dec!(1.5), ImpactScale::Percent), Some(dec!(1.5)));
    }

    #[test]
    fn test_impact_fraction_from_prices() {
        assert_eq!(impact_fraction(dec!(2), dec!(1.9)), Some(dec!(0.05)));
        assert_eq!(impact_fraction(Decimal::ZERO, dec!(1)), Some(Decimal::ONE));
        // Favourable execution never reports negative impact
        assert_eq!(impact_fraction(dec!(1), dec!(1.1)), Some(Decimal::ZERO));
    }

    #[test]
    fn test_overflowing_ratios_are_none() {
        assert_eq!(price(dec!(0.0000000001), Decimal::MAX), None);
        assert_eq!(impact_pct(Decimal::MAX, ImpactScale::Fraction), None);
        assert_eq!(impact_pct(Decimal::MAX, ImpactScale::Percent), Some(Decimal::MAX));
        assert_eq!(impact_fraction(dec!(0.0000000001), Decimal::MAX), None);
    }
}
