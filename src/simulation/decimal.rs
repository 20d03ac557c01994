//! Decimal Normalization
//!
//! Converts raw integer token amounts into human-scale decimals
//! (`raw / 10^decimals`) and back, using rust_decimal throughout so 18-decimal
//! tokens keep full precision.
//!
//! Created: 2026-01-27

use rust_decimal::Decimal;

use super::SimulationError;

/// Largest mantissa a `Decimal` can hold (96 bits)
const MAX_MANTISSA: u128 = (1u128 << 96) - 1;

/// Largest scale a `Decimal` can hold
const MAX_SCALE: u32 = 28;

/// Convert a raw on-chain amount into a human-scale quantity.
///
/// Exact whenever the raw value fits in 96 bits and `decimals <= 28`. Beyond
/// that, trailing digits are rounded half-up until the value is representable.
pub fn normalize(raw: u128, decimals: u8) -> Result<Decimal, SimulationError> {
    if raw == 0 {
        return Ok(Decimal::ZERO);
    }

    let mut mantissa = raw;
    let mut scale = decimals as u32;

    while mantissa > MAX_MANTISSA || scale > MAX_SCALE {
        if scale == 0 {
            return Err(SimulationError::ComputationInvariant(format!(
                "amount {} with {} decimals exceeds decimal range",
                raw, decimals
            )));
        }
        let round_up = mantissa % 10 >= 5;
        mantissa = mantissa / 10 + u128::from(round_up);
        scale -= 1;
    }

    Ok(Decimal::from_i128_with_scale(mantissa as i128, scale).normalize())
}

/// Convert a human-scale quantity back into a raw integer amount.
///
/// Digits below the token's resolution are truncated.
pub fn denormalize(amount: Decimal, decimals: u8) -> Result<u128, SimulationError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(SimulationError::ComputationInvariant(format!(
            "negative amount {}",
            amount
        )));
    }

    let mantissa = amount.mantissa().unsigned_abs();
    let scale = amount.scale();
    let decimals = decimals as u32;

    let raw = if decimals >= scale {
        10u128
            .checked_pow(decimals - scale)
            .and_then(|factor| mantissa.checked_mul(factor))
    } else {
        10u128
            .checked_pow(scale - decimals)
            .map(|divisor| mantissa / divisor)
            .or(Some(0))
    };

    raw.ok_or_else(|| {
        SimulationError::ComputationInvariant(format!(
            "amount {} with {} decimals overflows u128",
            amount, decimals
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_normalize_zero_is_exact_zero() {
        assert_eq!(normalize(0, 6).unwrap(), Decimal::ZERO);
        assert_eq!(normalize(0, 18).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize(1_000_000, 6).unwrap(), dec!(1));
        assert_eq!(normalize(1_500_000, 6).unwrap(), dec!(1.5));
        assert_eq!(normalize(42, 0).unwrap(), dec!(42));
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let first = normalize(123_456_789, 6).unwrap();
        let second = normalize(123_456_789, 6).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, dec!(123.456789));
    }

    #[test]
    fn test_normalize_18_decimals_keeps_precision() {
        // 1.000000000000000001 ETH; f64 would collapse this to 1.0
        let amount = normalize(1_000_000_000_000_000_001, 18).unwrap();
        assert_eq!(amount, dec!(1.000000000000000001));
    }

    #[test]
    fn test_normalize_large_raw_rounds_trailing_digits() {
        // 10^30 wei exceeds the 96-bit mantissa
        let raw = 1_000_000_000_000_000_000_000_000_000_007u128;
        let amount = normalize(raw, 18).unwrap();
        assert_eq!(amount, dec!(1000000000000));
    }

    #[test]
    fn test_normalize_scale_above_28() {
        let amount = normalize(5, 30).unwrap();
        // 5e-30 rounds away at 28 places
        assert_eq!(amount, Decimal::ZERO);
        let amount = normalize(123_000_000_000_000_000_000_000_000_000_000, 30).unwrap();
        assert_eq!(amount, dec!(123));
    }

    #[test]
    fn test_normalize_overflow_is_error() {
        assert!(matches!(
            normalize(u128::MAX, 0),
            Err(SimulationError::ComputationInvariant(_))
        ));
    }

    #[test]
    fn test_denormalize() {
        assert_eq!(denormalize(dec!(1.5), 6).unwrap(), 1_500_000);
        assert_eq!(denormalize(dec!(0.1234567), 6).unwrap(), 123_456);
        assert_eq!(denormalize(dec!(2), 18).unwrap(), 2_000_000_000_000_000_000);
        assert_eq!(denormalize(Decimal::ZERO, 9).unwrap(), 0);
    }

    #[test]
    fn test_denormalize_rejects_negative() {
        assert!(denormalize(dec!(-1), 6).is_err());
    }

    #[test]
    fn test_denormalize_inverts_normalize() {
        let raw = 987_654_321_012_345_678u128;
        assert_eq!(denormalize(normalize(raw, 18).unwrap(), 18).unwrap(), raw);
    }
}
