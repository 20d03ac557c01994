//! Post-Trade Price Projection: aggregated routes
//!
//! A route may span several pools, so there is no single pool state to
//! project. The realized average price stands in for the final price.

use rust_decimal::Decimal;

use super::FinalPriceSource;

/// Final price of an aggregated route: the effective swap price, unchanged
pub fn project_final_price(price: Decimal) -> (Decimal, FinalPriceSource) {
    (price, FinalPriceSource::EffectiveSwapPrice)
}
