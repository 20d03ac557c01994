//! Swap Simulation Core
//!
//! Turns an already-built quote into a simulation result: decimal
//! normalization, price and impact derivation, and the per-model post-trade
//! price projection (constant product, concentrated liquidity, aggregator).
//!
//! Created: 2026-01-27
//! Modified: 2026-02-03 (final price source flag)

pub mod adapter;
pub mod aggregated;
pub mod concentrated;
pub mod constant_product;
pub mod decimal;
pub mod price;

pub use adapter::{ProjectionContext, SimulationModel};
pub use concentrated::{
    CanonicalTrade, ClmmTradeResult, ConcentratedPool, PoolQueryError, Refinement,
};
pub use decimal::{denormalize, normalize};
pub use price::{impact_pct, price, ImpactScale};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::quote::QuoteError;

/// Where the reported final price came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FinalPriceSource {
    /// Marginal price from the projected constant-product reserves
    ProjectedReserves,
    /// Price read from the re-queried post-trade CLMM pool
    PostTradePool,
    /// Trade execution price, no pool refinement available for this route
    ExecutionPrice,
    /// Trade execution price after a failed pool refinement
    ExecutionPriceFallback,
    /// Nominal amountOut/amountIn when the trade carried no execution price
    NominalPrice,
    /// Realized average price of an aggregated route
    EffectiveSwapPrice,
}

/// Simulation output, built fresh per request and never cached
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_address: Option<String>,
    pub token_in: String,
    pub token_out: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount_in: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount_out: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub price_impact_pct: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub final_price: Decimal,
    pub final_price_source: FinalPriceSource,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub slippage_pct: Option<Decimal>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub min_amount_out: Option<Decimal>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub max_amount_in: Option<Decimal>,
}

/// Simulation failures
///
/// `InvalidInput` and `NotFound` are rejected before any quote is taken and
/// reach the caller verbatim. Everything else is reported as an opaque
/// internal failure by the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("quote acquisition failed: {0}")]
    Upstream(#[from] QuoteError),
    #[error("computation invariant violated: {0}")]
    ComputationInvariant(String),
}

impl SimulationError {
    /// Arithmetic that left the range `Decimal` can represent
    pub(crate) fn overflow(what: impl std::fmt::Display) -> Self {
        SimulationError::ComputationInvariant(format!("{} overflowed", what))
    }

    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SimulationError::InvalidInput(_) | SimulationError::NotFound(_)
        )
    }
}
