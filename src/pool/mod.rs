//! Pool management module for the swap simulator
//!
//! Handles token and pool lookup plus the pool math the in-memory quote
//! sources run on. Supports both constant-product pairs and single-range
//! concentrated-liquidity pools.
//!
//! Created: 2026-01-27
//! Modified: 2026-01-29 (range pools, concentrated pool lookup)

pub mod calculator;
pub mod clmm;
pub mod state;

pub use calculator::{CalculatorError, PriceCalculator};
pub use clmm::RangePool;
pub use state::PoolRegistry;

use async_trait::async_trait;

use crate::simulation::{ConcentratedPool, PoolQueryError};
use crate::types::Connector;

/// Locates live concentrated-liquidity pools for post-trade refinement
///
/// `Ok(None)` means the pool genuinely does not exist, `Err` means the
/// lookup itself failed.
#[async_trait]
pub trait ConcentratedPoolSource: Send + Sync {
    async fn concentrated_pool(
        &self,
        connector: Connector,
        network: &str,
        address: &str,
    ) -> Result<Option<Box<dyn ConcentratedPool>>, PoolQueryError>;
}
