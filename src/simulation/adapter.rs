//! Simulation adapters: one tagged variant per pool model
//!
//! Every model shares the same pipeline (normalize, price, impact,
//! projection, assembly) and differs only in how the final price is
//! projected and which optional fields the response carries.
//!
//! Created: 2026-01-28
//! Modified: 2026-02-03 (status flag, slippage echoes)

use rust_decimal::Decimal;
use tracing::debug;

use super::concentrated::{self, canonicalize, CanonicalTrade, Refinement};
use super::decimal::normalize;
use super::price::{impact_pct, price, ImpactScale};
use super::{aggregated, constant_product, FinalPriceSource, SimulationError, SimulationResult};
use crate::quote::{Quote, TradeRoute};
use crate::types::{ConnectorRoute, PoolModel, TradeSide};

/// Pool model behind a route, with the route's quirks attached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationModel {
    ConstantProduct {
        impact_scale: ImpactScale,
    },
    ConcentratedLiquidity {
        impact_scale: ImpactScale,
        /// Echo slippage, min-out and max-in in the response
        echo_slippage: bool,
    },
    AggregatedRoute {
        impact_scale: ImpactScale,
    },
}

/// Request-scoped inputs the quote itself does not carry
#[derive(Debug, Clone)]
pub struct ProjectionContext<'a> {
    pub pool_address: Option<String>,
    pub side: TradeSide,
    pub slippage_pct: Option<Decimal>,
    pub refinement: Refinement<'a>,
}

impl<'a> ProjectionContext<'a> {
    pub fn new(pool_address: Option<String>, side: TradeSide) -> Self {
        Self {
            pool_address,
            side,
            slippage_pct: None,
            refinement: Refinement::Unsupported,
        }
    }
}

impl SimulationModel {
    pub fn for_route(route: ConnectorRoute) -> Self {
        let impact_scale = route.impact_scale();
        match route.model() {
            PoolModel::ConstantProduct => SimulationModel::ConstantProduct { impact_scale },
            PoolModel::ConcentratedLiquidity => SimulationModel::ConcentratedLiquidity {
                impact_scale,
                echo_slippage: route.echoes_slippage(),
            },
            PoolModel::AggregatedRoute => SimulationModel::AggregatedRoute { impact_scale },
        }
    }

    pub fn impact_scale(&self) -> ImpactScale {
        match self {
            SimulationModel::ConstantProduct { impact_scale }
            | SimulationModel::ConcentratedLiquidity { impact_scale, .. }
            | SimulationModel::AggregatedRoute { impact_scale } => *impact_scale,
        }
    }

    fn is_single_pool(&self) -> bool {
        !matches!(self, SimulationModel::AggregatedRoute { .. })
    }

    fn echoes_slippage(&self) -> bool {
        matches!(
            self,
            SimulationModel::ConcentratedLiquidity {
                echo_slippage: true,
                ..
            }
        )
    }

    /// Turn a quote into the response for this model
    pub fn project(
        &self,
        quote: &Quote,
        ctx: ProjectionContext<'_>,
    ) -> Result<SimulationResult, SimulationError> {
        let amount_in = normalize(quote.amount_in, quote.token_in.decimals)?;
        let amount_out = normalize(quote.amount_out, quote.token_out.decimals)?;
        let price = price(amount_in, amount_out).ok_or_else(|| {
            SimulationError::overflow(format!("price {} / {}", amount_out, amount_in))
        })?;
        let price_impact_pct = impact_pct(quote.price_impact, self.impact_scale())
            .ok_or_else(|| SimulationError::overflow(format!("impact {}", quote.price_impact)))?;
        if quote.price != price {
            debug!(
                "Quoted price {} differs from normalized amounts price {}",
                quote.price, price
            );
        }

        let (final_price, final_price_source) = match self {
            SimulationModel::ConstantProduct { .. } => {
                let reserves = match &quote.route {
                    Some(TradeRoute::Pair(reserves)) => reserves,
                    _ => {
                        return Err(SimulationError::ComputationInvariant(
                            "constant-product quote carries no reserve snapshot".to_string(),
                        ))
                    }
                };
                let final_price = constant_product::project_final_price(
                    reserves,
                    &quote.token_in,
                    amount_in,
                    amount_out,
                )?;
                (final_price, FinalPriceSource::ProjectedReserves)
            }
            SimulationModel::ConcentratedLiquidity { .. } => {
                let trade = match &quote.route {
                    Some(TradeRoute::Concentrated(trade)) => {
                        canonicalize(trade, &quote.token_in, &quote.token_out)?
                    }
                    _ => CanonicalTrade {
                        amount_in,
                        amount_out,
                        execution_price: None,
                    },
                };
                concentrated::project_final_price(
                    &trade,
                    ctx.side,
                    &quote.token_in,
                    &quote.token_out,
                    ctx.refinement,
                )?
            }
            SimulationModel::AggregatedRoute { .. } => aggregated::project_final_price(price),
        };

        let (slippage_pct, min_amount_out, max_amount_in) = if self.echoes_slippage() {
            (
                ctx.slippage_pct,
                quote
                    .min_amount_out
                    .map(|raw| normalize(raw, quote.token_out.decimals))
                    .transpose()?,
                quote
                    .max_amount_in
                    .map(|raw| normalize(raw, quote.token_in.decimals))
                    .transpose()?,
            )
        } else {
            (None, None, None)
        };

        debug!(
            "Projected {} -> {}: price {}, impact {}%, final {} ({:?})",
            quote.token_in.symbol,
            quote.token_out.symbol,
            price,
            price_impact_pct,
            final_price,
            final_price_source
        );

        Ok(SimulationResult {
            pool_address: if self.is_single_pool() {
                ctx.pool_address
            } else {
                None
            },
            token_in: quote.token_in.address.clone(),
            token_out: quote.token_out.address.clone(),
            amount_in,
            amount_out,
            price,
            price_impact_pct,
            final_price,
            final_price_source,
            slippage_pct,
            min_amount_out,
            max_amount_in,
        })
    }
}
