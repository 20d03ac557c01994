//! Jupiter aggregator quote source
//!
//! Calls the Jupiter quote API (`GET {base}/swap/v1/quote`) and maps the
//! response onto a `Quote`. SELL is `ExactIn` on the base amount, BUY is
//! `ExactOut`. `priceImpactPct` comes back as a decimal string on the
//! 0-1 scale.
//!
//! Created: 2026-01-30

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

use super::{
    slippage_bounds, to_raw, Quote, QuoteError, QuoteSource, ResolvedSwap, RouteHop, TradeRoute,
};
use crate::simulation::{normalize, price};
use crate::types::TradeSide;

pub const DEFAULT_JUPITER_API_BASE: &str = "https://lite-api.jup.ag";

/// Jupiter client settings
#[derive(Debug, Clone)]
pub struct JupiterConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for JupiterConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_JUPITER_API_BASE.to_string(),
            api_key: None,
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Serialize)]
struct JupiterQuoteRequest {
    #[serde(rename = "inputMint")]
    input_mint: String,
    #[serde(rename = "outputMint")]
    output_mint: String,
    amount: String,
    #[serde(rename = "slippageBps")]
    slippage_bps: u16,
    #[serde(rename = "swapMode")]
    swap_mode: &'static str,
}

#[derive(Debug, Deserialize)]
struct JupiterQuoteResponse {
    #[serde(rename = "inAmount")]
    in_amount: String,
    #[serde(rename = "outAmount")]
    out_amount: String,
    #[serde(rename = "otherAmountThreshold", default)]
    other_amount_threshold: Option<String>,
    #[serde(rename = "priceImpactPct", default)]
    price_impact_pct: Option<String>,
    #[serde(rename = "routePlan", default)]
    route_plan: Vec<RoutePlanStep>,
}

#[derive(Debug, Deserialize)]
struct RoutePlanStep {
    #[serde(rename = "swapInfo")]
    swap_info: SwapInfo,
}

#[derive(Debug, Deserialize)]
struct SwapInfo {
    #[serde(rename = "ammKey")]
    amm_key: String,
    label: Option<String>,
}

pub struct JupiterQuoteSource {
    client: reqwest::Client,
    config: JupiterConfig,
}

impl JupiterQuoteSource {
    pub fn new(config: JupiterConfig) -> Result<Self, QuoteError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn request_for(swap: &ResolvedSwap) -> Result<JupiterQuoteRequest, QuoteError> {
        // Jupiter takes the raw base amount on both sides
        let amount = to_raw(swap.amount, &swap.base_token, RoundingStrategy::ToZero)?;
        if amount == 0 {
            return Err(QuoteError::InvalidAmount(format!(
                "{} {} rounds to zero",
                swap.amount, swap.base_token.symbol
            )));
        }
        let slippage_bps = (swap.slippage_pct * Decimal::ONE_HUNDRED)
            .round()
            .to_u16()
            .ok_or_else(|| {
                QuoteError::InvalidAmount(format!("slippage {}% out of range", swap.slippage_pct))
            })?;

        Ok(JupiterQuoteRequest {
            input_mint: swap.token_in().address.clone(),
            output_mint: swap.token_out().address.clone(),
            amount: amount.to_string(),
            slippage_bps,
            swap_mode: match swap.side {
                TradeSide::Sell => "ExactIn",
                TradeSide::Buy => "ExactOut",
            },
        })
    }

    fn into_quote(
        response: JupiterQuoteResponse,
        swap: &ResolvedSwap,
    ) -> Result<Quote, QuoteError> {
        let parse_raw = |field: &str, value: &str| {
            value.parse::<u128>().map_err(|_| {
                QuoteError::Malformed(format!("{} '{}' is not an integer", field, value))
            })
        };
        let raw_in = parse_raw("inAmount", &response.in_amount)?;
        let raw_out = parse_raw("outAmount", &response.out_amount)?;

        let token_in = swap.token_in();
        let token_out = swap.token_out();

        let price_impact = match response.price_impact_pct.as_deref() {
            Some(value) => Decimal::from_str(value)
                .or_else(|_| Decimal::from_scientific(value))
                .unwrap_or_else(|_| {
                    warn!(
                        "Jupiter: Failed to parse priceImpactPct '{}', defaulting to 0",
                        value
                    );
                    Decimal::ZERO
                }),
            None => Decimal::ZERO,
        };

        let (mut min_amount_out, mut max_amount_in) =
            slippage_bounds(swap.side, raw_in, raw_out, swap.slippage_pct)?;
        if let Some(threshold) = response.other_amount_threshold.as_deref() {
            let threshold = parse_raw("otherAmountThreshold", threshold)?;
            match swap.side {
                TradeSide::Sell => min_amount_out = threshold,
                TradeSide::Buy => max_amount_in = threshold,
            }
        }

        let hops: Vec<RouteHop> = response
            .route_plan
            .into_iter()
            .map(|step| RouteHop {
                amm_key: step.swap_info.amm_key,
                label: step.swap_info.label.unwrap_or_else(|| "Unknown".to_string()),
            })
            .collect();

        let to_amount = |raw, decimals| {
            normalize(raw, decimals).map_err(|err| QuoteError::Malformed(err.to_string()))
        };
        let nominal_price = price(
            to_amount(raw_in, token_in.decimals)?,
            to_amount(raw_out, token_out.decimals)?,
        )
        .ok_or_else(|| {
            QuoteError::Malformed(format!("price of {} -> {} overflowed", raw_in, raw_out))
        })?;

        Ok(Quote {
            token_in: token_in.clone(),
            token_out: token_out.clone(),
            amount_in: raw_in,
            amount_out: raw_out,
            price: nominal_price,
            price_impact,
            min_amount_out: Some(min_amount_out),
            max_amount_in: Some(max_amount_in),
            route: Some(TradeRoute::Aggregated(hops)),
        })
    }
}

#[async_trait]
impl QuoteSource for JupiterQuoteSource {
    async fn quote(&self, swap: &ResolvedSwap) -> Result<Quote, QuoteError> {
        let request = Self::request_for(swap)?;
        debug!(
            "Jupiter quote request: {} {} -> {} ({}, slippage: {}bps)",
            request.amount,
            request.input_mint,
            request.output_mint,
            request.swap_mode,
            request.slippage_bps
        );

        let url = format!("{}/swap/v1/quote", self.config.base_url.trim_end_matches('/'));
        let mut builder = self.client.get(&url).query(&request);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.header("x-api-key", api_key);
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown".to_string());
            return Err(QuoteError::Status { status, body });
        }

        let response: JupiterQuoteResponse = response
            .json()
            .await
            .map_err(|err| QuoteError::Malformed(err.to_string()))?;
        let quote = Self::into_quote(response, swap)?;

        if let Some(TradeRoute::Aggregated(hops)) = &quote.route {
            let labels: Vec<&str> = hops.iter().map(|hop| hop.label.as_str()).collect();
            debug!(
                "Jupiter quote: {} -> {}, impact {}, route: {}",
                quote.amount_in,
                quote.amount_out,
                quote.price_impact,
                labels.join(" -> ")
            );
        }
        Ok(quote)
    }
}
