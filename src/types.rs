//! Core data structures shared by the simulator
//!
//! Token identities, trade sides, connector routes and the constant-product
//! reserve snapshot. Addresses are kept as strings so EVM (hex) and Solana
//! (base58) pools go through the same pipeline.
//!
//! Created: 2026-01-27
//! Modified: 2026-02-03 (connector routes, Solana addresses)

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::simulation::price::ImpactScale;

/// Token identity with its on-chain decimal exponent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRef {
    pub symbol: String,
    pub address: String,
    /// Fixed for the lifetime of the token, never inferred from amounts
    pub decimals: u8,
}

impl TokenRef {
    pub fn new(symbol: impl Into<String>, address: impl Into<String>, decimals: u8) -> Self {
        Self {
            symbol: symbol.into(),
            address: address.into(),
            decimals,
        }
    }

    /// Compare by address only
    pub fn same_token(&self, other: &TokenRef) -> bool {
        same_address(&self.address, &other.address)
    }
}

impl PartialEq for TokenRef {
    fn eq(&self, other: &Self) -> bool {
        self.same_token(other)
    }
}

impl Eq for TokenRef {}

/// EVM hex addresses are case-insensitive (checksum casing), base58 is not.
pub fn same_address(a: &str, b: &str) -> bool {
    if a.starts_with("0x") && b.starts_with("0x") {
        a.eq_ignore_ascii_case(b)
    } else {
        a == b
    }
}

/// Side of the trade from the base token's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    /// Receive exactly `amount` of base, pay quote (exact output)
    Buy,
    /// Spend exactly `amount` of base, receive quote (exact input)
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "BUY"),
            TradeSide::Sell => write!(f, "SELL"),
        }
    }
}

impl FromStr for TradeSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BUY" => Ok(TradeSide::Buy),
            "SELL" => Ok(TradeSide::Sell),
            other => Err(format!("unknown side '{}', expected BUY or SELL", other)),
        }
    }
}

/// Quoting venues we support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connector {
    Uniswap,
    Raydium,
    Jupiter,
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Connector::Uniswap => write!(f, "uniswap"),
            Connector::Raydium => write!(f, "raydium"),
            Connector::Jupiter => write!(f, "jupiter"),
        }
    }
}

/// Pool mathematics behind a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolModel {
    /// x * y = k (Uniswap V2, Raydium AMM)
    #[serde(alias = "amm")]
    ConstantProduct,
    /// Tick-ranged liquidity (Uniswap V3, Raydium CLMM)
    #[serde(alias = "clmm")]
    ConcentratedLiquidity,
    /// Multi-pool router (Jupiter)
    #[serde(alias = "router")]
    AggregatedRoute,
}

impl fmt::Display for PoolModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PoolModel::ConstantProduct => write!(f, "amm"),
            PoolModel::ConcentratedLiquidity => write!(f, "clmm"),
            PoolModel::AggregatedRoute => write!(f, "router"),
        }
    }
}

/// One simulate-swap endpoint: a connector paired with its pool model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectorRoute {
    UniswapAmm,
    UniswapClmm,
    RaydiumAmm,
    RaydiumClmm,
    JupiterRouter,
}

impl ConnectorRoute {
    pub const ALL: [ConnectorRoute; 5] = [
        ConnectorRoute::UniswapAmm,
        ConnectorRoute::UniswapClmm,
        ConnectorRoute::RaydiumAmm,
        ConnectorRoute::RaydiumClmm,
        ConnectorRoute::JupiterRouter,
    ];

    pub fn connector(&self) -> Connector {
        match self {
            ConnectorRoute::UniswapAmm | ConnectorRoute::UniswapClmm => Connector::Uniswap,
            ConnectorRoute::RaydiumAmm | ConnectorRoute::RaydiumClmm => Connector::Raydium,
            ConnectorRoute::JupiterRouter => Connector::Jupiter,
        }
    }

    pub fn model(&self) -> PoolModel {
        match self {
            ConnectorRoute::UniswapAmm | ConnectorRoute::RaydiumAmm => PoolModel::ConstantProduct,
            ConnectorRoute::UniswapClmm | ConnectorRoute::RaydiumClmm => {
                PoolModel::ConcentratedLiquidity
            }
            ConnectorRoute::JupiterRouter => PoolModel::AggregatedRoute,
        }
    }

    /// Scale in which this route's quoting library reports price impact.
    ///
    /// Uniswap quotes already carry a percentage; Raydium and Jupiter report
    /// a 0-1 fraction. Declared here rather than guessed from the magnitude.
    pub fn impact_scale(&self) -> ImpactScale {
        match self {
            ConnectorRoute::UniswapAmm | ConnectorRoute::UniswapClmm => ImpactScale::Percent,
            ConnectorRoute::RaydiumAmm
            | ConnectorRoute::RaydiumClmm
            | ConnectorRoute::JupiterRouter => ImpactScale::Fraction,
        }
    }

    /// Only the Uniswap CLMM quote exposes its slippage configuration
    pub fn echoes_slippage(&self) -> bool {
        matches!(self, ConnectorRoute::UniswapClmm)
    }

    /// Whether the route simulates against a single addressable pool
    pub fn is_single_pool(&self) -> bool {
        self.model() != PoolModel::AggregatedRoute
    }

    /// URL path segment, e.g. `uniswap/clmm`
    pub fn path(&self) -> String {
        format!("{}/{}", self.connector(), self.model())
    }
}

impl fmt::Display for ConnectorRoute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}", self.connector(), self.model())
    }
}

impl FromStr for ConnectorRoute {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_ascii_lowercase().replace(['/', '_'], "-");
        ConnectorRoute::ALL
            .into_iter()
            .find(|route| route.to_string() == normalized)
            .ok_or_else(|| {
                format!(
                    "unknown route '{}', expected one of: uniswap-amm, uniswap-clmm, raydium-amm, raydium-clmm, jupiter-router",
                    s
                )
            })
    }
}

/// Constant-product pool snapshot (human-scale reserves, read-only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolReserves {
    pub address: String,
    pub token0: TokenRef,
    pub token1: TokenRef,
    pub reserve0: Decimal,
    pub reserve1: Decimal,
    /// LP fee in basis points (30 = 0.30%)
    pub fee_bps: u32,
}

impl PoolReserves {
    /// (reserve_in, reserve_out) for a trade entering with `token_in`
    pub fn oriented(&self, token_in: &TokenRef) -> Option<(Decimal, Decimal)> {
        if token_in.same_token(&self.token0) {
            Some((self.reserve0, self.reserve1))
        } else if token_in.same_token(&self.token1) {
            Some((self.reserve1, self.reserve0))
        } else {
            None
        }
    }

    pub fn contains(&self, token: &TokenRef) -> bool {
        token.same_token(&self.token0) || token.same_token(&self.token1)
    }
}

/// Simulate-swap request as received from the transport layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateSwapRequest {
    pub network: String,
    #[serde(default)]
    pub pool_address: Option<String>,
    #[serde(default)]
    pub base_token: Option<String>,
    #[serde(default)]
    pub quote_token: Option<String>,
    pub amount: Decimal,
    pub side: TradeSide,
    #[serde(default)]
    pub slippage_pct: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_same_address_evm_case_insensitive() {
        assert!(same_address(
            "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2",
            "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"
        ));
    }

    #[test]
    fn test_same_address_base58_exact() {
        assert!(!same_address(
            "So11111111111111111111111111111111111111112",
            "so11111111111111111111111111111111111111112"
        ));
    }

    #[test]
    fn test_route_round_trip_names() {
        for route in ConnectorRoute::ALL {
            assert_eq!(route.to_string().parse::<ConnectorRoute>().unwrap(), route);
        }
        assert_eq!(
            "Uniswap/CLMM".parse::<ConnectorRoute>().unwrap(),
            ConnectorRoute::UniswapClmm
        );
        assert!("curve-amm".parse::<ConnectorRoute>().is_err());
    }

    #[test]
    fn test_route_properties() {
        assert_eq!(ConnectorRoute::UniswapAmm.impact_scale(), ImpactScale::Percent);
        assert_eq!(ConnectorRoute::RaydiumClmm.impact_scale(), ImpactScale::Fraction);
        assert!(ConnectorRoute::UniswapClmm.echoes_slippage());
        assert!(!ConnectorRoute::RaydiumClmm.echoes_slippage());
        assert!(!ConnectorRoute::JupiterRouter.is_single_pool());
        assert_eq!(ConnectorRoute::JupiterRouter.path(), "jupiter/router");
    }

    #[test]
    fn test_reserves_orientation() {
        let weth = TokenRef::new("WETH", "0xaa", 18);
        let usdc = TokenRef::new("USDC", "0xbb", 6);
        let pool = PoolReserves {
            address: "0xpool".to_string(),
            token0: weth.clone(),
            token1: usdc.clone(),
            reserve0: dec!(100),
            reserve1: dec!(200000),
            fee_bps: 30,
        };

        assert_eq!(pool.oriented(&weth), Some((dec!(100), dec!(200000))));
        assert_eq!(pool.oriented(&usdc), Some((dec!(200000), dec!(100))));
        assert_eq!(pool.oriented(&TokenRef::new("DAI", "0xcc", 18)), None);
    }

    #[test]
    fn test_side_parsing() {
        assert_eq!("sell".parse::<TradeSide>().unwrap(), TradeSide::Sell);
        assert_eq!(serde_json::to_string(&TradeSide::Buy).unwrap(), "\"BUY\"");
        assert!("hold".parse::<TradeSide>().is_err());
    }
}
