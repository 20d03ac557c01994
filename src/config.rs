//! Configuration management
//!
//! Service settings come from the environment (optionally a `.env` file);
//! tokens and pools come from a TOML markets file.
//!
//! Created: 2026-01-30

use anyhow::{anyhow, bail, Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::pool::{PoolRegistry, RangePool};
use crate::quote::jupiter::DEFAULT_JUPITER_API_BASE;
use crate::quote::JupiterConfig;
use crate::service::{SimulationService, DEFAULT_SLIPPAGE_PCT};
use crate::types::{Connector, PoolModel, PoolReserves, TokenRef};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:15888";

/// Service settings
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub markets_file: Option<PathBuf>,
    pub jupiter: JupiterConfig,
    /// Default slippage percentage per connector
    pub slippage: HashMap<Connector, Decimal>,
    pub log_level: String,
    pub log_json: bool,
}

/// Load settings from `.env` (if present) and the process environment
pub fn load_config() -> Result<ServiceConfig> {
    dotenv::dotenv().ok();
    ServiceConfig::from_lookup(|key| std::env::var(key).ok())
}

/// Load settings from a specific env file, then the process environment
pub fn load_config_from_file(path: &str) -> Result<ServiceConfig> {
    dotenv::from_filename(path).with_context(|| format!("Failed to load env file: {}", path))?;
    ServiceConfig::from_lookup(|key| std::env::var(key).ok())
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid {} '{}': {}", key, value, e)),
        _ => Ok(default),
    }
}

impl ServiceConfig {
    /// Build from any key lookup (environment in production, maps in tests)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_addr = parse_or(
            &lookup,
            "BIND_ADDR",
            SocketAddr::from_str(DEFAULT_BIND_ADDR)?,
        )?;

        let markets_file = lookup("MARKETS_FILE")
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        let jupiter = JupiterConfig {
            base_url: lookup("JUPITER_API_URL")
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_JUPITER_API_BASE.to_string()),
            api_key: lookup("JUPITER_API_KEY").filter(|key| !key.trim().is_empty()),
            timeout: Duration::from_secs(parse_or(&lookup, "JUPITER_TIMEOUT_SECS", 10u64)?),
        };

        let mut slippage = HashMap::new();
        for (connector, key) in [
            (Connector::Uniswap, "UNISWAP_SLIPPAGE_PCT"),
            (Connector::Raydium, "RAYDIUM_SLIPPAGE_PCT"),
            (Connector::Jupiter, "JUPITER_SLIPPAGE_PCT"),
        ] {
            let value: Decimal = parse_or(&lookup, key, DEFAULT_SLIPPAGE_PCT)?;
            if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
                bail!("{} must be between 0 and 100, got {}", key, value);
            }
            slippage.insert(connector, value);
        }

        Ok(Self {
            bind_addr,
            markets_file,
            jupiter,
            slippage,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_json: lookup("LOG_FORMAT")
                .map(|format| format.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        })
    }

    /// Wire the service: markets into the registry, sources per route
    pub fn build_service(&self) -> Result<SimulationService> {
        let registry = PoolRegistry::new();
        if let Some(path) = &self.markets_file {
            let markets = MarketsConfig::load(path)?;
            markets.apply(&registry)?;
        }
        let (tokens, pairs, range_pools) = registry.stats();
        info!(
            "Registry loaded: {} tokens, {} AMM pools, {} CLMM pools",
            tokens, pairs, range_pools
        );

        let mut service = SimulationService::standard(registry, self.jupiter.clone())
            .context("Failed to build Jupiter client")?;
        for (connector, slippage) in &self.slippage {
            service = service.with_default_slippage(*connector, *slippage);
        }
        Ok(service)
    }
}

/// Top-level markets file
#[derive(Debug, Clone, Deserialize)]
pub struct MarketsConfig {
    #[serde(default, rename = "token")]
    pub tokens: Vec<TokenConfig>,
    #[serde(default, rename = "amm_pool")]
    pub amm_pools: Vec<AmmPoolConfig>,
    #[serde(default, rename = "clmm_pool")]
    pub clmm_pools: Vec<ClmmPoolConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub network: String,
    pub symbol: String,
    pub address: String,
    pub decimals: u8,
}

/// Constant-product pool snapshot
#[derive(Debug, Clone, Deserialize)]
pub struct AmmPoolConfig {
    pub connector: Connector,
    pub network: String,
    pub address: String,
    /// Symbol or address
    pub token0: String,
    pub token1: String,
    pub reserve0: Decimal,
    pub reserve1: Decimal,
    #[serde(default = "default_amm_fee_bps")]
    pub fee_bps: u32,
    /// Register as the pair's default pool for this connector
    #[serde(default)]
    pub default: bool,
}

/// Single-range concentrated-liquidity pool
#[derive(Debug, Clone, Deserialize)]
pub struct ClmmPoolConfig {
    pub connector: Connector,
    pub network: String,
    pub address: String,
    pub token0: String,
    pub token1: String,
    /// token1 per token0
    pub price: Decimal,
    pub liquidity: Decimal,
    pub price_lower: Decimal,
    pub price_upper: Decimal,
    /// Millionths (500 = 0.05%)
    #[serde(default = "default_clmm_fee")]
    pub fee: u32,
    #[serde(default)]
    pub default: bool,
}

fn default_amm_fee_bps() -> u32 {
    30
}

fn default_clmm_fee() -> u32 {
    3000
}

impl MarketsConfig {
    /// Load markets from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read markets file: {}", path.as_ref().display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse markets TOML")
    }

    /// Register every token and pool
    pub fn apply(&self, registry: &PoolRegistry) -> Result<()> {
        for token in &self.tokens {
            registry.register_token(
                &token.network,
                TokenRef::new(&token.symbol, &token.address, token.decimals),
            );
        }

        let resolve = |network: &str, id: &str, pool: &str| {
            registry
                .find_token(network, id)
                .ok_or_else(|| anyhow!("Pool {}: unknown token '{}' on {}", pool, id, network))
        };

        for pool in &self.amm_pools {
            let token0 = resolve(&pool.network, &pool.token0, &pool.address)?;
            let token1 = resolve(&pool.network, &pool.token1, &pool.address)?;
            if pool.reserve0 < Decimal::ZERO || pool.reserve1 < Decimal::ZERO {
                bail!("Pool {}: reserves must be non-negative", pool.address);
            }
            if pool.default {
                registry.set_default_pool(
                    pool.connector,
                    &pool.network,
                    PoolModel::ConstantProduct,
                    &token0,
                    &token1,
                    &pool.address,
                );
            }
            registry.update_pair(
                pool.connector,
                &pool.network,
                PoolReserves {
                    address: pool.address.clone(),
                    token0,
                    token1,
                    reserve0: pool.reserve0,
                    reserve1: pool.reserve1,
                    fee_bps: pool.fee_bps,
                },
            );
        }

        for pool in &self.clmm_pools {
            let token0 = resolve(&pool.network, &pool.token0, &pool.address)?;
            let token1 = resolve(&pool.network, &pool.token1, &pool.address)?;
            if pool.default {
                registry.set_default_pool(
                    pool.connector,
                    &pool.network,
                    PoolModel::ConcentratedLiquidity,
                    &token0,
                    &token1,
                    &pool.address,
                );
            }
            let range_pool = RangePool::new(
                pool.address.clone(),
                token0,
                token1,
                pool.price,
                pool.liquidity,
                (pool.price_lower, pool.price_upper),
                pool.fee,
            )
            .with_context(|| format!("Pool {}: invalid range pool", pool.address))?;
            registry.update_range_pool(pool.connector, &pool.network, range_pool);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const MARKETS: &str = r#"
        [[token]]
        network = "mainnet"
        symbol = "WETH"
        address = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"
        decimals = 18

        [[token]]
        network = "mainnet"
        symbol = "USDC"
        address = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"
        decimals = 6

        [[amm_pool]]
        connector = "uniswap"
        network = "mainnet"
        address = "0xB4e16d0168e52d35CaCD2c6185b44281Ec28C9Dc"
        token0 = "USDC"
        token1 = "WETH"
        reserve0 = "25000000"
        reserve1 = "10000"
        default = true

        [[clmm_pool]]
        connector = "uniswap"
        network = "mainnet"
        address = "0x88e6A0c2dDD26FEEb64F039a2c41296FcB3f5640"
        token0 = "USDC"
        token1 = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"
        price = "0.0004"
        liquidity = "500000"
        price_lower = "0.0003"
        price_upper = "0.0005"
        fee = 500
    "#;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.jupiter.base_url, DEFAULT_JUPITER_API_BASE);
        assert_eq!(config.slippage[&Connector::Uniswap], DEFAULT_SLIPPAGE_PCT);
        assert!(config.markets_file.is_none());
        assert!(!config.log_json);
    }

    #[test]
    fn test_overrides() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("BIND_ADDR", "0.0.0.0:8080"),
            ("JUPITER_API_KEY", "secret"),
            ("RAYDIUM_SLIPPAGE_PCT", "0.5"),
            ("LOG_FORMAT", "JSON"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.jupiter.api_key.as_deref(), Some("secret"));
        assert_eq!(config.slippage[&Connector::Raydium], dec!(0.5));
        assert!(config.log_json);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(ServiceConfig::from_lookup(lookup(&[("BIND_ADDR", "nowhere")])).is_err());
        assert!(ServiceConfig::from_lookup(lookup(&[("UNISWAP_SLIPPAGE_PCT", "150")])).is_err());
    }

    #[test]
    fn test_markets_apply() {
        let markets = MarketsConfig::parse(MARKETS).unwrap();
        let registry = PoolRegistry::new();
        markets.apply(&registry).unwrap();

        assert_eq!(registry.stats(), (2, 1, 1));
        let weth = registry.find_token("mainnet", "WETH").unwrap();
        let usdc = registry.find_token("mainnet", "usdc").unwrap();
        assert_eq!(
            registry.default_pool(
                Connector::Uniswap,
                "mainnet",
                PoolModel::ConstantProduct,
                &weth,
                &usdc
            ),
            Some("0xB4e16d0168e52d35CaCD2c6185b44281Ec28C9Dc".to_string())
        );
        // CLMM pool was not marked default
        assert!(registry
            .default_pool(
                Connector::Uniswap,
                "mainnet",
                PoolModel::ConcentratedLiquidity,
                &weth,
                &usdc
            )
            .is_none());
        let pair = registry
            .get_pair(
                Connector::Uniswap,
                "mainnet",
                "0xb4e16d0168e52d35cacd2c6185b44281ec28c9dc",
            )
            .unwrap();
        assert_eq!(pair.fee_bps, 30);
    }

    #[test]
    fn test_markets_unknown_token_fails() {
        let markets =
            MarketsConfig::parse(&MARKETS.replace("token1 = \"WETH\"", "token1 = \"WBTC\""))
                .unwrap();
        assert!(markets.apply(&PoolRegistry::new()).is_err());
    }
}
