//! Pool Registry
//!
//! Thread-safe token and pool lookup using DashMap. Pools belong to one
//! connector: a Raydium pool address never resolves on a Uniswap route.
//! Cloning shares the underlying maps.
//!
//! Created: 2026-01-27
//! Modified: 2026-01-29 (tokens by symbol/address, default pools, range pools)
//! Modified: 2026-02-04 (pools keyed by connector)

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use super::clmm::RangePool;
use super::ConcentratedPoolSource;
use crate::simulation::{ConcentratedPool, PoolQueryError};
use crate::types::{Connector, PoolModel, PoolReserves, TokenRef};

/// Lookup key for an address: EVM hex is case-insensitive, base58 is not
fn address_key(address: &str) -> String {
    if address.starts_with("0x") {
        address.to_ascii_lowercase()
    } else {
        address.to_string()
    }
}

/// Unordered token pair, so (A, B) and (B, A) find the same default pool
fn pair_key(token_a: &TokenRef, token_b: &TokenRef) -> (String, String) {
    let a = address_key(&token_a.address);
    let b = address_key(&token_b.address);
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PoolKey {
    connector: Connector,
    network: String,
    address: String,
}

impl PoolKey {
    fn new(connector: Connector, network: &str, address: &str) -> Self {
        Self {
            connector,
            network: network.to_string(),
            address: address_key(address),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DefaultPoolKey {
    connector: Connector,
    network: String,
    model: PoolModel,
    pair: (String, String),
}

/// Concurrent token and pool registry
#[derive(Debug, Clone, Default)]
pub struct PoolRegistry {
    /// (network, uppercase symbol) -> token
    tokens_by_symbol: Arc<DashMap<(String, String), TokenRef>>,
    /// (network, address key) -> token
    tokens_by_address: Arc<DashMap<(String, String), TokenRef>>,
    pairs: Arc<DashMap<PoolKey, PoolReserves>>,
    range_pools: Arc<DashMap<PoolKey, RangePool>>,
    defaults: Arc<DashMap<DefaultPoolKey, String>>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_token(&self, network: &str, token: TokenRef) {
        debug!(
            "Registering token {} ({}) on {}",
            token.symbol, token.address, network
        );
        self.tokens_by_symbol.insert(
            (network.to_string(), token.symbol.to_ascii_uppercase()),
            token.clone(),
        );
        self.tokens_by_address
            .insert((network.to_string(), address_key(&token.address)), token);
    }

    /// Find a token by address, or by symbol (case-insensitive)
    pub fn find_token(&self, network: &str, symbol_or_address: &str) -> Option<TokenRef> {
        let by_address = (network.to_string(), address_key(symbol_or_address));
        if let Some(entry) = self.tokens_by_address.get(&by_address) {
            return Some(entry.clone());
        }
        let by_symbol = (network.to_string(), symbol_or_address.to_ascii_uppercase());
        self.tokens_by_symbol.get(&by_symbol).map(|entry| entry.clone())
    }

    /// Add or replace a constant-product snapshot
    pub fn update_pair(&self, connector: Connector, network: &str, pool: PoolReserves) {
        debug!(
            "Updating {} pair {} on {} - reserves: ({}, {})",
            connector, pool.address, network, pool.reserve0, pool.reserve1
        );
        self.pairs
            .insert(PoolKey::new(connector, network, &pool.address), pool);
    }

    pub fn get_pair(
        &self,
        connector: Connector,
        network: &str,
        address: &str,
    ) -> Option<PoolReserves> {
        let key = PoolKey::new(connector, network, address);
        self.pairs.get(&key).map(|entry| entry.clone())
    }

    /// Add or replace a concentrated-liquidity pool
    pub fn update_range_pool(&self, connector: Connector, network: &str, pool: RangePool) {
        debug!(
            "Updating {} range pool {} on {} - sqrtP {}, L {}",
            connector, pool.address, network, pool.sqrt_price, pool.liquidity
        );
        self.range_pools
            .insert(PoolKey::new(connector, network, &pool.address), pool);
    }

    pub fn get_range_pool(
        &self,
        connector: Connector,
        network: &str,
        address: &str,
    ) -> Option<RangePool> {
        let key = PoolKey::new(connector, network, address);
        self.range_pools.get(&key).map(|entry| entry.clone())
    }

    /// Token pair of a pool registered for the connector and model
    pub fn pool_tokens(
        &self,
        connector: Connector,
        network: &str,
        model: PoolModel,
        address: &str,
    ) -> Option<(TokenRef, TokenRef)> {
        match model {
            PoolModel::ConstantProduct => self
                .get_pair(connector, network, address)
                .map(|pool| (pool.token0, pool.token1)),
            PoolModel::ConcentratedLiquidity => self
                .get_range_pool(connector, network, address)
                .map(|pool| (pool.token0, pool.token1)),
            PoolModel::AggregatedRoute => None,
        }
    }

    pub fn set_default_pool(
        &self,
        connector: Connector,
        network: &str,
        model: PoolModel,
        token_a: &TokenRef,
        token_b: &TokenRef,
        address: &str,
    ) {
        let key = DefaultPoolKey {
            connector,
            network: network.to_string(),
            model,
            pair: pair_key(token_a, token_b),
        };
        debug!(
            "Default {} {} pool for {}/{} on {}: {}",
            connector, model, token_a.symbol, token_b.symbol, network, address
        );
        self.defaults.insert(key, address.to_string());
    }

    pub fn default_pool(
        &self,
        connector: Connector,
        network: &str,
        model: PoolModel,
        token_a: &TokenRef,
        token_b: &TokenRef,
    ) -> Option<String> {
        let key = DefaultPoolKey {
            connector,
            network: network.to_string(),
            model,
            pair: pair_key(token_a, token_b),
        };
        self.defaults.get(&key).map(|entry| entry.clone())
    }

    /// Get statistics: (token_count, pair_count, range_pool_count)
    pub fn stats(&self) -> (usize, usize, usize) {
        (
            self.tokens_by_address.len(),
            self.pairs.len(),
            self.range_pools.len(),
        )
    }
}

#[async_trait]
impl ConcentratedPoolSource for PoolRegistry {
    async fn concentrated_pool(
        &self,
        connector: Connector,
        network: &str,
        address: &str,
    ) -> Result<Option<Box<dyn ConcentratedPool>>, PoolQueryError> {
        Ok(self
            .get_range_pool(connector, network, address)
            .map(|pool| Box::new(pool) as Box<dyn ConcentratedPool>))
    }
}
