//! Simulation Service
//!
//! Request pipeline shared by every simulate-swap endpoint:
//! validate -> resolve pool and tokens -> quote -> refinement lookup ->
//! project. Each request is independent; the only shared state is the
//! registry's concurrent maps, and suspension happens only at collaborator
//! calls.
//!
//! Created: 2026-01-30

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::pool::{ConcentratedPoolSource, PoolRegistry};
use crate::quote::{
    AmmQuoteSource, ClmmQuoteSource, JupiterConfig, JupiterQuoteSource, QuoteError, QuoteSource,
    ResolvedSwap,
};
use crate::simulation::{
    ProjectionContext, Refinement, SimulationError, SimulationModel, SimulationResult,
};
use crate::types::{Connector, ConnectorRoute, SimulateSwapRequest, TokenRef};

/// Slippage used when a request does not carry one
pub const DEFAULT_SLIPPAGE_PCT: Decimal = Decimal::ONE;

#[derive(Clone)]
pub struct SimulationService {
    registry: PoolRegistry,
    sources: HashMap<ConnectorRoute, Arc<dyn QuoteSource>>,
    refinement_sources: HashMap<ConnectorRoute, Arc<dyn ConcentratedPoolSource>>,
    default_slippage: HashMap<Connector, Decimal>,
}

impl SimulationService {
    /// Service with no quote sources wired
    pub fn new(registry: PoolRegistry) -> Self {
        Self {
            registry,
            sources: HashMap::new(),
            refinement_sources: HashMap::new(),
            default_slippage: HashMap::new(),
        }
    }

    /// All five routes: in-memory pools for AMM/CLMM, the Jupiter API for
    /// the router. Only Uniswap CLMM re-queries its pool after the trade.
    pub fn standard(registry: PoolRegistry, jupiter: JupiterConfig) -> Result<Self, QuoteError> {
        let amm: Arc<dyn QuoteSource> = Arc::new(AmmQuoteSource::new(registry.clone()));
        let clmm: Arc<dyn QuoteSource> = Arc::new(ClmmQuoteSource::new(registry.clone()));
        let router: Arc<dyn QuoteSource> = Arc::new(JupiterQuoteSource::new(jupiter)?);
        let pools: Arc<dyn ConcentratedPoolSource> = Arc::new(registry.clone());

        Ok(Self::new(registry)
            .with_source(ConnectorRoute::UniswapAmm, amm.clone())
            .with_source(ConnectorRoute::RaydiumAmm, amm)
            .with_source(ConnectorRoute::UniswapClmm, clmm.clone())
            .with_source(ConnectorRoute::RaydiumClmm, clmm)
            .with_source(ConnectorRoute::JupiterRouter, router)
            .with_refinement_source(ConnectorRoute::UniswapClmm, pools))
    }

    pub fn with_source(mut self, route: ConnectorRoute, source: Arc<dyn QuoteSource>) -> Self {
        self.sources.insert(route, source);
        self
    }

    pub fn with_refinement_source(
        mut self,
        route: ConnectorRoute,
        source: Arc<dyn ConcentratedPoolSource>,
    ) -> Self {
        self.refinement_sources.insert(route, source);
        self
    }

    pub fn with_default_slippage(mut self, connector: Connector, slippage_pct: Decimal) -> Self {
        self.default_slippage.insert(connector, slippage_pct);
        self
    }

    pub fn registry(&self) -> &PoolRegistry {
        &self.registry
    }

    pub fn default_slippage(&self, connector: Connector) -> Decimal {
        self.default_slippage
            .get(&connector)
            .copied()
            .unwrap_or(DEFAULT_SLIPPAGE_PCT)
    }

    /// Simulate one swap on one route
    pub async fn simulate(
        &self,
        route: ConnectorRoute,
        request: SimulateSwapRequest,
    ) -> Result<SimulationResult, SimulationError> {
        let swap = self.resolve(route, &request)?;
        debug!(
            "Simulating {} {} {} {}/{} on {} (pool: {:?})",
            route,
            swap.side,
            swap.amount,
            swap.base_token.symbol,
            swap.quote_token.symbol,
            swap.network,
            swap.pool_address
        );

        let source = self
            .sources
            .get(&route)
            .ok_or_else(|| {
                SimulationError::NotFound(format!("route {} is not configured", route))
            })?;
        let quote = source.quote(&swap).await?;

        // Keep the looked-up pool alive for the projection borrow
        let refinement_pool = match (self.refinement_sources.get(&route), &swap.pool_address) {
            (Some(pools), Some(address)) => {
                let lookup = pools.concentrated_pool(route.connector(), &swap.network, address);
                Some(lookup.await)
            }
            _ => None,
        };
        let refinement = match &refinement_pool {
            None => Refinement::Unsupported,
            Some(Ok(Some(pool))) => Refinement::Pool(pool.as_ref()),
            Some(Ok(None)) => Refinement::PoolUnavailable,
            Some(Err(err)) => Refinement::LookupFailed(err.to_string()),
        };

        let ctx = ProjectionContext {
            pool_address: swap.pool_address.clone(),
            side: swap.side,
            slippage_pct: Some(swap.slippage_pct),
            refinement,
        };
        let result = SimulationModel::for_route(route).project(&quote, ctx)?;

        info!(
            "{} simulate-swap: {} {} -> {} {}, price {}, impact {}%, final {}",
            route,
            result.amount_in,
            swap.token_in().symbol,
            result.amount_out,
            swap.token_out().symbol,
            result.price,
            result.price_impact_pct,
            result.final_price
        );
        Ok(result)
    }

    /// Validate the request and resolve pool and token identities
    fn resolve(
        &self,
        route: ConnectorRoute,
        request: &SimulateSwapRequest,
    ) -> Result<ResolvedSwap, SimulationError> {
        let network = request.network.trim();
        if network.is_empty() {
            return Err(SimulationError::InvalidInput("network is required".to_string()));
        }
        if request.amount <= Decimal::ZERO {
            return Err(SimulationError::InvalidInput(format!(
                "amount must be positive, got {}",
                request.amount
            )));
        }
        if let Some(slippage) = request.slippage_pct {
            if slippage < Decimal::ZERO || slippage > Decimal::ONE_HUNDRED {
                return Err(SimulationError::InvalidInput(format!(
                    "slippagePct must be between 0 and 100, got {}",
                    slippage
                )));
            }
        }

        let has_pair = request.base_token.is_some() && request.quote_token.is_some();
        let pool_address = if route.is_single_pool() {
            request.pool_address.as_deref().filter(|a| !a.trim().is_empty())
        } else {
            None
        };
        if !route.is_single_pool() && !has_pair {
            return Err(SimulationError::InvalidInput(
                "baseToken and quoteToken must be provided.".to_string(),
            ));
        }
        if pool_address.is_none() && !has_pair {
            return Err(SimulationError::InvalidInput(
                "Either poolAddress or both baseToken and quoteToken must be provided.".to_string(),
            ));
        }

        let base = self.lookup_token(network, request.base_token.as_deref())?;
        let quote = self.lookup_token(network, request.quote_token.as_deref())?;

        let (pool_address, base_token, quote_token) = match pool_address {
            Some(address) => {
                let (token0, token1) = self
                    .registry
                    .pool_tokens(route.connector(), network, route.model(), address)
                    .ok_or_else(|| {
                        SimulationError::NotFound(format!(
                            "{} pool {} not found on {}",
                            route.model(),
                            address,
                            network
                        ))
                    })?;
                let base_token = base.unwrap_or_else(|| token0.clone());
                let quote_token = quote.unwrap_or_else(|| token1.clone());
                for token in [&base_token, &quote_token] {
                    if !(token.same_token(&token0) || token.same_token(&token1)) {
                        return Err(SimulationError::InvalidInput(format!(
                            "token {} is not part of pool {}",
                            token.symbol, address
                        )));
                    }
                }
                (Some(address.to_string()), base_token, quote_token)
            }
            None => {
                let (base_token, quote_token) = match (base, quote) {
                    (Some(base), Some(quote)) => (base, quote),
                    _ => {
                        return Err(SimulationError::InvalidInput(
                            "baseToken and quoteToken must be provided.".to_string(),
                        ))
                    }
                };
                let pool_address = if route.is_single_pool() {
                    let address = self
                        .registry
                        .default_pool(
                            route.connector(),
                            network,
                            route.model(),
                            &base_token,
                            &quote_token,
                        )
                        .ok_or_else(|| {
                            SimulationError::NotFound(format!(
                                "No {} pool found for pair {}-{}",
                                route.model().to_string().to_uppercase(),
                                base_token.symbol,
                                quote_token.symbol
                            ))
                        })?;
                    Some(address)
                } else {
                    None
                };
                (pool_address, base_token, quote_token)
            }
        };

        if base_token.same_token(&quote_token) {
            return Err(SimulationError::InvalidInput(
                "baseToken and quoteToken must differ".to_string(),
            ));
        }

        Ok(ResolvedSwap {
            route,
            network: network.to_string(),
            pool_address,
            base_token,
            quote_token,
            amount: request.amount,
            side: request.side,
            slippage_pct: request
                .slippage_pct
                .unwrap_or_else(|| self.default_slippage(route.connector())),
        })
    }

    fn lookup_token(
        &self,
        network: &str,
        symbol_or_address: Option<&str>,
    ) -> Result<Option<TokenRef>, SimulationError> {
        match symbol_or_address {
            None => Ok(None),
            Some(id) => self.registry.find_token(network, id).map(Some).ok_or_else(|| {
                SimulationError::NotFound(format!("token {} not found on {}", id, network))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::RangePool;
    use crate::quote::{Quote, TradeRoute};
    use crate::simulation::{ClmmTradeResult, ConcentratedPool, FinalPriceSource, PoolQueryError};
    use crate::types::{PoolModel, PoolReserves, TradeSide};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use tokio_test::assert_ok;

    fn weth() -> TokenRef {
        TokenRef::new("WETH", "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2", 18)
    }

    fn usdc() -> TokenRef {
        TokenRef::new("USDC", "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", 6)
    }

    const PAIR: &str = "0xB4e16d0168e52d35CaCD2c6185b44281Ec28C9Dc";
    const RANGE: &str = "0x88e6A0c2dDD26FEEb64F039a2c41296FcB3f5640";

    fn registry() -> PoolRegistry {
        let registry = PoolRegistry::new();
        registry.register_token("mainnet", weth());
        registry.register_token("mainnet", usdc());
        registry.update_pair(
            Connector::Uniswap,
            "mainnet",
            PoolReserves {
                address: PAIR.to_string(),
                token0: usdc(),
                token1: weth(),
                reserve0: dec!(25000000),
                reserve1: dec!(10000),
                fee_bps: 30,
            },
        );
        registry.set_default_pool(
            Connector::Uniswap,
            "mainnet",
            PoolModel::ConstantProduct,
            &weth(),
            &usdc(),
            PAIR,
        );
        let range = RangePool::new(
            RANGE,
            usdc(),
            weth(),
            dec!(0.0004),
            dec!(500000),
            (dec!(0.0003), dec!(0.0005)),
            500,
        )
        .unwrap();
        registry.update_range_pool(Connector::Uniswap, "mainnet", range.clone());
        registry.update_range_pool(Connector::Raydium, "mainnet", range);
        registry
    }

    fn service() -> SimulationService {
        let registry = registry();
        let pools: Arc<dyn ConcentratedPoolSource> = Arc::new(registry.clone());
        SimulationService::new(registry.clone())
            .with_source(
                ConnectorRoute::UniswapAmm,
                Arc::new(AmmQuoteSource::new(registry.clone())),
            )
            .with_source(
                ConnectorRoute::UniswapClmm,
                Arc::new(ClmmQuoteSource::new(registry.clone())),
            )
            .with_source(
                ConnectorRoute::RaydiumClmm,
                Arc::new(ClmmQuoteSource::new(registry)),
            )
            .with_refinement_source(ConnectorRoute::UniswapClmm, pools)
            .with_default_slippage(Connector::Uniswap, dec!(0.5))
    }

    fn request(side: TradeSide) -> SimulateSwapRequest {
        SimulateSwapRequest {
            network: "mainnet".to_string(),
            pool_address: None,
            base_token: Some("WETH".to_string()),
            quote_token: Some("USDC".to_string()),
            amount: dec!(1),
            side,
            slippage_pct: None,
        }
    }

    #[tokio::test]
    async fn test_amm_sell_through_default_pool() {
        let result = assert_ok!(
            service()
                .simulate(ConnectorRoute::UniswapAmm, request(TradeSide::Sell))
                .await
        );

        assert_eq!(result.pool_address.as_deref(), Some(PAIR));
        assert_eq!(result.token_in, weth().address);
        assert_eq!(result.amount_in, dec!(1));
        // ~2500 USDC per WETH, minus fee and slippage
        assert!(result.price > dec!(2480) && result.price < dec!(2500));
        assert_eq!(result.final_price_source, FinalPriceSource::ProjectedReserves);
        // USDC per WETH drops once the WETH lands in the pool
        assert!(result.final_price < dec!(2500));
        assert!(result.final_price > dec!(2499));
        assert!(result.slippage_pct.is_none());
    }

    #[tokio::test]
    async fn test_oversized_amount_is_computation_error() {
        let mut request = request(TradeSide::Sell);
        request.amount = Decimal::MAX;
        let err = service()
            .simulate(ConnectorRoute::UniswapAmm, request)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SimulationError::Upstream(_) | SimulationError::ComputationInvariant(_)
        ));
        assert!(!err.is_client_error());
    }

    #[tokio::test]
    async fn test_huge_amount_drains_pool_without_panic() {
        let mut request = request(TradeSide::Sell);
        request.amount = dec!(10000000000000000000);
        let result = assert_ok!(
            service()
                .simulate(ConnectorRoute::UniswapAmm, request)
                .await
        );
        assert!(result.amount_out < dec!(25000000));
        assert!(result.final_price < dec!(0.000001));
    }

    #[tokio::test]
    async fn test_missing_pool_and_tokens_is_invalid_input() {
        let mut request = request(TradeSide::Sell);
        request.quote_token = None;
        let err = service()
            .simulate(ConnectorRoute::UniswapAmm, request)
            .await
            .unwrap_err();
        assert!(matches!(err, SimulationError::InvalidInput(_)));
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_missing_default_pool_is_not_found() {
        let err = service()
            .simulate(ConnectorRoute::UniswapClmm, request(TradeSide::Sell))
            .await
            .unwrap_err();
        assert!(matches!(err, SimulationError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unknown_token_is_not_found() {
        let mut request = request(TradeSide::Sell);
        request.base_token = Some("PEPE".to_string());
        let err = service()
            .simulate(ConnectorRoute::UniswapAmm, request)
            .await
            .unwrap_err();
        assert!(matches!(err, SimulationError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_non_positive_amount_is_invalid() {
        let mut request = request(TradeSide::Sell);
        request.amount = Decimal::ZERO;
        let err = service()
            .simulate(ConnectorRoute::UniswapAmm, request)
            .await
            .unwrap_err();
        assert!(matches!(err, SimulationError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_pool_address_of_another_connector_is_not_found() {
        let mut request = request(TradeSide::Sell);
        request.pool_address = Some(PAIR.to_string());
        let service = service().with_source(
            ConnectorRoute::RaydiumAmm,
            Arc::new(AmmQuoteSource::new(registry())),
        );
        let err = service
            .simulate(ConnectorRoute::RaydiumAmm, request)
            .await
            .unwrap_err();
        assert!(matches!(&err, SimulationError::NotFound(msg) if msg.contains(PAIR)));
    }

    #[tokio::test]
    async fn test_pool_address_defaults_tokens() {
        let request = SimulateSwapRequest {
            network: "mainnet".to_string(),
            pool_address: Some(RANGE.to_lowercase()),
            base_token: None,
            quote_token: None,
            amount: dec!(1000),
            side: TradeSide::Sell,
            slippage_pct: None,
        };
        let result = assert_ok!(service().simulate(ConnectorRoute::UniswapClmm, request).await);

        // Base defaults to token0 (USDC)
        assert_eq!(result.token_in, usdc().address);
        assert_eq!(result.final_price_source, FinalPriceSource::PostTradePool);
        // Selling USDC lowers its price in WETH
        assert!(result.final_price < dec!(0.0004));
        assert_eq!(result.slippage_pct, Some(dec!(0.5)));
        assert!(result.min_amount_out.unwrap() < result.amount_out);
    }

    #[tokio::test]
    async fn test_raydium_clmm_uses_execution_price() {
        let mut request = request(TradeSide::Buy);
        request.pool_address = Some(RANGE.to_string());
        let result = assert_ok!(service().simulate(ConnectorRoute::RaydiumClmm, request).await);

        assert_eq!(result.final_price_source, FinalPriceSource::ExecutionPrice);
        assert_eq!(result.amount_out, dec!(1));
        assert!(result.slippage_pct.is_none());
    }

    #[tokio::test]
    async fn test_unconfigured_route_is_not_found() {
        let err = service()
            .simulate(ConnectorRoute::JupiterRouter, request(TradeSide::Sell))
            .await
            .unwrap_err();
        assert!(matches!(err, SimulationError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_router_requires_both_tokens() {
        let mut request = request(TradeSide::Sell);
        request.base_token = None;
        request.pool_address = Some(PAIR.to_string());
        let err = service()
            .simulate(ConnectorRoute::JupiterRouter, request)
            .await
            .unwrap_err();
        assert!(matches!(err, SimulationError::InvalidInput(_)));
    }

    struct FailingQuoteSource;

    #[async_trait]
    impl QuoteSource for FailingQuoteSource {
        async fn quote(&self, _swap: &ResolvedSwap) -> Result<Quote, QuoteError> {
            Err(QuoteError::Status {
                status: 503,
                body: "unavailable".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_quote_failure_is_upstream() {
        let service =
            service().with_source(ConnectorRoute::UniswapAmm, Arc::new(FailingQuoteSource));
        let err = service
            .simulate(ConnectorRoute::UniswapAmm, request(TradeSide::Sell))
            .await
            .unwrap_err();
        assert!(matches!(err, SimulationError::Upstream(_)));
        assert!(!err.is_client_error());
    }

    /// Fixed trade against the registered range pool
    struct FixedClmmSource;

    #[async_trait]
    impl QuoteSource for FixedClmmSource {
        async fn quote(&self, swap: &ResolvedSwap) -> Result<Quote, QuoteError> {
            Ok(Quote {
                token_in: swap.token_in().clone(),
                token_out: swap.token_out().clone(),
                amount_in: 1_000_000_000,
                amount_out: 399_000_000_000_000_000,
                price: dec!(0.000399),
                price_impact: dec!(0.25),
                min_amount_out: Some(397_005_000_000_000_000),
                max_amount_in: Some(1_000_000_000),
                route: Some(TradeRoute::Concentrated(ClmmTradeResult::Trade {
                    input_amount: dec!(1000),
                    output_amount: dec!(0.399),
                    execution_price: dec!(0.000399),
                })),
            })
        }
    }

    /// Pool whose re-query always fails
    #[derive(Debug)]
    struct BrokenPool;

    impl ConcentratedPool for BrokenPool {
        fn address(&self) -> &str {
            RANGE
        }
        fn token0(&self) -> &TokenRef {
            unreachable!("never read after a failed query")
        }
        fn token1(&self) -> &TokenRef {
            unreachable!("never read after a failed query")
        }
        fn token0_price(&self) -> Decimal {
            Decimal::ZERO
        }
        fn token1_price(&self) -> Decimal {
            Decimal::ZERO
        }
        fn get_output_amount(
            &self,
            _token_in: &TokenRef,
            _amount_in: Decimal,
        ) -> Result<(Decimal, Box<dyn ConcentratedPool>), PoolQueryError> {
            Err(PoolQueryError::Lookup("tick data unavailable".to_string()))
        }
        fn get_input_amount(
            &self,
            _token_out: &TokenRef,
            _amount_out: Decimal,
        ) -> Result<(Decimal, Box<dyn ConcentratedPool>), PoolQueryError> {
            Err(PoolQueryError::Lookup("tick data unavailable".to_string()))
        }
    }

    struct BrokenPoolSource;

    #[async_trait]
    impl ConcentratedPoolSource for BrokenPoolSource {
        async fn concentrated_pool(
            &self,
            _connector: Connector,
            _network: &str,
            _address: &str,
        ) -> Result<Option<Box<dyn ConcentratedPool>>, PoolQueryError> {
            Ok(Some(Box::new(BrokenPool)))
        }
    }

    struct FailingLookup;

    #[async_trait]
    impl ConcentratedPoolSource for FailingLookup {
        async fn concentrated_pool(
            &self,
            _connector: Connector,
            _network: &str,
            _address: &str,
        ) -> Result<Option<Box<dyn ConcentratedPool>>, PoolQueryError> {
            Err(PoolQueryError::Lookup("rpc timeout".to_string()))
        }
    }

    fn clmm_request() -> SimulateSwapRequest {
        SimulateSwapRequest {
            pool_address: Some(RANGE.to_string()),
            base_token: Some("USDC".to_string()),
            quote_token: Some("WETH".to_string()),
            amount: dec!(1000),
            ..request(TradeSide::Sell)
        }
    }

    #[tokio::test]
    async fn test_refinement_failure_still_returns_result() {
        let service = service()
            .with_source(ConnectorRoute::UniswapClmm, Arc::new(FixedClmmSource))
            .with_refinement_source(ConnectorRoute::UniswapClmm, Arc::new(BrokenPoolSource));
        let result = assert_ok!(
            service
                .simulate(ConnectorRoute::UniswapClmm, clmm_request())
                .await
        );

        assert_eq!(result.final_price, dec!(0.000399));
        assert_eq!(result.final_price_source, FinalPriceSource::ExecutionPriceFallback);
        assert_eq!(result.price_impact_pct, dec!(0.25));
    }

    #[tokio::test]
    async fn test_refinement_lookup_failure_still_returns_result() {
        let service = service()
            .with_source(ConnectorRoute::UniswapClmm, Arc::new(FixedClmmSource))
            .with_refinement_source(ConnectorRoute::UniswapClmm, Arc::new(FailingLookup));
        let result = assert_ok!(
            service
                .simulate(ConnectorRoute::UniswapClmm, clmm_request())
                .await
        );

        assert_eq!(result.final_price, dec!(0.000399));
        assert_eq!(result.final_price_source, FinalPriceSource::ExecutionPriceFallback);
    }
}
