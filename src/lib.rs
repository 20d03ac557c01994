//! DEX Swap Simulator Library
//!
//! Quotes a swap against a connector (Uniswap, Raydium, Jupiter) and projects
//! the pool's post-trade price, for AMM, CLMM and aggregated routes.
//!
//! Created: 2026-01-30
//! Modified: 2026-02-02 - HTTP server and TOML markets loader

pub mod config;
pub mod pool;
pub mod quote;
pub mod server;
pub mod service;
pub mod simulation;
pub mod types;

// Re-export commonly used types
pub use config::{load_config, MarketsConfig, ServiceConfig};
pub use pool::PoolRegistry;
pub use service::SimulationService;
pub use simulation::{FinalPriceSource, SimulationError, SimulationResult};
pub use types::{Connector, ConnectorRoute, PoolModel, SimulateSwapRequest, TokenRef, TradeSide};
