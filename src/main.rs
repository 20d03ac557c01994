//! DEX Swap Simulator
//!
//! Main entry point. `serve` runs the HTTP API; `simulate` runs one
//! simulation against the configured markets and prints the JSON result.
//!
//! Created: 2026-01-30
//! Modified: 2026-02-02 - simulate subcommand for one-off quotes

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::net::SocketAddr;
use swap_simulator::config::{load_config, load_config_from_file, ServiceConfig};
use swap_simulator::server;
use swap_simulator::types::{ConnectorRoute, SimulateSwapRequest, TradeSide};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// DEX Swap Simulator - post-trade price projection
#[derive(Parser)]
#[command(name = "swap-simulator")]
struct Args {
    /// Env file to load instead of ./.env
    #[arg(long, env = "ENV_FILE")]
    env_file: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Override BIND_ADDR
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Simulate one swap and print the result
    Simulate {
        /// Route, e.g. uniswap/clmm or jupiter-router
        #[arg(long)]
        route: ConnectorRoute,
        #[arg(long, default_value = "mainnet")]
        network: String,
        #[arg(long)]
        pool: Option<String>,
        #[arg(long)]
        base: Option<String>,
        #[arg(long)]
        quote: Option<String>,
        #[arg(long)]
        amount: Decimal,
        /// BUY or SELL
        #[arg(long)]
        side: TradeSide,
        #[arg(long)]
        slippage: Option<Decimal>,
    },
}

fn init_logging(config: &ServiceConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    if config.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.env_file {
        Some(path) => load_config_from_file(path)?,
        None => load_config()?,
    };
    init_logging(&config);

    info!("DEX Swap Simulator starting...");
    match &config.markets_file {
        Some(path) => info!("Markets file: {}", path.display()),
        None => info!("No MARKETS_FILE set, registry starts empty"),
    }
    info!("Jupiter API: {}", config.jupiter.base_url);

    let service = config.build_service()?;

    match args.command {
        Command::Serve { bind } => {
            let bind = bind.unwrap_or(config.bind_addr);
            server::serve(bind, service).await?;
        }
        Command::Simulate {
            route,
            network,
            pool,
            base,
            quote,
            amount,
            side,
            slippage,
        } => {
            let request = SimulateSwapRequest {
                network,
                pool_address: pool,
                base_token: base,
                quote_token: quote,
                amount,
                side,
                slippage_pct: slippage,
            };
            let result = service
                .simulate(route, request)
                .await
                .with_context(|| format!("Simulation on {} failed", route))?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
