//! CLI interface for basket-trader
//!
//! Provides subcommands for:
//! - `run`: Evaluate the basket on a fixed interval
//! - `report`: Print the profitability report once
//! - `config`: Show the validated configuration

mod report;
mod run;

pub use report::ReportArgs;
pub use run::RunArgs;

use crate::config::Config;
use crate::ledger::{load_trades_json, InMemoryLedger};
use crate::market::StaticMarketData;
use crate::orchestrator::CycleOrchestrator;
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::Path;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "basket-trader")]
#[command(about = "Multi-factor trading decisions and ledger-derived P&L for a fixed basket")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run evaluation cycles against file-backed inputs
    Run(RunArgs),
    /// Print the profitability report and performance summary
    Report(ReportArgs),
    /// Show the validated configuration
    Config,
}

/// Build an orchestrator over a trades file and a market file
fn file_orchestrator(
    config: &Config,
    trades: &Path,
    market: &Path,
) -> anyhow::Result<CycleOrchestrator> {
    let trades = load_trades_json(trades)?;
    let ledger = InMemoryLedger::from_trades(trades)?;
    let market = Arc::new(
        StaticMarketData::load_json(market)
            .with_context(|| format!("loading market file {}", market.display()))?,
    );

    let orchestrator = CycleOrchestrator::new(
        config,
        Arc::new(ledger),
        market.clone(),
        market,
    )?;
    Ok(orchestrator)
}
