//! Run command implementation

use super::file_orchestrator;
use crate::config::Config;
use crate::sink::{JsonlDecisionSink, LoggingDecisionSink};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// JSON array of executed trades
    #[arg(long)]
    pub trades: PathBuf,

    /// JSON market file with one snapshot per symbol
    #[arg(long)]
    pub market: PathBuf,

    /// Stop after this many cycles (default: until Ctrl-C)
    #[arg(long)]
    pub cycles: Option<usize>,

    /// Append decisions as JSON lines to this file
    #[arg(long)]
    pub decisions: Option<PathBuf>,
}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let mut orchestrator = file_orchestrator(config, &self.trades, &self.market)?
            .with_sink(Arc::new(LoggingDecisionSink));
        if let Some(ref path) = self.decisions {
            orchestrator = orchestrator.with_sink(Arc::new(JsonlDecisionSink::open(path).await?));
        }

        let shutdown = CancellationToken::new();
        let ctrl_c = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Ctrl-C received, stopping after the current cycle");
                ctrl_c.cancel();
            }
        });

        tracing::info!(
            symbols = ?orchestrator.symbols(),
            interval_secs = config.orchestrator.cycle_interval_seconds,
            cycles = ?self.cycles,
            "Starting evaluation loop"
        );

        let outcome = orchestrator.run_for(shutdown, self.cycles).await;

        if let Some(summary) = outcome.last_summary {
            println!("{}", summary.report.format_table());
            println!("{}", summary.performance.format_table());
        }
        if outcome.cycles_completed == 0 && outcome.cycles_failed > 0 {
            anyhow::bail!("no cycle completed ({} failed)", outcome.cycles_failed);
        }

        Ok(())
    }
}
