//! Report command implementation

use super::file_orchestrator;
use crate::config::Config;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// JSON array of executed trades
    #[arg(long)]
    pub trades: PathBuf,

    /// JSON market file with one snapshot per symbol
    #[arg(long)]
    pub market: PathBuf,

    /// Output format: json or table
    #[arg(long, default_value = "table")]
    pub format: String,
}

impl ReportArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let orchestrator = file_orchestrator(config, &self.trades, &self.market)?;
        let summary = orchestrator.run_cycle().await?;

        match self.format.as_str() {
            "json" => println!("{}", serde_json::to_string_pretty(&summary)?),
            _ => {
                println!("{}", summary.report.format_table());
                println!("{}", summary.performance.format_table());
                for decision in &summary.decisions {
                    println!(
                        "{:<10} {:<5} confidence {:.2}  {}",
                        decision.symbol,
                        decision.action,
                        decision.confidence,
                        decision.explanation.notes.join("; ")
                    );
                }
            }
        }

        Ok(())
    }
}
