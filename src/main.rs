use basket_trader::cli::{Cli, Commands};
use basket_trader::config::Config;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Configuration errors are fatal
    let config = Config::load(&cli.config)
        .map_err(|e| anyhow::anyhow!("Invalid configuration {}: {}", cli.config, e))?;

    basket_trader::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!("Starting evaluation loop");
            args.execute(&config).await?;
        }
        Commands::Report(args) => {
            args.execute(&config).await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!(
                "  Universe: {} (capital {})",
                config.universe.symbols.join(", "),
                config.universe.capital
            );
            println!(
                "  Scoring: momentum={} trend={} volatility={} volume={} sentiment_max_age={}h",
                config.scoring.momentum_weight,
                config.scoring.trend_weight,
                config.scoring.volatility_weight,
                config.scoring.volume_weight,
                config.scoring.sentiment_max_age_hours
            );
            println!(
                "  Fusion: technical={} sentiment={} risk={} buy>={} sell<=-{}",
                config.fusion.technical_weight,
                config.fusion.sentiment_weight,
                config.fusion.risk_weight,
                config.fusion.theta_buy,
                config.fusion.theta_sell
            );
            println!(
                "  Risk: MaxPos={}% MaxExposure={}% MaxSnapshotAge={}s",
                config.risk.max_position_pct,
                config.risk.max_exposure_pct,
                config.risk.max_snapshot_age_seconds
            );
            println!(
                "  Orchestrator: every {}s, concurrency {}, snapshot timeout {}ms",
                config.orchestrator.cycle_interval_seconds,
                config.orchestrator.max_concurrency,
                config.orchestrator.snapshot_timeout_ms
            );
        }
    }

    Ok(())
}
