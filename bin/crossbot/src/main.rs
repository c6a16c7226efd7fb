use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use common::Config;
use engine::{load_csv, Backtest, DataConfig};
use paper::BrokerConfig;
use strategy::StrategyFileConfig;

#[derive(Parser)]
#[command(name = "crossbot")]
#[command(about = "Single-asset signal backtester.", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest the configured strategy over a CSV price history.
    Run {
        /// OHLCV CSV file. Overrides BACKTEST_DATA_PATH.
        #[arg(long)]
        data: Option<PathBuf>,
        /// Strategy TOML file. Overrides STRATEGY_CONFIG_PATH.
        #[arg(long)]
        config: Option<PathBuf>,
        /// First bar date to include (YYYY-MM-DD).
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last bar date to include (YYYY-MM-DD).
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Write the per-bar equity curve to this CSV file.
        #[arg(long)]
        equity_out: Option<PathBuf>,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Rewrite YYYY/M/D dates to YYYY-M-D in every matching file under DIR.
    FixDates {
        dir: PathBuf,
        #[arg(long, default_value = "csv")]
        ext: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    match Cli::parse().command {
        Commands::Run {
            data,
            config,
            from,
            to,
            equity_out,
            json,
        } => {
            // ── Config ────────────────────────────────────────────────────────
            let cfg = Config::from_env().context("invalid environment configuration")?;
            let data_path = data.unwrap_or_else(|| PathBuf::from(&cfg.data_path));
            let config_path = config.unwrap_or_else(|| PathBuf::from(&cfg.strategy_config_path));

            let params = StrategyFileConfig::load(&config_path)?.strategy;
            info!(
                strategy = %params.name,
                variant = %params.variant,
                config = %config_path.display(),
                "Strategy loaded"
            );

            // ── Data ──────────────────────────────────────────────────────────
            let bars = load_csv(&DataConfig {
                from,
                to,
                ..DataConfig::new(data_path)
            })?;

            // ── Backtest ──────────────────────────────────────────────────────
            let report = Backtest::signal(params, BrokerConfig::from(&cfg)).run(&bars)?;

            if json {
                println!("{}", report.to_json()?);
            } else {
                println!("{report}");
            }
            if let Some(path) = equity_out {
                report.write_equity_csv(&path).with_context(|| {
                    format!("failed to write equity curve to {}", path.display())
                })?;
                info!(
                    path = %path.display(),
                    points = report.equity.len(),
                    "Equity curve written"
                );
            }
        }
        Commands::FixDates { dir, ext } => {
            let summary = datefix::fix_tree(&dir, &ext).await?;
            println!(
                "Scanned {} file(s), rewrote {}, failed {}",
                summary.scanned,
                summary.rewritten,
                summary.failures.len()
            );
            for failure in &summary.failures {
                eprintln!("  {failure}");
            }
            if !summary.failures.is_empty() {
                anyhow::bail!("{} file(s) could not be fixed", summary.failures.len());
            }
        }
    }

    Ok(())
}
