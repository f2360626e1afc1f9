//! tapesim CLI — run backtests, validate configs, generate sample data.
//!
//! Commands:
//! - `run` — execute a backtest from a TOML config and export artifacts
//! - `validate` — check a config (structure + strategy parameters)
//! - `strategies` — list registered strategies
//! - `sample-data` — write deterministic synthetic CSV fixtures

mod artifacts;
mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tapesim_core::data::{BarSource, SyntheticBarSource};
use tapesim_core::engine::Engine;
use tapesim_core::persist::JsonlRepository;
use tapesim_core::progress::{EngineEvent, ProgressBus};
use tapesim_core::strategy::StrategyRegistry;

use crate::config::CliConfig;

#[derive(Parser)]
#[command(name = "tapesim", about = "tapesim CLI — historical replay backtesting engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to the TOML config.
        #[arg(long)]
        config: PathBuf,

        /// Directory for result artifacts (metrics.json, equity.csv, trades.csv).
        #[arg(long)]
        out: Option<PathBuf>,

        /// Path of the append-only run journal.
        #[arg(long, default_value = "runs.jsonl")]
        journal: PathBuf,
    },
    /// Validate a config file without running it.
    Validate {
        /// Path to the TOML config.
        #[arg(long)]
        config: PathBuf,
    },
    /// List registered strategies.
    Strategies,
    /// Generate deterministic synthetic CSV data files.
    SampleData {
        /// Symbols to generate (e.g., BTC ETH).
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Output directory. One `<SYMBOL>.csv` per symbol.
        #[arg(long, default_value = "data")]
        out: PathBuf,

        /// Start date (YYYY-MM-DD).
        #[arg(long, default_value = "2023-01-02")]
        start: NaiveDate,

        /// End date (YYYY-MM-DD).
        #[arg(long, default_value = "2024-12-31")]
        end: NaiveDate,

        /// RNG seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            config,
            out,
            journal,
        } => cmd_run(&config, out.as_deref(), &journal),
        Commands::Validate { config } => cmd_validate(&config),
        Commands::Strategies => cmd_strategies(),
        Commands::SampleData {
            symbols,
            out,
            start,
            end,
            seed,
        } => cmd_sample_data(&symbols, &out, start, end, seed),
    }
}

fn cmd_run(
    config_path: &std::path::Path,
    out: Option<&std::path::Path>,
    journal: &std::path::Path,
) -> Result<()> {
    let cli_config = CliConfig::load(config_path)?;
    let backtest_config = cli_config.to_backtest_config();
    let run_id = backtest_config.run_id();

    let registry = StrategyRegistry::with_builtins();
    let data = cli_config.make_source();
    let repo = Arc::new(JsonlRepository::new(journal));
    let bus = Arc::new(ProgressBus::new());

    println!(
        "Running {} on {}...",
        backtest_config.strategy_id, backtest_config.symbol
    );
    let mut engine = Engine::new(backtest_config, &registry, data, repo)
        .context("failed to construct engine")?
        .with_progress(bus.clone());

    // Print progress lines as the engine reports them.
    let rx = bus.subscribe(&run_id);
    let printer = thread::spawn(move || {
        for event in rx {
            match event {
                EngineEvent::Progress {
                    percent_complete,
                    bars_processed,
                    ..
                } => {
                    println!("  {percent_complete:5.1}%  {bars_processed} bars processed");
                }
                EngineEvent::Completed { .. } | EngineEvent::Failed { .. } => break,
            }
        }
    });

    let outcome = engine.run();
    bus.remove(&run_id);
    let _ = printer.join();

    let result = outcome.context("backtest run failed")?;

    let m = &result.metrics;
    println!();
    println!("Run {}", result.run_id);
    println!("  total return      {:>10.2}%", m.total_return * 100.0);
    println!("  annualized return {:>10.2}%", m.annualized_return * 100.0);
    println!("  sharpe ratio      {:>10.2}", m.sharpe_ratio);
    println!(
        "  max drawdown      {:>10.2}%  ({} bars)",
        m.max_drawdown * 100.0,
        m.max_drawdown_duration
    );
    println!(
        "  trades            {:>10}  ({} won / {} lost, win rate {:.1}%)",
        m.total_trades,
        m.winning_trades,
        m.losing_trades,
        m.win_rate * 100.0
    );
    println!("  profit factor     {:>10.2}", m.profit_factor);
    println!("  final value       {:>10.2}", result.final_portfolio.total_value);

    if let Some(dir) = out {
        artifacts::write_artifacts(dir, &result)?;
        println!("Artifacts written to {}", dir.display());
    }
    Ok(())
}

fn cmd_validate(config_path: &std::path::Path) -> Result<()> {
    let cli_config = CliConfig::load(config_path)?;
    let backtest_config = cli_config.to_backtest_config();

    if let Err(message) = backtest_config.validate() {
        bail!("config invalid: {message}");
    }

    let registry = StrategyRegistry::with_builtins();
    let report = registry.validate(&backtest_config.strategy_id, &backtest_config.params);
    if !report.valid {
        for error in &report.errors {
            eprintln!("  error: {error}");
        }
        bail!(
            "parameters invalid for strategy '{}'",
            backtest_config.strategy_id
        );
    }

    println!(
        "OK: {} on {} from {} to {} (run id {})",
        backtest_config.strategy_id,
        backtest_config.symbol,
        backtest_config.start,
        backtest_config.end,
        backtest_config.run_id()
    );
    Ok(())
}

fn cmd_strategies() -> Result<()> {
    let registry = StrategyRegistry::with_builtins();
    for info in registry.list() {
        println!("{:<16} {:<28} {}", info.id, info.name, info.description);
    }
    Ok(())
}

fn cmd_sample_data(
    symbols: &[String],
    out: &std::path::Path,
    start: NaiveDate,
    end: NaiveDate,
    seed: u64,
) -> Result<()> {
    use std::io::Write;

    if end < start {
        bail!("end date {end} precedes start date {start}");
    }
    std::fs::create_dir_all(out)
        .with_context(|| format!("failed to create {}", out.display()))?;

    let source = SyntheticBarSource::new(seed, 100.0, 0.0005, 0.02);
    for symbol in symbols {
        let bars = source
            .load_bars(symbol, start, end)
            .with_context(|| format!("failed to generate bars for {symbol}"))?;

        let path = out.join(format!("{symbol}.csv"));
        let mut file = std::fs::File::create(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        writeln!(file, "timestamp,open,high,low,close,volume")?;
        for bar in &bars {
            writeln!(
                file,
                "{},{:.4},{:.4},{:.4},{:.4},{:.2}",
                bar.timestamp.to_rfc3339(),
                bar.open,
                bar.high,
                bar.low,
                bar.close,
                bar.volume
            )?;
        }
        println!("{}: {} bars -> {}", symbol, bars.len(), path.display());
    }
    Ok(())
}
