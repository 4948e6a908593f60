//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::adapters::csv_adapter::CsvPriceAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{run_backtest, BacktestResult};
use crate::domain::config_validation::{
    build_backtest_config, build_ledger_limits, build_strategy_config, parse_assets,
    validate_backtest_config, validate_engine_config, validate_portfolio_config,
    validate_strategy_config,
};
use crate::domain::engine::{CycleReport, StrategyDecisionEngine};
use crate::domain::error::CoinstratError;
use crate::domain::indicator::macd;
use crate::domain::ledger::{PortfolioLedger, TradeOutcome};
use crate::domain::scheduler::TickScheduler;
use crate::ports::ConfigPort;

#[derive(Parser, Debug)]
#[command(name = "coinstrat", about = "Rule-based crypto trading engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay historical CSV data through the strategy
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory holding per-asset CSV files
        #[arg(short, long)]
        data: PathBuf,
        /// Single asset override; defaults to every file in the data directory
        #[arg(long)]
        asset: Option<String>,
    },
    /// Run the live evaluation loop
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Stop after this many ticks (0 = run until killed)
        #[arg(long, default_value_t = 0)]
        ticks: u64,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Report the optimized MACD periods for an asset's history
    Optimize {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long)]
        asset: String,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data,
            asset,
        } => run_backtest_command(&config, &data, asset.as_deref()),
        Command::Run { config, ticks } => run_live(&config, ticks),
        Command::Validate { config } => run_validate(&config),
        Command::Optimize { data, asset } => run_optimize(&data, &asset),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = CoinstratError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn run_backtest_command(config_path: &PathBuf, data_path: &PathBuf, asset: Option<&str>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_backtest_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    let bt_config = build_backtest_config(&adapter);

    let data = CsvPriceAdapter::new(data_path.clone());
    let assets = match asset {
        Some(a) => vec![a.to_string()],
        None => match data.list_assets() {
            Ok(assets) => assets,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        },
    };
    if assets.is_empty() {
        eprintln!("error: no data files found in {}", data_path.display());
        return ExitCode::from(5);
    }

    let mut results: Vec<BacktestResult> = Vec::with_capacity(assets.len());
    for asset in &assets {
        let samples = match data.load_prices(asset) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("warning: skipping {} ({})", asset, e);
                continue;
            }
        };
        eprintln!("Running backtest: {} ({} samples)", asset, samples.len());
        results.push(run_backtest(asset, &samples, &bt_config));
    }

    if results.is_empty() {
        eprintln!("error: no assets with usable data");
        return ExitCode::from(5);
    }

    eprintln!("\n=== Backtest Results ===");
    for r in &results {
        let sign = if r.total_realized_gain_loss >= 0.0 { "+" } else { "" };
        eprintln!(
            "  {}:  {} trades, {:.2} -> {:.2} ({:+.2}%), realized {}{:.2}",
            r.asset,
            r.transactions,
            r.initial_balance,
            r.final_balance,
            r.total_return_pct,
            sign,
            r.total_realized_gain_loss,
        );
    }
    ExitCode::SUCCESS
}

fn run_live(config_path: &PathBuf, ticks: u64) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    for check in [
        validate_portfolio_config(&adapter),
        validate_strategy_config(&adapter),
        validate_engine_config(&adapter),
    ] {
        if let Err(e) = check {
            eprintln!("error: {e}");
            return (&e).into();
        }
    }

    let assets = adapter
        .get_string("engine", "assets")
        .map(|s| parse_assets(&s))
        .unwrap_or_default();
    let interval = adapter.get_int("engine", "tick_interval_secs", 60) as u64;
    let strategy = build_strategy_config(&adapter);
    let limits = build_ledger_limits(&adapter);
    let balance = adapter.get_double("portfolio", "initial_balance", 0.0);
    let ledger = Arc::new(Mutex::new(PortfolioLedger::new(balance, limits)));

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_adapter::SqliteAdapter;

        let db_path = adapter
            .get_string("database", "path")
            .unwrap_or_else(|| "coinstrat.db".to_string());
        let store = match SqliteAdapter::open(&db_path) {
            Ok(s) => Arc::new(s),
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };
        eprintln!(
            "Starting engine: {} assets, tick every {}s, store {}",
            assets.len(),
            interval,
            db_path,
        );

        let engine = Arc::new(StrategyDecisionEngine::new(
            assets,
            strategy,
            ledger,
            store.clone(),
            store,
        ));

        let (tx, rx) = mpsc::channel::<CycleReport>();
        let scheduler = TickScheduler::start(
            engine,
            Duration::from_secs(interval),
            move |report| {
                let _ = tx.send(report);
            },
        );

        let mut seen = 0u64;
        while let Ok(report) = rx.recv() {
            print_cycle(&report);
            seen += 1;
            if ticks > 0 && seen >= ticks {
                break;
            }
        }
        scheduler.stop();
        ExitCode::SUCCESS
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (assets, interval, strategy, ledger, ticks);
        eprintln!("error: sqlite feature is required for run");
        ExitCode::from(1)
    }
}

fn print_cycle(report: &CycleReport) {
    for asset in &report.assets {
        if let Some(skip) = &asset.skip {
            eprintln!("  {}: skipped ({:?})", asset.asset, skip);
            continue;
        }
        let price = asset.snapshot.as_ref().map(|s| s.price).unwrap_or(0.0);
        if asset.actions.is_empty() {
            eprintln!("  {}: {:.4}, no action", asset.asset, price);
        }
        for action in &asset.actions {
            let outcome = match &action.outcome {
                TradeOutcome::Executed(fill) => format!(
                    "{} {:.6} @ {:.4}",
                    fill.transaction.side.as_str(),
                    fill.transaction.quantity,
                    fill.transaction.price,
                ),
                TradeOutcome::Refused(reason) => format!("refused ({:?})", reason),
                TradeOutcome::NoOp(reason) => format!("no-op ({:?})", reason),
            };
            eprintln!("  {}: {:?} -> {}", asset.asset, action.trigger, outcome);
        }
        for note in &asset.notes {
            eprintln!("  {}: note: {}", asset.asset, note);
        }
    }
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    for check in [
        validate_portfolio_config(&adapter),
        validate_strategy_config(&adapter),
        validate_engine_config(&adapter),
        validate_backtest_config(&adapter),
    ] {
        if let Err(e) = check {
            eprintln!("error: {e}");
            return (&e).into();
        }
    }

    eprintln!("Configuration is valid");
    ExitCode::SUCCESS
}

fn run_optimize(data_path: &PathBuf, asset: &str) -> ExitCode {
    let data = CsvPriceAdapter::new(data_path.clone());
    let samples = match data.load_prices(asset) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let prices: Vec<f64> = samples.iter().map(|s| s.price).collect();

    eprintln!("Optimizing MACD periods for {} ({} samples)", asset, prices.len());
    match macd(&prices) {
        Ok(output) => {
            println!(
                "{}: short={} long={} signal={} value={:.6}",
                asset, output.short, output.long, output.signal, output.value,
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}
