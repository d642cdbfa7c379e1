//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvSnapshotAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::signal_log_adapter::CsvSignalLogAdapter;
use crate::domain::anomaly::{scores_by_bucket, top_anomalies};
use crate::domain::catalog::catalog;
use crate::domain::config::EngineConfig;
use crate::domain::config_validation::{validate_config_file, validate_engine_config};
use crate::domain::diversity::DiversityLedger;
use crate::domain::error::EngineError;
use crate::domain::pipeline::{run_cycle, RunContext, Universe};
use crate::domain::regime::RegimeState;
use crate::domain::report::CycleReport;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::SnapshotPort;
use crate::ports::report_port::ReportPort;
use crate::ports::signal_log_port::SignalLogPort;

#[derive(Parser, Debug)]
#[command(name = "signaldesk", about = "Daily market signal engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a full cycle and print the ranked signal rows
    Report {
        #[arg(short, long)]
        config: PathBuf,
        /// Reference date (YYYY-MM-DD). Defaults to the latest snapshot.
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Do not append this cycle to the signal log
        #[arg(long)]
        no_log: bool,
    },
    /// Backtest every catalog strategy and print the results
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Classify the market regime on a date
    Regime {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
    /// List the strongest trading-value anomalies on a date
    Anomalies {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        #[arg(long, default_value_t = 20)]
        top: usize,
    },
    /// List the strategy catalog
    Catalog,
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{s}' (expected YYYY-MM-DD)"))
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Report {
            config,
            date,
            output,
            no_log,
        } => run_report(&config, date, output.as_deref(), no_log),
        Command::Backtest {
            config,
            date,
            output,
        } => run_backtest(&config, date, output.as_deref()),
        Command::Regime { config, date } => run_regime(&config, date),
        Command::Anomalies { config, date, top } => run_anomalies(&config, date, top),
        Command::Catalog => run_catalog(),
        Command::Validate { config } => run_validate(&config),
    }
}

fn fail(err: &EngineError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| fail(&e))
}

/// Reads and validates the typed config from an already-loaded file.
pub fn build_engine_config(adapter: &dyn ConfigPort) -> Result<EngineConfig, EngineError> {
    validate_config_file(adapter)?;
    let config = EngineConfig::from_port(adapter)?;
    validate_engine_config(&config)?;
    Ok(config)
}

/// The requested date, or the latest date with a snapshot.
pub fn resolve_reference_date(
    port: &dyn SnapshotPort,
    requested: Option<NaiveDate>,
) -> Result<NaiveDate, EngineError> {
    if let Some(date) = requested {
        return Ok(date);
    }
    port.available_dates()?
        .last()
        .copied()
        .ok_or_else(|| EngineError::Snapshot {
            reason: "no snapshot files found".to_string(),
        })
}

/// Stages shared by every data-reading command: config, date, universe.
fn prepare_context(
    config_path: &Path,
    requested: Option<NaiveDate>,
) -> Result<RunContext, ExitCode> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;
    let config = build_engine_config(&adapter).map_err(|e| fail(&e))?;

    let port = CsvSnapshotAdapter::new(
        config.data.snapshot_dir.clone(),
        config.data.listing_path.clone(),
    );
    let reference_date = resolve_reference_date(&port, requested).map_err(|e| fail(&e))?;
    eprintln!(
        "Loading snapshots from {} up to {}",
        config.data.snapshot_dir.display(),
        reference_date
    );
    let universe = Universe::load(&port, reference_date, &config).map_err(|e| fail(&e))?;
    eprintln!("Loaded {} instruments", universe.histories.len());

    Ok(RunContext {
        reference_date,
        universe,
        config,
    })
}

/// Previous cycles from the signal log, restricted to the penalty window.
pub fn load_ledger(
    log: Option<&dyn SignalLogPort>,
    reference_date: NaiveDate,
    weights: &[f64],
) -> Result<DiversityLedger, EngineError> {
    match log {
        Some(log) => Ok(DiversityLedger::from_entries(
            log.read_entries()?,
            reference_date,
            weights,
        )),
        None => Ok(DiversityLedger::empty()),
    }
}

fn run_report(
    config_path: &Path,
    date: Option<NaiveDate>,
    output_path: Option<&Path>,
    no_log: bool,
) -> ExitCode {
    let ctx = match prepare_context(config_path, date) {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };
    let log = ctx
        .config
        .data
        .signal_log_path
        .clone()
        .map(CsvSignalLogAdapter::new);
    let log_port = log.as_ref().map(|l| l as &dyn SignalLogPort);
    run_report_pipeline(&ctx, log_port, &CsvReportAdapter, output_path, no_log)
}

/// Cycle, ledger read/append and output, given prepared inputs.
pub fn run_report_pipeline(
    ctx: &RunContext,
    log: Option<&dyn SignalLogPort>,
    reporter: &dyn ReportPort,
    output_path: Option<&Path>,
    no_log: bool,
) -> ExitCode {
    let ledger = match load_ledger(
        log,
        ctx.reference_date,
        &ctx.config.selection.diversity_penalty_weights,
    ) {
        Ok(l) => l,
        Err(e) => return fail(&e),
    };
    if !ledger.is_empty() {
        eprintln!("Diversity ledger: {} prior cycles", ledger.entries().len());
    }

    let report = match run_cycle(ctx, &ledger) {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };

    println!("{}", format_report(&report));

    if let Some(path) = output_path {
        if let Err(e) = reporter.write_signals(&report.rows, path) {
            return fail(&e);
        }
        eprintln!("Rows written to {}", path.display());
    }

    if let (Some(log), false) = (log, no_log) {
        if let Some(entry) = report.ledger_entry() {
            if let Err(e) = log.append(&entry) {
                return fail(&e);
            }
            eprintln!("Signal log updated ({})", entry.top_strategy);
        }
    }

    ExitCode::SUCCESS
}

fn format_regime(regime: &RegimeState) -> String {
    format!(
        "Regime: {} / {} (momentum {:+.2}%, high volatility: {})",
        regime.main_regime,
        regime.tactical_state,
        regime.momentum_score,
        if regime.is_high_volatility { "yes" } else { "no" }
    )
}

pub fn format_report(report: &CycleReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("Signals for {}\n", report.reference_date));
    out.push_str(&format_regime(&report.regime));
    out.push('\n');
    out.push_str(&format!(
        "Commander: {}{}\n\n",
        report.commander,
        if report.overridden {
            format!(" (override, default {})", report.default_persona)
        } else {
            String::new()
        }
    ));
    out.push_str(&format!(
        "{:>3}  {:<10} {:<24} {:>12} {:>7}  {:<8} {:<28} {:>5}\n",
        "#", "Code", "Name", "Close", "Sigma", "Side", "Strategy", "Score"
    ));
    for row in &report.rows {
        out.push_str(&format!(
            "{:>3}  {:<10} {:<24} {:>12.2} {:>7.2}  {:<8} {:<28} {:>5.1}\n",
            row.rank,
            row.code,
            row.instrument_name,
            row.close,
            row.anomaly_sigma,
            row.sentiment_label,
            row.strategy_name,
            row.score
        ));
    }
    out.push('\n');
    for row in &report.rows {
        out.push_str(&format!("{}. {}\n", row.rank, row.narrative));
    }
    out
}

fn run_backtest(config_path: &Path, date: Option<NaiveDate>, output_path: Option<&Path>) -> ExitCode {
    let ctx = match prepare_context(config_path, date) {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };
    let strategies = catalog();
    let triggers = ctx.triggers(&strategies);
    eprintln!(
        "Backtesting {} strategies over {} instruments...",
        strategies.len(),
        triggers.len()
    );
    let results = ctx.backtests(&strategies, &triggers);

    println!(
        "{:<28} {:<10} {:<6} {:>4} {:>7} {:>9} {:>7} {:>6}",
        "Strategy", "Category", "Side", "Hold", "Win%", "AvgRet%", "Trades", "Score"
    );
    for r in &results {
        println!(
            "{:<28} {:<10} {:<6} {:>4} {:>7.1} {:>+9.2} {:>7} {:>6.1}{}",
            r.strategy_name,
            r.category,
            r.side,
            r.holding_days,
            r.win_rate,
            r.avg_return_pct,
            r.trade_count,
            r.score,
            if r.reliable { "" } else { " *" }
        );
    }

    if let Some(path) = output_path {
        if let Err(e) = CsvReportAdapter.write_backtests(&results, path) {
            return fail(&e);
        }
        eprintln!("Results written to {}", path.display());
    }
    ExitCode::SUCCESS
}

fn run_regime(config_path: &Path, date: Option<NaiveDate>) -> ExitCode {
    let ctx = match prepare_context(config_path, date) {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };
    println!("{}", format_regime(&ctx.regime()));
    ExitCode::SUCCESS
}

fn run_anomalies(config_path: &Path, date: Option<NaiveDate>, top: usize) -> ExitCode {
    let ctx = match prepare_context(config_path, date) {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };
    let snapshot = ctx.snapshot();
    if snapshot.is_empty() {
        return fail(&EngineError::NoHistory {
            date: ctx.reference_date,
        });
    }
    let scores = ctx.anomalies();
    eprintln!(
        "{} of {} instruments eligible on {}",
        scores.len(),
        snapshot.len(),
        ctx.reference_date
    );

    println!(
        "{:<10} {:<24} {:<8} {:>18} {:>7}",
        "Code", "Name", "Bucket", "TradingValue", "Sigma"
    );
    for s in top_anomalies(&scores, top) {
        println!(
            "{:<10} {:<24} {:<8} {:>18.0} {:>7.2}",
            s.instrument_id,
            ctx.universe.display_name(&s.instrument_id),
            snapshot.bucket_of(&s.instrument_id),
            s.trading_value,
            s.z_score
        );
    }

    let grouped = scores_by_bucket(&scores, &snapshot);
    for (bucket, members) in &grouped {
        if let Some(best) = members.first() {
            eprintln!(
                "  {bucket}: {} eligible, top {} ({:.2})",
                members.len(),
                best.instrument_id,
                best.z_score
            );
        }
    }
    ExitCode::SUCCESS
}

fn run_catalog() -> ExitCode {
    for s in catalog() {
        let holding = s
            .holding_days
            .map(|h| format!("{h}d"))
            .unwrap_or_else(|| "default".to_string());
        println!(
            "{:<28} {:<10} {:<6} {:<8} {}",
            s.name, s.category, s.side, holding, s.condition
        );
    }
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let config = match build_engine_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    println!("Config is valid.");
    println!("  Snapshots:   {}", config.data.snapshot_dir.display());
    println!("  Listing:     {}", config.data.listing_path.display());
    match &config.data.signal_log_path {
        Some(p) => println!("  Signal log:  {}", p.display()),
        None => println!("  Signal log:  (disabled)"),
    }
    println!(
        "  Regime from: {}",
        config.data.reference_instrument.as_deref().unwrap_or("(none)")
    );
    println!(
        "  Backtest:    {} days, {}-day hold, {} min trades",
        config.backtest.lookback_window_days,
        config.backtest.holding_horizon_days,
        config.backtest.min_trade_count
    );
    println!("  Top K:       {}", config.selection.top_k);
    ExitCode::SUCCESS
}
