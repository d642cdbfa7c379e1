//! CLI integration tests.
//!
//! Tests cover:
//! - Config building and validation (build_engine_config)
//! - Reference date resolution
//! - `report`, `backtest`, `regime`, `anomalies`, `catalog` and `validate`
//!   against a snapshot directory on disk
//! - Signal log append and `--no-log`

mod common;

use clap::Parser;
use common::*;
use signaldesk::adapters::csv_adapter::CsvSnapshotAdapter;
use signaldesk::adapters::file_config_adapter::FileConfigAdapter;
use signaldesk::cli::{self, Cli};
use signaldesk::domain::error::EngineError;
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use tempfile::TempDir;

fn same_code(a: ExitCode, b: ExitCode) -> bool {
    format!("{a:?}") == format!("{b:?}")
}

fn run_cli(args: &[&str]) -> ExitCode {
    let mut argv = vec!["signaldesk"];
    argv.extend_from_slice(args);
    cli::run(Cli::parse_from(argv))
}

/// Snapshot directory, listing and INI file inside one temp dir.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let snapshots = dir.path().join("snapshots");
        fs::create_dir_all(&snapshots).unwrap();

        let mut bars = Vec::new();
        for (i, code) in ["AAA", "BBB", "CCC", "DDD", "IDX"].iter().enumerate() {
            bars.extend(wavy_bars(code, 150, 40.0 + 15.0 * i as f64, 500.0 * (i + 1) as f64));
        }
        write_snapshot_dir(&snapshots, &bars);
        fs::write(
            dir.path().join("listing.csv"),
            "code,name,size_bucket,classification\n\
             AAA,Alpha,large,equity\n\
             BBB,Beta,mid,equity\n\
             CCC,Gamma,small,equity\n",
        )
        .unwrap();

        let ini = format!(
            "[data]\n\
             snapshot_dir = {}\n\
             listing_path = {}\n\
             signal_log_path = {}\n\
             reference_instrument = IDX\n\
             [anomaly]\n\
             liquidity_percentile = 0\n\
             min_sample_size = 2\n\
             [backtest]\n\
             min_trade_count = 1\n",
            snapshots.display(),
            dir.path().join("listing.csv").display(),
            dir.path().join("signal_log.csv").display(),
        );
        fs::write(dir.path().join("engine.ini"), ini).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> String {
        self.dir.path().join(name).display().to_string()
    }

    fn config(&self) -> String {
        self.path("engine.ini")
    }
}

fn line_count(path: &Path) -> usize {
    fs::read_to_string(path).map(|c| c.lines().count()).unwrap_or(0)
}

mod config_building {
    use super::*;

    #[test]
    fn valid_file_builds_config() {
        let ws = Workspace::new();
        let adapter = FileConfigAdapter::from_file(ws.config()).unwrap();
        let config = cli::build_engine_config(&adapter).unwrap();
        assert_eq!(config.data.reference_instrument.as_deref(), Some("IDX"));
        assert_eq!(config.anomaly.min_sample_size, 2);
        assert_eq!(config.backtest.min_trade_count, 1);
        assert_eq!(config.backtest.holding_horizon_days, 3);
    }

    #[test]
    fn unparsable_value_is_rejected() {
        let adapter =
            FileConfigAdapter::from_string("[selection]\ntop_k = five\n").unwrap();
        let err = cli::build_engine_config(&adapter).unwrap_err();
        assert!(matches!(err, EngineError::ConfigInvalid { .. }));
    }

    #[test]
    fn out_of_range_value_is_rejected() {
        let adapter =
            FileConfigAdapter::from_string("[anomaly]\nliquidity_percentile = 1.5\n").unwrap();
        let err = cli::build_engine_config(&adapter).unwrap_err();
        assert!(matches!(err, EngineError::ConfigInvalid { key, .. } if key == "liquidity_percentile"));
    }

    #[test]
    fn parse_date_accepts_iso_only() {
        assert_eq!(cli::parse_date("2024-03-04").unwrap(), day(63));
        assert!(cli::parse_date("04/03/2024").is_err());
    }
}

mod reference_date {
    use super::*;

    #[test]
    fn defaults_to_latest_snapshot() {
        let ws = Workspace::new();
        let port = CsvSnapshotAdapter::new(
            ws.dir.path().join("snapshots"),
            ws.dir.path().join("listing.csv"),
        );
        assert_eq!(cli::resolve_reference_date(&port, None).unwrap(), day(149));
        assert_eq!(cli::resolve_reference_date(&port, Some(day(10))).unwrap(), day(10));
    }

    #[test]
    fn empty_directory_is_a_snapshot_error() {
        let dir = TempDir::new().unwrap();
        let port = CsvSnapshotAdapter::new(dir.path().to_path_buf(), dir.path().join("x.csv"));
        let err = cli::resolve_reference_date(&port, None).unwrap_err();
        assert!(matches!(err, EngineError::Snapshot { .. }));
    }
}

mod commands {
    use super::*;

    #[test]
    fn report_writes_rows_and_updates_log() {
        let ws = Workspace::new();
        let rows = ws.path("out/rows.csv");
        let log = ws.dir.path().join("signal_log.csv");

        let code = run_cli(&["report", "-c", &ws.config(), "--date", "2024-05-20", "-o", &rows]);
        assert!(same_code(code, ExitCode::SUCCESS));

        let content = fs::read_to_string(&rows).unwrap();
        let mut lines = content.lines();
        assert!(lines.next().unwrap().starts_with("rank,instrument_name,code,"));
        let first_row = lines.next().unwrap();
        let neutral = first_row.contains("No Signal");
        assert_eq!(line_count(&log), if neutral { 0 } else { 2 });

        let code = run_cli(&[
            "report", "-c", &ws.config(), "--date", "2024-05-20", "--no-log",
        ]);
        assert!(same_code(code, ExitCode::SUCCESS));
        assert_eq!(line_count(&log), if neutral { 0 } else { 2 });
    }

    #[test]
    fn report_without_data_exits_with_data_code() {
        let ws = Workspace::new();
        let code = run_cli(&["report", "-c", &ws.config(), "--date", "2030-01-01", "--no-log"]);
        assert!(same_code(code, ExitCode::from(5)));
    }

    #[test]
    fn missing_config_exits_with_config_code() {
        let code = run_cli(&["validate", "-c", "/nonexistent/engine.ini"]);
        assert!(same_code(code, ExitCode::from(2)));
    }

    #[test]
    fn backtest_writes_one_row_per_strategy() {
        let ws = Workspace::new();
        let out = ws.path("backtests.csv");
        let code = run_cli(&["backtest", "-c", &ws.config(), "-o", &out]);
        assert!(same_code(code, ExitCode::SUCCESS));
        let strategies = signaldesk::domain::catalog::catalog().len();
        assert_eq!(line_count(Path::new(&out)), strategies + 1);
    }

    #[test]
    fn diagnostic_commands_succeed() {
        let ws = Workspace::new();
        let config = ws.config();
        assert!(same_code(run_cli(&["regime", "-c", &config]), ExitCode::SUCCESS));
        assert!(same_code(
            run_cli(&["anomalies", "-c", &config, "--top", "3"]),
            ExitCode::SUCCESS
        ));
        assert!(same_code(run_cli(&["catalog"]), ExitCode::SUCCESS));
        assert!(same_code(run_cli(&["validate", "-c", &config]), ExitCode::SUCCESS));
    }
}
