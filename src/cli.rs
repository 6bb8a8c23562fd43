//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvMarketData;
use crate::adapters::csv_export_adapter::CsvExportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::ticker_store::{FileTickerStore, InMemoryTickerStore};
use crate::domain::calendar::resolve_rebalance_dates;
use crate::domain::config_validation::{
    resolve_scenario, validate_data_config, validate_index_config,
};
use crate::domain::error::IndexError;
use crate::domain::pipeline::{IndexReport, IndexSettings, make_index};
use crate::domain::scenario::{DEFAULT_SCENARIO_ID, Scenario};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::MarketDataPort;
use crate::ports::export_port::ExportPort;
use crate::ports::ticker_store_port::TickerSetStore;

#[derive(Parser, Debug)]
#[command(
    name = "indexmaker",
    about = "Market-cap weighted index construction and backtesting"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the index and print its month-start levels
    Build {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated tickers, or "default" for the stored set
        #[arg(short, long)]
        tickers: Option<String>,
        /// Directory for the exported workbook files
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show selection and adjustment dates for the configured scenario
    Dates {
        #[arg(short, long)]
        config: PathBuf,
        /// Scenario id overriding the configuration
        #[arg(long)]
        scenario: Option<i64>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List the built-in rebalancing scenarios
    Scenarios,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Build {
            config,
            tickers,
            output,
        } => run_build(&config, tickers.as_deref(), output.as_ref()),
        Command::Dates { config, scenario } => run_dates(&config, scenario),
        Command::Validate { config } => run_validate(&config),
        Command::Scenarios => run_scenarios(),
    }
}

fn fail(err: &IndexError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(err)
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| fail(&e))
}

/// Ticker request: the command-line value wins over `[index] tickers`.
pub fn resolve_ticker_input(
    ticker_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Option<String> {
    ticker_override
        .map(str::to_string)
        .or_else(|| config.get_string("index", "tickers"))
        .filter(|s| !s.trim().is_empty())
}

/// File-backed store when `[data] ticker_store` is set, else in-memory.
pub fn ticker_store_from_config(config: &dyn ConfigPort) -> Box<dyn TickerSetStore> {
    match config
        .get_string("data", "ticker_store")
        .filter(|s| !s.trim().is_empty())
    {
        Some(path) => Box::new(FileTickerStore::new(path.trim())),
        None => Box::new(InMemoryTickerStore::default()),
    }
}

/// Export directory: the command-line value wins over `[export] output_dir`.
pub fn resolve_output_dir(
    output_override: Option<&PathBuf>,
    config: &dyn ConfigPort,
) -> Option<PathBuf> {
    output_override.cloned().or_else(|| {
        config
            .get_string("export", "output_dir")
            .filter(|s| !s.trim().is_empty())
            .map(|s| PathBuf::from(s.trim()))
    })
}

fn run_build(
    config_path: &Path,
    ticker_override: Option<&str>,
    output_override: Option<&PathBuf>,
) -> ExitCode {
    // Stage 1: Load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_data_config(&adapter) {
        return fail(&e);
    }
    let settings = match IndexSettings::from_config(&adapter) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    // Stage 2: Wire adapters
    let data = match CsvMarketData::from_config(&adapter) {
        Ok(d) => d,
        Err(e) => return fail(&e),
    };
    let store = ticker_store_from_config(&adapter);
    let tickers = resolve_ticker_input(ticker_override, &adapter);
    let output_dir = resolve_output_dir(output_override, &adapter);

    // Stage 3: Build, report, export
    run_build_pipeline(
        &data,
        store.as_ref(),
        &settings,
        tickers.as_deref(),
        output_dir.as_deref(),
        &CsvExportAdapter::new(),
    )
}

pub fn run_build_pipeline(
    data: &dyn MarketDataPort,
    store: &dyn TickerSetStore,
    settings: &IndexSettings,
    tickers: Option<&str>,
    output_dir: Option<&Path>,
    exporter: &dyn ExportPort,
) -> ExitCode {
    eprintln!(
        "Building index: scenario {}, variants {}",
        settings.scenario,
        settings
            .variants
            .iter()
            .map(|v| v.code())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let report = match make_index(tickers, settings, data, store) {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };

    print_summary(&report);

    if let Some(dir) = output_dir {
        for run in &report.runs {
            if let Err(e) = exporter.write(&report.workbook(run), dir) {
                return fail(&e);
            }
        }
        if let Some(levels) = report.index_levels() {
            if let Err(e) = exporter.write_index_levels(&levels, dir) {
                return fail(&e);
            }
        }
        eprintln!("\nWorkbooks written to: {}", dir.display());
    }
    ExitCode::SUCCESS
}

fn print_summary(report: &IndexReport) {
    eprintln!("\n{}", report.available_text);
    if !report.removed_text.is_empty() {
        eprintln!("{}", report.removed_text);
    }

    for run in &report.runs {
        let series = &run.result.index_series;
        eprintln!("\n=== {} ===", run.variant);
        eprintln!("Rebalances:   {}", run.weights.len());
        match (series.first(), series.last()) {
            (Some(first), Some(last)) => {
                eprintln!("First level:  {} {:.4}", first.date, first.level);
                eprintln!("Last level:   {} {:.4}", last.date, last.level);
            }
            _ => eprintln!("No index levels produced"),
        }
        for point in run.result.monthly_series() {
            println!("{},{},{}", run.variant, point.date, point.level);
        }
    }
}

fn run_dates(config_path: &Path, scenario_override: Option<i64>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let scenario = match scenario_override {
        Some(id) => Scenario::from_id(id),
        None => resolve_scenario(&adapter),
    };
    let scenario = match scenario {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let offset_days = adapter.get_int("index", "offset_days", 0);

    let data = match CsvMarketData::from_config(&adapter) {
        Ok(d) => d,
        Err(e) => return fail(&e),
    };
    let (prices, market_caps) = match (data.load_prices(), data.load_market_caps()) {
        (Ok(p), Ok(m)) => (p, m),
        (Err(e), _) | (_, Err(e)) => return fail(&e),
    };

    let pairs = resolve_rebalance_dates(
        market_caps.dates(),
        prices.dates(),
        &scenario,
        offset_days,
    );
    eprintln!("Scenario: {scenario}, offset {offset_days} days");
    println!("selection_date,adjustment_date");
    for pair in &pairs {
        println!("{},{}", pair.selection_date, pair.adjustment_date);
    }
    eprintln!("{} rebalance dates", pairs.len());
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_data_config(&adapter) {
        return fail(&e);
    }
    if let Err(e) = validate_index_config(&adapter) {
        return fail(&e);
    }
    let settings = match IndexSettings::from_config(&adapter) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    eprintln!("\nIndex:");
    eprintln!("  scenario:       {}", settings.scenario);
    eprintln!("  offset days:    {}", settings.offset_days);
    eprintln!("  start level:    {}", settings.backtest.start_level);
    eprintln!("  divisor:        {}", settings.backtest.initial_divisor);
    match settings.backtest.first_index_date {
        Some(date) => eprintln!("  first date:     {date}"),
        None => eprintln!("  first date:     first rebalance"),
    }
    eprintln!(
        "  caps:           max {} min {} (threshold {})",
        settings.caps.max_cap, settings.caps.min_cap, settings.caps.market_cap_threshold
    );
    eprintln!(
        "  variants:       {}",
        settings
            .variants
            .iter()
            .map(|v| v.code())
            .collect::<Vec<_>>()
            .join(", ")
    );

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_scenarios() -> ExitCode {
    for (id, scenario) in Scenario::all() {
        let marker = if id == DEFAULT_SCENARIO_ID { " (default)" } else { "" };
        println!("{id:>2}  {scenario}{marker}");
    }
    ExitCode::SUCCESS
}
