//! CLI definition and dispatch.

use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::adapters::csv_adapter::{self, CsvSeedSource};
use crate::adapters::file_cache_adapter::FileCacheAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::metals_api_adapter::MetalsApiSource;
use crate::adapters::tokio_sleep_adapter::TokioSleeper;
use crate::domain::config::{self, StrategyOverrides};
use crate::domain::error::AuagError;
use crate::domain::history::HistoryAssembler;
use crate::domain::record::Asset;
use crate::domain::series::merge;
use crate::domain::simulate::{simulate, SimulationPoint};
use crate::domain::store::SeriesStore;
use crate::ports::config_port::ConfigPort;
use crate::ports::price_source_port::PriceSource;

#[derive(Parser, Debug)]
#[command(name = "auag", about = "Gold/silver price history and ratio-switching simulator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Assemble the price history and run a strategy simulation
    Simulate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        asset: Option<String>,
        #[arg(long)]
        amount: Option<f64>,
        #[arg(long)]
        up: Option<f64>,
        #[arg(long)]
        down: Option<f64>,
        /// Write the full simulation series as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Fill the cached history for a date window
    Fetch {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    /// Merge a CSV file into the cached series
    Import {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Export the cached window as date,gold,silver CSV
    Export {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Show cached series range and record count
    Info {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub async fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Simulate {
            config,
            start,
            end,
            asset,
            amount,
            up,
            down,
            output,
        } => {
            run_simulate(
                &config,
                start.as_deref(),
                end.as_deref(),
                asset.as_deref(),
                amount,
                up,
                down,
                output.as_ref(),
            )
            .await
        }
        Command::Fetch { config, start, end } => {
            run_fetch(&config, start.as_deref(), end.as_deref()).await
        }
        Command::Import { config, file } => run_import(&config, &file),
        Command::Export {
            config,
            start,
            end,
            output,
        } => run_export(&config, start.as_deref(), end.as_deref(), &output),
        Command::Info { config } => run_info(&config),
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, AuagError> {
    FileConfigAdapter::from_file(path).map_err(|e| AuagError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn parse_date_flag(value: &str, name: &str) -> Result<NaiveDate, AuagError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| AuagError::Validation {
        reason: format!("invalid --{name} value, expected YYYY-MM-DD"),
    })
}

fn parse_asset_flag(value: &str) -> Result<Asset, AuagError> {
    value.parse().map_err(|reason| AuagError::Validation { reason })
}

/// Resolve a date window from flags, falling back to the
/// `[simulation]` section.
fn resolve_window(
    adapter: &dyn ConfigPort,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(NaiveDate, NaiveDate), AuagError> {
    let start_date = match start {
        Some(s) => parse_date_flag(s, "start")?,
        None => parse_config_date(adapter, "start_date")?,
    };
    let end_date = match end {
        Some(s) => parse_date_flag(s, "end")?,
        None => parse_config_date(adapter, "end_date")?,
    };
    if end_date < start_date {
        return Err(AuagError::Validation {
            reason: format!("end date {end_date} before start date {start_date}"),
        });
    }
    Ok((start_date, end_date))
}

fn parse_config_date(adapter: &dyn ConfigPort, key: &str) -> Result<NaiveDate, AuagError> {
    match adapter.get_string("simulation", key) {
        None => Err(AuagError::ConfigMissing {
            section: "simulation".to_string(),
            key: key.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            AuagError::ConfigInvalid {
                section: "simulation".to_string(),
                key: key.to_string(),
                reason: format!("invalid {key} format, expected YYYY-MM-DD"),
            }
        }),
    }
}

fn build_assembler(adapter: &dyn ConfigPort) -> HistoryAssembler {
    let cache = config::cache_settings(adapter);
    let store = SeriesStore::new(Box::new(FileCacheAdapter::new(cache.dir)));
    let mut assembler = HistoryAssembler::new(store, Box::new(TokioSleeper));
    if let Some(seed_csv) = cache.seed_csv {
        assembler = assembler.with_seed(Box::new(CsvSeedSource::new(seed_csv)));
    }
    assembler
}

fn build_source(adapter: &dyn ConfigPort) -> Option<MetalsApiSource> {
    let api = config::api_settings(adapter);
    api.key
        .map(|key| MetalsApiSource::new(api.base_url, key, Box::new(TokioSleeper)))
}

#[allow(clippy::too_many_arguments)]
pub async fn run_simulate(
    config_path: &PathBuf,
    start: Option<&str>,
    end: Option<&str>,
    asset: Option<&str>,
    amount: Option<f64>,
    up: Option<f64>,
    down: Option<f64>,
    output: Option<&PathBuf>,
) -> Result<(), AuagError> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;

    let overrides = StrategyOverrides {
        start_date: start.map(|s| parse_date_flag(s, "start")).transpose()?,
        end_date: end.map(|s| parse_date_flag(s, "end")).transpose()?,
        start_asset: asset.map(parse_asset_flag).transpose()?,
        start_amount: amount,
        up_threshold: up,
        down_threshold: down,
    };
    let params = config::strategy_parameters(&adapter, &overrides)?;

    eprintln!(
        "Assembling history {}..{}",
        params.start_date, params.end_date
    );
    let mut assembler = build_assembler(&adapter);
    let source = build_source(&adapter);
    let history = assembler
        .load_merged_prices(
            params.start_date,
            params.end_date,
            source.as_ref().map(|s| s as &dyn PriceSource),
        )
        .await?;

    if history.dropped_rows > 0 {
        eprintln!("Dropped {} unreadable rows", history.dropped_rows);
    }
    if let Some(reason) = &history.fetch_error {
        eprintln!("Warning: some gaps could not be fetched: {reason}");
    }
    if history.records.is_empty() {
        eprintln!("No price data in the requested window, nothing to display");
        return Ok(());
    }

    eprintln!("Simulating over {} days", history.records.len());
    let points = simulate(&history.records, &params);
    print_summary(&params.start_asset, &points);

    if let Some(path) = output {
        let file = File::create(path)?;
        csv_adapter::write_simulation(file, &points)?;
        eprintln!("Simulation series written to {}", path.display());
    }
    Ok(())
}

fn print_summary(start_asset: &Asset, points: &[SimulationPoint]) {
    let Some(last) = points.last() else {
        return;
    };

    println!("days:            {}", points.len());
    println!("start asset:     {start_asset}");

    let switches: Vec<&SimulationPoint> =
        points.iter().filter(|p| p.switched.is_some()).collect();
    println!("switches:        {}", switches.len());
    for point in &switches {
        if let Some(direction) = point.switched {
            println!("  {}  {}  ratio {:.2}", point.date, direction, point.ratio);
        }
    }

    println!(
        "strategy:        {:>12.2}  ({:+.2}%)  holding {}",
        last.portfolio_value, last.portfolio_pct, last.held_asset
    );
    println!(
        "gold baseline:   {:>12.2}  ({:+.2}%)",
        last.gold_only_value, last.gold_pct
    );
    println!(
        "silver baseline: {:>12.2}  ({:+.2}%)",
        last.silver_only_value, last.silver_pct
    );
}

pub async fn run_fetch(
    config_path: &PathBuf,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(), AuagError> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;
    let (start_date, end_date) = resolve_window(&adapter, start, end)?;

    eprintln!("Assembling history {start_date}..{end_date}");
    let mut assembler = build_assembler(&adapter);
    let source = build_source(&adapter);
    if source.is_none() {
        eprintln!("No API key configured, only local data will be used");
    }
    let history = assembler
        .load_merged_prices(
            start_date,
            end_date,
            source.as_ref().map(|s| s as &dyn PriceSource),
        )
        .await?;

    if let Some(reason) = &history.fetch_error {
        eprintln!("Warning: some gaps could not be fetched: {reason}");
    }
    println!(
        "{} of {} days covered",
        history.records.len(),
        (end_date - start_date).num_days() + 1
    );
    Ok(())
}

pub fn run_import(config_path: &PathBuf, file: &PathBuf) -> Result<(), AuagError> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;

    eprintln!("Reading {}", file.display());
    let parsed = csv_adapter::read_series(File::open(file)?)?;
    if parsed.dropped_rows > 0 {
        eprintln!("Dropped {} unreadable rows", parsed.dropped_rows);
    }

    let cache = config::cache_settings(&adapter);
    let store = SeriesStore::new(Box::new(FileCacheAdapter::new(cache.dir)));
    let existing = store.load();
    // the upload wins over cached data for a given date
    let merged = merge(&existing, &parsed.records);
    store.save(&merged);

    println!(
        "Imported {} records ({} total cached)",
        parsed.records.len(),
        merged.len()
    );
    Ok(())
}

pub fn run_export(
    config_path: &PathBuf,
    start: Option<&str>,
    end: Option<&str>,
    output: &PathBuf,
) -> Result<(), AuagError> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;
    let (start_date, end_date) = resolve_window(&adapter, start, end)?;

    let cache = config::cache_settings(&adapter);
    let store = SeriesStore::new(Box::new(FileCacheAdapter::new(cache.dir)));
    let series = store.load();
    let window = crate::domain::series::slice_range(&series, start_date, end_date);

    let file = File::create(output)?;
    csv_adapter::write_series(file, &window)?;
    println!("Exported {} records to {}", window.len(), output.display());
    Ok(())
}

pub fn run_info(config_path: &PathBuf) -> Result<(), AuagError> {
    let adapter = load_config(config_path)?;
    let cache = config::cache_settings(&adapter);
    let store = SeriesStore::new(Box::new(FileCacheAdapter::new(cache.dir)));
    let series = store.load();

    match (series.first(), series.last()) {
        (Some(first), Some(last)) => {
            println!("{} records cached, {} .. {}", series.len(), first.date, last.date);
        }
        _ => println!("cache is empty"),
    }
    Ok(())
}

pub fn run_validate(config_path: &PathBuf) -> Result<(), AuagError> {
    let adapter = load_config(config_path)?;
    let params = config::strategy_parameters(&adapter, &StrategyOverrides::default())?;
    let api = config::api_settings(&adapter);

    println!("Config OK");
    println!(
        "  window:     {} .. {}",
        params.start_date, params.end_date
    );
    println!("  start:      {} of {}", params.start_amount, params.start_asset);
    match (params.up_threshold, params.down_threshold) {
        (None, None) => println!("  thresholds: none (buy and hold)"),
        (up, down) => {
            if let Some(up) = up {
                println!("  up:         {up}");
            }
            if let Some(down) = down {
                println!("  down:       {down}");
            }
        }
    }
    println!(
        "  api key:    {}",
        if api.key.is_some() { "present" } else { "absent" }
    );
    Ok(())
}
