//! CSV import/export adapter.
//!
//! Import matches header names case-insensitively against date, gold
//! and silver patterns (XAU/XAG aliases included) in any column
//! order; unreadable rows are dropped and counted, never fatal.

use std::fs::File;
use std::io;
use std::path::PathBuf;

use tracing::warn;

use crate::domain::error::AuagError;
use crate::domain::normalize::normalize_row;
use crate::domain::record::PriceRecord;
use crate::domain::series::sort_dedupe;
use crate::domain::simulate::SimulationPoint;
use crate::ports::price_source_port::{ParsedSeries, SeedSource};

fn is_date_header(name: &str) -> bool {
    name.contains("date") || name.contains("time")
}

fn is_gold_header(name: &str) -> bool {
    name.contains("gold") || name.contains("xau") || name == "au"
}

fn is_silver_header(name: &str) -> bool {
    name.contains("silver") || name.contains("xag") || name == "ag"
}

/// Column positions resolved from a header row.
#[derive(Debug, PartialEq, Eq)]
struct ColumnMap {
    date: usize,
    gold: usize,
    silver: usize,
}

fn resolve_columns(headers: &csv::StringRecord) -> Result<ColumnMap, AuagError> {
    let mut date = None;
    let mut gold = None;
    let mut silver = None;

    for (i, raw) in headers.iter().enumerate() {
        let name = raw.trim().to_lowercase();
        if date.is_none() && is_date_header(&name) {
            date = Some(i);
        } else if gold.is_none() && is_gold_header(&name) {
            gold = Some(i);
        } else if silver.is_none() && is_silver_header(&name) {
            silver = Some(i);
        }
    }

    match (date, gold, silver) {
        (Some(date), Some(gold), Some(silver)) => Ok(ColumnMap { date, gold, silver }),
        _ => Err(AuagError::Parse {
            reason: "header must contain date, gold and silver columns".into(),
        }),
    }
}

/// Read a price series from CSV. The returned series is sorted and
/// deduplicated; `dropped_rows` counts rows that failed to normalize.
pub fn read_series<R: io::Read>(reader: R) -> Result<ParsedSeries, AuagError> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers().map_err(|e| AuagError::Parse {
        reason: format!("CSV header error: {e}"),
    })?;
    let columns = resolve_columns(headers)?;

    let mut records = Vec::new();
    let mut dropped_rows = 0;

    for row in rdr.records() {
        let row = match row {
            Ok(row) => row,
            Err(_) => {
                dropped_rows += 1;
                continue;
            }
        };
        let fields = (
            row.get(columns.date),
            row.get(columns.gold),
            row.get(columns.silver),
        );
        let record = match fields {
            (Some(date), Some(gold), Some(silver)) => normalize_row(date, gold, silver),
            _ => None,
        };
        match record {
            Some(record) => records.push(record),
            None => dropped_rows += 1,
        }
    }

    Ok(ParsedSeries {
        records: sort_dedupe(records),
        dropped_rows,
    })
}

/// Write a series as `date,gold,silver` CSV.
pub fn write_series<W: io::Write>(writer: W, records: &[PriceRecord]) -> Result<(), AuagError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["date", "gold", "silver"])
        .map_err(csv_write_error)?;
    for record in records {
        wtr.write_record([
            record.date.format("%Y-%m-%d").to_string(),
            record.gold.to_string(),
            record.silver.to_string(),
        ])
        .map_err(csv_write_error)?;
    }
    wtr.flush().map_err(AuagError::Io)
}

/// Write the full simulation series for the charting surface.
pub fn write_simulation<W: io::Write>(
    writer: W,
    points: &[SimulationPoint],
) -> Result<(), AuagError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        "date",
        "gold",
        "silver",
        "ratio",
        "held_asset",
        "held_units",
        "portfolio_value",
        "gold_only_value",
        "silver_only_value",
        "portfolio_pct",
        "gold_pct",
        "silver_pct",
        "switched",
    ])
    .map_err(csv_write_error)?;
    for point in points {
        wtr.write_record([
            point.date.format("%Y-%m-%d").to_string(),
            point.gold.to_string(),
            point.silver.to_string(),
            point.ratio.to_string(),
            point.held_asset.to_string(),
            point.held_units.to_string(),
            point.portfolio_value.to_string(),
            point.gold_only_value.to_string(),
            point.silver_only_value.to_string(),
            point.portfolio_pct.to_string(),
            point.gold_pct.to_string(),
            point.silver_pct.to_string(),
            point.switched.map(|s| s.to_string()).unwrap_or_default(),
        ])
        .map_err(csv_write_error)?;
    }
    wtr.flush().map_err(AuagError::Io)
}

fn csv_write_error(e: csv::Error) -> AuagError {
    AuagError::Parse {
        reason: format!("CSV write error: {e}"),
    }
}

/// Bootstrap source backed by a local CSV file. A missing file is
/// "no data", not an error; the assembler moves on.
pub struct CsvSeedSource {
    path: PathBuf,
    name: String,
}

impl CsvSeedSource {
    pub fn new(path: PathBuf) -> Self {
        let name = format!("csv:{}", path.display());
        Self { path, name }
    }
}

impl SeedSource for CsvSeedSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<ParsedSeries, AuagError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %self.path.display(), "seed CSV not found");
                return Ok(ParsedSeries::default());
            }
            Err(e) => return Err(e.into()),
        };
        read_series(file)
    }
}
