//! Typed configuration extraction and validation.
//!
//! Reads the `[api]`, `[cache]` and `[simulation]` sections through
//! [`ConfigPort`]; CLI flags arrive as overrides and win over the
//! file.

use std::path::PathBuf;

use chrono::NaiveDate;

use super::error::AuagError;
use super::record::Asset;
use super::simulate::StrategyParameters;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_BASE_URL: &str = "https://metals-api.com/api";
pub const DEFAULT_CACHE_DIR: &str = "data";

#[derive(Debug, Clone, PartialEq)]
pub struct ApiSettings {
    /// No key means the fetcher is skipped and gaps stay gaps.
    pub key: Option<String>,
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    pub dir: PathBuf,
    /// Optional local CSV consulted once per session when the cache
    /// is empty.
    pub seed_csv: Option<PathBuf>,
}

/// CLI-provided values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct StrategyOverrides {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub start_asset: Option<Asset>,
    pub start_amount: Option<f64>,
    pub up_threshold: Option<f64>,
    pub down_threshold: Option<f64>,
}

pub fn api_settings(config: &dyn ConfigPort) -> ApiSettings {
    ApiSettings {
        key: config
            .get_string("api", "key")
            .filter(|k| !k.trim().is_empty()),
        base_url: config
            .get_string("api", "base_url")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
    }
}

pub fn cache_settings(config: &dyn ConfigPort) -> CacheSettings {
    CacheSettings {
        dir: config
            .get_string("cache", "dir")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR)),
        seed_csv: config.get_string("cache", "seed_csv").map(PathBuf::from),
    }
}

/// Resolve the five strategy inputs plus window, override-first, and
/// validate the result.
pub fn strategy_parameters(
    config: &dyn ConfigPort,
    overrides: &StrategyOverrides,
) -> Result<StrategyParameters, AuagError> {
    let params = StrategyParameters {
        start_date: resolve_date(config, overrides.start_date, "start_date")?,
        end_date: resolve_date(config, overrides.end_date, "end_date")?,
        start_asset: resolve_asset(config, overrides.start_asset)?,
        start_amount: resolve_amount(config, overrides.start_amount)?,
        up_threshold: resolve_threshold(config, overrides.up_threshold, "up_threshold")?,
        down_threshold: resolve_threshold(config, overrides.down_threshold, "down_threshold")?,
    };
    params.validate()?;
    Ok(params)
}

fn resolve_date(
    config: &dyn ConfigPort,
    flag: Option<NaiveDate>,
    key: &str,
) -> Result<NaiveDate, AuagError> {
    if let Some(date) = flag {
        return Ok(date);
    }
    match config.get_string("simulation", key) {
        None => Err(AuagError::ConfigMissing {
            section: "simulation".to_string(),
            key: key.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            AuagError::ConfigInvalid {
                section: "simulation".to_string(),
                key: key.to_string(),
                reason: format!("invalid {} format, expected YYYY-MM-DD", key),
            }
        }),
    }
}

fn resolve_asset(config: &dyn ConfigPort, flag: Option<Asset>) -> Result<Asset, AuagError> {
    if let Some(asset) = flag {
        return Ok(asset);
    }
    match config.get_string("simulation", "start_asset") {
        None => Err(AuagError::ConfigMissing {
            section: "simulation".to_string(),
            key: "start_asset".to_string(),
        }),
        Some(s) => s.parse().map_err(|reason| AuagError::ConfigInvalid {
            section: "simulation".to_string(),
            key: "start_asset".to_string(),
            reason,
        }),
    }
}

fn resolve_amount(config: &dyn ConfigPort, flag: Option<f64>) -> Result<f64, AuagError> {
    if let Some(amount) = flag {
        return Ok(amount);
    }
    config
        .get_double("simulation", "start_amount")
        .ok_or_else(|| AuagError::ConfigMissing {
            section: "simulation".to_string(),
            key: "start_amount".to_string(),
        })
}

fn resolve_threshold(
    config: &dyn ConfigPort,
    flag: Option<f64>,
    key: &str,
) -> Result<Option<f64>, AuagError> {
    if flag.is_some() {
        return Ok(flag);
    }
    match config.get_string("simulation", key) {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| AuagError::ConfigInvalid {
                section: "simulation".to_string(),
                key: key.to_string(),
                reason: format!("{key} must be a number"),
            }),
    }
}
