//! Daily price record for the two metals.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which metal a holding is denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Asset {
    Gold,
    Silver,
}

impl Asset {
    pub fn other(self) -> Asset {
        match self {
            Asset::Gold => Asset::Silver,
            Asset::Silver => Asset::Gold,
        }
    }
}

impl std::fmt::Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Asset::Gold => write!(f, "gold"),
            Asset::Silver => write!(f, "silver"),
        }
    }
}

impl std::str::FromStr for Asset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gold" | "au" | "xau" => Ok(Asset::Gold),
            "silver" | "ag" | "xag" => Ok(Asset::Silver),
            other => Err(format!("unknown asset: {other}")),
        }
    }
}

/// One day of USD/oz prices. The struct is also the persisted cache
/// wire form, so field names are part of the blob format.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub date: NaiveDate,
    pub gold: f64,
    pub silver: f64,
}

impl PriceRecord {
    pub fn price(&self, asset: Asset) -> f64 {
        match asset {
            Asset::Gold => self.gold,
            Asset::Silver => self.silver,
        }
    }

    /// gold/silver ratio for the day; currency-independent.
    pub fn ratio(&self) -> f64 {
        self.gold / self.silver
    }

    /// Both prices strictly positive and finite.
    pub fn is_valid(&self) -> bool {
        self.gold.is_finite() && self.gold > 0.0 && self.silver.is_finite() && self.silver > 0.0
    }
}
