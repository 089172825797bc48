//! Threshold-switching strategy simulation.
//!
//! A single forward pass over the price series. State is the currently
//! held asset plus units held; a switch fires when the gold/silver
//! ratio crosses a configured threshold, executes at the step's closing
//! prices, and flips the holding. Two buy-and-hold baselines (100%
//! gold, 100% silver) run alongside for comparison. Pure computation:
//! no I/O, no clock, bit-for-bit reproducible.

use chrono::NaiveDate;

use super::error::AuagError;
use super::record::{Asset, PriceRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyParameters {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_asset: Asset,
    pub start_amount: f64,
    /// Ratio at or above this fires gold → silver.
    pub up_threshold: Option<f64>,
    /// Ratio at or below this fires silver → gold.
    pub down_threshold: Option<f64>,
}

impl StrategyParameters {
    pub fn validate(&self) -> Result<(), AuagError> {
        if self.end_date < self.start_date {
            return Err(AuagError::Validation {
                reason: "end date before start date".into(),
            });
        }
        if !self.start_amount.is_finite() || self.start_amount <= 0.0 {
            return Err(AuagError::Validation {
                reason: "start amount must be positive".into(),
            });
        }
        for (name, threshold) in [
            ("up threshold", self.up_threshold),
            ("down threshold", self.down_threshold),
        ] {
            if let Some(t) = threshold {
                if !t.is_finite() || t <= 0.0 {
                    return Err(AuagError::Validation {
                        reason: format!("{name} must be positive"),
                    });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchDirection {
    GoldToSilver,
    SilverToGold,
}

impl std::fmt::Display for SwitchDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwitchDirection::GoldToSilver => write!(f, "gold->silver"),
            SwitchDirection::SilverToGold => write!(f, "silver->gold"),
        }
    }
}

/// One simulated day, derived entirely from the input slice and
/// parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationPoint {
    pub date: NaiveDate,
    pub gold: f64,
    pub silver: f64,
    pub ratio: f64,
    pub held_asset: Asset,
    pub held_units: f64,
    pub portfolio_value: f64,
    pub gold_only_value: f64,
    pub silver_only_value: f64,
    pub portfolio_pct: f64,
    pub gold_pct: f64,
    pub silver_pct: f64,
    pub switched: Option<SwitchDirection>,
}

/// Run the crossing state machine over an ordered slice.
///
/// An empty slice yields an empty output: nothing to display, not an
/// error.
pub fn simulate(slice: &[PriceRecord], params: &StrategyParameters) -> Vec<SimulationPoint> {
    let Some(first) = slice.first() else {
        return Vec::new();
    };

    let start_amount = params.start_amount;
    let mut held = params.start_asset;
    let mut units = start_amount / first.price(held);
    let gold_units = start_amount / first.gold;
    let silver_units = start_amount / first.silver;

    let pct = |value: f64| (value / start_amount - 1.0) * 100.0;

    let mut points = Vec::with_capacity(slice.len());
    let mut prev_ratio: Option<f64> = None;

    for record in slice {
        let ratio = record.ratio();
        let first_step = prev_ratio.is_none();
        // On the first step the previous ratio is the ratio itself, so
        // only the explicit first-step clause can fire a switch.
        let prev = prev_ratio.unwrap_or(ratio);

        let mut switched = None;
        match held {
            Asset::Gold => {
                if let Some(up) = params.up_threshold {
                    if ratio >= up && (first_step || prev < up) {
                        units = units * record.gold / record.silver;
                        held = Asset::Silver;
                        switched = Some(SwitchDirection::GoldToSilver);
                    }
                }
            }
            Asset::Silver => {
                if let Some(down) = params.down_threshold {
                    if ratio <= down && (first_step || prev > down) {
                        units = units * record.silver / record.gold;
                        held = Asset::Gold;
                        switched = Some(SwitchDirection::SilverToGold);
                    }
                }
            }
        }

        let portfolio_value = units * record.price(held);
        let gold_only_value = gold_units * record.gold;
        let silver_only_value = silver_units * record.silver;

        points.push(SimulationPoint {
            date: record.date,
            gold: record.gold,
            silver: record.silver,
            ratio,
            held_asset: held,
            held_units: units,
            portfolio_value,
            gold_only_value,
            silver_only_value,
            portfolio_pct: pct(portfolio_value),
            gold_pct: pct(gold_only_value),
            silver_pct: pct(silver_only_value),
            switched,
        });

        prev_ratio = Some(ratio);
    }

    points
}
