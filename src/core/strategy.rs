//! Strategy parameters and results

use crate::core::error::CalcError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Cadence of recurring purchases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    #[default]
    Monthly,
}

impl Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Frequency::Daily => "daily",
                Frequency::Weekly => "weekly",
                Frequency::Monthly => "monthly",
            }
        )
    }
}

impl FromStr for Frequency {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            _ => Err(CalcError::invalid(
                "frequency",
                format!("expected one of daily, weekly, monthly, got '{s}'"),
            )),
        }
    }
}

/// Outcome of running one strategy over one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyResult {
    pub name: String,
    pub total_invested: f64,
    pub final_value: f64,
    pub return_percent: f64,
    /// Units of the underlying held at the end. Always zero for derivative
    /// payoffs, which never buy units.
    pub total_accumulated: f64,
    #[serde(default)]
    no_data: bool,
}

impl StrategyResult {
    pub fn new(
        name: impl Into<String>,
        total_invested: f64,
        final_value: f64,
        total_accumulated: f64,
    ) -> Self {
        StrategyResult {
            name: name.into(),
            total_invested,
            final_value,
            return_percent: return_percent(total_invested, final_value),
            total_accumulated,
            no_data: false,
        }
    }

    /// Zero-valued result for a strategy that had no prices to work with.
    pub fn no_data(label: &str) -> Self {
        StrategyResult {
            name: format!("{label} (no data)"),
            total_invested: 0.0,
            final_value: 0.0,
            return_percent: 0.0,
            total_accumulated: 0.0,
            no_data: true,
        }
    }

    pub fn is_no_data(&self) -> bool {
        self.no_data
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Cumulative return in percent, zero when nothing was invested.
pub fn return_percent(total_invested: f64, final_value: f64) -> f64 {
    if total_invested > 0.0 {
        (final_value - total_invested) / total_invested * 100.0
    } else {
        0.0
    }
}
