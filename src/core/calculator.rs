//! Strategy calculators.
//!
//! Each calculator is a pure function from a [`QuoteSeries`] and strategy
//! parameters to a [`StrategyResult`]. An empty series is not an error: it
//! yields a zero-valued result whose name carries a "no data" marker so that
//! ranking downstream keeps working. Invalid parameters fail fast.

use crate::core::error::{CalcError, ensure_amount};
use crate::core::quote::{Quote, QuoteSeries};
use crate::core::strategy::{Frequency, StrategyResult};
use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Recurring purchases of `periodic_amount` at `frequency`, optionally seeded
/// with `initial_amount` bought on the first sample.
pub fn dca(
    series: &QuoteSeries,
    initial_amount: f64,
    periodic_amount: f64,
    frequency: Frequency,
) -> Result<StrategyResult, CalcError> {
    ensure_amount("initial_amount", initial_amount)?;
    ensure_amount("periodic_amount", periodic_amount)?;

    let (Some(first), Some(last)) = (series.first(), series.last()) else {
        return Ok(StrategyResult::no_data("DCA"));
    };

    let mut total_invested = 0.0;
    let mut total_accumulated = 0.0;

    if initial_amount > 0.0 {
        total_accumulated += initial_amount / first.close;
        total_invested += initial_amount;
    }

    if periodic_amount > 0.0 {
        let mut last_purchase: Option<DateTime<Utc>> = None;
        let mut purchases = 0usize;
        for quote in series {
            if should_buy(quote, last_purchase, frequency) {
                total_accumulated += periodic_amount / quote.close;
                total_invested += periodic_amount;
                last_purchase = Some(quote.date);
                purchases += 1;
            }
        }
        debug!(purchases, %frequency, "Scheduled recurring purchases");
    }

    let final_value = total_accumulated * last.close;
    let name = dca_name(initial_amount, periodic_amount, frequency);

    Ok(StrategyResult::new(
        name,
        total_invested,
        final_value,
        total_accumulated,
    ))
}

fn should_buy(quote: &Quote, last_purchase: Option<DateTime<Utc>>, frequency: Frequency) -> bool {
    let Some(last) = last_purchase else {
        return true;
    };
    match frequency {
        Frequency::Daily => true,
        // Exact elapsed time, not calendar weeks.
        Frequency::Weekly => quote.date - last >= Duration::hours(7 * 24),
        Frequency::Monthly => {
            quote.date.month() != last.month() || quote.date.year() != last.year()
        }
    }
}

fn dca_name(initial_amount: f64, periodic_amount: f64, frequency: Frequency) -> String {
    if initial_amount > 0.0 && periodic_amount == 0.0 {
        "Single Lump-Sum Investment".to_string()
    } else if initial_amount > 0.0 {
        format!("Hybrid (Initial: ${initial_amount:.0} + DCA)")
    } else {
        format!("DCA {frequency}")
    }
}

/// Invests `total_amount` on the first sample and holds to the last.
pub fn lump_sum(
    series: &QuoteSeries,
    total_amount: f64,
    label: &str,
) -> Result<StrategyResult, CalcError> {
    ensure_amount("total_amount", total_amount)?;

    let (Some(first), Some(last)) = (series.first(), series.last()) else {
        return Ok(StrategyResult::no_data(label));
    };

    let accumulated = total_amount / first.close;
    let final_value = accumulated * last.close;

    Ok(StrategyResult::new(
        label,
        total_amount,
        final_value,
        accumulated,
    ))
}

/// Payoff terms of a capped and/or capital-protected note.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteTerms {
    /// Floor the gross return at zero.
    #[serde(default)]
    pub protected: bool,
    /// Share of the underlying's return passed through, 1.0 = 100%.
    #[serde(default = "default_participation")]
    pub participation: f64,
    /// Maximum gross return as a fraction; 0 means uncapped.
    #[serde(default)]
    pub cap: f64,
}

fn default_participation() -> f64 {
    1.0
}

impl Default for NoteTerms {
    fn default() -> Self {
        NoteTerms {
            protected: false,
            participation: default_participation(),
            cap: 0.0,
        }
    }
}

impl NoteTerms {
    pub fn validate(&self) -> Result<(), CalcError> {
        ensure_amount("participation", self.participation)?;
        ensure_amount("cap", self.cap)
    }

    /// Applies participation, then the upside cap, then the protection floor.
    pub fn gross_return(&self, underlying_return: f64) -> f64 {
        let mut gross = underlying_return * self.participation;
        if self.cap > 0.0 && gross > self.cap {
            gross = self.cap;
        }
        if self.protected && gross < 0.0 {
            gross = 0.0;
        }
        gross
    }

    pub fn describe(&self) -> String {
        let protection = if self.protected {
            "Protected"
        } else {
            "Unprotected"
        };
        let cap = if self.cap > 0.0 {
            format!("Cap {:.0}%", self.cap * 100.0)
        } else {
            "No Cap".to_string()
        };
        format!(
            "Structured Note ({protection}, Part. {:.0}%, {cap})",
            self.participation * 100.0
        )
    }
}

/// Return of a structured note on the series' underlying. No units are ever
/// held, so `total_accumulated` is always zero.
pub fn structured_note(
    series: &QuoteSeries,
    initial_amount: f64,
    terms: &NoteTerms,
) -> Result<StrategyResult, CalcError> {
    ensure_amount("initial_amount", initial_amount)?;
    terms.validate()?;

    let (Some(first), Some(last)) = (series.first(), series.last()) else {
        return Ok(StrategyResult::no_data("Structured Note"));
    };

    let underlying_return = (last.close - first.close) / first.close;
    let gross = terms.gross_return(underlying_return);
    debug!(underlying_return, gross, "Structured note payoff");

    Ok(StrategyResult::new(
        terms.describe(),
        initial_amount,
        initial_amount * (1.0 + gross),
        0.0,
    ))
}
