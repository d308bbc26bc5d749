//! Normalization of raw series into a single reference currency.

use crate::core::error::CalcError;
use crate::core::quote::{Quote, QuoteSeries};
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::{debug, trace};

/// Notional value of a synthetic instrument on its first day.
pub const SYNTHETIC_ANCHOR_VALUE: f64 = 100.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Converts a foreign-currency series into the reference currency.
///
/// `pair` quotes units of the foreign currency per one unit of the reference
/// currency, so each foreign close is divided by the rate of the same
/// calendar day. Samples without a same-day rate are dropped: there is no
/// interpolation or carry-forward.
pub fn align_to_reference(foreign: &QuoteSeries, pair: &QuoteSeries) -> QuoteSeries {
    let rates: HashMap<NaiveDate, f64> = pair
        .iter()
        .map(|q| (q.date.date_naive(), q.close))
        .collect();

    let aligned: QuoteSeries = foreign
        .iter()
        .filter_map(|q| match rates.get(&q.date.date_naive()) {
            Some(rate) if *rate != 0.0 => Some(Quote::new(q.date, q.close / rate)),
            _ => {
                trace!(date = %q.date, "No currency rate for sample, dropping");
                None
            }
        })
        .collect();

    let dropped = foreign.len() - aligned.len();
    if dropped > 0 {
        debug!(
            dropped,
            kept = aligned.len(),
            "Dropped samples without a matching currency rate"
        );
    }
    aligned
}

/// Daily compounding rate equivalent to an annual percentage, accruing on
/// every calendar day.
pub fn daily_rate(annual_rate_percent: f64) -> f64 {
    (1.0 + annual_rate_percent / 100.0).powf(1.0 / 365.0) - 1.0
}

/// Generates a notional fixed-rate instrument using `pair` as the calendar.
///
/// The series starts at [`SYNTHETIC_ANCHOR_VALUE`] on the first pair date and
/// compounds daily over the exact (fractional) time elapsed. With `convert`
/// set, each value is divided by that day's pair rate; otherwise values stay
/// in the instrument's native unit.
pub fn synthetic_fixed_income(
    annual_rate_percent: f64,
    pair: &QuoteSeries,
    convert: bool,
) -> Result<QuoteSeries, CalcError> {
    if !annual_rate_percent.is_finite() || annual_rate_percent <= -100.0 {
        return Err(CalcError::invalid(
            "annual_rate_percent",
            format!("must be a finite rate above -100%, got {annual_rate_percent}"),
        ));
    }

    let Some(anchor) = pair.first().map(|q| q.date) else {
        return Ok(QuoteSeries::empty());
    };
    let growth = 1.0 + daily_rate(annual_rate_percent);

    let series = pair
        .iter()
        .filter_map(|q| {
            let elapsed_days = ((q.date - anchor).num_seconds() as f64 / SECONDS_PER_DAY).max(0.0);
            let notional = SYNTHETIC_ANCHOR_VALUE * growth.powf(elapsed_days);
            if !convert {
                return Some(Quote::new(q.date, notional));
            }
            if q.close == 0.0 {
                return None;
            }
            Some(Quote::new(q.date, notional / q.close))
        })
        .collect();

    Ok(series)
}
