//! Quote series and the raw-fetch abstraction

use crate::core::error::CalcError;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A single closing price observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub date: DateTime<Utc>,
    pub close: f64,
}

impl Quote {
    pub fn new(date: DateTime<Utc>, close: f64) -> Self {
        Quote { date, close }
    }

    fn is_valid(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }
}

/// Historical closing prices for one instrument.
///
/// Samples are strictly increasing by timestamp and every close is a
/// finite, positive number. An empty series is the explicit "no data"
/// state. The only way in is [`QuoteSeries::from_samples`] (or
/// deserialization, which goes through the same cleanup), so a series
/// can't be mutated once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Quote>", into = "Vec<Quote>")]
pub struct QuoteSeries {
    quotes: Vec<Quote>,
}

impl QuoteSeries {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a series from raw samples: drops zero, negative and
    /// non-finite prices, orders by date and keeps the first sample for a
    /// repeated timestamp.
    pub fn from_samples<I>(samples: I) -> Self
    where
        I: IntoIterator<Item = Quote>,
    {
        let mut quotes: Vec<Quote> = samples.into_iter().filter(Quote::is_valid).collect();
        quotes.sort_by_key(|q| q.date);
        quotes.dedup_by_key(|q| q.date);
        QuoteSeries { quotes }
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn first(&self) -> Option<&Quote> {
        self.quotes.first()
    }

    pub fn last(&self) -> Option<&Quote> {
        self.quotes.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Quote> {
        self.quotes.iter()
    }

    pub fn as_slice(&self) -> &[Quote] {
        &self.quotes
    }
}

impl From<Vec<Quote>> for QuoteSeries {
    fn from(quotes: Vec<Quote>) -> Self {
        QuoteSeries::from_samples(quotes)
    }
}

impl From<QuoteSeries> for Vec<Quote> {
    fn from(series: QuoteSeries) -> Self {
        series.quotes
    }
}

impl FromIterator<Quote> for QuoteSeries {
    fn from_iter<T: IntoIterator<Item = Quote>>(iter: T) -> Self {
        QuoteSeries::from_samples(iter)
    }
}

impl<'a> IntoIterator for &'a QuoteSeries {
    type Item = &'a Quote;
    type IntoIter = std::slice::Iter<'a, Quote>;

    fn into_iter(self) -> Self::IntoIter {
        self.quotes.iter()
    }
}

/// Inclusive calendar range of a historical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, CalcError> {
        if start > end {
            return Err(CalcError::invalid(
                "date_range",
                format!("start date {start} is after end date {end}"),
            ));
        }
        Ok(DateRange { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Unix timestamp of the first instant of the range.
    pub fn start_timestamp(&self) -> i64 {
        self.start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp()
    }

    /// Unix timestamp just past the range, so the end date is included.
    pub fn end_timestamp(&self) -> i64 {
        self.end
            .checked_add_days(Days::new(1))
            .unwrap_or(self.end)
            .and_time(chrono::NaiveTime::MIN)
            .and_utc()
            .timestamp()
    }
}

impl Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Fetches the unprocessed daily series for a symbol from a market data
/// source. Implementations return already-cleaned [`QuoteSeries`]; they never
/// interpret symbol shapes.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn fetch_raw(&self, symbol: &str, range: &DateRange) -> Result<QuoteSeries>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_from_samples_cleans_input() {
        let series = QuoteSeries::from_samples(vec![
            Quote::new(at(3), 30.0),
            Quote::new(at(1), 10.0),
            Quote::new(at(2), 0.0),
            Quote::new(at(4), f64::NAN),
            Quote::new(at(5), -5.0),
            Quote::new(at(1), 11.0),
        ]);

        let closes: Vec<f64> = series.iter().map(|q| q.close).collect();
        assert_eq!(closes, vec![10.0, 30.0]);
        assert_eq!(series.first().unwrap().date, at(1));
        assert_eq!(series.last().unwrap().date, at(3));
    }

    #[test]
    fn test_empty_series() {
        let series = QuoteSeries::empty();
        assert!(series.is_empty());
        assert_eq!(series.len(), 0);
        assert!(series.first().is_none());
    }

    #[test]
    fn test_deserialization_goes_through_cleanup() {
        let json = r#"[
            {"date": "2024-01-02T00:00:00Z", "close": 2.0},
            {"date": "2024-01-01T00:00:00Z", "close": 1.0},
            {"date": "2024-01-03T00:00:00Z", "close": 0.0}
        ]"#;
        let series: QuoteSeries = serde_json::from_str(json).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.first().unwrap().close, 1.0);
    }

    #[test]
    fn test_date_range() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let range = DateRange::new(start, end).unwrap();
        assert_eq!(range.start_timestamp(), 1_704_067_200);
        assert_eq!(range.end_timestamp(), 1_706_745_600);
        assert_eq!(range.to_string(), "2024-01-01..2024-01-31");

        assert!(DateRange::new(end, start).is_err());
        assert!(DateRange::new(start, start).is_ok());
    }
}
