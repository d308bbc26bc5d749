use crate::core::quote::{DateRange, Quote, QuoteProvider, QuoteSeries};
use crate::providers::util::with_retry;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use tracing::{debug, instrument};

const USER_AGENT: &str = "dcasim/1.0";
const RETRIES: usize = 3;
const RETRY_DELAY_MS: u64 = 500;

/// Daily closing prices from the Yahoo Finance chart API.
pub struct YahooFinanceProvider {
    base_url: String,
    client: reqwest::Client,
}

impl YahooFinanceProvider {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(YahooFinanceProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[derive(Deserialize, Debug)]
struct YahooChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    result: Option<Vec<ChartItem>>,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<IndicatorQuote>,
}

#[derive(Deserialize, Debug)]
struct IndicatorQuote {
    close: Option<Vec<Option<f64>>>,
}

/// Pairs timestamps with closes. Extra entries on either side are ignored;
/// missing or zero closes are skipped by [`QuoteSeries::from_samples`].
fn extract_quotes(item: &ChartItem) -> QuoteSeries {
    let timestamps = item.timestamp.as_deref().unwrap_or_default();
    let closes = item
        .indicators
        .as_ref()
        .and_then(|inds| inds.quote.first())
        .and_then(|q| q.close.as_deref())
        .unwrap_or_default();

    if timestamps.len() != closes.len() {
        debug!(
            timestamps = timestamps.len(),
            closes = closes.len(),
            "Mismatched chart arrays, truncating"
        );
    }

    timestamps
        .iter()
        .zip(closes)
        .filter_map(|(ts, close)| {
            let date = Utc.timestamp_opt(*ts, 0).single()?;
            close.map(|c| Quote::new(date, c))
        })
        .collect()
}

#[async_trait]
impl QuoteProvider for YahooFinanceProvider {
    #[instrument(
        name = "YahooQuoteFetch",
        skip(self, range),
        fields(symbol = %symbol, range = %range)
    )]
    async fn fetch_raw(&self, symbol: &str, range: &DateRange) -> Result<QuoteSeries> {
        let url = format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval=1d",
            self.base_url,
            symbol,
            range.start_timestamp(),
            range.end_timestamp()
        );
        debug!("Requesting chart data from {}", url);

        let response = with_retry(
            || self.client.get(&url).send(),
            RETRIES,
            RETRY_DELAY_MS,
        )
        .await
        .with_context(|| format!("Request error for symbol: {symbol} URL: {url}"))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for symbol: {}",
                response.status(),
                symbol
            ));
        }

        let text = response.text().await?;
        let data: YahooChartResponse = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse JSON response for {symbol}"))?;

        let item = data
            .chart
            .result
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No price data found for symbol: {}", symbol))?;

        let series = extract_quotes(&item);
        debug!(samples = series.len(), "Parsed chart data");
        Ok(series)
    }
}
