//! Runs every selected strategy and ranks the outcomes.
//!
//! The lump-sum and structured-note strategies invest the same budget the
//! recurring plan would have spent, so the comparison is like for like: the
//! budget is the capital invested by the first DCA run that got data, or, when
//! there is none, by a DCA schedule run over the first other asset's
//! calendar.

use crate::core::calculator::{self, NoteTerms};
use crate::core::config::{AppConfig, AssetConfig};
use crate::core::error::ensure_amount;
use crate::core::facade::QuoteService;
use crate::core::quote::{DateRange, QuoteSeries};
use crate::core::strategy::{Frequency, StrategyResult};
use anyhow::Result;
use futures::future::join_all;
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct AssetRef {
    pub symbol: String,
    pub name: String,
}

impl AssetRef {
    pub fn new(symbol: &str, name: &str) -> Self {
        AssetRef {
            symbol: symbol.to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoteRequest {
    pub underlying: AssetRef,
    pub terms: NoteTerms,
}

#[derive(Debug, Clone)]
pub struct ComparisonRequest {
    pub range: DateRange,
    pub initial_amount: f64,
    pub periodic_amount: f64,
    pub frequency: Frequency,
    pub native: bool,
    pub dca: Vec<AssetRef>,
    pub lump_sum: Vec<AssetRef>,
    pub notes: Vec<NoteRequest>,
}

impl ComparisonRequest {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let select = |wanted: fn(&AssetConfig) -> bool| {
            config
                .assets
                .iter()
                .filter(|a| wanted(a))
                .map(|a| AssetRef::new(&a.symbol, a.display_name()))
                .collect::<Vec<_>>()
        };

        Ok(ComparisonRequest {
            range: config.date_range()?,
            initial_amount: config.simulation.initial_amount,
            periodic_amount: config.simulation.periodic_amount,
            frequency: config.simulation.frequency,
            native: config.simulation.native_currency,
            dca: select(|a| a.dca),
            lump_sum: select(|a| a.lump_sum),
            notes: config
                .notes
                .iter()
                .map(|n| NoteRequest {
                    underlying: AssetRef::new(&n.underlying, config.asset_name(&n.underlying)),
                    terms: n.terms,
                })
                .collect(),
        })
    }

    /// Distinct symbols in first-seen order.
    pub fn symbols(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        let all = self
            .dca
            .iter()
            .chain(&self.lump_sum)
            .chain(self.notes.iter().map(|n| &n.underlying));
        for asset in all {
            if !seen.contains(&asset.symbol.as_str()) {
                seen.push(asset.symbol.as_str());
            }
        }
        seen
    }
}

/// An asset whose quotes could not be fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetFailure {
    pub symbol: String,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct Comparison {
    /// Sorted by return, best first.
    pub results: Vec<StrategyResult>,
    pub failures: Vec<AssetFailure>,
    /// Capital given to each one-off strategy.
    pub budget: f64,
}

impl Comparison {
    pub fn best(&self) -> Option<&StrategyResult> {
        self.results.first()
    }
}

fn labelled(result: StrategyResult, label: String) -> StrategyResult {
    if result.is_no_data() {
        StrategyResult::no_data(&label)
    } else {
        result.with_name(label)
    }
}

/// Fetches every selected asset once, concurrently, then runs the requested
/// strategies. `on_fetched` is called as each asset finishes loading.
/// A failed fetch only removes that asset's strategies from the ranking.
pub async fn run_comparison(
    service: &QuoteService<'_>,
    request: &ComparisonRequest,
    on_fetched: &(dyn Fn() + Sync),
) -> Result<Comparison> {
    ensure_amount("initial_amount", request.initial_amount)?;
    ensure_amount("periodic_amount", request.periodic_amount)?;

    let symbols = request.symbols();
    info!(assets = symbols.len(), range = %request.range, "Fetching quotes");

    let futures = symbols.iter().map(|symbol| async move {
        let result = service.resolve(symbol, &request.range, request.native).await;
        on_fetched();
        (*symbol, result)
    });
    let fetched: HashMap<&str, Result<QuoteSeries>> =
        join_all(futures).await.into_iter().collect();

    let mut comparison = Comparison::default();
    for symbol in &symbols {
        if let Some(Err(e)) = fetched.get(symbol) {
            warn!(symbol = %symbol, error = %e, "Skipping asset");
            comparison.failures.push(AssetFailure {
                symbol: symbol.to_string(),
                error: format!("{e:#}"),
            });
        }
    }
    let series_for = |asset: &AssetRef| {
        fetched
            .get(asset.symbol.as_str())
            .and_then(|r| r.as_ref().ok())
    };

    let mut budget = None;
    for asset in &request.dca {
        let Some(series) = series_for(asset) else {
            continue;
        };
        let result = calculator::dca(
            series,
            request.initial_amount,
            request.periodic_amount,
            request.frequency,
        )?;
        if budget.is_none() && !result.is_no_data() {
            budget = Some(result.total_invested);
        }
        let label = if request.initial_amount > 0.0 {
            format!("Hybrid DCA {}", asset.name)
        } else {
            format!("DCA {}", asset.name)
        };
        comparison.results.push(labelled(result, label));
    }

    if budget.is_none() {
        let calendar = request
            .lump_sum
            .first()
            .or_else(|| request.notes.first().map(|n| &n.underlying))
            .and_then(series_for);
        if let Some(series) = calendar {
            let phantom = calculator::dca(
                series,
                request.initial_amount,
                request.periodic_amount,
                request.frequency,
            )?;
            debug!(budget = phantom.total_invested, "Budget from DCA schedule");
            budget = Some(phantom.total_invested);
        }
    }
    let budget = budget.unwrap_or_default();
    comparison.budget = budget;

    for asset in &request.lump_sum {
        if let Some(series) = series_for(asset) {
            let label = format!("Lump Sum {}", asset.name);
            comparison
                .results
                .push(calculator::lump_sum(series, budget, &label)?);
        }
    }

    for note in &request.notes {
        if let Some(series) = series_for(&note.underlying) {
            let result = calculator::structured_note(series, budget, &note.terms)?;
            let label = format!("{} on {}", note.terms.describe(), note.underlying.name);
            comparison.results.push(labelled(result, label));
        }
    }

    comparison
        .results
        .sort_by(|a, b| b.return_percent.total_cmp(&a.return_percent));
    Ok(comparison)
}
