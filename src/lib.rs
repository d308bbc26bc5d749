pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::{
    Frequency, QuoteService, cache::Store, comparison::ComparisonRequest, config::AppConfig,
};
use crate::providers::{caching::CachingQuoteProvider, yahoo_finance::YahooFinanceProvider};
use crate::store::KeyValueStore;
use anyhow::Result;
use tracing::{debug, info};

const QUOTES_COLLECTION: &str = "quotes";

pub enum AppCommand {
    Compare {
        frequency: Option<Frequency>,
        native: bool,
        refresh: bool,
    },
    Quotes {
        symbol: String,
        native: bool,
        refresh: bool,
    },
}

impl AppCommand {
    fn refresh(&self) -> bool {
        match self {
            AppCommand::Compare { refresh, .. } | AppCommand::Quotes { refresh, .. } => *refresh,
        }
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("dcasim starting...");

    let mut config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    if let AppCommand::Compare {
        frequency, native, ..
    } = &command
    {
        if let Some(frequency) = frequency {
            config.simulation.frequency = *frequency;
        }
        config.simulation.native_currency |= *native;
    }
    debug!("Loaded config: {config:#?}");

    let store = KeyValueStore::new(&config.default_data_path()?);
    let cache = store.get_collection(QUOTES_COLLECTION);
    if command.refresh() {
        info!("Clearing cached quotes");
        cache.clear().await;
    }
    let provider = CachingQuoteProvider::new(
        YahooFinanceProvider::new(config.yahoo_base_url())?,
        cache,
        Some(config.cache_ttl()),
    );
    let service = QuoteService::new(&provider, &config.markets);

    match command {
        AppCommand::Compare { .. } => {
            config.validate()?;
            let request = ComparisonRequest::from_config(&config)?;
            cli::compare::run(&service, &request).await
        }
        AppCommand::Quotes { symbol, native, .. } => {
            let range = config.date_range()?;
            cli::quotes::run(
                &service,
                &symbol,
                &range,
                native || config.simulation.native_currency,
            )
            .await
        }
    }
}
