use crate::core::calculator::NoteTerms;
use crate::core::error::ensure_amount;
use crate::core::quote::DateRange;
use crate::core::strategy::Frequency;
use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

const DEFAULT_CACHE_TTL_HOURS: u64 = 12;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SimulationConfig {
    pub start_date: NaiveDate,
    /// Defaults to today when omitted.
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub initial_amount: f64,
    #[serde(default)]
    pub periodic_amount: f64,
    #[serde(default)]
    pub frequency: Frequency,
    /// Keep foreign and synthetic instruments in their own currency.
    #[serde(default)]
    pub native_currency: bool,
}

/// One entry of the asset catalog.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AssetConfig {
    pub symbol: String,
    pub name: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub dca: bool,
    #[serde(default)]
    pub lump_sum: bool,
}

impl AssetConfig {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.symbol)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NoteConfig {
    pub underlying: String,
    #[serde(flatten)]
    pub terms: NoteTerms,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YahooProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub yahoo: Option<YahooProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            yahoo: Some(YahooProviderConfig {
                base_url: "https://query1.finance.yahoo.com".to_string(),
            }),
        }
    }
}

fn default_markets() -> HashMap<String, String> {
    HashMap::from([("SA".to_string(), "BRL".to_string())])
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub assets: Vec<AssetConfig>,
    #[serde(default)]
    pub notes: Vec<NoteConfig>,
    /// Foreign market suffix to the currency its listings trade in.
    #[serde(default = "default_markets")]
    pub markets: HashMap<String, String>,
    #[serde(default)]
    pub providers: ProvidersConfig,
    pub cache_ttl_hours: Option<u64>,
    pub data_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "dcasim", "dcasim")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("dev", "dcasim", "dcasim")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn yahoo_base_url(&self) -> &str {
        self.providers
            .yahoo
            .as_ref()
            .map_or("https://query1.finance.yahoo.com", |p| &p.base_url)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(
            self.cache_ttl_hours.unwrap_or(DEFAULT_CACHE_TTL_HOURS) * 60 * 60,
        )
    }

    pub fn date_range(&self) -> Result<DateRange> {
        let end = self
            .simulation
            .end_date
            .unwrap_or_else(|| Utc::now().date_naive());
        Ok(DateRange::new(self.simulation.start_date, end)?)
    }

    /// Catalog name for `symbol`, or the symbol itself when it isn't listed.
    pub fn asset_name<'a>(&'a self, symbol: &'a str) -> &'a str {
        self.assets
            .iter()
            .find(|a| a.symbol == symbol)
            .map_or(symbol, AssetConfig::display_name)
    }

    /// Checks the simulation parameters before any data is fetched.
    pub fn validate(&self) -> Result<()> {
        ensure_amount("initial_amount", self.simulation.initial_amount)?;
        ensure_amount("periodic_amount", self.simulation.periodic_amount)?;
        self.date_range()?;
        for note in &self.notes {
            note.terms
                .validate()
                .with_context(|| format!("Invalid note on {}", note.underlying))?;
        }
        if !self.assets.iter().any(|a| a.dca || a.lump_sum) {
            bail!("Select at least one asset for DCA or lump sum");
        }
        Ok(())
    }
}
