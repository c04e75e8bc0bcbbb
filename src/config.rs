use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::models::{DimensionWeights, ScoringWeights};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub listing_store: ListingStoreSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingStoreSettings {
    pub endpoint: String,
    pub api_key: String,
    #[serde(default = "default_listings_table")]
    pub listings_table: String,
    #[serde(default = "default_criteria_table")]
    pub criteria_table: String,
    #[serde(default = "default_active_status")]
    pub active_status: String,
    pub timeout_secs: Option<u64>,
}

fn default_listings_table() -> String { "listings".to_string() }
fn default_criteria_table() -> String { "search_criteria".to_string() }
fn default_active_status() -> String { "active".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    pub redis_url: String,
    pub ttl_secs: Option<u64>,
    pub l1_cache_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_limit")]
    pub default_limit: u16,
    #[serde(default = "default_max_limit")]
    pub max_limit: u16,
    #[serde(default = "default_candidate_pool_size")]
    pub candidate_pool_size: usize,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            candidate_pool_size: default_candidate_pool_size(),
        }
    }
}

fn default_limit() -> u16 { 20 }
fn default_max_limit() -> u16 { 100 }
fn default_candidate_pool_size() -> usize { 1000 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub criteria_weights: CriteriaWeightsConfig,
    #[serde(default)]
    pub peer_points: PeerPointsConfig,
}

impl ScoringSettings {
    /// Weights handed to the matcher
    pub fn weights(&self) -> ScoringWeights {
        ScoringWeights {
            criteria: DimensionWeights {
                budget: self.criteria_weights.budget,
                sector: self.criteria_weights.sector,
                location: self.criteria_weights.location,
                employees: 0.0,
                revenue: 0.0,
                growth_potential: self.criteria_weights.growth_potential,
            },
            peer: DimensionWeights {
                budget: self.peer_points.price,
                sector: self.peer_points.sector,
                location: self.peer_points.location,
                employees: self.peer_points.employees,
                revenue: self.peer_points.revenue,
                growth_potential: 0.0,
            },
        }
    }
}

/// Relative weights for buyer criteria (weighted average)
#[derive(Debug, Clone, Deserialize)]
pub struct CriteriaWeightsConfig {
    #[serde(default = "default_criteria_budget")]
    pub budget: f64,
    #[serde(default = "default_criteria_sector")]
    pub sector: f64,
    #[serde(default = "default_criteria_location")]
    pub location: f64,
    #[serde(default = "default_criteria_growth")]
    pub growth_potential: f64,
}

impl Default for CriteriaWeightsConfig {
    fn default() -> Self {
        Self {
            budget: default_criteria_budget(),
            sector: default_criteria_sector(),
            location: default_criteria_location(),
            growth_potential: default_criteria_growth(),
        }
    }
}

fn default_criteria_budget() -> f64 { 3.0 }
fn default_criteria_sector() -> f64 { 3.0 }
fn default_criteria_location() -> f64 { 2.0 }
fn default_criteria_growth() -> f64 { 2.0 }

/// Points awarded for listing-to-listing comparisons (summed, capped at 100)
#[derive(Debug, Clone, Deserialize)]
pub struct PeerPointsConfig {
    #[serde(default = "default_peer_price")]
    pub price: f64,
    #[serde(default = "default_peer_sector")]
    pub sector: f64,
    #[serde(default = "default_peer_location")]
    pub location: f64,
    #[serde(default = "default_peer_employees")]
    pub employees: f64,
    #[serde(default = "default_peer_revenue")]
    pub revenue: f64,
}

impl Default for PeerPointsConfig {
    fn default() -> Self {
        Self {
            price: default_peer_price(),
            sector: default_peer_sector(),
            location: default_peer_location(),
            employees: default_peer_employees(),
            revenue: default_peer_revenue(),
        }
    }
}

fn default_peer_price() -> f64 { 40.0 }
fn default_peer_sector() -> f64 { 30.0 }
fn default_peer_location() -> f64 { 20.0 }
fn default_peer_employees() -> f64 { 5.0 }
fn default_peer_revenue() -> f64 { 5.0 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "full".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with SMARTMATCH__)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., SMARTMATCH__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("SMARTMATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = substitute_env_vars(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("SMARTMATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

/// Apply the conventional deployment variables on top of the loaded config
///
/// `DATABASE_URL` wins over `database.url`; the listing store credentials can
/// be injected without the double-underscore prefix.
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let database_url = env::var("DATABASE_URL").ok();
    let store_endpoint = env::var("SMARTMATCH_LISTING_STORE__ENDPOINT").ok();
    let store_api_key = env::var("SMARTMATCH_LISTING_STORE__API_KEY").ok();

    let mut builder = Config::builder().add_source(settings);

    if let Some(url) = database_url {
        builder = builder.set_override("database.url", url)?;
    }
    if let Some(endpoint) = store_endpoint {
        builder = builder.set_override("listing_store.endpoint", endpoint)?;
    }
    if let Some(api_key) = store_api_key {
        builder = builder.set_override("listing_store.api_key", api_key)?;
    }

    builder.build()
}
