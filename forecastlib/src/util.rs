use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::market::{default_instruments, Instrument, Role};
use crate::models::ModelConfig;

pub const DEFAULT_SETTINGS_PATH: &str = "settings.json";

// Tolerance on the weight total, weights are typed in by hand
const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("weights must sum to 1.0, got {0}")]
    WeightSum(f64),
    #[error("weight for {0} must be non-negative, got {1}")]
    NegativeWeight(Role, f64),
    #[error("{0} must be positive, got {1}")]
    NonPositive(&'static str, f64),
    #[error("baseAccuracy must be in (0, 1], got {0}")]
    BaseAccuracy(f64),
    #[error("maxRetries must be at least 1")]
    NoAttempts,
    #[error("lookbackDays must be at least 2, got {0}")]
    LookbackTooShort(u32),
    #[error("role {0} is configured {1} times, expected exactly once")]
    RoleCount(Role, usize),
}

/// Everything a run needs, loaded once at process start and never mutated.
///
/// The model and fetch blocks are flattened so the model constants sit at the
/// top level of `settings.json` (`weights`, `stdDev`, `lookbackDays`, ...).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    #[serde(flatten)]
    pub model: ModelConfig,
    #[serde(flatten)]
    pub fetch: FetchSettings,
    pub instruments: Vec<Instrument>,
    pub output: OutputSettings,
    pub run_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            model: ModelConfig::default(),
            fetch: FetchSettings::default(),
            instruments: default_instruments(),
            output: OutputSettings::default(),
            run_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FetchSettings {
    pub lookback_days: u32,
    pub max_retries: u32,
    pub backoff_base_secs: u64,
    pub request_timeout_secs: u64,
    pub base_url: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        FetchSettings {
            lookback_days: 15,
            max_retries: 3,
            backoff_base_secs: 2,
            request_timeout_secs: 20,
            base_url: crate::yahoo::API_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputSettings {
    pub log_path: String,
    pub snapshot_path: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        OutputSettings {
            log_path: "prediction_log.csv".to_string(),
            snapshot_path: "prediction_results.json".to_string(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let model = &self.model;

        for role in Role::WEIGHTED {
            let weight = model.weights.weight(role).unwrap_or(0.0);
            if weight < 0.0 {
                return Err(ConfigError::NegativeWeight(role, weight));
            }
        }
        let total = model.weights.total();
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightSum(total));
        }

        if model.std_dev <= 0.0 {
            return Err(ConfigError::NonPositive("stdDev", model.std_dev));
        }
        if model.volatility_multiplier <= 0.0 {
            return Err(ConfigError::NonPositive(
                "volatilityMultiplier",
                model.volatility_multiplier,
            ));
        }
        if model.base_accuracy <= 0.0 || model.base_accuracy > 1.0 {
            return Err(ConfigError::BaseAccuracy(model.base_accuracy));
        }

        if self.fetch.max_retries < 1 {
            return Err(ConfigError::NoAttempts);
        }
        if self.fetch.lookback_days < 2 {
            return Err(ConfigError::LookbackTooShort(self.fetch.lookback_days));
        }

        // Each weighted role plus the target must be backed by exactly one instrument
        for role in Role::WEIGHTED.into_iter().chain([Role::Target]) {
            let count = self.instruments.iter().filter(|i| i.role == role).count();
            if count != 1 {
                return Err(ConfigError::RoleCount(role, count));
            }
        }

        Ok(())
    }
}

pub fn parse_settings(json: &str) -> Result<Settings, Box<dyn std::error::Error>> {
    let settings: Settings = serde_json::from_str(json)?;
    settings.validate()?;
    Ok(settings)
}

pub fn read_settings(path: &str) -> Result<Settings, Box<dyn std::error::Error>> {
    if !Path::new(path).exists() {
        log::warn!("Settings file {} not found, using built-in defaults", path);
        let settings = Settings::default();
        settings.validate()?;
        return Ok(settings);
    }

    let json = std::fs::read_to_string(path)?;
    parse_settings(&json)
}

pub fn generate_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
