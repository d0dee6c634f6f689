use serde::{Deserialize, Serialize};

use crate::market::Role;

/// Fixed model constants. Nothing here is fitted by this crate; the
/// defaults are the hand-tuned values the forecast has always used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelConfig {
    pub weights: Weights,
    pub std_dev: f64,
    pub volatility_multiplier: f64,
    pub base_accuracy: f64,
    pub backtest: BacktestSummary,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            weights: Weights::default(),
            std_dev: 85.0,
            volatility_multiplier: 1.15,
            base_accuracy: 0.87,
            backtest: BacktestSummary::default(),
        }
    }
}

impl ModelConfig {
    // Half width of the high/low band, in index points
    pub fn volatility_range(&self) -> f64 {
        self.std_dev * self.volatility_multiplier
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub tsm: f64,
    pub sox: f64,
    pub nasdaq: f64,
    pub sp500: f64,
    pub currency: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Weights {
            tsm: 0.35,
            sox: 0.25,
            nasdaq: 0.20,
            sp500: 0.15,
            currency: 0.05,
        }
    }
}

impl Weights {
    // None for the target, which carries no weight
    pub fn weight(&self, role: Role) -> Option<f64> {
        match role {
            Role::Tsm => Some(self.tsm),
            Role::Sox => Some(self.sox),
            Role::Nasdaq => Some(self.nasdaq),
            Role::Sp500 => Some(self.sp500),
            Role::Currency => Some(self.currency),
            Role::Target => None,
        }
    }

    pub fn total(&self) -> f64 {
        Role::WEIGHTED.iter().filter_map(|role| self.weight(*role)).sum()
    }
}

// Static descriptive figures shown alongside each forecast. They describe a
// past backtest and are not recomputed from run data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BacktestSummary {
    pub direction_accuracy: f64,
    pub avg_error: f64,
    pub range_coverage: f64,
    pub sample_days: u32,
}

impl Default for BacktestSummary {
    fn default() -> Self {
        BacktestSummary {
            direction_accuracy: 0.87,
            avg_error: 127.0,
            range_coverage: 0.82,
            sample_days: 127,
        }
    }
}
