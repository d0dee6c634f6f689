use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::market::Role;
use crate::models::{ChangeRecord, ModelConfig};

// A weighted move beyond this many percent counts as a consistent signal
const SIGNAL_THRESHOLD_PCT: f64 = 0.5;
const CONSISTENT_SIGNAL: f64 = 1.0;
const WEAK_SIGNAL: f64 = 0.7;
const CONSISTENCY_SCALE: f64 = 0.95;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictError {
    #[error("insufficient data for prediction, missing: {}", format_roles(.missing))]
    InsufficientData { missing: Vec<Role> },
}

fn format_roles(roles: &[Role]) -> String {
    roles.iter().map(|r| r.as_str()).collect::<Vec<_>>().join(", ")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contribution {
    pub role: Role,
    pub label: String,
    pub change_pct: f64,
    pub weight: f64,
    pub contribution: f64,
}

/// One forecast, at full floating-point precision. Rounding happens only
/// when the result is presented or persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub baseline_close: f64,
    pub weighted_change: f64,
    pub predicted_open: f64,
    pub predicted_high: f64,
    pub predicted_low: f64,
    pub range_width: f64,
    pub confidence: u32,
    pub contributions: Vec<Contribution>,
    pub timestamp: DateTime<Utc>,
}

impl PredictionResult {
    // Predicted gap from the baseline, in index points
    pub fn change_points(&self) -> f64 {
        self.predicted_open - self.baseline_close
    }

    pub fn volatility_range(&self) -> f64 {
        self.range_width / 2.0
    }
}

pub struct OpeningPredictor<'a> {
    config: &'a ModelConfig,
}

impl<'a> OpeningPredictor<'a> {
    pub fn new(config: &'a ModelConfig) -> Self {
        OpeningPredictor { config }
    }

    // Each weighted role's contribution, in role order. Missing roles are
    // returned instead of being treated as a zero change.
    pub fn contributions(&self, changes: &[ChangeRecord]) -> Result<Vec<Contribution>, Vec<Role>> {
        let mut contributions = Vec::with_capacity(Role::WEIGHTED.len());
        let mut missing = Vec::new();

        for role in Role::WEIGHTED {
            let record = changes.iter().find(|c| c.instrument.role == role);
            let weight = self.config.weights.weight(role).unwrap_or(0.0);
            match record {
                Some(record) => contributions.push(Contribution {
                    role,
                    label: record.label().to_string(),
                    change_pct: record.change_pct,
                    weight,
                    contribution: record.change_pct * weight,
                }),
                None => missing.push(role),
            }
        }

        if missing.is_empty() {
            Ok(contributions)
        } else {
            Err(missing)
        }
    }

    // Two-tier heuristic: only the size of the signal picks the tier, so a
    // given configuration yields exactly two possible scores.
    pub fn confidence(&self, weighted_change: f64) -> u32 {
        let consistency = if weighted_change.abs() > SIGNAL_THRESHOLD_PCT {
            CONSISTENT_SIGNAL
        } else {
            WEAK_SIGNAL
        };
        (consistency * CONSISTENCY_SCALE * self.config.base_accuracy * 100.0).round() as u32
    }

    pub fn predict(
        &self,
        changes: &[ChangeRecord],
        baseline_close: Option<f64>,
        timestamp: DateTime<Utc>,
    ) -> Result<PredictionResult, PredictError> {
        let (contributions, mut missing) = match self.contributions(changes) {
            Ok(contributions) => (contributions, Vec::new()),
            Err(missing) => (Vec::new(), missing),
        };
        if baseline_close.is_none() {
            missing.push(Role::Target);
        }
        let baseline_close = match baseline_close {
            Some(close) if missing.is_empty() => close,
            _ => return Err(PredictError::InsufficientData { missing }),
        };

        let weighted_change: f64 = contributions.iter().map(|c| c.contribution).sum();
        let predicted_open = baseline_close * (1.0 + weighted_change / 100.0);

        // Constant-width band, independent of the day's signal
        let volatility_range = self.config.volatility_range();

        Ok(PredictionResult {
            baseline_close,
            weighted_change,
            predicted_open,
            predicted_high: predicted_open + volatility_range,
            predicted_low: predicted_open - volatility_range,
            range_width: 2.0 * volatility_range,
            confidence: self.confidence(weighted_change),
            contributions,
            timestamp,
        })
    }
}
