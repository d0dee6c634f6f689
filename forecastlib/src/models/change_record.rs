use serde::Serialize;
use thiserror::Error;

use crate::market::{BarSeries, Instrument};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChangeError {
    #[error("{0}: no bars available")]
    EmptySeries(String),
    #[error("{0}: previous close is zero, change is undefined")]
    DivisionByZero(String),
}

/// Last-session move of one instrument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeRecord {
    pub instrument: Instrument,
    pub previous_close: f64,
    pub current_close: f64,
    pub change_pct: f64,
}

impl ChangeRecord {
    pub fn label(&self) -> &str {
        &self.instrument.label
    }
}

// Reduces a series to its last-session change. With a single bar both
// closes are that bar and the change is defined as zero; an empty series or
// a zero previous close makes the instrument unavailable for this run.
pub fn compute_change(instrument: &Instrument, series: &BarSeries) -> Result<ChangeRecord, ChangeError> {
    let (previous_close, current_close, change_pct) = match series.last_two() {
        Some((previous, current)) => {
            if previous.close == 0.0 {
                return Err(ChangeError::DivisionByZero(instrument.symbol.clone()));
            }
            let change_pct = (current.close - previous.close) / previous.close * 100.0;
            (previous.close, current.close, change_pct)
        }
        None => match series.last() {
            Some(only) => (only.close, only.close, 0.0),
            None => return Err(ChangeError::EmptySeries(instrument.symbol.clone())),
        },
    };

    Ok(ChangeRecord {
        instrument: instrument.clone(),
        previous_close,
        current_close,
        change_pct,
    })
}
