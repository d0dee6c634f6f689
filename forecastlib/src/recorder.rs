use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::market::{FetchFailure, Instrument, Role, SessionDates};
use crate::models::{ChangeError, ChangeRecord, PredictionResult};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// An instrument that produced no change record this run, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Unavailable {
    pub symbol: String,
    pub name: String,
    pub role: Role,
    pub reason: String,
}

impl Unavailable {
    pub fn new(instrument: &Instrument, reason: String) -> Self {
        Unavailable {
            symbol: instrument.symbol.clone(),
            name: instrument.label.clone(),
            role: instrument.role,
            reason,
        }
    }

    pub fn from_fetch(instrument: &Instrument, failure: &FetchFailure) -> Self {
        Self::new(instrument, failure.to_string())
    }

    pub fn from_change(instrument: &Instrument, error: &ChangeError) -> Self {
        Self::new(instrument, error.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionSnapshot {
    pub baseline_close: f64,
    pub predicted_open: f64,
    pub change_points: f64,
    pub predicted_high: f64,
    pub predicted_low: f64,
    pub range_width: f64,
    pub confidence: u32,
    pub weighted_change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSnapshot {
    pub symbol: String,
    pub name: String,
    pub role: Role,
    pub prev_close: f64,
    pub curr_close: f64,
    pub change_pct: f64,
}

/// What gets persisted for one run: the prediction rounded for
/// presentation, every indicator that made it through, and every one that
/// did not.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRecord {
    pub timestamp: String,
    pub data_date: NaiveDate,
    pub prediction_date: NaiveDate,
    pub prediction: PredictionSnapshot,
    pub indicators: Vec<IndicatorSnapshot>,
    pub unavailable: Vec<Unavailable>,
}

// Flat row for the tabular log; the column set is fixed
#[derive(Debug, Serialize)]
pub struct LogRow {
    pub timestamp: String,
    pub data_date: NaiveDate,
    pub prediction_date: NaiveDate,
    pub baseline_close: f64,
    pub predicted_open: f64,
    pub change_points: f64,
    pub predicted_high: f64,
    pub predicted_low: f64,
    pub range_width: f64,
    pub confidence: u32,
    pub weighted_change: f64,
    pub sp500_change: Option<f64>,
    pub nasdaq_change: Option<f64>,
    pub sox_change: Option<f64>,
    pub tsm_change: Option<f64>,
    pub currency_change: Option<f64>,
    pub unavailable: String,
}

impl PredictionRecord {
    fn change_for(&self, role: Role) -> Option<f64> {
        self.indicators
            .iter()
            .find(|indicator| indicator.role == role)
            .map(|indicator| indicator.change_pct)
    }

    pub fn log_row(&self) -> LogRow {
        let p = &self.prediction;
        LogRow {
            timestamp: self.timestamp.clone(),
            data_date: self.data_date,
            prediction_date: self.prediction_date,
            baseline_close: p.baseline_close,
            predicted_open: p.predicted_open,
            change_points: p.change_points,
            predicted_high: p.predicted_high,
            predicted_low: p.predicted_low,
            range_width: p.range_width,
            confidence: p.confidence,
            weighted_change: p.weighted_change,
            sp500_change: self.change_for(Role::Sp500),
            nasdaq_change: self.change_for(Role::Nasdaq),
            sox_change: self.change_for(Role::Sox),
            tsm_change: self.change_for(Role::Tsm),
            currency_change: self.change_for(Role::Currency),
            unavailable: self
                .unavailable
                .iter()
                .map(|u| u.symbol.as_str())
                .collect::<Vec<_>>()
                .join(";"),
        }
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

pub fn record(
    prediction: &PredictionResult,
    dates: &SessionDates,
    changes: &[ChangeRecord],
    unavailable: &[Unavailable],
) -> PredictionRecord {
    let predicted_high = round_to(prediction.predicted_high, 0);
    let predicted_low = round_to(prediction.predicted_low, 0);
    let snapshot = PredictionSnapshot {
        baseline_close: round_to(prediction.baseline_close, 0),
        predicted_open: round_to(prediction.predicted_open, 0),
        change_points: round_to(prediction.change_points(), 0),
        predicted_high,
        predicted_low,
        // width always equals high - low as stored
        range_width: predicted_high - predicted_low,
        confidence: prediction.confidence,
        weighted_change: round_to(prediction.weighted_change, 2),
    };

    let indicators = changes
        .iter()
        .map(|change| IndicatorSnapshot {
            symbol: change.instrument.symbol.clone(),
            name: change.instrument.label.clone(),
            role: change.instrument.role,
            prev_close: round_to(change.previous_close, 2),
            curr_close: round_to(change.current_close, 2),
            change_pct: round_to(change.change_pct, 2),
        })
        .collect();

    PredictionRecord {
        timestamp: prediction.timestamp.to_rfc3339(),
        data_date: dates.data_date,
        prediction_date: dates.prediction_date,
        prediction: snapshot,
        indicators,
        unavailable: unavailable.to_vec(),
    }
}

pub trait PersistenceSink {
    fn name(&self) -> &str;
    fn write(&self, record: &PredictionRecord) -> Result<(), PersistError>;
}

fn ensure_parent_dir(path: &Path) -> Result<(), PersistError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            log::info!("Creating output directory at {}...", parent.display());
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Appends one row per run to a CSV log, writing the header only when the
/// file is new or empty.
pub struct CsvLogSink {
    path: PathBuf,
}

impl CsvLogSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvLogSink { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the log back and summarises it: row count plus the first and
    /// last data dates, in file order.
    pub fn history(&self) -> Result<HistorySummary, PersistError> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut summary = HistorySummary::default();
        for row in reader.deserialize() {
            let row: HistoryRow = row?;
            summary.rows += 1;
            if summary.earliest.is_none() {
                summary.earliest = Some(row.data_date);
            }
            summary.latest = Some(row.data_date);
        }
        Ok(summary)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistorySummary {
    pub rows: usize,
    pub earliest: Option<NaiveDate>,
    pub latest: Option<NaiveDate>,
}

// Only the column the summary needs, the rest of the row is ignored
#[derive(Debug, Deserialize)]
struct HistoryRow {
    data_date: NaiveDate,
}

impl PersistenceSink for CsvLogSink {
    fn name(&self) -> &str {
        "csv log"
    }

    fn write(&self, record: &PredictionRecord) -> Result<(), PersistError> {
        ensure_parent_dir(&self.path)?;
        let needs_header = fs::metadata(&self.path).map_or(true, |meta| meta.len() == 0);

        let file = fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);

        writer.serialize(record.log_row())?;
        writer.flush()?;
        Ok(())
    }
}

/// Overwrites a single pretty-printed JSON snapshot of the latest run.
pub struct JsonSnapshotSink {
    path: PathBuf,
}

impl JsonSnapshotSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonSnapshotSink { path: path.into() }
    }
}

impl PersistenceSink for JsonSnapshotSink {
    fn name(&self) -> &str {
        "json snapshot"
    }

    fn write(&self, record: &PredictionRecord) -> Result<(), PersistError> {
        ensure_parent_dir(&self.path)?;
        let json = serde_json::to_vec_pretty(record)?;

        // Rename over the old snapshot so readers never see a half-written file
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, json)?;
        if let Err(err) = fs::rename(&tmp, &self.path) {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                log::warn!("Could not remove {}: {}", tmp.display(), cleanup);
            }
            return Err(err.into());
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct PersistReport {
    pub written: Vec<String>,
    pub failed: Vec<(String, PersistError)>,
}

impl PersistReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

// Every sink is attempted; a failing one is logged and does not stop the rest
pub fn persist(record: &PredictionRecord, sinks: &[&dyn PersistenceSink]) -> PersistReport {
    let mut report = PersistReport::default();

    for sink in sinks {
        match sink.write(record) {
            Ok(()) => {
                log::info!("Saved results to {}", sink.name());
                report.written.push(sink.name().to_string());
            }
            Err(err) => {
                log::error!("Failed to write {}: {}", sink.name(), err);
                report.failed.push((sink.name().to_string(), err));
            }
        }
    }

    report
}
