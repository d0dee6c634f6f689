use std::time::Duration;

use chrono::Utc;
use thiserror::Error;

use crate::market::{FetchWindow, Fetcher, MarketDataProvider, Role, SessionDates};
use crate::models::{compute_change, ChangeRecord, OpeningPredictor, PredictError, PredictionResult};
use crate::recorder::{self, PersistReport, PersistenceSink, PredictionRecord, Unavailable};
use crate::report;
use crate::util::Settings;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("no market data could be fetched for any instrument")]
    NoData,
    #[error(transparent)]
    InsufficientData(#[from] PredictError),
    #[error("run did not finish within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug)]
pub struct RunOutcome {
    pub dates: SessionDates,
    pub prediction: PredictionResult,
    pub record: PredictionRecord,
    pub changes: Vec<ChangeRecord>,
    pub unavailable: Vec<Unavailable>,
    pub persistence: PersistReport,
}

pub async fn run<P: MarketDataProvider>(
    settings: &Settings,
    provider: &P,
    sinks: &[&dyn PersistenceSink],
) -> Result<RunOutcome, RunError> {
    let window = FetchWindow::ending_today(settings.fetch.lookback_days);
    run_for_window(settings, provider, sinks, &window).await
}

pub async fn run_for_window<P: MarketDataProvider>(
    settings: &Settings,
    provider: &P,
    sinks: &[&dyn PersistenceSink],
    window: &FetchWindow,
) -> Result<RunOutcome, RunError> {
    // 1. Fetch
    let dates = SessionDates::for_day(window.end);
    report::run_header(window, &dates);
    let fetcher = Fetcher::new(provider, &settings.fetch);
    let reports = fetcher.fetch_all(&settings.instruments, window).await;
    report::fetch_summary(&reports);

    if reports.iter().all(|r| r.result.is_err()) {
        log::error!("Could not fetch any market data, check the network connection");
        return Err(RunError::NoData);
    }

    // 2. Changes. The baseline is the target's latest close whether or not
    // its own change can be computed.
    let mut changes = Vec::new();
    let mut unavailable = Vec::new();
    let mut baseline_close = None;
    for fetched in &reports {
        let instrument = &fetched.instrument;
        let series = match &fetched.result {
            Ok(series) => series,
            Err(failure) => {
                unavailable.push(Unavailable::from_fetch(instrument, failure));
                continue;
            }
        };
        if instrument.role == Role::Target {
            baseline_close = series.last().map(|bar| bar.close);
        }
        match compute_change(instrument, series) {
            Ok(change) => changes.push(change),
            Err(err) => {
                log::warn!("Skipping {}: {}", instrument.symbol, err);
                unavailable.push(Unavailable::from_change(instrument, &err));
            }
        }
    }
    report::change_table(&changes, &unavailable);

    // 3. Predict
    let prediction = OpeningPredictor::new(&settings.model)
        .predict(&changes, baseline_close, Utc::now())
        .map_err(|err| {
            log::error!("{}", err);
            err
        })?;
    report::prediction(&prediction, &dates);
    report::backtest_summary(&settings.model.backtest);

    // 4. Record. Persistence failures are reported but the run still succeeds.
    let record = recorder::record(&prediction, &dates, &changes, &unavailable);
    let persistence = recorder::persist(&record, sinks);
    if !persistence.is_complete() {
        log::warn!(
            "Prediction computed but {} of {} sink(s) failed to persist",
            persistence.failed.len(),
            sinks.len()
        );
    }

    Ok(RunOutcome {
        dates,
        prediction,
        record,
        changes,
        unavailable,
        persistence,
    })
}

// Global ceiling on the whole run, retries and backoff included
pub async fn run_with_timeout<P: MarketDataProvider>(
    settings: &Settings,
    provider: &P,
    sinks: &[&dyn PersistenceSink],
) -> Result<RunOutcome, RunError> {
    let limit = Duration::from_secs(settings.run_timeout_secs);
    match tokio::time::timeout(limit, run(settings, provider, sinks)).await {
        Ok(outcome) => outcome,
        Err(_) => {
            log::error!("Run exceeded the {:?} time limit", limit);
            Err(RunError::Timeout(limit))
        }
    }
}
