use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use approx::assert_relative_eq;
use chrono::NaiveDate;

use forecastlib::market::{Bar, FetchError, FetchWindow, MarketDataProvider, Role};
use forecastlib::pipeline::{run_for_window, run_with_timeout, RunError};
use forecastlib::recorder::{CsvLogSink, JsonSnapshotSink, PersistenceSink};
use forecastlib::util::Settings;

// Serves fixed closes per symbol and counts requests
struct FixedProvider {
    closes: HashMap<String, Result<Vec<f64>, FetchError>>,
    calls: Mutex<HashMap<String, u32>>,
}

impl FixedProvider {
    fn new(entries: &[(&str, Result<Vec<f64>, FetchError>)]) -> Self {
        FixedProvider {
            closes: entries
                .iter()
                .map(|(symbol, closes)| (symbol.to_string(), closes.clone()))
                .collect(),
            calls: Mutex::new(HashMap::new()),
        }
    }

    fn calls(&self, symbol: &str) -> u32 {
        self.calls.lock().unwrap().get(symbol).copied().unwrap_or(0)
    }
}

impl MarketDataProvider for FixedProvider {
    async fn daily_bars(&self, symbol: &str, _window: &FetchWindow) -> Result<Vec<Bar>, FetchError> {
        *self.calls.lock().unwrap().entry(symbol.to_string()).or_insert(0) += 1;
        let closes = self
            .closes
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::Permanent(format!("{} not found", symbol))))?;
        Ok(closes
            .into_iter()
            .enumerate()
            .map(|(i, close)| Bar::new(NaiveDate::from_ymd_opt(2024, 3, 11 + i as u32).unwrap(), close))
            .collect())
    }
}

// Never answers within any sensible run limit
struct StalledProvider;

impl MarketDataProvider for StalledProvider {
    async fn daily_bars(&self, _symbol: &str, _window: &FetchWindow) -> Result<Vec<Bar>, FetchError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }
}

fn window() -> FetchWindow {
    FetchWindow::ending_on(NaiveDate::from_ymd_opt(2024, 3, 16).unwrap(), 15)
}

// Closes chosen so the changes are +0.5, +0.8, +1.2, +0.6 and -0.1 percent
fn healthy_market() -> Vec<(&'static str, Result<Vec<f64>, FetchError>)> {
    vec![
        ("^GSPC", Ok(vec![5100.0, 5000.0, 5025.0])),
        ("^IXIC", Ok(vec![16000.0, 16128.0])),
        ("^SOX", Ok(vec![4800.0, 4857.6])),
        ("TSM", Ok(vec![140.0, 150.0, 150.9])),
        ("USDTWD=X", Ok(vec![31.60, 31.5684])),
        ("^TWII", Ok(vec![21900.0, 22000.0])),
    ]
}

#[tokio::test(start_paused = true)]
async fn end_to_end_prediction_is_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("out/prediction_log.csv");
    let json_path = dir.path().join("out/prediction_results.json");
    let csv_sink = CsvLogSink::new(&csv_path);
    let json_sink = JsonSnapshotSink::new(&json_path);
    let sinks: Vec<&dyn PersistenceSink> = vec![&csv_sink, &json_sink];

    let provider = FixedProvider::new(&healthy_market());
    let settings = Settings::default();

    let outcome = run_for_window(&settings, &provider, &sinks, &window()).await.unwrap();

    assert_relative_eq!(outcome.prediction.weighted_change, 0.74, epsilon = 1e-9);
    assert_relative_eq!(outcome.prediction.predicted_open, 22162.8, epsilon = 1e-6);
    assert_eq!(outcome.prediction.confidence, 83);
    assert!(outcome.unavailable.is_empty());
    assert!(outcome.persistence.is_complete());
    // the window ends on a Saturday, so the data date walks back to Friday
    assert_eq!(outcome.dates.data_date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
    assert_eq!(outcome.dates.prediction_date, NaiveDate::from_ymd_opt(2024, 3, 16).unwrap());

    let snapshot: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(snapshot["prediction"]["predicted_open"], 22163.0);
    assert_eq!(snapshot["prediction"]["confidence"], 83);
    assert_eq!(snapshot["indicators"].as_array().unwrap().len(), 6);
    assert_eq!(snapshot["data_date"], "2024-03-15");
    assert_eq!(snapshot["prediction_date"], "2024-03-16");
    assert_eq!(
        snapshot["prediction"]["range_width"],
        snapshot["prediction"]["predicted_high"].as_f64().unwrap()
            - snapshot["prediction"]["predicted_low"].as_f64().unwrap()
    );

    // A second run appends a row without repeating the header
    run_for_window(&settings, &provider, &sinks, &window()).await.unwrap();
    let csv = std::fs::read_to_string(&csv_path).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("timestamp,data_date,prediction_date,baseline_close,predicted_open"));
    assert!(!lines[2].starts_with("timestamp"));

    let history = csv_sink.history().unwrap();
    assert_eq!(history.rows, 2);
    assert_eq!(history.earliest, NaiveDate::from_ymd_opt(2024, 3, 15));
    assert_eq!(history.latest, NaiveDate::from_ymd_opt(2024, 3, 15));
}

#[tokio::test(start_paused = true)]
async fn missing_weighted_instrument_fails_instead_of_defaulting() {
    let mut market = healthy_market();
    market.retain(|(symbol, _)| *symbol != "TSM");
    market.push(("TSM", Err(FetchError::Permanent("symbol may be delisted".to_string()))));
    let provider = FixedProvider::new(&market);
    let settings = Settings::default();

    let err = run_for_window(&settings, &provider, &[], &window()).await.unwrap_err();

    match err {
        RunError::InsufficientData(inner) => assert!(inner.to_string().contains("tsm")),
        other => panic!("expected insufficient data, got {:?}", other),
    }
    // permanent errors are not retried
    assert_eq!(provider.calls("TSM"), 1);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried_up_to_the_limit() {
    let market: Vec<_> = healthy_market()
        .into_iter()
        .map(|(symbol, _)| (symbol, Err(FetchError::Transient("connection reset".to_string()))))
        .collect();
    let provider = FixedProvider::new(&market);
    let settings = Settings::default();

    let err = run_for_window(&settings, &provider, &[], &window()).await.unwrap_err();

    assert!(matches!(err, RunError::NoData));
    assert_eq!(provider.calls("^GSPC"), settings.fetch.max_retries);
}

#[tokio::test(start_paused = true)]
async fn single_bar_target_still_supplies_the_baseline() {
    let mut market = healthy_market();
    market.retain(|(symbol, _)| *symbol != "^TWII");
    market.push(("^TWII", Ok(vec![22000.0])));
    let provider = FixedProvider::new(&market);

    let outcome = run_for_window(&Settings::default(), &provider, &[], &window())
        .await
        .unwrap();

    assert_eq!(outcome.prediction.baseline_close, 22000.0);
    let target = outcome
        .changes
        .iter()
        .find(|c| c.instrument.role == Role::Target)
        .unwrap();
    assert_eq!(target.change_pct, 0.0);
}

#[tokio::test(start_paused = true)]
async fn persistence_failure_does_not_fail_the_run() {
    let dir = tempfile::tempdir().unwrap();
    // A directory where the snapshot file should be cannot be overwritten
    let blocked = dir.path().join("blocked");
    std::fs::create_dir_all(blocked.join("inner")).unwrap();
    let json_sink = JsonSnapshotSink::new(&blocked);
    let sinks: Vec<&dyn PersistenceSink> = vec![&json_sink];
    let provider = FixedProvider::new(&healthy_market());

    let outcome = run_for_window(&Settings::default(), &provider, &sinks, &window())
        .await
        .unwrap();

    assert!(!outcome.persistence.is_complete());
    assert_eq!(outcome.persistence.failed.len(), 1);
    assert_eq!(outcome.prediction.confidence, 83);
    assert!(!dir.path().join("blocked.tmp").exists());
}

#[tokio::test(start_paused = true)]
async fn zero_previous_target_close_still_supplies_the_baseline() {
    let mut market = healthy_market();
    market.retain(|(symbol, _)| *symbol != "^TWII");
    market.push(("^TWII", Ok(vec![0.0, 22000.0])));
    let provider = FixedProvider::new(&market);

    let outcome = run_for_window(&Settings::default(), &provider, &[], &window())
        .await
        .unwrap();

    assert_eq!(outcome.prediction.baseline_close, 22000.0);
    assert_relative_eq!(outcome.prediction.predicted_open, 22162.8, epsilon = 1e-6);
    // the target's own change is undefined and shows up as a gap
    assert!(outcome.changes.iter().all(|c| c.instrument.role != Role::Target));
    assert_eq!(outcome.unavailable.len(), 1);
    assert_eq!(outcome.unavailable[0].role, Role::Target);
}

#[tokio::test(start_paused = true)]
async fn stalled_run_hits_the_global_timeout() {
    let mut settings = Settings::default();
    settings.run_timeout_secs = 5;

    let err = run_with_timeout(&settings, &StalledProvider, &[]).await.unwrap_err();

    match err {
        RunError::Timeout(limit) => assert_eq!(limit, Duration::from_secs(5)),
        other => panic!("expected a timeout, got {:?}", other),
    }
}
