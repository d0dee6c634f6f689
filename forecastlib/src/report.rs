// Human-readable run report, written through the log facade so it lands on
// the console and in the log file alike.

use std::path::Path;

use crate::market::{FetchReport, FetchWindow, SessionDates};
use crate::models::{BacktestSummary, ChangeRecord, PredictionResult};
use crate::recorder::{HistorySummary, Unavailable};
use crate::util;

const RULE: &str = "======================================================================";

fn section(title: &str) {
    log::info!("{}", RULE);
    log::info!("{}", title);
    log::info!("{}", RULE);
}

pub fn run_header(window: &FetchWindow, dates: &SessionDates) {
    section("Opening forecast - market data download");
    log::info!("Data window: {}", window);
    log::info!("Data date: {}, forecasting {}", dates.data_date, dates.prediction_date);
    log::info!("Run started: {}", util::generate_timestamp());
}

pub fn fetch_summary(reports: &[FetchReport]) {
    for report in reports {
        let instrument = &report.instrument;
        match &report.result {
            Ok(series) => log::info!(
                "{:<12} ({:<24}) ok, {:>2} bars",
                instrument.symbol, instrument.label, series.len()
            ),
            Err(failure) => log::error!(
                "{:<12} ({:<24}) unavailable: {}",
                instrument.symbol, instrument.label, failure
            ),
        }
    }
}

pub fn change_table(changes: &[ChangeRecord], unavailable: &[Unavailable]) {
    section("Price changes");
    for change in changes {
        let direction = if change.change_pct >= 0.0 { "+" } else { "-" };
        log::info!(
            "[{}] {:<24} | prev: {:>10.2} | curr: {:>10.2} | change: {:>7.2}%",
            direction, change.label(), change.previous_close, change.current_close, change.change_pct
        );
    }
    for gap in unavailable {
        log::warn!("[x] {:<24} | unavailable: {}", gap.name, gap.reason);
    }
}

pub fn prediction(result: &PredictionResult, dates: &SessionDates) {
    section(&format!("Opening prediction for {}", dates.prediction_date));

    log::info!("Weighted indicators:");
    for c in &result.contributions {
        log::info!(
            "  {:<10} ({:>3.0}%): {:>7.2}% x {:.2} = {:>7.3}%",
            c.role, c.weight * 100.0, c.change_pct, c.weight, c.contribution
        );
    }
    log::info!("  {}", "-".repeat(65));
    log::info!("  Weighted change: {:>7.2}%", result.weighted_change);

    log::info!("Next session (based on {} closes):", dates.data_date);
    log::info!("  Previous close   : {:>10.0}", result.baseline_close);
    log::info!(
        "  Predicted open   : {:>10.0} ({:+.0} points)",
        result.predicted_open,
        result.change_points()
    );
    log::info!("  Predicted high   : {:>10.0}", result.predicted_high);
    log::info!("  Predicted low    : {:>10.0}", result.predicted_low);
    log::info!(
        "  Range width      : {:>10.0} (+/-{:.0})",
        result.range_width,
        result.volatility_range()
    );
    log::info!("  Confidence       : {:>9}%", result.confidence);
}

pub fn backtest_summary(summary: &BacktestSummary) {
    section("Model backtest (static figures)");
    log::info!("  Direction accuracy : {:>6.1}%", summary.direction_accuracy * 100.0);
    log::info!("  Average error      : +/-{:.0} points", summary.avg_error);
    log::info!("  Band coverage      : {:>6.1}%", summary.range_coverage * 100.0);
    log::info!("  Sample size        : {} days", summary.sample_days);
}

pub fn history_summary(path: &Path, summary: &HistorySummary) {
    log::info!("{} holds {} prediction(s)", path.display(), summary.rows);
    if summary.rows > 1 {
        if let (Some(earliest), Some(latest)) = (summary.earliest, summary.latest) {
            log::info!("  Data dates: {} to {}", earliest, latest);
        }
    }
}
