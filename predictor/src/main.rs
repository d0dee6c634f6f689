use forecastlib::logging;
use forecastlib::pipeline;
use forecastlib::recorder::{CsvLogSink, JsonSnapshotSink, PersistenceSink};
use forecastlib::report;
use forecastlib::util::{read_settings, DEFAULT_SETTINGS_PATH};
use forecastlib::yahoo::YahooClient;
use std::env;
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() > 2 {
        eprintln!("Usage: {} [settings.json]", args[0]);
        std::process::exit(1);
    }
    let settings_path = args.get(1).map(String::as_str).unwrap_or(DEFAULT_SETTINGS_PATH);

    // Configure logger
    logging::configure_logger(logging::DEFAULT_LOG_FILE)?;

    let settings = read_settings(settings_path).unwrap_or_else(|err| {
        log::error!("Failed to read settings from {}: {}", settings_path, err);
        std::process::exit(1);
    });

    let provider = YahooClient::new(&settings.fetch)?;
    let csv_sink = CsvLogSink::new(&settings.output.log_path);
    let json_sink = JsonSnapshotSink::new(&settings.output.snapshot_path);
    let sinks: Vec<&dyn PersistenceSink> = vec![&csv_sink, &json_sink];

    // Exit status only reflects whether a prediction was computed; sink
    // failures have already been logged by the recorder
    match pipeline::run_with_timeout(&settings, &provider, &sinks).await {
        Ok(outcome) => {
            log::info!(
                "Prediction complete: open {:.0}, confidence {}%",
                outcome.prediction.predicted_open,
                outcome.prediction.confidence
            );
            match csv_sink.history() {
                Ok(summary) => report::history_summary(csv_sink.path(), &summary),
                Err(err) => log::warn!("Could not read back {}: {}", csv_sink.path().display(), err),
            }
            Ok(())
        }
        Err(err) => {
            log::error!("Prediction failed: {}", err);
            std::process::exit(1);
        }
    }
}
