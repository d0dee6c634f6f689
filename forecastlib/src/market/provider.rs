use chrono::{Duration, NaiveDate, NaiveTime, Utc};

use crate::market::bars::Bar;
use crate::market::errors::FetchError;

/// Calendar window for a daily-bar request. `end` is exclusive, so a window
/// ending today only covers sessions that closed before today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl FetchWindow {
    pub fn ending_on(end: NaiveDate, lookback_days: u32) -> Self {
        FetchWindow {
            start: end - Duration::days(i64::from(lookback_days)),
            end,
        }
    }

    pub fn ending_today(lookback_days: u32) -> Self {
        Self::ending_on(Utc::now().date_naive(), lookback_days)
    }

    // Window bounds as seconds since the UNIX epoch, midnight UTC on each side
    pub fn unix_bounds(&self) -> (i64, i64) {
        (
            self.start.and_time(NaiveTime::MIN).and_utc().timestamp(),
            self.end.and_time(NaiveTime::MIN).and_utc().timestamp(),
        )
    }
}

impl std::fmt::Display for FetchWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Source of daily bars. Implementations only need to classify their errors;
/// retrying is the fetcher's job.
#[allow(async_fn_in_trait)]
pub trait MarketDataProvider {
    async fn daily_bars(&self, symbol: &str, window: &FetchWindow) -> Result<Vec<Bar>, FetchError>;
}
