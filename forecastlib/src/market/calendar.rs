use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;

// How far back the data date may walk before giving up on finding a weekday
const MAX_WALK_BACK_DAYS: u32 = 7;

pub fn is_trading_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The session whose closes feed a run, and the session being forecast.
///
/// Weekends only; exchange holidays are not modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionDates {
    pub data_date: NaiveDate,
    pub prediction_date: NaiveDate,
}

impl SessionDates {
    pub fn for_day(today: NaiveDate) -> Self {
        let mut data_date = today;
        let mut walked = 0;
        while !is_trading_day(data_date) && walked < MAX_WALK_BACK_DAYS {
            data_date -= Duration::days(1);
            walked += 1;
        }
        if !is_trading_day(data_date) {
            log::warn!("No trading day within {} days of {}, using it as is", MAX_WALK_BACK_DAYS, today);
            data_date = today;
        }

        SessionDates {
            data_date,
            prediction_date: data_date + Duration::days(1),
        }
    }
}
