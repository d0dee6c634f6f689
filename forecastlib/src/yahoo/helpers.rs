use chrono::{DateTime, NaiveDate};

// Yahoo stamps daily bars with the session open in UTC; shifting by the
// exchange offset before truncating gives the local trading date.
pub fn session_date(timestamp: i64, gmtoffset: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(timestamp.checked_add(gmtoffset)?, 0).map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shifts_into_exchange_time() {
        // 2024-03-14 01:00 UTC is already 09:00 on the 14th in Taipei
        assert_eq!(
            session_date(1_710_378_000, 28_800),
            NaiveDate::from_ymd_opt(2024, 3, 14)
        );
        // 2024-03-14 02:00 UTC is still the evening of the 13th in New York
        assert_eq!(
            session_date(1_710_381_600, -14_400),
            NaiveDate::from_ymd_opt(2024, 3, 13)
        );
    }
}
