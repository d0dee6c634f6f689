use serde::Deserialize;

use crate::market::Bar;
use crate::yahoo::helpers::session_date;

pub const API_URL: &str = "https://query1.finance.yahoo.com";

// Yahoo rejects requests without a browser-looking user agent
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

#[derive(Debug, Deserialize)]
pub struct ChartResponse {
    pub chart: Chart,
}

#[derive(Debug, Deserialize)]
pub struct Chart {
    pub result: Option<Vec<ChartResult>>,
    pub error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
pub struct ChartError {
    pub code: String,
    pub description: Option<String>,
}

impl ChartError {
    pub fn is_not_found(&self) -> bool {
        self.code == "Not Found"
    }
}

impl std::fmt::Display for ChartError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{}: {}", self.code, description),
            None => f.write_str(&self.code),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    pub meta: ChartMeta,
    // Absent entirely when the range holds no sessions
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: Indicators,
}

#[derive(Debug, Deserialize)]
pub struct ChartMeta {
    pub symbol: String,
    // Exchange offset from UTC in seconds
    #[serde(default)]
    pub gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
pub struct Quote {
    #[serde(default)]
    pub close: Vec<Option<f64>>,
}

impl ChartResult {
    // Pairs timestamps with closes, dropping sessions Yahoo reports as null
    pub fn bars(&self) -> Vec<Bar> {
        let closes = match self.indicators.quote.first() {
            Some(quote) => &quote.close,
            None => return Vec::new(),
        };

        self.timestamp
            .iter()
            .zip(closes)
            .filter_map(|(&timestamp, close)| {
                let close = (*close).filter(|c| c.is_finite())?;
                let date = session_date(timestamp, self.meta.gmtoffset)?;
                Some(Bar::new(date, close))
            })
            .collect()
    }
}
