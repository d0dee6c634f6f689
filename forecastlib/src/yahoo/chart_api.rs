use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::StatusCode;

use crate::market::{Bar, FetchError, FetchWindow, MarketDataProvider};
use crate::util::FetchSettings;
use crate::yahoo::objects::{ChartResponse, BROWSER_USER_AGENT};

/// Daily bars from the Yahoo Finance v8 chart endpoint.
pub struct YahooClient {
    client: reqwest::Client,
    base_url: String,
}

impl YahooClient {
    pub fn new(settings: &FetchSettings) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));

        // The request timeout bounds each attempt on its own
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;

        Ok(YahooClient {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl MarketDataProvider for YahooClient {
    async fn daily_bars(&self, symbol: &str, window: &FetchWindow) -> Result<Vec<Bar>, FetchError> {
        let (period1, period2) = window.unix_bounds();
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
            ])
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(classify_transport_error)?;
        log::trace!("{} chart response ({}): {}", symbol, status, body);

        parse_chart(status, &body)
    }
}

pub fn classify_transport_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
        FetchError::Transient(err.to_string())
    } else {
        FetchError::Unknown(err.to_string())
    }
}

pub fn classify_status(status: StatusCode, body: &str) -> Option<FetchError> {
    if status.is_success() {
        return None;
    }

    // Keep provider messages short in logs
    let detail: String = body.chars().take(200).collect();
    let message = format!("received status code {}: {}", status, detail);

    let error = if status == StatusCode::NOT_FOUND {
        FetchError::Permanent(message)
    } else if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        FetchError::Transient(message)
    } else {
        FetchError::Unknown(message)
    };
    Some(error)
}

pub fn parse_chart(status: StatusCode, body: &str) -> Result<Vec<Bar>, FetchError> {
    if let Some(error) = classify_status(status, body) {
        return Err(error);
    }

    let response: ChartResponse = serde_json::from_str(body)
        .map_err(|err| FetchError::Unknown(format!("error parsing chart JSON: {}", err)))?;

    if let Some(error) = response.chart.error {
        return Err(if error.is_not_found() {
            FetchError::Permanent(error.to_string())
        } else {
            FetchError::Unknown(error.to_string())
        });
    }

    let result = response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| FetchError::Permanent("chart response has no result".to_string()))?;

    let bars = result.bars();
    if bars.is_empty() {
        return Err(FetchError::Permanent(format!(
            "no data found for {} in range",
            result.meta.symbol
        )));
    }

    Ok(bars)
}
