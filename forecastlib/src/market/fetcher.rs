use std::time::Duration;

use futures::future::join_all;

use crate::market::bars::BarSeries;
use crate::market::errors::{FetchError, FetchFailure};
use crate::market::instrument::Instrument;
use crate::market::provider::{FetchWindow, MarketDataProvider};
use crate::market::retry::RetryPolicy;
use crate::util::FetchSettings;

// Outcome for one instrument; every configured instrument gets exactly one
#[derive(Debug)]
pub struct FetchReport {
    pub instrument: Instrument,
    pub result: Result<BarSeries, FetchFailure>,
}

pub struct Fetcher<'a, P> {
    provider: &'a P,
    policy: RetryPolicy,
}

impl<'a, P: MarketDataProvider> Fetcher<'a, P> {
    pub fn new(provider: &'a P, settings: &FetchSettings) -> Self {
        let policy = RetryPolicy::new(
            settings.max_retries,
            Duration::from_secs(settings.backoff_base_secs),
        );
        Fetcher { provider, policy }
    }

    pub fn with_policy(provider: &'a P, policy: RetryPolicy) -> Self {
        Fetcher { provider, policy }
    }

    pub async fn fetch(
        &self,
        instrument: &Instrument,
        window: &FetchWindow,
    ) -> Result<BarSeries, FetchFailure> {
        let provider = self.provider;
        let symbol = instrument.symbol.as_str();

        self.policy
            .run(symbol, |_| async move {
                let bars = provider.daily_bars(symbol, window).await?;
                // An empty range is as final as an unknown symbol
                if bars.is_empty() {
                    return Err(FetchError::Permanent(format!(
                        "no bars between {}",
                        window
                    )));
                }
                Ok::<_, FetchError>(BarSeries::new(bars))
            })
            .await
    }

    // Instruments are independent, so they are fetched concurrently. Each
    // keeps its own retry loop; a slow or failing one never fails the others.
    pub async fn fetch_all(
        &self,
        instruments: &[Instrument],
        window: &FetchWindow,
    ) -> Vec<FetchReport> {
        let fetches = instruments.iter().map(|instrument| async move {
            log::debug!("Fetching {} ({})...", instrument.symbol, instrument.label);
            let result = self.fetch(instrument, window).await;
            FetchReport {
                instrument: instrument.clone(),
                result,
            }
        });

        join_all(fetches).await
    }
}
