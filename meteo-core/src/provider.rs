use crate::{Config, ForecastBundle, error::Result, provider::openweather::OpenWeatherProvider};
use async_trait::async_trait;
use std::{fmt::Debug, time::Duration};

pub mod openweather;

/// Upstream source of 3-hour forecasts.
///
/// Fetching and parsing are split so the cache can persist the raw body and
/// decode it again on a later hit.
#[async_trait]
pub trait ForecastProvider: Send + Sync + Debug {
    /// Fetch the raw forecast body for a locality in a country (ISO alpha-2).
    async fn fetch_raw(&self, locality: &str, country: &str) -> Result<String>;

    /// Decode a body previously returned by [`ForecastProvider::fetch_raw`].
    fn parse(&self, body: &str) -> Result<ForecastBundle>;
}

/// Construct the OpenWeatherMap provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn ForecastProvider>> {
    let api_key = config.api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured.\n\
                 Hint: run `meteo configure` and enter your OpenWeatherMap API key."
        )
    })?;

    let provider = OpenWeatherProvider::with_base_url(
        api_key.to_owned(),
        config.base_url(),
        Duration::from_secs(config.request_timeout_secs),
    )?;

    Ok(Box::new(provider))
}
