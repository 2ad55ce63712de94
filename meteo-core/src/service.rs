//! Question pipeline: location, cache, resolver, then one of three adapters.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{
    Config, ForecastCache,
    advice::{
        self, ClothingAdvice, TemperatureQuestion, TemperatureVerdict, confirms_condition,
    },
    error::{ForecastError, Result},
    location::{CountryTable, Location, LocationQuery, resolve_location},
    model::{BundleStatus, ForecastBundle, ForecastSample, RequestedTime, requested_instant},
    provider::{ForecastProvider, provider_from_config},
    resolver,
};

/// A question's location and time slots.
#[derive(Debug, Clone, Default)]
pub struct ForecastRequest {
    pub location: LocationQuery,
    pub time: Option<RequestedTime>,
}

/// A bundle together with the sample chosen for the request.
#[derive(Debug, Clone)]
pub struct ResolvedForecast {
    pub location: Location,
    pub bundle: ForecastBundle,
    pub slot: usize,
    pub requested: DateTime<Utc>,
    pub now: DateTime<Utc>,
}

impl ResolvedForecast {
    pub fn sample(&self) -> &ForecastSample {
        &self.bundle.samples[self.slot]
    }

    /// True when no explicit time was asked.
    pub fn is_current(&self) -> bool {
        self.requested == self.now
    }
}

#[derive(Debug, Clone)]
pub struct ConditionAnswer {
    pub forecast: ResolvedForecast,
    pub confirmed: bool,
}

#[derive(Debug, Clone)]
pub struct ItemAnswer {
    pub forecast: ResolvedForecast,
    pub advice: ClothingAdvice,
}

#[derive(Debug, Clone)]
pub struct TemperatureAnswer {
    pub forecast: ResolvedForecast,
    pub celsius: f64,
    /// Present when a question phrase was asked and could be answered.
    pub verdict: Option<TemperatureVerdict>,
}

#[derive(Debug)]
pub struct WeatherService {
    cache: ForecastCache,
    provider: Box<dyn ForecastProvider>,
    countries: Option<CountryTable>,
    default_locality: String,
    default_country: String,
}

impl WeatherService {
    pub fn new(
        cache: ForecastCache,
        provider: Box<dyn ForecastProvider>,
        default_locality: impl Into<String>,
        default_country: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            provider,
            countries: None,
            default_locality: default_locality.into(),
            default_country: default_country.into(),
        }
    }

    pub fn with_countries(mut self, countries: CountryTable) -> Self {
        self.countries = Some(countries);
        self
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let cache = ForecastCache::from_config(config)?;
        let provider = provider_from_config(config)?;
        let service = Self::new(
            cache,
            provider,
            config.default_location.clone(),
            config.default_country.clone(),
        );

        match &config.country_table {
            Some(path) => Ok(service.with_countries(CountryTable::load(path)?)),
            None => Ok(service),
        }
    }

    pub fn cache(&self) -> &ForecastCache {
        &self.cache
    }

    /// Fetch (or reuse) the forecast for the request and pick its sample.
    pub async fn forecast(
        &self,
        request: &ForecastRequest,
        now: DateTime<Utc>,
    ) -> Result<ResolvedForecast> {
        let location = resolve_location(
            &request.location,
            &self.default_locality,
            &self.default_country,
            self.countries.as_ref(),
        )?;

        let bundle = self
            .cache
            .fetch_at(&location.locality, &location.country, self.provider.as_ref(), now)
            .await?;

        match &bundle.status {
            BundleStatus::Ok => {}
            BundleStatus::NotFound => {
                return Err(ForecastError::NotFound {
                    locality: location.locality,
                    country: location.country,
                });
            }
            BundleStatus::Error(cod) => {
                return Err(ForecastError::Upstream(format!(
                    "OpenWeather returned status code {cod}"
                )));
            }
        }

        let requested = requested_instant(request.time.as_ref(), now);
        let slot = resolver::resolve(&bundle.samples, requested, now)
            .ok_or(ForecastError::NoApplicableSlot)?;

        debug!(
            locality = %location.locality,
            %requested,
            slot,
            samples = bundle.samples.len(),
            "resolved forecast slot"
        );

        Ok(ResolvedForecast {
            location,
            bundle,
            slot,
            requested,
            now,
        })
    }

    /// Is the named condition (e.g. "pluie") expected?
    pub async fn condition(
        &self,
        request: &ForecastRequest,
        phrase: &str,
        now: DateTime<Utc>,
    ) -> Result<ConditionAnswer> {
        let forecast = self.forecast(request, now).await?;
        let confirmed = confirms_condition(forecast.sample(), phrase);
        Ok(ConditionAnswer {
            forecast,
            confirmed,
        })
    }

    /// Is the named clothing item worth taking?
    pub async fn item(
        &self,
        request: &ForecastRequest,
        item: &str,
        now: DateTime<Utc>,
    ) -> Result<ItemAnswer> {
        let forecast = self.forecast(request, now).await?;
        let advice = advice::clothing_advice(item, forecast.sample());
        Ok(ItemAnswer { forecast, advice })
    }

    /// Temperature at the requested time, with an optional question verdict.
    pub async fn temperature(
        &self,
        request: &ForecastRequest,
        question: Option<TemperatureQuestion>,
        now: DateTime<Utc>,
    ) -> Result<TemperatureAnswer> {
        let forecast = self.forecast(request, now).await?;
        let celsius = forecast.sample().temperature_celsius();
        let verdict = question.and_then(|q| {
            advice::answer_temperature_question(q, &forecast.bundle.samples, forecast.slot)
        });

        Ok(TemperatureAnswer {
            forecast,
            celsius,
            verdict,
        })
    }
}
