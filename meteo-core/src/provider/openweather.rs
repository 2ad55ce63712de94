use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::{
    error::{ForecastError, Result},
    model::{BundleStatus, ForecastBundle, ForecastSample, WeatherCondition},
};

use super::ForecastProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

const COD_FOUND: &str = "200";
const COD_NOT_FOUND: &str = "404";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http: Client::new(),
        }
    }

    /// Point the provider at another host (mirrors, test servers) with a request timeout.
    pub fn with_base_url(api_key: String, base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }
}

/// `cod` is a string on forecast responses but a number on some error bodies.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OwCod {
    Text(String),
    Number(i64),
}

impl OwCod {
    fn into_string(self) -> String {
        match self {
            OwCod::Text(s) => s,
            OwCod::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    id: i32,
    #[serde(default)]
    main: String,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    cod: OwCod,
    #[serde(default)]
    list: Vec<OwForecastEntry>,
}

/// Decode an OpenWeatherMap `/forecast` body into a bundle.
pub fn parse_forecast_body(body: &str) -> Result<ForecastBundle> {
    let parsed: OwForecastResponse = serde_json::from_str(body).map_err(|e| {
        ForecastError::Upstream(format!(
            "Failed to parse OpenWeather forecast JSON: {e}: {}",
            truncate_body(body)
        ))
    })?;

    let cod = parsed.cod.into_string();
    let status = match cod.as_str() {
        COD_FOUND => BundleStatus::Ok,
        COD_NOT_FOUND => return Ok(ForecastBundle::not_found()),
        _ => BundleStatus::Error(cod),
    };

    let samples = parsed
        .list
        .into_iter()
        .map(|entry| ForecastSample {
            timestamp: entry.dt,
            temperature: entry.main.temp,
            conditions: entry
                .weather
                .into_iter()
                .map(|w| WeatherCondition {
                    code: w.id,
                    label: w.main,
                })
                .collect(),
        })
        .collect();

    Ok(ForecastBundle { status, samples })
}

#[async_trait]
impl ForecastProvider for OpenWeatherProvider {
    async fn fetch_raw(&self, locality: &str, country: &str) -> Result<String> {
        let url = format!("{}/forecast", self.base_url);
        let location = format!("{locality},{country}");

        debug!(%locality, %country, "requesting OpenWeather forecast");

        let res = self
            .http
            .get(&url)
            .query(&[("q", location.as_str()), ("appid", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                ForecastError::Upstream(format!("Failed to send request to OpenWeather: {e}"))
            })?;

        // Unknown cities come back as HTTP 404 with a JSON body carrying `cod`,
        // so the body is kept whatever the status.
        let status = res.status();
        let body = res.text().await.map_err(|e| {
            ForecastError::Upstream(format!("Failed to read OpenWeather response body: {e}"))
        })?;

        debug!(%status, bytes = body.len(), "OpenWeather responded");
        Ok(body)
    }

    fn parse(&self, body: &str) -> Result<ForecastBundle> {
        parse_forecast_body(body)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let cut = (0..=MAX).rev().find(|&i| body.is_char_boundary(i)).unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_found_forecast() {
        let body = r#"{
            "cod": "200", "message": 0, "cnt": 2,
            "list": [
                {"dt": 1000, "main": {"temp": 290.5}, "weather": [{"id": 800, "main": "Clear"}]},
                {"dt": 11800, "main": {"temp": 288.0}, "weather": [{"id": 500, "main": "Rain"}, {"id": 701, "main": "Mist"}]}
            ]
        }"#;

        let bundle = parse_forecast_body(body).unwrap();
        assert!(bundle.is_ok());
        assert_eq!(bundle.samples.len(), 2);
        assert_eq!(bundle.samples[1].timestamp, 11800);
        assert_eq!(bundle.samples[1].condition_codes().collect::<Vec<_>>(), vec![500, 701]);
        assert_eq!(bundle.samples[0].primary_condition().unwrap().label, "Clear");
    }

    #[test]
    fn not_found_has_no_samples() {
        let bundle = parse_forecast_body(r#"{"cod":"404","message":"city not found"}"#).unwrap();
        assert_eq!(bundle, ForecastBundle::not_found());
    }

    #[test]
    fn numeric_cod_is_an_error_status() {
        let bundle =
            parse_forecast_body(r#"{"cod":401,"message":"Invalid API key"}"#).unwrap();
        assert_eq!(bundle.status, BundleStatus::Error("401".to_string()));
    }

    #[test]
    fn garbage_body_is_upstream_error() {
        let err = parse_forecast_body("<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, ForecastError::Upstream(_)));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let body = "é".repeat(150);
        let out = truncate_body(&body);
        assert!(out.ends_with("..."));
    }
}
