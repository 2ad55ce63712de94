use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use inquire::{Password, Text};
use meteo_core::{
    Config, ForecastError, ForecastRequest, LocationQuery, RequestedTime, ResolvedForecast,
    WeatherService, advice::TemperatureQuestion, model::parse_dialogue_time,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "meteo", version, about = "Weather answers for voice questions")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the API key and default location interactively.
    Configure,

    /// Is a condition (e.g. "pluie", "soleil") expected?
    Condition {
        /// Condition name as spoken.
        name: String,

        #[command(flatten)]
        query: QueryArgs,
    },

    /// Is a clothing item (e.g. "parapluie", "écharpe") worth taking?
    Item {
        /// Item name as spoken.
        name: String,

        #[command(flatten)]
        query: QueryArgs,
    },

    /// Temperature at a time, optionally answering a question like "plus froid".
    Temperature {
        /// Optional temperature question as spoken.
        question: Option<String>,

        #[command(flatten)]
        query: QueryArgs,
    },

    /// Manage the forecast cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Delete every cached forecast.
    Purge,
    /// Print the cache directory.
    Path,
}

/// Location and time slots of a question.
#[derive(Debug, Args)]
pub struct QueryArgs {
    /// City; defaults to the configured one.
    #[arg(long)]
    locality: Option<String>,

    /// Country name or ISO code.
    #[arg(long)]
    country: Option<String>,

    /// Point of interest (not supported, reported as such).
    #[arg(long)]
    poi: Option<String>,

    /// Region (not supported, reported as such).
    #[arg(long)]
    region: Option<String>,

    /// Requested time, "YYYY-MM-DD HH:MM:SS +HH:MM"; absent means now.
    #[arg(long)]
    at: Option<String>,

    /// End of the requested interval; turns `--at` into an interval start.
    #[arg(long, requires = "at")]
    until: Option<String>,
}

impl QueryArgs {
    fn into_request(self) -> Result<ForecastRequest, ForecastError> {
        let time = match (self.at, self.until) {
            (Some(from), Some(to)) => Some(RequestedTime::Interval {
                from: parse_dialogue_time(&from)?,
                to: parse_dialogue_time(&to)?,
            }),
            (Some(at), None) => Some(RequestedTime::Instant(parse_dialogue_time(&at)?)),
            _ => None,
        };

        Ok(ForecastRequest {
            location: LocationQuery {
                locality: self.locality,
                country: self.country,
                point_of_interest: self.poi,
                region: self.region,
            },
            time,
        })
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Cache { action } => {
                let config = Config::load()?;
                let cache = meteo_core::ForecastCache::from_config(&config)?;
                match action {
                    CacheAction::Purge => {
                        let removed = cache.purge()?;
                        println!("Removed {removed} cached forecast(s)");
                    }
                    CacheAction::Path => println!("{}", cache.dir().display()),
                }
                Ok(())
            }
            Command::Condition { name, query } => {
                ask(query, |svc, req, now| async move {
                    let answer = svc.condition(&req, &name, now).await?;
                    let verdict = if answer.confirmed {
                        format!("Yes, {name} is expected")
                    } else {
                        format!("No, {name} is not expected")
                    };
                    Ok::<_, ForecastError>(format!("{} {verdict}", lead_in(&answer.forecast)))
                })
                .await
            }
            Command::Item { name, query } => {
                ask(query, |svc, req, now| async move {
                    let answer = svc.item(&req, &name, now).await?;
                    Ok::<_, ForecastError>(format!("{} {}", lead_in(&answer.forecast), answer.advice))
                })
                .await
            }
            Command::Temperature { question, query } => {
                let question = question.as_deref().map(|q| {
                    TemperatureQuestion::from_phrase(q).ok_or_else(|| {
                        anyhow::anyhow!("Unknown temperature question '{q}'")
                    })
                });
                let question = question.transpose()?;

                ask(query, |svc, req, now| async move {
                    let answer = svc.temperature(&req, question, now).await?;
                    let mut out = format!(
                        "{} {:.2} °C.",
                        lead_in(&answer.forecast),
                        answer.celsius
                    );
                    if let Some(verdict) = answer.verdict {
                        out.push_str(&format!(" {verdict}"));
                    }
                    Ok::<_, ForecastError>(out)
                })
                .await
            }
        }
    }
}

/// Build the service, run one question and print either the answer or the
/// user-facing error message.
async fn ask<F, Fut>(query: QueryArgs, question: F) -> anyhow::Result<()>
where
    F: FnOnce(WeatherService, ForecastRequest, DateTime<Utc>) -> Fut,
    Fut: std::future::Future<Output = Result<String, ForecastError>>,
{
    let config = Config::load()?;
    let service = WeatherService::from_config(&config)?;

    let outcome = match query.into_request() {
        Ok(request) => question(service, request, Utc::now()).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(answer) => println!("{answer}"),
        Err(e) => {
            tracing::debug!(error = %e, "question failed");
            println!("{}", e.user_message());
        }
    }

    Ok(())
}

fn lead_in(forecast: &ResolvedForecast) -> String {
    let when = if forecast.is_current() {
        "Right now".to_string()
    } else {
        let local = forecast.requested.with_timezone(&chrono::Local);
        local.format("On %A %d at %H:%M").to_string()
    };
    format!("{when} in {}:", forecast.location.locality)
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("OpenWeatherMap API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    if !api_key.trim().is_empty() {
        config.set_api_key(api_key.trim().to_string());
    }

    config.default_location = Text::new("Default city:")
        .with_default(&config.default_location)
        .prompt()
        .context("Failed to read default city")?;

    config.default_country = Text::new("Default country (ISO-3166 alpha-2):")
        .with_default(&config.default_country)
        .prompt()
        .context("Failed to read default country")?
        .to_lowercase();

    let table = Text::new("Country table path (empty for none):")
        .with_default(
            &config
                .country_table
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        )
        .prompt()
        .context("Failed to read country table path")?;
    config.country_table = (!table.trim().is_empty()).then(|| table.trim().into());

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}
