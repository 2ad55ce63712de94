//! Error taxonomy for forecast lookups.
//!
//! Every variant is a reportable outcome for the dialogue layer; none of them
//! should abort the process.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForecastError {
    /// Transport failure, malformed payload or an upstream `cod` that is
    /// neither "200" nor "404".
    #[error("Upstream forecast error: {0}")]
    Upstream(String),

    #[error("Location not found upstream: {locality}, {country}")]
    NotFound { locality: String, country: String },

    #[error("No forecast sample covers the requested time")]
    NoApplicableSlot,

    #[error("Forecast cache error: {0}")]
    Store(String),

    #[error("Points of interest are not supported")]
    PointOfInterestUnsupported,

    #[error("Regions are not supported")]
    RegionUnsupported,

    #[error("A city is required for country '{0}'")]
    LocalityRequired(String),

    #[error("Invalid requested time: {0}")]
    InvalidTime(String),
}

impl ForecastError {
    /// Short message suitable for reading back to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            ForecastError::Upstream(_) | ForecastError::Store(_) => {
                "There is a problem fetching the weather information"
            }
            ForecastError::NotFound { .. } => "I could not find the city you asked for",
            ForecastError::NoApplicableSlot => {
                "It seems the date you asked for does not allow me to get any information"
            }
            ForecastError::PointOfInterestUnsupported => {
                "Sorry, I cannot get the weather for a point of interest yet"
            }
            ForecastError::RegionUnsupported => "I cannot give the weather for a region yet",
            ForecastError::LocalityRequired(_) => {
                "I need a city in the country you want the weather for"
            }
            ForecastError::InvalidTime(_) => "I am not sure which time you asked about",
        }
    }
}

impl From<reqwest::Error> for ForecastError {
    fn from(err: reqwest::Error) -> Self {
        ForecastError::Upstream(err.to_string())
    }
}

pub type Result<T, E = ForecastError> = std::result::Result<T, E>;
