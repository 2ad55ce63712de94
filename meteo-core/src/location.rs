//! Choosing which `(locality, country)` to forecast for.

use anyhow::Context;
use std::{fs, path::Path};

use crate::error::{ForecastError, Result};

/// Location slots as decoded from a question. All optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationQuery {
    pub locality: Option<String>,
    /// Country as spoken, e.g. "la France".
    pub country: Option<String>,
    pub point_of_interest: Option<String>,
    pub region: Option<String>,
}

/// Resolved forecast location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub locality: String,
    /// ISO-3166 alpha-2 code.
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryEntry {
    pub name: String,
    pub code: String,
    pub capital: Option<String>,
}

/// Localized country names mapped to ISO alpha-2 codes and capitals.
#[derive(Debug, Clone, Default)]
pub struct CountryTable {
    entries: Vec<CountryEntry>,
}

impl CountryTable {
    /// Parse tab-separated rows: column 1 is the name, 2 the code, 5 the capital.
    pub fn parse(text: &str) -> Self {
        let entries = text
            .lines()
            .filter_map(|line| {
                let cols: Vec<&str> = line.split('\t').collect();
                let name = cols.get(1)?.trim();
                let code = cols.get(2)?.trim();
                if name.is_empty() || code.is_empty() {
                    return None;
                }
                let capital = cols
                    .get(5)
                    .map(|c| c.trim())
                    .filter(|c| !c.is_empty())
                    .map(str::to_string);

                Some(CountryEntry {
                    name: name.to_string(),
                    code: code.to_lowercase(),
                    capital,
                })
            })
            .collect();

        Self { entries }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read country table: {}", path.display()))?;
        Ok(Self::parse(&text))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Match on the last word of the spoken name so articles are ignored.
    pub fn lookup(&self, spoken: &str) -> Option<&CountryEntry> {
        let word = spoken.split_whitespace().last()?.to_lowercase();
        self.entries.iter().find(|e| e.name.to_lowercase() == word)
    }
}

/// Resolve a query against the configured defaults.
///
/// Points of interest and regions are rejected. A foreign country without a
/// city falls back to its capital when the table knows it.
pub fn resolve_location(
    query: &LocationQuery,
    default_locality: &str,
    default_country: &str,
    countries: Option<&CountryTable>,
) -> Result<Location> {
    if query.point_of_interest.is_some() {
        return Err(ForecastError::PointOfInterestUnsupported);
    }
    if query.region.is_some() {
        return Err(ForecastError::RegionUnsupported);
    }

    let (country, capital) = match &query.country {
        Some(spoken) => match countries.and_then(|t| t.lookup(spoken)) {
            Some(entry) => (entry.code.clone(), entry.capital.clone()),
            None => (spoken.trim().to_lowercase(), None),
        },
        None => (default_country.to_lowercase(), None),
    };

    let locality = match &query.locality {
        Some(locality) => locality.trim().to_string(),
        None if !country.eq_ignore_ascii_case(default_country) => {
            capital.ok_or_else(|| ForecastError::LocalityRequired(country.clone()))?
        }
        None => default_locality.to_string(),
    };

    Ok(Location { locality, country })
}
