//! Short-lived on-disk forecast cache keyed by `(locality, country)`.
//!
//! Each entry is one file named `<fetched_at>_<locality>_<country>.json`
//! holding the raw upstream body. Key parts are percent-escaped so `_` only
//! ever appears as a separator. Entries are write-once snapshots and no
//! locking is done: two concurrent misses may both fetch and both write.

use chrono::{DateTime, Utc};
use std::{
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{debug, info, warn};

use crate::{
    Config,
    error::{ForecastError, Result},
    model::{BundleStatus, ForecastBundle},
    provider::ForecastProvider,
};

pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

const EXTENSION: &str = ".json";

#[derive(Debug, Clone)]
pub struct ForecastCache {
    dir: PathBuf,
    ttl: Duration,
}

/// A cache file name decoded back into its parts.
#[derive(Debug, PartialEq, Eq)]
struct EntryName<'a> {
    fetched_at: i64,
    locality: &'a str,
    country: &'a str,
}

impl ForecastCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ttl: DEFAULT_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(config.cache_dir()?).with_ttl(config.cache_ttl()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Return a fresh cached bundle for the key, or fetch and cache a live one.
    pub async fn fetch(
        &self,
        locality: &str,
        country: &str,
        provider: &dyn ForecastProvider,
    ) -> Result<ForecastBundle> {
        self.fetch_at(locality, country, provider, Utc::now()).await
    }

    /// [`ForecastCache::fetch`] with an explicit clock.
    pub async fn fetch_at(
        &self,
        locality: &str,
        country: &str,
        provider: &dyn ForecastProvider,
        now: DateTime<Utc>,
    ) -> Result<ForecastBundle> {
        if let Some(bundle) = self.lookup(locality, country, provider, now) {
            return Ok(bundle);
        }

        info!(%locality, %country, "fetching live forecast");
        let body = provider.fetch_raw(locality, country).await?;
        let bundle = provider.parse(&body)?;

        match bundle.status {
            BundleStatus::Ok => {
                self.store(locality, country, &body, now);
                Ok(bundle)
            }
            BundleStatus::NotFound => {
                debug!(%locality, %country, "location unknown upstream, not caching");
                Ok(bundle)
            }
            BundleStatus::Error(ref cod) => Err(ForecastError::Upstream(format!(
                "OpenWeather returned status code {cod}"
            ))),
        }
    }

    /// Remove every cache entry, fresh or not. Returns how many were deleted.
    pub fn purge(&self) -> Result<usize> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(ForecastError::Store(format!(
                    "Failed to read cache directory {}: {e}",
                    self.dir.display()
                )));
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if EntryName::parse(name).is_none() {
                continue;
            }
            fs::remove_file(entry.path()).map_err(|e| {
                ForecastError::Store(format!("Failed to remove cache entry {name}: {e}"))
            })?;
            removed += 1;
        }

        Ok(removed)
    }

    /// Sweep expired entries and return the newest fresh bundle for the key.
    ///
    /// Every store failure degrades to a miss.
    fn lookup(
        &self,
        locality: &str,
        country: &str,
        provider: &dyn ForecastProvider,
        now: DateTime<Utc>,
    ) -> Option<ForecastBundle> {
        if let Err(e) = fs::create_dir_all(&self.dir) {
            warn!(dir = %self.dir.display(), error = %e, "forecast cache directory unavailable");
            return None;
        }

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "failed to scan forecast cache");
                return None;
            }
        };

        let wanted_locality = encode_key(locality);
        let wanted_country = encode_key(country);
        let ttl = self.ttl.as_secs() as i64;
        let cutoff = now.timestamp() - ttl;

        let mut newest: Option<(i64, PathBuf)> = None;

        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else { continue };
            let Some(name) = EntryName::parse(file_name) else { continue };

            if name.fetched_at < cutoff {
                debug!(entry = file_name, "removing expired forecast");
                if let Err(e) = fs::remove_file(entry.path()) {
                    warn!(entry = file_name, error = %e, "failed to remove expired forecast");
                }
                continue;
            }

            if name.locality == wanted_locality
                && name.country == wanted_country
                && newest.as_ref().is_none_or(|(at, _)| name.fetched_at > *at)
            {
                newest = Some((name.fetched_at, entry.path()));
            }
        }

        let (_, path) = newest?;
        let body = match fs::read_to_string(&path) {
            Ok(body) => body,
            Err(e) => {
                warn!(entry = %path.display(), error = %e, "failed to read cached forecast");
                return None;
            }
        };

        match provider.parse(&body) {
            Ok(bundle) if bundle.is_ok() => {
                debug!(%locality, %country, "forecast cache hit");
                Some(bundle)
            }
            Ok(bundle) => {
                warn!(entry = %path.display(), status = ?bundle.status, "ignoring cached non-forecast");
                None
            }
            Err(e) => {
                warn!(entry = %path.display(), error = %e, "ignoring unreadable cached forecast");
                None
            }
        }
    }

    fn store(&self, locality: &str, country: &str, body: &str, now: DateTime<Utc>) {
        let path = self.dir.join(entry_file_name(now.timestamp(), locality, country));

        match fs::write(&path, body) {
            Ok(()) => debug!(entry = %path.display(), "cached forecast"),
            Err(e) => warn!(entry = %path.display(), error = %e, "failed to cache forecast"),
        }
    }
}

impl<'a> EntryName<'a> {
    fn parse(file_name: &'a str) -> Option<Self> {
        let stem = file_name.strip_suffix(EXTENSION)?;
        let mut parts = stem.split('_');

        let fetched_at = parts.next()?;
        let locality = parts.next()?;
        let country = parts.next()?;
        if parts.next().is_some() || fetched_at.is_empty() || locality.is_empty() {
            return None;
        }
        if !fetched_at.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        Some(Self {
            fetched_at: fetched_at.parse().ok()?,
            locality,
            country,
        })
    }
}

fn entry_file_name(fetched_at: i64, locality: &str, country: &str) -> String {
    format!(
        "{fetched_at}_{}_{}{EXTENSION}",
        encode_key(locality),
        encode_key(country)
    )
}

/// Keep alphanumerics and `-`, percent-escape every other UTF-8 byte.
fn encode_key(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c.is_alphanumeric() || c == '-' {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            for b in c.encode_utf8(&mut buf).bytes() {
                let _ = write!(out, "%{b:02X}");
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::openweather::parse_forecast_body;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const FOUND: &str = r#"{"cod":"200","list":[{"dt":1000,"main":{"temp":280.0},"weather":[{"id":800,"main":"Clear"}]}]}"#;
    const FOUND_LATER: &str = r#"{"cod":"200","list":[{"dt":5000,"main":{"temp":290.0},"weather":[{"id":500,"main":"Rain"}]}]}"#;
    const NOT_FOUND: &str = r#"{"cod":"404","message":"city not found"}"#;
    const SERVER_ERROR: &str = r#"{"cod":"500","message":"internal error"}"#;

    #[derive(Debug)]
    struct CountingProvider {
        body: String,
        calls: AtomicUsize,
    }

    impl CountingProvider {
        fn new(body: &str) -> Self {
            Self {
                body: body.to_string(),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ForecastProvider for CountingProvider {
        async fn fetch_raw(&self, _locality: &str, _country: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.body.clone())
        }

        fn parse(&self, body: &str) -> Result<ForecastBundle> {
            parse_forecast_body(body)
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 3, 12, 0, 0).unwrap()
    }

    fn entry_count(dir: &Path) -> usize {
        fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn fresh_entry_is_served_without_refetch() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ForecastCache::new(dir.path());
        let provider = CountingProvider::new(FOUND);

        let first = cache.fetch_at("Paris", "fr", &provider, t0()).await.unwrap();
        let second = cache
            .fetch_at("Paris", "fr", &provider, t0() + chrono::Duration::minutes(9))
            .await
            .unwrap();

        assert_eq!(provider.calls(), 1);
        assert_eq!(first, second);
        assert_eq!(entry_count(dir.path()), 1);
    }

    #[tokio::test]
    async fn stale_entry_is_refetched_and_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ForecastCache::new(dir.path());
        let provider = CountingProvider::new(FOUND);

        cache.fetch_at("Paris", "fr", &provider, t0()).await.unwrap();
        cache
            .fetch_at("Paris", "fr", &provider, t0() + chrono::Duration::minutes(11))
            .await
            .unwrap();

        assert_eq!(provider.calls(), 2);
        assert_eq!(entry_count(dir.path()), 1);
    }

    #[tokio::test]
    async fn sweep_removes_expired_entries_of_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ForecastCache::new(dir.path());
        let provider = CountingProvider::new(FOUND);

        cache.fetch_at("Lyon", "fr", &provider, t0()).await.unwrap();
        cache
            .fetch_at("Berlin", "de", &provider, t0() + chrono::Duration::minutes(20))
            .await
            .unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].contains("Berlin"));
    }

    #[tokio::test]
    async fn different_keys_do_not_share_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ForecastCache::new(dir.path());
        let paris = CountingProvider::new(FOUND);
        let rome = CountingProvider::new(FOUND_LATER);

        cache.fetch_at("Paris", "fr", &paris, t0()).await.unwrap();
        let bundle = cache.fetch_at("Rome", "it", &rome, t0()).await.unwrap();

        assert_eq!(rome.calls(), 1);
        assert_eq!(bundle.samples[0].timestamp, 5000);
    }

    #[tokio::test]
    async fn not_found_is_returned_but_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ForecastCache::new(dir.path());
        let provider = CountingProvider::new(NOT_FOUND);

        let bundle = cache.fetch_at("Atlantis", "gr", &provider, t0()).await.unwrap();
        cache.fetch_at("Atlantis", "gr", &provider, t0()).await.unwrap();

        assert_eq!(bundle.status, BundleStatus::NotFound);
        assert!(bundle.samples.is_empty());
        assert_eq!(provider.calls(), 2);
        assert_eq!(entry_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn upstream_failure_is_an_error_and_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ForecastCache::new(dir.path());
        let provider = CountingProvider::new(SERVER_ERROR);

        let err = cache.fetch_at("Paris", "fr", &provider, t0()).await.unwrap_err();

        assert!(matches!(err, ForecastError::Upstream(ref m) if m.contains("500")));
        assert_eq!(entry_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn unusable_store_falls_back_to_live_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "x").unwrap();
        let cache = ForecastCache::new(&blocker);
        let provider = CountingProvider::new(FOUND);

        let bundle = cache.fetch_at("Paris", "fr", &provider, t0()).await.unwrap();

        assert!(bundle.is_ok());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn corrupted_entry_is_treated_as_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ForecastCache::new(dir.path());
        let provider = CountingProvider::new(FOUND);
        fs::write(
            dir.path().join(entry_file_name(t0().timestamp(), "Paris", "fr")),
            "{not json",
        )
        .unwrap();

        let bundle = cache.fetch_at("Paris", "fr", &provider, t0()).await.unwrap();

        assert!(bundle.is_ok());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn purge_removes_only_cache_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ForecastCache::new(dir.path());
        let provider = CountingProvider::new(FOUND);
        cache.fetch_at("Paris", "fr", &provider, t0()).await.unwrap();
        cache.fetch_at("Lyon", "fr", &provider, t0()).await.unwrap();
        fs::write(dir.path().join("README"), "keep me").unwrap();

        assert_eq!(cache.purge().unwrap(), 2);
        assert_eq!(entry_count(dir.path()), 1);
    }

    #[test]
    fn key_encoding_keeps_parts_separable() {
        let a = entry_file_name(1, "Saint_Malo", "fr");
        let b = entry_file_name(1, "Saint", "Malo_fr");
        assert_ne!(a, b);

        let parsed = EntryName::parse(&a).unwrap();
        assert_eq!(parsed.fetched_at, 1);
        assert_eq!(parsed.locality, encode_key("Saint_Malo"));
        assert_eq!(parsed.country, "fr");
    }

    #[test]
    fn key_encoding_escapes_separators_and_keeps_accents() {
        assert_eq!(encode_key("Aix-en-Provence"), "Aix-en-Provence");
        assert_eq!(encode_key("Saint Étienne"), "Saint%20Étienne");
        assert_eq!(encode_key("a/b%"), "a%2Fb%25");
    }

    #[test]
    fn foreign_file_names_are_ignored() {
        assert!(EntryName::parse("README").is_none());
        assert!(EntryName::parse("abc_Paris_fr.json").is_none());
        assert!(EntryName::parse("12_Paris_fr_extra.json").is_none());
    }
}
