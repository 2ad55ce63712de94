//! Mapping a requested instant onto one 3-hour forecast sample.

use chrono::{DateTime, Duration, Utc};

use crate::model::ForecastSample;

/// Width of the window following each sample's timestamp.
pub const SAMPLE_WINDOW_SECS: i64 = 3 * 60 * 60;

/// Pick the index of the sample covering `requested`, or `None`.
///
/// Requests for "now", for up to three hours in the past, or for anything
/// before the first sample's timestamp (now may lag behind the first bucket)
/// map to the first sample. Otherwise the last sample whose open window
/// `(ts, ts + 3h)` contains the request wins.
pub fn resolve(
    samples: &[ForecastSample],
    requested: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<usize> {
    let first = samples.first()?;

    if requested == now || (requested >= now - Duration::hours(3) && requested <= now) {
        return Some(0);
    }

    let t = requested.timestamp();
    if requested > now && t <= first.timestamp {
        return Some(0);
    }

    let mut selected = None;
    for (i, sample) in samples.iter().enumerate() {
        if in_window(sample, t) {
            selected = Some(i);
        }
    }
    selected
}

fn in_window(sample: &ForecastSample, t: i64) -> bool {
    t > sample.timestamp && t < sample.timestamp + SAMPLE_WINDOW_SECS
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(timestamp: i64) -> ForecastSample {
        ForecastSample {
            timestamp,
            temperature: 280.0,
            conditions: vec![],
        }
    }

    fn at(ts: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(ts, 0).unwrap()
    }

    const BASE: i64 = 1_714_737_600; // 2024-05-03 12:00:00 UTC
    const H: i64 = 3600;

    /// Eight regular samples starting at BASE, 3h apart.
    fn regular() -> Vec<ForecastSample> {
        (0..8).map(|i| sample(BASE + i * 3 * H)).collect()
    }

    #[test]
    fn now_resolves_to_first_sample() {
        let now = at(BASE + H);
        assert_eq!(resolve(&regular(), now, now), Some(0));
    }

    #[test]
    fn recent_past_resolves_to_first_sample() {
        let now = at(BASE + 2 * H);
        for back in [1, 60, H, 2 * H, 3 * H] {
            assert_eq!(resolve(&regular(), at(BASE + 2 * H - back), now), Some(0), "back={back}");
        }
    }

    #[test]
    fn distant_past_resolves_to_none() {
        let now = at(BASE + 2 * H);
        assert_eq!(resolve(&regular(), at(BASE - 5 * H), now), None);
    }

    #[test]
    fn request_before_first_bucket_but_after_now_uses_first() {
        let now = at(BASE - H);
        assert_eq!(resolve(&regular(), at(BASE - 30 * 60), now), Some(0));
    }

    #[test]
    fn request_inside_window_picks_that_sample() {
        let now = at(BASE);
        assert_eq!(resolve(&regular(), at(BASE + 7 * H), now), Some(2));
        assert_eq!(resolve(&regular(), at(BASE + 21 * H + 1), now), Some(7));
    }

    #[test]
    fn window_bounds_are_exclusive() {
        let now = at(BASE);
        // Exactly on a sample timestamp belongs to neither neighbouring window.
        assert_eq!(resolve(&regular(), at(BASE + 6 * H), now), None);
        assert_eq!(resolve(&regular(), at(BASE + 6 * H + 1), now), Some(2));
        assert_eq!(resolve(&regular(), at(BASE + 9 * H - 1), now), Some(2));
    }

    #[test]
    fn beyond_last_window_is_none() {
        let now = at(BASE);
        assert_eq!(resolve(&regular(), at(BASE + 24 * H), now), None);
        assert_eq!(resolve(&regular(), at(BASE + 30 * H), now), None);
    }

    #[test]
    fn overlapping_windows_pick_the_later_sample() {
        let samples = vec![sample(BASE), sample(BASE + 2 * H), sample(BASE + 3 * H)];
        let now = at(BASE - 10 * H);

        // BASE+2.5h is inside the first two windows, BASE+3.5h the last two.
        assert_eq!(resolve(&samples, at(BASE + 2 * H + 30 * 60), now), Some(1));
        assert_eq!(resolve(&samples, at(BASE + 3 * H + 30 * 60), now), Some(2));
    }

    #[test]
    fn empty_bundle_never_resolves() {
        let now = at(BASE);
        assert_eq!(resolve(&[], now, now), None);
        assert_eq!(resolve(&[], at(BASE + 4 * H), now), None);
    }
}
