use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Band around the overall rate inside which the trend counts as stable
const TREND_BAND: f64 = 0.2;

/// Samples considered for the recent rate
const RECENT_WINDOW: usize = 3;

/// A completion reading taken at a point in time
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProgressSample {
    pub timestamp: DateTime<Utc>,
    pub completion: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Accelerating,
    Decelerating,
    Stable,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trend::Accelerating => write!(f, "accelerating"),
            Trend::Decelerating => write!(f, "decelerating"),
            Trend::Stable => write!(f, "stable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Velocity {
    /// Completion percentage points gained per hour
    pub rate_per_hour: f64,
    pub estimated_completion: Option<DateTime<Utc>>,
    pub trend: Trend,
    pub samples: usize,
}

pub fn calculate_velocity(history: &[ProgressSample]) -> Velocity {
    calculate_velocity_at(history, Utc::now())
}

/// Velocity relative to an explicit `now`, used for the completion estimate
pub fn calculate_velocity_at(history: &[ProgressSample], now: DateTime<Utc>) -> Velocity {
    let mut samples = history.to_vec();
    samples.sort_by_key(|s| s.timestamp);

    let stalled = Velocity {
        rate_per_hour: 0.0,
        estimated_completion: None,
        trend: Trend::Stable,
        samples: samples.len(),
    };

    let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
        return stalled;
    };
    let Some(rate) = rate_between(first, last) else {
        return stalled;
    };

    let estimated_completion = if rate > 0.0 {
        let remaining_hours = (100.0 - last.completion).max(0.0) / rate;
        // A crawl can put the estimate beyond what a timestamp can hold
        now.checked_add_signed(Duration::milliseconds((remaining_hours * 3_600_000.0) as i64))
    } else {
        None
    };

    let recent_start = samples.len().saturating_sub(RECENT_WINDOW);
    let recent_rates: Vec<f64> = samples[recent_start..]
        .windows(2)
        .filter_map(|pair| rate_between(&pair[0], &pair[1]))
        .collect();
    let recent = if recent_rates.is_empty() {
        rate
    } else {
        recent_rates.iter().sum::<f64>() / recent_rates.len() as f64
    };

    let band = rate.abs() * TREND_BAND;
    let trend = if recent > rate + band {
        Trend::Accelerating
    } else if recent < rate - band {
        Trend::Decelerating
    } else {
        Trend::Stable
    };

    Velocity {
        rate_per_hour: rate,
        estimated_completion,
        trend,
        samples: samples.len(),
    }
}

fn rate_between(from: &ProgressSample, to: &ProgressSample) -> Option<f64> {
    let hours = (to.timestamp - from.timestamp).num_milliseconds() as f64 / 3_600_000.0;
    if hours > 0.0 {
        Some((to.completion - from.completion) / hours)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(hour: i64, completion: f64) -> ProgressSample {
        ProgressSample {
            timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::hours(hour),
            completion,
        }
    }

    #[test]
    fn test_linear_progress_is_stable() {
        let history = vec![sample(0, 0.0), sample(1, 10.0), sample(2, 20.0), sample(3, 30.0)];
        let now = sample(3, 0.0).timestamp;
        let v = calculate_velocity_at(&history, now);

        assert!((v.rate_per_hour - 10.0).abs() < 1e-9);
        assert_eq!(v.trend, Trend::Stable);
        assert_eq!(v.estimated_completion, Some(now + Duration::hours(7)));
        assert_eq!(v.samples, 4);
    }

    #[test]
    fn test_speeding_up_is_accelerating() {
        let history = vec![sample(0, 0.0), sample(4, 4.0), sample(5, 14.0), sample(6, 34.0)];
        let v = calculate_velocity(&history);
        assert_eq!(v.trend, Trend::Accelerating);
    }

    #[test]
    fn test_slowing_down_is_decelerating() {
        let history = vec![sample(0, 0.0), sample(1, 60.0), sample(2, 62.0), sample(3, 63.0)];
        let v = calculate_velocity(&history);
        assert!((v.rate_per_hour - 21.0).abs() < 1e-9);
        assert_eq!(v.trend, Trend::Decelerating);
    }

    #[test]
    fn test_unsorted_input_is_ordered_by_time() {
        let history = vec![sample(2, 20.0), sample(0, 0.0), sample(1, 10.0)];
        let v = calculate_velocity(&history);
        assert!((v.rate_per_hour - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_insufficient_history() {
        let v = calculate_velocity(&[]);
        assert_eq!(v.rate_per_hour, 0.0);
        assert_eq!(v.estimated_completion, None);
        assert_eq!(v.trend, Trend::Stable);

        let v = calculate_velocity(&[sample(0, 40.0)]);
        assert_eq!(v.samples, 1);
        assert_eq!(v.estimated_completion, None);
    }

    #[test]
    fn test_no_progress_has_no_estimate() {
        let v = calculate_velocity(&[sample(0, 40.0), sample(5, 40.0)]);
        assert_eq!(v.rate_per_hour, 0.0);
        assert_eq!(v.estimated_completion, None);
        assert_eq!(v.trend, Trend::Stable);
    }

    #[test]
    fn test_crawling_progress_has_no_estimate() {
        let history = vec![sample(0, 10.0), sample(1, 10.000_000_000_1)];
        let v = calculate_velocity_at(&history, sample(1, 0.0).timestamp);
        assert!(v.rate_per_hour > 0.0);
        assert_eq!(v.estimated_completion, None);
    }
}
