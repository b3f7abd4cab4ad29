/// Shared data types: stations, displacement samples, earthquake events.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// A WGS84 latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// One daily solution: offsets from the station's reference position, in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DisplacementSample {
    pub date: NaiveDate,
    pub east: f64,
    pub north: f64,
    pub vertical: f64,
}

/// A GNSS ground station with its full displacement series.
///
/// `samples` is ordered by date with no duplicate dates.
#[derive(Debug, Clone)]
pub struct Station {
    pub station_id: String,
    pub position: GeoPoint,
    pub samples: Vec<DisplacementSample>,
}

impl Station {
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.samples.first().map(|s| s.date)
    }

    /// True if any sample falls within `[start, end]`.
    pub fn has_sample_between(&self, start: NaiveDate, end: NaiveDate) -> bool {
        let idx = self.samples.partition_point(|s| s.date < start);
        self.samples.get(idx).is_some_and(|s| s.date <= end)
    }

    /// Largest gap in days between consecutive samples (0 for fewer than two).
    pub fn max_gap_days(&self) -> i64 {
        self.samples
            .windows(2)
            .map(|w| (w[1].date - w[0].date).num_days())
            .max()
            .unwrap_or(0)
    }
}

/// A cataloged earthquake.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EarthquakeEvent {
    pub event_id: String,
    pub magnitude: f64,
    pub epicenter: GeoPoint,
    pub origin_time: DateTime<Utc>,
    pub depth_km: Option<f64>,
}

impl EarthquakeEvent {
    pub fn origin_date(&self) -> NaiveDate {
        self.origin_time.date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(y: i32, m: u32, d: u32) -> DisplacementSample {
        DisplacementSample {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            east: 0.0,
            north: 0.0,
            vertical: 0.0,
        }
    }

    fn station(samples: Vec<DisplacementSample>) -> Station {
        Station {
            station_id: "TEST".to_string(),
            position: GeoPoint::new(0.0, 0.0),
            samples,
        }
    }

    #[test]
    fn test_has_sample_between_inclusive_bounds() {
        let s = station(vec![sample(2020, 1, 1), sample(2020, 1, 10)]);
        let d = |day| NaiveDate::from_ymd_opt(2020, 1, day).unwrap();

        assert!(s.has_sample_between(d(1), d(1)));
        assert!(s.has_sample_between(d(5), d(10)));
        assert!(!s.has_sample_between(d(2), d(9)));
        assert!(!s.has_sample_between(d(11), d(20)));
    }

    #[test]
    fn test_max_gap_days() {
        let s = station(vec![sample(2020, 1, 1), sample(2020, 1, 2), sample(2020, 2, 1)]);
        assert_eq!(s.max_gap_days(), 30);
        assert_eq!(station(vec![sample(2020, 1, 1)]).max_gap_days(), 0);
    }
}
