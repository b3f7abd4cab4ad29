/// Proximity correlation: associating stations with earthquake events.
///
/// A station is associated with an event when its great-circle distance to
/// the epicenter is within the event's radius and, if a time window is set,
/// it has at least one sample dated inside that window. Associations are
/// never stored; every call recomputes them from the dataset.

use std::collections::{BTreeMap, HashSet};

use crate::analysis::geo::haversine_km;
use crate::analysis::shift_days;
use crate::config::CorrelationConfig;
use crate::dataset::Dataset;
use crate::error::GeoError;
use crate::model::{EarthquakeEvent, Station};

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// How far from an epicenter a station may be.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RadiusRule {
    /// Same radius for every event, in km.
    Fixed(f64),
    /// `10^(M/2 - 0.79)` km, the threshold distance of UNR step catalogs.
    MagnitudeScaled,
}

impl RadiusRule {
    pub fn radius_for(&self, event: &EarthquakeEvent) -> f64 {
        match self {
            RadiusRule::Fixed(km) => *km,
            RadiusRule::MagnitudeScaled => magnitude_scaled_radius_km(event.magnitude),
        }
    }
}

pub fn magnitude_scaled_radius_km(magnitude: f64) -> f64 {
    10f64.powf(magnitude / 2.0 - 0.79)
}

/// Days around an origin date in which a station must have data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub before_days: i64,
    pub after_days: i64,
}

impl TimeWindow {
    pub fn admits(&self, station: &Station, event: &EarthquakeEvent) -> bool {
        let origin = event.origin_date();
        station.has_sample_between(
            shift_days(origin, self.before_days.saturating_neg()),
            shift_days(origin, self.after_days),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityParams {
    pub radius: RadiusRule,
    pub window: Option<TimeWindow>,
}

impl ProximityParams {
    /// Configured defaults, with `radius_km` (from a request) forcing a fixed radius.
    pub fn from_config(config: &CorrelationConfig, radius_km: Option<f64>) -> Self {
        let radius = match radius_km {
            Some(km) => RadiusRule::Fixed(km),
            None => config.default_radius_rule(),
        };
        let window = match (config.window_before_days, config.window_after_days) {
            (Some(before_days), Some(after_days)) => Some(TimeWindow {
                before_days,
                after_days,
            }),
            _ => None,
        };
        Self { radius, window }
    }

    pub fn fixed(radius_km: f64) -> Self {
        Self {
            radius: RadiusRule::Fixed(radius_km),
            window: None,
        }
    }
}

/// Distance to the epicenter if `station` is associated with `event`.
pub fn association_distance(
    station: &Station,
    event: &EarthquakeEvent,
    params: &ProximityParams,
) -> Option<f64> {
    let distance = haversine_km(station.position, event.epicenter);
    if distance > params.radius.radius_for(event) {
        return None;
    }
    if let Some(window) = &params.window {
        if !window.admits(station, event) {
            return None;
        }
    }
    Some(distance)
}

// ---------------------------------------------------------------------------
// Event -> stations
// ---------------------------------------------------------------------------

/// Stations associated with `event`, ordered by station id.
pub fn stations_near<'a>(
    dataset: &'a Dataset,
    event: &EarthquakeEvent,
    params: &ProximityParams,
) -> Vec<&'a Station> {
    dataset
        .stations()
        .iter()
        .filter(|s| association_distance(s, event, params).is_some())
        .collect()
}

/// Stations per requested event, plus their union.
#[derive(Debug)]
pub struct EventStations<'a> {
    /// In request order, one entry per distinct event id.
    pub by_event: Vec<(String, Vec<&'a Station>)>,
    /// Every station from `by_event`, once, ordered by id.
    pub union: Vec<&'a Station>,
}

/// Trims ids, drops empties and repeats, keeps first-seen order.
pub fn dedup_ids(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty() && seen.insert(id.to_string()))
        .map(str::to_string)
        .collect()
}

pub fn stations_for_events<'a>(
    dataset: &'a Dataset,
    event_ids: &[String],
    params: &ProximityParams,
) -> Result<EventStations<'a>, GeoError> {
    let event_ids = dedup_ids(event_ids);
    if event_ids.is_empty() {
        return Err(GeoError::EmptySelection("no event ids given".to_string()));
    }

    let mut by_event = Vec::with_capacity(event_ids.len());
    let mut union: BTreeMap<&str, &Station> = BTreeMap::new();

    for id in event_ids {
        let event = dataset
            .events()
            .find_event(&id)
            .ok_or_else(|| GeoError::event_not_found(id.as_str()))?;
        let near = stations_near(dataset, event, params);
        for &station in &near {
            union.insert(station.station_id.as_str(), station);
        }
        log::debug!("{}: {} stations within radius", id, near.len());
        by_event.push((id, near));
    }

    Ok(EventStations {
        by_event,
        union: union.into_values().collect(),
    })
}

// ---------------------------------------------------------------------------
// Station subsample with associations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoadQuery {
    /// Share of the id-sorted station table to consider, in (0, 100].
    pub load_percentage: f64,
    pub magnitude_threshold: Option<f64>,
    /// Keep only the first N qualifying events by origin time.
    pub earthquake_count: Option<usize>,
    pub proximity: ProximityParams,
    /// Drop stations with a gap between samples longer than this.
    pub gap_tolerance_days: Option<i64>,
    /// Drop stations with no associated event.
    pub associated_only: bool,
}

#[derive(Debug, Clone)]
pub struct StationSummary<'a> {
    pub station: &'a Station,
    pub eq_count: usize,
    /// Parallel to `event_ids`, in event order.
    pub magnitudes: Vec<f64>,
    pub event_ids: Vec<String>,
}

/// Number of stations taken from a table of `total` for `percentage`.
pub fn subsample_size(total: usize, percentage: f64) -> usize {
    if total == 0 {
        return 0;
    }
    let n = (percentage / 100.0 * total as f64).floor() as usize;
    n.clamp(1, total)
}

pub fn load_stations<'a>(
    dataset: &'a Dataset,
    query: &LoadQuery,
) -> Result<Vec<StationSummary<'a>>, GeoError> {
    let pct = query.load_percentage;
    if !(pct > 0.0 && pct <= 100.0) {
        return Err(GeoError::invalid(
            "load_percentage",
            format!("{} is outside (0, 100]", pct),
        ));
    }
    if query.earthquake_count == Some(0) {
        return Err(GeoError::invalid("earthquake_count", "must be at least 1"));
    }

    let take = subsample_size(dataset.stations().len(), pct);
    let events = dataset
        .events()
        .select(query.magnitude_threshold, query.earthquake_count);

    let mut summaries = Vec::with_capacity(take);
    for station in dataset.stations().iter().take(take) {
        if let Some(tolerance) = query.gap_tolerance_days {
            if station.max_gap_days() > tolerance {
                continue;
            }
        }

        let near: Vec<&EarthquakeEvent> = events
            .iter()
            .copied()
            .filter(|e| association_distance(station, e, &query.proximity).is_some())
            .collect();

        if query.associated_only && near.is_empty() {
            continue;
        }

        summaries.push(StationSummary {
            station,
            eq_count: near.len(),
            magnitudes: near.iter().map(|e| e.magnitude).collect(),
            event_ids: near.iter().map(|e| e.event_id.clone()).collect(),
        });
    }

    log::info!(
        "load_stations: {} of {} stations, {} events considered",
        summaries.len(),
        dataset.stations().len(),
        events.len()
    );

    Ok(summaries)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
