/// Displacement aggregation over selected stations and events.
///
/// Two views:
/// - `averaged_displacement`: stations aligned on an event origin and
///   averaged per day offset, for displacement-vs-time plots.
/// - `distance_vs_displacement`: one coseismic displacement per
///   (event, station) pair against epicentral distance.
///
/// Time arithmetic is in whole calendar days. A sample dated on the origin
/// day is neither "before" nor "after" the event for step statistics, since
/// the daily solution mixes both sides.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::analysis::proximity::{association_distance, dedup_ids, ProximityParams};
use crate::analysis::shift_days;
use crate::config::AggregationConfig;
use crate::dataset::Dataset;
use crate::error::GeoError;
use crate::model::{DisplacementSample, EarthquakeEvent, Station};

// ---------------------------------------------------------------------------
// Averaged displacement
// ---------------------------------------------------------------------------

/// What day 0 means for each station.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Alignment {
    /// Every station uses this event's origin date.
    Event(String),
    /// Each station uses the earliest event associated with it, or its own
    /// first sample when it has none.
    #[default]
    EarliestEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AveragedPoint {
    pub offset_days: i64,
    pub east: f64,
    pub north: f64,
    pub vertical: f64,
    /// Stations with a sample at this offset.
    pub station_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AveragedSeries {
    /// Ordered by offset.
    pub points: Vec<AveragedPoint>,
    pub resolved: Vec<String>,
    pub unresolved: Vec<String>,
}

#[derive(Default)]
struct Accumulator {
    east: f64,
    north: f64,
    vertical: f64,
    count: usize,
}

fn earliest_event_origin(
    dataset: &Dataset,
    station: &Station,
    proximity: &ProximityParams,
) -> Option<NaiveDate> {
    dataset
        .events()
        .iter()
        .find(|e| association_distance(station, e, proximity).is_some())
        .map(EarthquakeEvent::origin_date)
}

pub fn averaged_displacement(
    dataset: &Dataset,
    station_ids: &[String],
    alignment: &Alignment,
    proximity: &ProximityParams,
) -> Result<AveragedSeries, GeoError> {
    let station_ids = dedup_ids(station_ids);
    if station_ids.is_empty() {
        return Err(GeoError::EmptySelection("no station ids given".to_string()));
    }

    let fixed_origin = match alignment {
        Alignment::Event(id) => Some(
            dataset
                .events()
                .find_event(id)
                .ok_or_else(|| GeoError::event_not_found(id.as_str()))?
                .origin_date(),
        ),
        Alignment::EarliestEvent => None,
    };

    let mut resolved = Vec::new();
    let mut unresolved = Vec::new();
    let mut by_offset: BTreeMap<i64, Accumulator> = BTreeMap::new();

    for id in station_ids {
        let Some(station) = dataset.stations().find_station(&id) else {
            log::warn!("averaged_displacement: unknown station {}", id);
            unresolved.push(id);
            continue;
        };

        let origin = fixed_origin
            .or_else(|| earliest_event_origin(dataset, station, proximity))
            .or_else(|| station.first_date());

        if let Some(origin) = origin {
            for sample in &station.samples {
                let acc = by_offset.entry((sample.date - origin).num_days()).or_default();
                acc.east += sample.east;
                acc.north += sample.north;
                acc.vertical += sample.vertical;
                acc.count += 1;
            }
        }
        resolved.push(id);
    }

    if resolved.is_empty() {
        return Err(GeoError::EmptySelection(format!(
            "none of the requested stations are known: {}",
            unresolved.join(", ")
        )));
    }

    let points = by_offset
        .into_iter()
        .map(|(offset_days, acc)| {
            let n = acc.count as f64;
            AveragedPoint {
                offset_days,
                east: acc.east / n,
                north: acc.north / n,
                vertical: acc.vertical / n,
                station_count: acc.count,
            }
        })
        .collect();

    Ok(AveragedSeries {
        points,
        resolved,
        unresolved,
    })
}

// ---------------------------------------------------------------------------
// Distance vs displacement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    /// Offset between the last sample before and the first sample after the origin.
    #[default]
    Step,
    /// Largest horizontal offset from the pre-event baseline in the window after the origin.
    Peak,
}

impl Statistic {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "step" => Some(Statistic::Step),
            "peak" => Some(Statistic::Peak),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplacementParams {
    pub proximity: ProximityParams,
    pub statistic: Statistic,
    pub step_window_days: i64,
    pub peak_window_days: i64,
}

impl DisplacementParams {
    pub fn new(proximity: ProximityParams, statistic: Statistic, aggregation: &AggregationConfig) -> Self {
        Self {
            proximity,
            statistic,
            step_window_days: aggregation.step_window_days,
            peak_window_days: aggregation.peak_window_days,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistancePoint {
    pub event_id: String,
    pub station_id: String,
    pub distance_km: f64,
    /// Horizontal norm, metres.
    pub displacement_m: f64,
    pub delta_east: f64,
    pub delta_north: f64,
    pub delta_vertical: f64,
}

fn horizontal(base: &DisplacementSample, other: &DisplacementSample) -> f64 {
    (other.east - base.east).hypot(other.north - base.north)
}

/// Last sample dated strictly before `origin`, no earlier than `window` days before it.
fn baseline(samples: &[DisplacementSample], origin: NaiveDate, window: i64) -> Option<&DisplacementSample> {
    let idx = samples.partition_point(|s| s.date < origin);
    let candidate = samples[..idx].last()?;
    (candidate.date >= shift_days(origin, window.saturating_neg())).then_some(candidate)
}

/// Samples dated in `(origin, origin + window]`.
fn after(samples: &[DisplacementSample], origin: NaiveDate, window: i64) -> &[DisplacementSample] {
    let start = samples.partition_point(|s| s.date <= origin);
    let end = samples.partition_point(|s| s.date <= shift_days(origin, window));
    &samples[start..end.max(start)]
}

fn measure<'s>(
    station: &'s Station,
    origin: NaiveDate,
    params: &DisplacementParams,
) -> Option<(&'s DisplacementSample, &'s DisplacementSample)> {
    match params.statistic {
        Statistic::Step => {
            let base = baseline(&station.samples, origin, params.step_window_days)?;
            let next = after(&station.samples, origin, params.step_window_days).first()?;
            Some((base, next))
        }
        Statistic::Peak => {
            let base = baseline(&station.samples, origin, params.step_window_days)?;
            let peak = after(&station.samples, origin, params.peak_window_days)
                .iter()
                .max_by(|a, b| horizontal(base, a).total_cmp(&horizontal(base, b)))?;
            Some((base, peak))
        }
    }
}

pub fn distance_vs_displacement(
    dataset: &Dataset,
    event_ids: &[String],
    params: &DisplacementParams,
) -> Result<Vec<DistancePoint>, GeoError> {
    let event_ids = dedup_ids(event_ids);
    if event_ids.is_empty() {
        return Err(GeoError::EmptySelection("no event ids given".to_string()));
    }

    let mut points = Vec::new();
    for id in &event_ids {
        let event = dataset
            .events()
            .find_event(id)
            .ok_or_else(|| GeoError::event_not_found(id.as_str()))?;
        let origin = event.origin_date();

        let mut for_event: Vec<DistancePoint> = dataset
            .stations()
            .iter()
            .filter_map(|station| {
                let distance_km = association_distance(station, event, &params.proximity)?;
                let (base, other) = measure(station, origin, params)?;
                Some(DistancePoint {
                    event_id: event.event_id.clone(),
                    station_id: station.station_id.clone(),
                    distance_km,
                    displacement_m: horizontal(base, other),
                    delta_east: (other.east - base.east).abs(),
                    delta_north: (other.north - base.north).abs(),
                    delta_vertical: (other.vertical - base.vertical).abs(),
                })
            })
            .collect();

        for_event.sort_by(|a, b| {
            a.distance_km
                .total_cmp(&b.distance_km)
                .then_with(|| a.station_id.cmp(&b.station_id))
        });
        log::debug!("{}: {} stations with a {:?} measurement", id, for_event.len(), params.statistic);
        points.extend(for_event);
    }

    Ok(points)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
