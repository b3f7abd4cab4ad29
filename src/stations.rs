/// Station table: the canonical, immutable set of loaded stations.
///
/// Built once per dataset snapshot and never mutated afterwards. All other
/// modules look stations up here rather than keeping their own copies.

use std::collections::BTreeMap;

use crate::model::Station;

/// Stations keyed and iterated by id.
#[derive(Debug, Clone, Default)]
pub struct StationTable {
    stations: BTreeMap<String, Station>,
}

impl StationTable {
    /// Builds the table. A repeated id keeps the last station given.
    pub fn new(stations: impl IntoIterator<Item = Station>) -> Self {
        Self {
            stations: stations
                .into_iter()
                .map(|s| (s.station_id.clone(), s))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Looks up a station by id. Returns `None` if not found.
    pub fn find_station(&self, station_id: &str) -> Option<&Station> {
        self.stations.get(station_id)
    }

    /// Stations in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Station> {
        self.stations.values()
    }

    pub fn station_ids(&self) -> Vec<&str> {
        self.stations.keys().map(String::as_str).collect()
    }

    /// Total number of samples across all stations.
    pub fn sample_count(&self) -> usize {
        self.stations.values().map(|s| s.samples.len()).sum()
    }
}
