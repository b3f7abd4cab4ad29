/// Dataset snapshot: the station table and event catalog, loaded together.
///
/// A `Dataset` is built completely before anyone can query it and is never
/// mutated afterwards. Refreshing data means building a new snapshot and
/// swapping it in (see `endpoint`'s `/reload`).
///
/// # Load Process
///
/// 1. Read the station position table and the event catalog
/// 2. Match positions against the `.tenv` files on disk
/// 3. Parse station files in parallel on a bounded thread pool
/// 4. Collect every result, then finalize the station table

use std::collections::{BTreeMap, BTreeSet};
use std::sync::mpsc;
use threadpool::ThreadPool;

use crate::config::AppConfig;
use crate::error::GeoError;
use crate::events::EventCatalog;
use crate::ingest::catalog::load_catalog;
use crate::ingest::positions::{load_positions, StationPosition};
use crate::ingest::tenv::{list_station_files, load_station_series};
use crate::model::Station;
use crate::stations::StationTable;

/// What happened while building a snapshot.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub stations_loaded: usize,
    pub events_loaded: usize,
    pub samples_loaded: usize,
    /// Lines skipped across all station files.
    pub parse_warnings: usize,
    /// Positioned stations with no (readable) `.tenv` file.
    pub missing_series: Vec<String>,
    /// `.tenv` files with no entry in the position table.
    pub unpositioned_series: Vec<String>,
}

/// Immutable station + event tables.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    stations: StationTable,
    events: EventCatalog,
    report: LoadReport,
}

impl Dataset {
    /// Wraps already-built tables.
    pub fn new(stations: StationTable, events: EventCatalog) -> Self {
        let report = LoadReport {
            stations_loaded: stations.len(),
            events_loaded: events.len(),
            samples_loaded: stations.sample_count(),
            ..LoadReport::default()
        };
        Self {
            stations,
            events,
            report,
        }
    }

    /// Loads every input file named by `config`.
    pub fn load(config: &AppConfig) -> Result<Self, GeoError> {
        let positions = load_positions(&config.data.positions_path())?;
        let events = EventCatalog::new(load_catalog(&config.data.catalog_path())?);

        let tenv_dir = config.data.tenv_path();
        let on_disk: BTreeSet<String> = list_station_files(&tenv_dir)?.into_iter().collect();

        // Later duplicate position rows win
        let positions: BTreeMap<String, StationPosition> = positions
            .into_iter()
            .map(|p| (p.station_id.clone(), p))
            .collect();

        let mut report = LoadReport::default();
        report.unpositioned_series = on_disk
            .iter()
            .filter(|id| !positions.contains_key(*id))
            .cloned()
            .collect();
        for id in &report.unpositioned_series {
            log::warn!("{} has a series file but no position, skipping", id);
        }

        let pool = ThreadPool::new(config.loader.threads.max(1));
        let (tx, rx) = mpsc::channel();

        for position in positions.into_values() {
            if !on_disk.contains(&position.station_id) {
                log::warn!("{} has a position but no series file, skipping", position.station_id);
                report.missing_series.push(position.station_id);
                continue;
            }
            let tx = tx.clone();
            let dir = tenv_dir.clone();
            pool.execute(move || {
                let result = load_station_series(&dir, &position.station_id);
                // Receiver outlives the pool; a send can only fail if loading was abandoned
                let _ = tx.send((position, result));
            });
        }
        drop(tx);

        let mut stations = Vec::new();
        for (position, result) in rx.iter() {
            match result {
                Ok(parsed) => {
                    report.parse_warnings += parsed.warnings.len();
                    stations.push(Station {
                        station_id: position.station_id,
                        position: position.position,
                        samples: parsed.samples,
                    });
                }
                Err(e) => {
                    log::warn!("failed to load {}: {}", position.station_id, e);
                    report.missing_series.push(position.station_id);
                }
            }
        }
        pool.join();

        let stations = StationTable::new(stations);
        report.missing_series.sort();
        report.stations_loaded = stations.len();
        report.events_loaded = events.len();
        report.samples_loaded = stations.sample_count();

        log::info!(
            "dataset ready: {} stations ({} samples), {} events, {} lines skipped",
            report.stations_loaded,
            report.samples_loaded,
            report.events_loaded,
            report.parse_warnings
        );

        Ok(Self {
            stations,
            events,
            report,
        })
    }

    pub fn stations(&self) -> &StationTable {
        &self.stations
    }

    pub fn events(&self) -> &EventCatalog {
        &self.events
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
