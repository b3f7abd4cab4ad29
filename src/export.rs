/// Station/event association table as CSV.
///
/// One row per (station, event) pair produced by `load_stations`, so the
/// same subsample and filters as the map service apply.

use std::io;
use std::path::Path;

use serde::Serialize;

use crate::analysis::geo::haversine_km;
use crate::analysis::proximity::{load_stations, LoadQuery};
use crate::dataset::Dataset;
use crate::error::GeoError;

#[derive(Debug, Serialize)]
struct AssociationRow<'a> {
    station_id: &'a str,
    lat: f64,
    lon: f64,
    event_id: &'a str,
    magnitude: f64,
    origin_time: String,
    distance_km: f64,
}

/// Writes the association rows and returns how many were written.
pub fn write_associations<W: io::Write>(
    dataset: &Dataset,
    query: &LoadQuery,
    writer: &mut csv::Writer<W>,
) -> Result<usize, GeoError> {
    let summaries = load_stations(dataset, query)?;
    let to_export = |e: csv::Error| GeoError::Export {
        path: "<writer>".into(),
        source: e,
    };

    let mut rows = 0;
    for summary in &summaries {
        let station = summary.station;
        for event_id in &summary.event_ids {
            let Some(event) = dataset.events().find_event(event_id) else {
                continue;
            };
            writer
                .serialize(AssociationRow {
                    station_id: &station.station_id,
                    lat: station.position.lat,
                    lon: station.position.lon,
                    event_id: &event.event_id,
                    magnitude: event.magnitude,
                    origin_time: event.origin_time.to_rfc3339(),
                    distance_km: haversine_km(station.position, event.epicenter),
                })
                .map_err(to_export)?;
            rows += 1;
        }
    }

    writer
        .flush()
        .map_err(|e| to_export(csv::Error::from(e)))?;
    Ok(rows)
}

/// Writes the association table to `path`, replacing any existing file.
pub fn export_associations(dataset: &Dataset, query: &LoadQuery, path: &Path) -> Result<usize, GeoError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| GeoError::Export {
        path: path.to_path_buf(),
        source: e,
    })?;

    write_associations(dataset, query, &mut writer).map_err(|e| match e {
        GeoError::Export { source, .. } => GeoError::Export {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })
}
