/// Earthquake event catalog reader (CSV).
///
/// Header-driven: columns may come in any order. Required columns are
/// `event_id, magnitude, latitude, longitude, origin_time`; `depth_km` is
/// optional and may be blank.
///
/// Accepted `origin_time` forms (all interpreted as UTC unless an offset is
/// given): RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`, and a bare
/// `YYYY-MM-DD` (midnight).

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{GeoError, ParseWarning};
use crate::ingest::positions::normalize_longitude;
use crate::model::{EarthquakeEvent, GeoPoint};

const REQUIRED_COLUMNS: [&str; 5] = ["event_id", "magnitude", "latitude", "longitude", "origin_time"];

/// Raw CSV row; typed fields let the csv crate reject bad numbers per row.
#[derive(Debug, Deserialize)]
struct CatalogRow {
    event_id: String,
    magnitude: f64,
    latitude: f64,
    longitude: f64,
    origin_time: String,
    #[serde(default)]
    depth_km: Option<f64>,
}

/// Parses an origin time in any of the accepted forms.
pub fn parse_origin_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parses catalog CSV from any reader.
///
/// `path` is used for error messages and warning sources only.
pub fn parse_catalog<R: Read>(
    path: &Path,
    reader: R,
) -> Result<(Vec<EarthquakeEvent>, Vec<ParseWarning>), GeoError> {
    let source = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("catalog")
        .to_string();

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| GeoError::Catalog {
            path: path.to_path_buf(),
            source: e,
        })?
        .clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(GeoError::CatalogHeader {
                path: path.to_path_buf(),
                column,
            });
        }
    }

    let mut events = Vec::new();
    let mut warnings = Vec::new();

    for result in rdr.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                let line = e.position().map_or(0, |p| p.line() as usize);
                warnings.push(ParseWarning::new(&source, line, e.to_string()));
                continue;
            }
        };
        let line = record.position().map_or(0, |p| p.line() as usize);

        let row: CatalogRow = match record.deserialize(Some(&headers)) {
            Ok(row) => row,
            Err(e) => {
                warnings.push(ParseWarning::new(&source, line, e.to_string()));
                continue;
            }
        };

        match validate_row(row) {
            Ok(event) => events.push(event),
            Err(reason) => warnings.push(ParseWarning::new(&source, line, reason)),
        }
    }

    Ok((events, warnings))
}

fn validate_row(row: CatalogRow) -> Result<EarthquakeEvent, String> {
    if row.event_id.is_empty() {
        return Err("empty event_id".to_string());
    }
    if !row.magnitude.is_finite() {
        return Err(format!("invalid magnitude for {}", row.event_id));
    }
    if !(-90.0..=90.0).contains(&row.latitude) || !row.longitude.is_finite() {
        return Err(format!("invalid epicenter for {}", row.event_id));
    }
    let origin_time = parse_origin_time(&row.origin_time)
        .ok_or_else(|| format!("invalid origin_time '{}' for {}", row.origin_time, row.event_id))?;

    Ok(EarthquakeEvent {
        event_id: row.event_id,
        magnitude: row.magnitude,
        epicenter: GeoPoint::new(row.latitude, normalize_longitude(row.longitude)),
        origin_time,
        depth_km: row.depth_km.filter(|d| d.is_finite()),
    })
}

/// Opens and parses the catalog file, logging skipped rows.
pub fn load_catalog(path: &Path) -> Result<Vec<EarthquakeEvent>, GeoError> {
    let file = File::open(path).map_err(|e| GeoError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let (events, warnings) = parse_catalog(path, file)?;
    for warning in &warnings {
        warning.log();
    }
    log::info!("read {} events from {} ({} rows skipped)", events.len(), path.display(), warnings.len());
    Ok(events)
}
