/// Station position table parser (`ID LAT LON [HEIGHT]`).
///
/// Longitudes published in the 0-360 convention are folded into -180..180 so
/// every downstream distance works in one convention.

use std::fs;
use std::path::Path;

use crate::error::{GeoError, ParseWarning};
use crate::ingest::numbered_lines;
use crate::model::GeoPoint;

/// One row of the position table.
#[derive(Debug, Clone, PartialEq)]
pub struct StationPosition {
    pub station_id: String,
    pub position: GeoPoint,
    pub height_m: Option<f64>,
}

/// Folds any finite longitude into [-180, 180].
pub fn normalize_longitude(lon: f64) -> f64 {
    if (-180.0..=180.0).contains(&lon) {
        return lon;
    }
    let folded = (lon + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid maps +180 to -180; keep the caller's sign for the seam
    if folded == -180.0 && lon > 0.0 { 180.0 } else { folded }
}

/// Parses the position table text. Malformed or non-UTF-8 lines become warnings.
pub fn parse_positions(source: &str, text: impl AsRef<[u8]>) -> (Vec<StationPosition>, Vec<ParseWarning>) {
    let mut positions = Vec::new();
    let mut warnings = Vec::new();

    for (line_no, line) in numbered_lines(text.as_ref()) {
        let line = match line {
            Ok(line) => line,
            Err(reason) => {
                warnings.push(ParseWarning::new(source, line_no, reason));
                continue;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        match parse_line(trimmed) {
            Ok(p) => positions.push(p),
            Err(reason) => warnings.push(ParseWarning::new(source, line_no, reason)),
        }
    }

    (positions, warnings)
}

fn parse_line(line: &str) -> Result<StationPosition, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 3 {
        return Err(format!("expected at least 3 columns, got {}", fields.len()));
    }

    let lat: f64 = fields[1]
        .parse()
        .map_err(|_| format!("invalid latitude '{}'", fields[1]))?;
    let lon: f64 = fields[2]
        .parse()
        .map_err(|_| format!("invalid longitude '{}'", fields[2]))?;

    if !(-90.0..=90.0).contains(&lat) {
        return Err(format!("latitude {} out of range", lat));
    }
    if !lon.is_finite() {
        return Err(format!("invalid longitude '{}'", fields[2]));
    }

    Ok(StationPosition {
        station_id: fields[0].to_string(),
        position: GeoPoint::new(lat, normalize_longitude(lon)),
        height_m: fields.get(3).and_then(|h| h.parse().ok()),
    })
}

/// Reads and parses the position table at `path`, logging skipped lines.
pub fn load_positions(path: &Path) -> Result<Vec<StationPosition>, GeoError> {
    let bytes = fs::read(path).map_err(|e| GeoError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let source = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("stations");
    let (positions, warnings) = parse_positions(source, &bytes);
    for warning in &warnings {
        warning.log();
    }
    Ok(positions)
}
