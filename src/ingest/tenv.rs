/// UNR `.tenv` daily time-series parser.
///
/// Each non-comment line is one daily solution, whitespace-delimited:
///
/// ```text
/// STAT YYMMMDD decyear MJD week dow dE dN dV ant sigE sigN sigV corrEN corrEV corrNV
/// ```
///
/// Some files carry a 17th column: the reference longitude, inserted just
/// before delta E. The layout is chosen per line from its column count so a
/// file mixing both still loads.
///
/// Malformed lines never abort a load. They become `ParseWarning`s and the
/// remaining samples are kept.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{GeoError, ParseWarning};
use crate::ingest::numbered_lines;
use crate::model::DisplacementSample;

/// File extension for station series files.
pub const TENV_EXTENSION: &str = "tenv";

const COLUMNS_BASIC: usize = 16;
const COLUMNS_WITH_LONGITUDE: usize = 17;

/// Result of parsing one station file.
#[derive(Debug, Clone, Default)]
pub struct TenvParse {
    /// Ordered by date, unique dates.
    pub samples: Vec<DisplacementSample>,
    pub warnings: Vec<ParseWarning>,
}

// ---------------------------------------------------------------------------
// Date handling
// ---------------------------------------------------------------------------

/// Parses the tenv `YYMMMDD` date (e.g. `08JAN05`).
///
/// Two-digit years pivot at 50: 00-49 map to 2000-2049, 50-99 to 1950-1999.
pub fn parse_tenv_date(raw: &str) -> Option<NaiveDate> {
    if raw.len() != 7 || !raw.is_ascii() {
        return None;
    }
    let yy: i32 = raw[0..2].parse().ok()?;
    let month = match raw[2..5].to_ascii_uppercase().as_str() {
        "JAN" => 1,
        "FEB" => 2,
        "MAR" => 3,
        "APR" => 4,
        "MAY" => 5,
        "JUN" => 6,
        "JUL" => 7,
        "AUG" => 8,
        "SEP" => 9,
        "OCT" => 10,
        "NOV" => 11,
        "DEC" => 12,
        _ => return None,
    };
    let day: u32 = raw[5..7].parse().ok()?;
    let year = if yy < 50 { 2000 + yy } else { 1900 + yy };
    NaiveDate::from_ymd_opt(year, month, day)
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parses the text of `<station_id>.tenv`.
///
/// Lines whose station column differs from `station_id`, or that are not
/// valid UTF-8, are skipped with a warning. If a date appears more than once,
/// the last line wins.
pub fn parse_tenv(station_id: &str, text: impl AsRef<[u8]>) -> TenvParse {
    let source = format!("{}.{}", station_id, TENV_EXTENSION);
    let mut by_date: BTreeMap<NaiveDate, DisplacementSample> = BTreeMap::new();
    let mut warnings = Vec::new();

    for (line_no, line) in numbered_lines(text.as_ref()) {
        let line = match line {
            Ok(line) => line,
            Err(reason) => {
                warnings.push(ParseWarning::new(&source, line_no, reason));
                continue;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        match parse_line(station_id, trimmed) {
            Ok(sample) => {
                by_date.insert(sample.date, sample);
            }
            Err(reason) => warnings.push(ParseWarning::new(&source, line_no, reason)),
        }
    }

    TenvParse {
        samples: by_date.into_values().collect(),
        warnings,
    }
}

fn parse_line(station_id: &str, line: &str) -> Result<DisplacementSample, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();

    // Index of delta E depends on the layout
    let east_idx = match fields.len() {
        COLUMNS_BASIC => 6,
        COLUMNS_WITH_LONGITUDE => 7,
        n => {
            return Err(format!(
                "expected {} or {} columns, got {}",
                COLUMNS_BASIC, COLUMNS_WITH_LONGITUDE, n
            ))
        }
    };

    if !fields[0].eq_ignore_ascii_case(station_id) {
        return Err(format!("station column '{}' does not match file", fields[0]));
    }

    let date = parse_tenv_date(fields[1])
        .ok_or_else(|| format!("invalid date '{}'", fields[1]))?;

    let east = parse_offset(fields[east_idx], "delta E")?;
    let north = parse_offset(fields[east_idx + 1], "delta N")?;
    let vertical = parse_offset(fields[east_idx + 2], "delta V")?;

    Ok(DisplacementSample {
        date,
        east,
        north,
        vertical,
    })
}

fn parse_offset(raw: &str, column: &str) -> Result<f64, String> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("invalid {} '{}'", column, raw))
}

// ---------------------------------------------------------------------------
// File access
// ---------------------------------------------------------------------------

/// Path of a station's series file inside `tenv_dir`.
pub fn tenv_path(tenv_dir: &Path, station_id: &str) -> PathBuf {
    tenv_dir.join(format!("{}.{}", station_id, TENV_EXTENSION))
}

/// Loads and parses one station's series.
///
/// Returns `GeoError::NotFound` if the station has no file.
pub fn load_station_series(tenv_dir: &Path, station_id: &str) -> Result<TenvParse, GeoError> {
    let path = tenv_path(tenv_dir, station_id);
    let bytes = fs::read(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            GeoError::station_not_found(station_id)
        } else {
            GeoError::Io { path: path.clone(), source: e }
        }
    })?;

    let parsed = parse_tenv(station_id, &bytes);
    for warning in &parsed.warnings {
        warning.log();
    }
    log::debug!(
        "loaded {} samples for {} ({} lines skipped)",
        parsed.samples.len(),
        station_id,
        parsed.warnings.len()
    );
    Ok(parsed)
}

/// Station ids that have a `.tenv` file in `tenv_dir`, sorted.
///
/// Hidden files are ignored.
pub fn list_station_files(tenv_dir: &Path) -> Result<Vec<String>, GeoError> {
    let entries = fs::read_dir(tenv_dir).map_err(|e| GeoError::Io {
        path: tenv_dir.to_path_buf(),
        source: e,
    })?;

    let mut ids: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(TENV_EXTENSION))
        .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
        .filter(|stem| !stem.starts_with('.'))
        .collect();
    ids.sort();
    Ok(ids)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::fixtures::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // --- Dates ---------------------------------------------------------------

    #[test]
    fn test_parse_tenv_date_pivots_two_digit_years() {
        assert_eq!(parse_tenv_date("08JAN05"), Some(date(2008, 1, 5)));
        assert_eq!(parse_tenv_date("49DEC31"), Some(date(2049, 12, 31)));
        assert_eq!(parse_tenv_date("50JAN01"), Some(date(1950, 1, 1)));
        assert_eq!(parse_tenv_date("99jun15"), Some(date(1999, 6, 15)));
    }

    #[test]
    fn test_parse_tenv_date_rejects_garbage() {
        assert_eq!(parse_tenv_date("08XYZ05"), None);
        assert_eq!(parse_tenv_date("08FEB30"), None);
        assert_eq!(parse_tenv_date("2008-01-05"), None);
        assert_eq!(parse_tenv_date(""), None);
    }

    // --- Lines ---------------------------------------------------------------

    #[test]
    fn test_malformed_line_is_skipped_and_rest_loads() {
        let parsed = parse_tenv("AAAA", fixture_tenv_aaaa());

        assert_eq!(parsed.samples.len(), 5, "one of six lines is malformed");
        assert_eq!(parsed.warnings.len(), 1);
        assert_eq!(parsed.warnings[0].line, 3);
        assert!(parsed.warnings[0].reason.contains("delta E"));
    }

    #[test]
    fn test_non_utf8_line_is_skipped_and_rest_loads() {
        let mut bytes = fixture_tenv_aaaa().as_bytes().to_vec();
        bytes.extend_from_slice(b"AAAA 20JAN08 2020.0205 58856 2087 3 \xff\xfe 0.0420 0.0030 0.0 0.0 0.0 0.0 0.0 0.0 0.0\n");

        let parsed = parse_tenv("AAAA", &bytes);
        assert_eq!(parsed.samples.len(), 5);
        assert_eq!(parsed.warnings.len(), 2);
        assert_eq!(parsed.warnings[1].line, 7);
        assert!(parsed.warnings[1].reason.contains("UTF-8"));
    }

    #[test]
    fn test_load_station_series_survives_non_utf8_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = fixture_tenv_aaaa().as_bytes().to_vec();
        bytes.extend_from_slice(b"\xff\xfe\n");
        fs::write(tenv_path(dir.path(), "AAAA"), bytes).unwrap();

        let parsed = load_station_series(dir.path(), "AAAA").unwrap();
        assert_eq!(parsed.samples.len(), 5);
    }

    #[test]
    fn test_samples_are_ordered_by_date() {
        let text = "\
AAAA 20JAN03 2020.0068 58851 2086 5 0.3 0.3 0.3 0.0 0.0 0.0 0.0 0.0 0.0 0.0
AAAA 20JAN01 2020.0014 58849 2086 3 0.1 0.1 0.1 0.0 0.0 0.0 0.0 0.0 0.0 0.0
AAAA 20JAN02 2020.0041 58850 2086 4 0.2 0.2 0.2 0.0 0.0 0.0 0.0 0.0 0.0 0.0
";
        let parsed = parse_tenv("AAAA", text);
        let dates: Vec<_> = parsed.samples.iter().map(|s| s.date).collect();
        assert_eq!(dates, vec![date(2020, 1, 1), date(2020, 1, 2), date(2020, 1, 3)]);
    }

    #[test]
    fn test_duplicate_date_last_line_wins() {
        let text = "\
AAAA 20JAN01 2020.0014 58849 2086 3 0.1 0.1 0.1 0.0 0.0 0.0 0.0 0.0 0.0 0.0
AAAA 20JAN01 2020.0014 58849 2086 3 0.9 0.8 0.7 0.0 0.0 0.0 0.0 0.0 0.0 0.0
";
        let parsed = parse_tenv("AAAA", text);
        assert_eq!(parsed.samples.len(), 1);
        assert_eq!(parsed.samples[0].east, 0.9);
        assert_eq!(parsed.samples[0].north, 0.8);
        assert_eq!(parsed.samples[0].vertical, 0.7);
    }

    #[test]
    fn test_seventeen_column_layout_skips_reference_longitude() {
        let parsed = parse_tenv("BBBB", fixture_tenv_bbbb());

        assert!(parsed.warnings.is_empty());
        assert_eq!(parsed.samples.len(), 4);
        let first = parsed.samples[0];
        assert_eq!(first.east, 0.0030);
        assert_eq!(first.north, 0.0010);
        assert_eq!(first.vertical, -0.0020);
    }

    #[test]
    fn test_wrong_column_count_and_station_mismatch_are_warnings() {
        let text = "\
AAAA 20JAN01 2020.0014
ZZZZ 20JAN02 2020.0041 58850 2086 4 0.2 0.2 0.2 0.0 0.0 0.0 0.0 0.0 0.0 0.0
# comment line

AAAA 20JAN03 2020.0068 58851 2086 5 NaN 0.3 0.3 0.0 0.0 0.0 0.0 0.0 0.0 0.0
";
        let parsed = parse_tenv("AAAA", text);
        assert!(parsed.samples.is_empty());
        assert_eq!(parsed.warnings.len(), 3, "comments and blank lines are not warnings");
        assert!(parsed.warnings[0].reason.contains("columns"));
        assert!(parsed.warnings[1].reason.contains("ZZZZ"));
        assert_eq!(parsed.warnings[2].line, 5);
    }

    // --- Files ---------------------------------------------------------------

    #[test]
    fn test_load_station_series_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_station_series(dir.path(), "NOPE").unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn test_list_station_files_only_tenv_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["BBBB.tenv", "AAAA.tenv", "notes.txt", ".hidden.tenv"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        let ids = list_station_files(dir.path()).unwrap();
        assert_eq!(ids, vec!["AAAA".to_string(), "BBBB".to_string()]);
    }
}
