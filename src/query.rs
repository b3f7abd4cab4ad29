/// Query-string parsing and per-endpoint parameter structs.
///
/// Parameter policy:
/// - missing, empty or unparseable values fall back to the documented
///   default and log a warning
/// - parseable values outside their valid range are rejected with
///   `GeoError::InvalidParameter`
/// - id lists are comma separated, trimmed, and de-duplicated keeping the
///   first occurrence

use std::collections::HashMap;

use crate::analysis::displacement::Statistic;
use crate::analysis::proximity::dedup_ids;
use crate::error::GeoError;

/// Default share of stations returned by `/load_stations`.
pub const DEFAULT_LOAD_PERCENTAGE: f64 = 5.0;

// ---------------------------------------------------------------------------
// Raw query string
// ---------------------------------------------------------------------------

/// Decoded `key=value` pairs. A repeated key keeps its last value.
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    values: HashMap<String, String>,
}

/// Splits a request URL into its path and decoded query.
pub fn split_request_url(url: &str) -> (&str, QueryParams) {
    match url.split_once('?') {
        Some((path, query)) => (path, QueryParams::parse(query)),
        None => (url, QueryParams::default()),
    }
}

fn decode(raw: &str) -> Option<String> {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(value) => Some(value.into_owned()),
        Err(e) => {
            log::warn!("dropping undecodable query component '{}': {}", raw, e);
            None
        }
    }
}

impl QueryParams {
    pub fn parse(query: &str) -> Self {
        let mut values = HashMap::new();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            if let (Some(key), Some(value)) = (decode(key), decode(value)) {
                values.insert(key, value);
            }
        }
        Self { values }
    }

    /// Trimmed value, `None` when absent or blank.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Finite float, or `None` (with a warning if a value was present).
    pub fn float(&self, key: &str) -> Option<f64> {
        let raw = self.get(key)?;
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Some(v),
            _ => {
                log::warn!("ignoring non-numeric {}='{}', using default", key, raw);
                None
            }
        }
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        let raw = self.get(key)?;
        match raw.parse::<i64>() {
            Ok(v) => Some(v),
            Err(_) => {
                log::warn!("ignoring non-integer {}='{}', using default", key, raw);
                None
            }
        }
    }

    /// `true/1/yes` or `false/0/no`, case-insensitive.
    pub fn flag(&self, key: &str) -> Option<bool> {
        let raw = self.get(key)?;
        match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => {
                log::warn!("ignoring non-boolean {}='{}', using default", key, raw);
                None
            }
        }
    }

    pub fn id_list(&self, key: &str) -> Vec<String> {
        let raw: Vec<String> = self
            .get(key)
            .map(|v| v.split(',').map(str::to_string).collect())
            .unwrap_or_default();
        dedup_ids(&raw)
    }
}

fn positive_radius(params: &QueryParams) -> Result<Option<f64>, GeoError> {
    match params.float("radius_km") {
        Some(r) if r <= 0.0 => Err(GeoError::invalid("radius_km", format!("{} must be positive", r))),
        other => Ok(other),
    }
}

// ---------------------------------------------------------------------------
// Shared options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Svg,
    Json,
}

impl OutputFormat {
    fn from_query(params: &QueryParams) -> Self {
        match params.get("format").map(str::to_ascii_lowercase).as_deref() {
            None | Some("svg") => OutputFormat::Svg,
            Some("json") => OutputFormat::Json,
            Some(other) => {
                log::warn!("unknown format '{}', using svg", other);
                OutputFormat::Svg
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitMode {
    #[default]
    None,
    Attenuation,
}

// ---------------------------------------------------------------------------
// Per-endpoint parameters
// ---------------------------------------------------------------------------

/// `/earthquakes`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EarthquakeListParams {
    pub min_magnitude: Option<f64>,
}

impl EarthquakeListParams {
    pub fn from_query(params: &QueryParams) -> Self {
        Self {
            min_magnitude: params.float("min_magnitude"),
        }
    }
}

/// `/load_stations`
#[derive(Debug, Clone, PartialEq)]
pub struct LoadStationsParams {
    pub load_percentage: f64,
    pub magnitude_threshold: Option<f64>,
    pub earthquake_count: Option<usize>,
    /// `None` means the configured radius rule.
    pub radius_km: Option<f64>,
    pub gap_tolerance_days: Option<i64>,
    pub associated_only: bool,
}

impl Default for LoadStationsParams {
    fn default() -> Self {
        Self {
            load_percentage: DEFAULT_LOAD_PERCENTAGE,
            magnitude_threshold: None,
            earthquake_count: None,
            radius_km: None,
            gap_tolerance_days: None,
            associated_only: false,
        }
    }
}

impl LoadStationsParams {
    pub fn from_query(params: &QueryParams) -> Result<Self, GeoError> {
        let load_percentage = params.float("load_percentage").unwrap_or(DEFAULT_LOAD_PERCENTAGE);
        if !(load_percentage > 0.0 && load_percentage <= 100.0) {
            return Err(GeoError::invalid(
                "load_percentage",
                format!("{} is outside (0, 100]", load_percentage),
            ));
        }

        let earthquake_count = match params.integer("earthquake_count") {
            Some(n) if n < 1 => {
                return Err(GeoError::invalid("earthquake_count", format!("{} must be at least 1", n)));
            }
            Some(n) => Some(n as usize),
            None => None,
        };

        let gap_tolerance_days = match params.integer("gap_tolerance_days") {
            Some(n) if n < 0 => {
                return Err(GeoError::invalid("gap_tolerance_days", format!("{} is negative", n)));
            }
            other => other,
        };

        Ok(Self {
            load_percentage,
            magnitude_threshold: params.float("magnitude_threshold"),
            earthquake_count,
            radius_km: positive_radius(params)?,
            gap_tolerance_days,
            associated_only: params.flag("associated_only").unwrap_or(false),
        })
    }
}

/// `/stations_for_earthquakes`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationsForEventsParams {
    pub event_ids: Vec<String>,
    pub radius_km: Option<f64>,
}

impl StationsForEventsParams {
    pub fn from_query(params: &QueryParams) -> Result<Self, GeoError> {
        let mut event_ids = params.id_list("event_ids");
        if event_ids.is_empty() {
            event_ids = params.id_list("event_id");
        }
        Ok(Self {
            event_ids,
            radius_km: positive_radius(params)?,
        })
    }
}

/// `/plot_averaged_displacement`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AveragedPlotParams {
    pub station_ids: Vec<String>,
    /// `None` aligns each station on its earliest associated event.
    pub event_id: Option<String>,
    pub format: OutputFormat,
}

impl AveragedPlotParams {
    pub fn from_query(params: &QueryParams) -> Self {
        Self {
            station_ids: params.id_list("station_ids"),
            event_id: params.get("event_id").map(str::to_string),
            format: OutputFormat::from_query(params),
        }
    }
}

/// `/plot_distance_vs_displacement`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistancePlotParams {
    pub event_ids: Vec<String>,
    pub statistic: Statistic,
    pub fit: FitMode,
    pub radius_km: Option<f64>,
    pub format: OutputFormat,
}

impl DistancePlotParams {
    pub fn from_query(params: &QueryParams) -> Result<Self, GeoError> {
        let statistic = match params.get("statistic") {
            None => Statistic::default(),
            Some(raw) => Statistic::parse(raw).unwrap_or_else(|| {
                log::warn!("unknown statistic '{}', using step", raw);
                Statistic::default()
            }),
        };

        let fit = match params.get("fit").map(str::to_ascii_lowercase).as_deref() {
            None | Some("none") => FitMode::None,
            Some("attenuation") => FitMode::Attenuation,
            Some(other) => {
                log::warn!("unknown fit '{}', using none", other);
                FitMode::None
            }
        };

        let mut event_ids = params.id_list("event_ids");
        if event_ids.is_empty() {
            event_ids = params.id_list("event_id");
        }

        Ok(Self {
            event_ids,
            statistic,
            fit,
            radius_km: positive_radius(params)?,
            format: OutputFormat::from_query(params),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_request_url() {
        let (path, params) = split_request_url("/load_stations?load_percentage=10&radius_km=50");
        assert_eq!(path, "/load_stations");
        assert_eq!(params.float("load_percentage"), Some(10.0));

        let (path, params) = split_request_url("/health");
        assert_eq!(path, "/health");
        assert!(params.get("anything").is_none());
    }

    #[test]
    fn test_percent_decoding_and_id_lists() {
        let params = QueryParams::parse("station_ids=ALBH%2C%20P395,,ALBH+,CHWK&event_id=us%2F1");
        assert_eq!(params.id_list("station_ids"), vec!["ALBH", "P395", "CHWK"]);
        assert_eq!(params.get("event_id"), Some("us/1"));
        assert!(params.id_list("missing").is_empty());
    }

    #[test]
    fn test_non_numeric_load_percentage_falls_back_to_default() {
        let params = QueryParams::parse("load_percentage=lots");
        let parsed = LoadStationsParams::from_query(&params).unwrap();
        assert_eq!(parsed.load_percentage, DEFAULT_LOAD_PERCENTAGE);

        let params = QueryParams::parse("load_percentage=&associated_only=maybe");
        let parsed = LoadStationsParams::from_query(&params).unwrap();
        assert_eq!(parsed, LoadStationsParams::default());
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        for query in [
            "load_percentage=0",
            "load_percentage=150",
            "radius_km=-3",
            "earthquake_count=0",
            "gap_tolerance_days=-1",
        ] {
            let err = LoadStationsParams::from_query(&QueryParams::parse(query)).unwrap_err();
            assert_eq!(err.kind(), "invalid_parameter", "query {}", query);
        }
    }

    #[test]
    fn test_load_stations_params_full() {
        let params = QueryParams::parse(
            "load_percentage=25&magnitude_threshold=5.5&earthquake_count=3&radius_km=80&gap_tolerance_days=10&associated_only=true",
        );
        let parsed = LoadStationsParams::from_query(&params).unwrap();
        assert_eq!(
            parsed,
            LoadStationsParams {
                load_percentage: 25.0,
                magnitude_threshold: Some(5.5),
                earthquake_count: Some(3),
                radius_km: Some(80.0),
                gap_tolerance_days: Some(10),
                associated_only: true,
            }
        );
    }

    #[test]
    fn test_event_id_accepted_for_single_event() {
        let parsed = StationsForEventsParams::from_query(&QueryParams::parse("event_id=ev1")).unwrap();
        assert_eq!(parsed.event_ids, vec!["ev1"]);
        assert_eq!(parsed.radius_km, None);
    }

    #[test]
    fn test_distance_plot_options() {
        let parsed =
            DistancePlotParams::from_query(&QueryParams::parse("event_ids=a,b&statistic=PEAK&fit=attenuation&format=json"))
                .unwrap();
        assert_eq!(parsed.statistic, Statistic::Peak);
        assert_eq!(parsed.fit, FitMode::Attenuation);
        assert_eq!(parsed.format, OutputFormat::Json);

        let parsed = DistancePlotParams::from_query(&QueryParams::parse("event_ids=a&statistic=mean&fit=x")).unwrap();
        assert_eq!(parsed.statistic, Statistic::Step);
        assert_eq!(parsed.fit, FitMode::None);
        assert_eq!(parsed.format, OutputFormat::Svg);
    }

    #[test]
    fn test_non_finite_radius_is_ignored() {
        let parsed = StationsForEventsParams::from_query(&QueryParams::parse("event_ids=a&radius_km=NaN")).unwrap();
        assert_eq!(parsed.radius_km, None);
    }
}
