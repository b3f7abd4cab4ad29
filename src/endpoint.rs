/// HTTP map service over the loaded dataset.
///
/// A synchronous `tiny_http` server: each request is routed, handled and
/// answered before the next is read. Handlers are plain functions of the
/// dataset, the configuration and the decoded query, so they can be tested
/// without a socket.
///
/// Endpoints:
/// - GET  /                               - Service info and endpoint list
/// - GET  /health                         - Station and event counts
/// - GET  /earthquakes                    - Event catalog, optionally by magnitude
/// - GET  /load_stations                  - Station subsample with associated events
/// - GET  /stations_for_earthquakes       - Stations near the selected events
/// - GET  /plot_averaged_displacement     - Averaged displacement vs time
/// - GET  /plot_distance_vs_displacement  - Displacement vs epicentral distance
/// - POST /reload                         - Rebuild the dataset from disk
///
/// Handler failures are reported as `200` with
/// `{"status": "error", "kind": ..., "message": ...}`.

use std::io::Cursor;
use std::time::Instant;

use serde::Serialize;
use serde_json::{json, Value};
use tiny_http::{Header, Method, Response, StatusCode};

use crate::analysis::attenuation::{fit_attenuation, AttenuationFit};
use crate::analysis::displacement::{
    averaged_displacement, distance_vs_displacement, Alignment, DisplacementParams, DistancePoint,
};
use crate::analysis::proximity::{load_stations, stations_for_events, LoadQuery, ProximityParams};
use crate::config::AppConfig;
use crate::dataset::Dataset;
use crate::error::GeoError;
use crate::model::{EarthquakeEvent, Station};
use crate::plot::{render_averaged_displacement, render_distance_vs_displacement, EventLayer};
use crate::query::{
    split_request_url, AveragedPlotParams, DistancePlotParams, EarthquakeListParams, FitMode,
    LoadStationsParams, OutputFormat, QueryParams, StationsForEventsParams,
};

const SERVICE_NAME: &str = "geoquake_service";

const ENDPOINTS: [&str; 8] = [
    "GET /",
    "GET /health",
    "GET /earthquakes",
    "GET /load_stations",
    "GET /stations_for_earthquakes",
    "GET /plot_averaged_displacement",
    "GET /plot_distance_vs_displacement",
    "POST /reload",
];

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// What a handler produces, before it becomes an HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    Json { status_code: u16, body: Value },
    Svg(String),
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        ApiResponse::Json {
            status_code: 200,
            body,
        }
    }

    pub fn error(err: &GeoError) -> Self {
        ApiResponse::ok(json!({
            "status": "error",
            "kind": err.kind(),
            "message": err.to_string(),
        }))
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiResponse::Json { status_code, .. } => *status_code,
            ApiResponse::Svg(_) => 200,
        }
    }

    pub fn into_http(self) -> Response<Cursor<Vec<u8>>> {
        match self {
            ApiResponse::Json { status_code, body } => {
                let bytes = serde_json::to_vec_pretty(&body).unwrap_or_default();
                create_response(status_code, bytes, "application/json")
            }
            ApiResponse::Svg(svg) => create_response(200, svg.into_bytes(), "image/svg+xml"),
        }
    }
}

#[derive(Debug, Serialize)]
struct StationJson<'a> {
    station_id: &'a str,
    lat: f64,
    lon: f64,
}

impl<'a> From<&'a Station> for StationJson<'a> {
    fn from(station: &'a Station) -> Self {
        Self {
            station_id: &station.station_id,
            lat: station.position.lat,
            lon: station.position.lon,
        }
    }
}

#[derive(Debug, Serialize)]
struct LoadedStationJson<'a> {
    #[serde(flatten)]
    station: StationJson<'a>,
    eq_count: usize,
    magnitudes: &'a [f64],
    event_ids: &'a [String],
}

#[derive(Debug, Serialize)]
struct EarthquakeJson<'a> {
    event_id: &'a str,
    magnitude: f64,
    lat: f64,
    lon: f64,
    origin_time: String,
    depth_km: Option<f64>,
}

impl<'a> From<&'a EarthquakeEvent> for EarthquakeJson<'a> {
    fn from(event: &'a EarthquakeEvent) -> Self {
        Self {
            event_id: &event.event_id,
            magnitude: event.magnitude,
            lat: event.epicenter.lat,
            lon: event.epicenter.lon,
            origin_time: event.origin_time.to_rfc3339(),
            depth_km: event.depth_km,
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Handle / endpoint
pub fn handle_root() -> ApiResponse {
    ApiResponse::ok(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": ENDPOINTS,
    }))
}

/// Handle /health endpoint
pub fn handle_health(dataset: &Dataset) -> ApiResponse {
    ApiResponse::ok(json!({
        "status": "ok",
        "stations": dataset.stations().len(),
        "events": dataset.events().len(),
    }))
}

/// Handle /earthquakes endpoint
pub fn handle_earthquakes(dataset: &Dataset, params: &QueryParams) -> ApiResponse {
    let params = EarthquakeListParams::from_query(params);
    let earthquakes: Vec<EarthquakeJson> = dataset
        .events()
        .select(params.min_magnitude, None)
        .into_iter()
        .map(EarthquakeJson::from)
        .collect();

    ApiResponse::ok(json!({
        "status": "ok",
        "earthquakes": earthquakes,
    }))
}

/// Handle /load_stations endpoint
pub fn handle_load_stations(dataset: &Dataset, config: &AppConfig, params: &QueryParams) -> ApiResponse {
    respond_with(|| {
        let params = LoadStationsParams::from_query(params)?;
        let query = LoadQuery {
            load_percentage: params.load_percentage,
            magnitude_threshold: params.magnitude_threshold,
            earthquake_count: params.earthquake_count,
            proximity: ProximityParams::from_config(&config.correlation, params.radius_km),
            gap_tolerance_days: params.gap_tolerance_days,
            associated_only: params.associated_only,
        };

        let summaries = load_stations(dataset, &query)?;
        let stations: Vec<LoadedStationJson> = summaries
            .iter()
            .map(|s| LoadedStationJson {
                station: StationJson::from(s.station),
                eq_count: s.eq_count,
                magnitudes: &s.magnitudes,
                event_ids: &s.event_ids,
            })
            .collect();

        Ok(ApiResponse::ok(json!({
            "status": "ok",
            "stations": stations,
        })))
    })
}

/// Handle /stations_for_earthquakes endpoint
pub fn handle_stations_for_earthquakes(
    dataset: &Dataset,
    config: &AppConfig,
    params: &QueryParams,
) -> ApiResponse {
    respond_with(|| {
        let params = StationsForEventsParams::from_query(params)?;
        let proximity = ProximityParams::from_config(&config.correlation, params.radius_km);
        let found = stations_for_events(dataset, &params.event_ids, &proximity)?;

        let by_event: serde_json::Map<String, Value> = found
            .by_event
            .iter()
            .map(|(id, stations)| {
                let ids: Vec<&str> = stations.iter().map(|s| s.station_id.as_str()).collect();
                (id.clone(), json!(ids))
            })
            .collect();
        let stations: Vec<StationJson> = found.union.iter().copied().map(StationJson::from).collect();

        Ok(ApiResponse::ok(json!({
            "status": "ok",
            "stations": stations,
            "by_event": by_event,
        })))
    })
}

/// Handle /plot_averaged_displacement endpoint
pub fn handle_plot_averaged_displacement(
    dataset: &Dataset,
    config: &AppConfig,
    params: &QueryParams,
) -> ApiResponse {
    respond_with(|| {
        let params = AveragedPlotParams::from_query(params);
        let alignment = params
            .event_id
            .clone()
            .map(Alignment::Event)
            .unwrap_or_default();
        let proximity = ProximityParams::from_config(&config.correlation, None);

        let series = averaged_displacement(dataset, &params.station_ids, &alignment, &proximity)?;
        let aligned_on = params.event_id.as_deref().unwrap_or("earliest event");

        match params.format {
            OutputFormat::Json => Ok(ApiResponse::ok(json!({
                "status": "ok",
                "alignment": aligned_on,
                "resolved": series.resolved,
                "unresolved": series.unresolved,
                "points": series.points,
            }))),
            OutputFormat::Svg => {
                let title = format!(
                    "Averaged displacement, {} stations (aligned on {})",
                    series.resolved.len(),
                    aligned_on
                );
                Ok(ApiResponse::Svg(render_averaged_displacement(&series, &title)?))
            }
        }
    })
}

/// Fits each event's points separately, in request order.
fn fits_by_event(event_ids: &[String], points: &[DistancePoint]) -> Vec<(String, Option<AttenuationFit>)> {
    event_ids
        .iter()
        .map(|id| {
            let own: Vec<DistancePoint> = points.iter().filter(|p| &p.event_id == id).cloned().collect();
            (id.clone(), fit_attenuation(&own))
        })
        .collect()
}

/// Handle /plot_distance_vs_displacement endpoint
pub fn handle_plot_distance_vs_displacement(
    dataset: &Dataset,
    config: &AppConfig,
    params: &QueryParams,
) -> ApiResponse {
    respond_with(|| {
        let params = DistancePlotParams::from_query(params)?;
        let proximity = ProximityParams::from_config(&config.correlation, params.radius_km);
        let displacement = DisplacementParams::new(proximity, params.statistic, &config.aggregation);

        let points = distance_vs_displacement(dataset, &params.event_ids, &displacement)?;
        let fits = match params.fit {
            FitMode::Attenuation => fits_by_event(&params.event_ids, &points),
            FitMode::None => params.event_ids.iter().map(|id| (id.clone(), None)).collect(),
        };

        match params.format {
            OutputFormat::Json => {
                let fit_json: serde_json::Map<String, Value> = fits
                    .iter()
                    .filter(|_| params.fit == FitMode::Attenuation)
                    .map(|(id, fit)| (id.clone(), json!(fit)))
                    .collect();
                Ok(ApiResponse::ok(json!({
                    "status": "ok",
                    "statistic": params.statistic,
                    "points": points,
                    "fits": fit_json,
                })))
            }
            OutputFormat::Svg => {
                let layers: Vec<EventLayer> = fits
                    .iter()
                    .filter_map(|(id, fit)| {
                        dataset
                            .events()
                            .find_event(id)
                            .map(|event| EventLayer { event, fit: *fit })
                    })
                    .collect();
                let title = format!("Displacement vs distance ({} events)", layers.len());
                Ok(ApiResponse::Svg(render_distance_vs_displacement(&points, &layers, &title)?))
            }
        }
    })
}

fn respond_with(handler: impl FnOnce() -> Result<ApiResponse, GeoError>) -> ApiResponse {
    handler().unwrap_or_else(|e| {
        log::warn!("request failed: {}", e);
        ApiResponse::error(&e)
    })
}

fn not_found(path: &str) -> ApiResponse {
    ApiResponse::Json {
        status_code: 404,
        body: json!({
            "error": "Not found",
            "path": path,
            "available_endpoints": ENDPOINTS,
        }),
    }
}

fn method_not_allowed(method: &Method, path: &str) -> ApiResponse {
    ApiResponse::Json {
        status_code: 405,
        body: json!({
            "error": format!("{} not allowed on {}", method, path),
            "available_endpoints": ENDPOINTS,
        }),
    }
}

// ---------------------------------------------------------------------------
// Service state and routing
// ---------------------------------------------------------------------------

/// The server-owned snapshot plus the configuration it was built from.
///
/// `/reload` is the only thing that replaces the dataset, and only after the
/// new one has loaded completely.
pub struct ServiceState {
    config: AppConfig,
    dataset: Dataset,
}

impl ServiceState {
    pub fn new(config: AppConfig, dataset: Dataset) -> Self {
        Self { config, dataset }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Routes one request.
    pub fn handle(&mut self, method: &Method, url: &str) -> ApiResponse {
        let (path, params) = split_request_url(url);
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };

        match (method, path) {
            (Method::Get, "/") => handle_root(),
            (Method::Get, "/health") => handle_health(&self.dataset),
            (Method::Get, "/earthquakes") => handle_earthquakes(&self.dataset, &params),
            (Method::Get, "/load_stations") => handle_load_stations(&self.dataset, &self.config, &params),
            (Method::Get, "/stations_for_earthquakes") => {
                handle_stations_for_earthquakes(&self.dataset, &self.config, &params)
            }
            (Method::Get, "/plot_averaged_displacement") => {
                handle_plot_averaged_displacement(&self.dataset, &self.config, &params)
            }
            (Method::Get, "/plot_distance_vs_displacement") => {
                handle_plot_distance_vs_displacement(&self.dataset, &self.config, &params)
            }
            (Method::Post, "/reload") => self.reload(),
            (_, p) if ENDPOINTS.iter().any(|e| e.ends_with(&format!(" {}", p))) => method_not_allowed(method, p),
            (_, p) => not_found(p),
        }
    }

    fn reload(&mut self) -> ApiResponse {
        log::info!("reloading dataset from {}", self.config.data.root.display());
        match Dataset::load(&self.config) {
            Ok(dataset) => {
                self.dataset = dataset;
                handle_health(&self.dataset)
            }
            Err(e) => {
                log::warn!("reload failed, keeping current dataset: {}", e);
                ApiResponse::error(&e)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP Server
// ---------------------------------------------------------------------------

/// Start HTTP endpoint server on the configured host and port
pub fn start_endpoint_server(config: AppConfig, dataset: Dataset) -> Result<(), String> {
    let address = format!("{}:{}", config.server.host, config.server.port);
    let server = tiny_http::Server::http(&address)
        .map_err(|e| format!("Failed to start HTTP server on {}: {}", address, e))?;

    println!("📡 HTTP endpoint listening on http://{}", address);
    for endpoint in ENDPOINTS {
        println!("   {}", endpoint);
    }
    println!();

    let mut state = ServiceState::new(config, dataset);

    for request in server.incoming_requests() {
        let started = Instant::now();
        let method = request.method().clone();
        let url = request.url().to_string();

        let response = state.handle(&method, &url);
        log::info!(
            "{} {} -> {} ({} ms)",
            method,
            url,
            response.status_code(),
            started.elapsed().as_millis()
        );

        if let Err(e) = request.respond(response.into_http()) {
            log::warn!("Failed to send response: {}", e);
        }
    }

    Ok(())
}

/// Create HTTP response with the given body and content type
fn create_response(status_code: u16, body: Vec<u8>, content_type: &str) -> Response<Cursor<Vec<u8>>> {
    let response = Response::from_data(body).with_status_code(StatusCode::from(status_code));
    match Header::from_bytes(&b"Content-Type"[..], content_type.as_bytes()) {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::fixtures::fixture_dataset;

    fn state() -> ServiceState {
        ServiceState::new(AppConfig::default(), fixture_dataset())
    }

    fn json_body(response: ApiResponse) -> Value {
        match response {
            ApiResponse::Json { body, .. } => body,
            ApiResponse::Svg(_) => panic!("expected JSON"),
        }
    }

    #[test]
    fn test_health_reports_counts() {
        let body = json_body(state().handle(&Method::Get, "/health"));
        assert_eq!(body["status"], "ok");
        assert_eq!(body["stations"], 3);
        assert_eq!(body["events"], 3);
    }

    #[test]
    fn test_unknown_route_is_404_with_endpoint_list() {
        let response = state().handle(&Method::Get, "/nowhere");
        assert_eq!(response.status_code(), 404);
        let body = json_body(response);
        assert!(body["available_endpoints"].as_array().unwrap().len() >= 7);
    }

    #[test]
    fn test_wrong_method_is_405() {
        assert_eq!(state().handle(&Method::Get, "/reload").status_code(), 405);
        assert_eq!(state().handle(&Method::Post, "/health").status_code(), 405);
    }

    #[test]
    fn test_earthquakes_filtered_by_magnitude() {
        let body = json_body(state().handle(&Method::Get, "/earthquakes?min_magnitude=4"));
        let ids: Vec<&str> = body["earthquakes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["event_id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["ev_far", "ev_mid"]);
    }

    #[test]
    fn test_load_stations_default_percentage() {
        let body = json_body(state().handle(&Method::Get, "/load_stations"));
        let stations = body["stations"].as_array().unwrap();
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0]["station_id"], "AAAA");
        assert_eq!(stations[0]["eq_count"], 2);
        assert_eq!(stations[0]["event_ids"], json!(["ev_small", "ev_mid"]));
    }

    #[test]
    fn test_load_stations_non_numeric_percentage_falls_back() {
        let body = json_body(state().handle(&Method::Get, "/load_stations?load_percentage=abc"));
        assert_eq!(body["status"], "ok");
        assert_eq!(body["stations"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_load_stations_zero_percentage_is_error_payload() {
        let response = state().handle(&Method::Get, "/load_stations?load_percentage=0");
        assert_eq!(response.status_code(), 200);
        let body = json_body(response);
        assert_eq!(body["status"], "error");
        assert_eq!(body["kind"], "invalid_parameter");
    }

    #[test]
    fn test_stations_for_earthquakes_by_event() {
        let body = json_body(state().handle(
            &Method::Get,
            "/stations_for_earthquakes?event_ids=ev_small,ev_mid&radius_km=60",
        ));
        assert_eq!(body["by_event"]["ev_small"], json!(["AAAA"]));
        assert_eq!(body["by_event"]["ev_mid"], json!(["AAAA", "BBBB"]));
        assert_eq!(body["stations"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_stations_for_unknown_event_is_not_found_payload() {
        let body = json_body(state().handle(&Method::Get, "/stations_for_earthquakes?event_id=missing"));
        assert_eq!(body["status"], "error");
        assert_eq!(body["kind"], "not_found");
    }

    #[test]
    fn test_averaged_plot_empty_selection() {
        let body = json_body(state().handle(&Method::Get, "/plot_averaged_displacement?station_ids="));
        assert_eq!(body["kind"], "empty_selection");
    }

    #[test]
    fn test_averaged_plot_json_and_svg() {
        let mut state = state();
        let body = json_body(state.handle(
            &Method::Get,
            "/plot_averaged_displacement?station_ids=AAAA,BBBB&event_id=ev_mid&format=json",
        ));
        assert_eq!(body["alignment"], "ev_mid");
        assert_eq!(body["resolved"], json!(["AAAA", "BBBB"]));

        match state.handle(&Method::Get, "/plot_averaged_displacement?station_ids=AAAA") {
            ApiResponse::Svg(svg) => assert!(svg.contains("<svg")),
            other => panic!("expected SVG, got {:?}", other),
        }
    }

    #[test]
    fn test_distance_plot_json_with_fit() {
        let body = json_body(state().handle(
            &Method::Get,
            "/plot_distance_vs_displacement?event_ids=ev_small&fit=attenuation&format=json",
        ));
        let points = body["points"].as_array().unwrap();
        assert_eq!(points.len(), 2);
        assert!(points.iter().all(|p| p["event_id"] == "ev_small"));
        assert_eq!(body["statistic"], "step");
        assert!(body["fits"].get("ev_small").is_some());
    }

    #[test]
    fn test_distance_plot_svg_has_legend() {
        match state().handle(&Method::Get, "/plot_distance_vs_displacement?event_ids=ev_mid") {
            ApiResponse::Svg(svg) => assert!(svg.contains("ev_mid (M 6.1)")),
            other => panic!("expected SVG, got {:?}", other),
        }
    }

    #[test]
    fn test_reload_failure_keeps_dataset() {
        let mut config = AppConfig::default();
        config.data.root = "/definitely/not/a/data/root".into();
        let mut state = ServiceState::new(config, fixture_dataset());

        let body = json_body(state.handle(&Method::Post, "/reload"));
        assert_eq!(body["status"], "error");
        assert_eq!(state.dataset().stations().len(), 3);
    }

    #[test]
    fn test_create_response_sets_status() {
        let response = create_response(404, b"{}".to_vec(), "application/json");
        assert_eq!(response.status_code(), StatusCode(404));
    }
}
