/// geoquake_service: GPS displacement time series correlated with earthquakes.
///
/// # Module structure
///
/// ```text
/// geoquake_service
/// ├── model      : shared data types (Station, DisplacementSample, EarthquakeEvent)
/// ├── error      : GeoError taxonomy and per-line ParseWarning
/// ├── config     : service configuration loader (geoquake.toml, .env)
/// ├── ingest
/// │   ├── tenv     : UNR .tenv daily-solution parser
/// │   ├── positions: station position table
/// │   ├── catalog  : earthquake catalog CSV
/// │   └── fixtures (test only): small structurally faithful input files
/// ├── stations   : immutable station table
/// ├── events     : immutable event catalog
/// ├── dataset    : parallel loading into one immutable snapshot
/// ├── analysis
/// │   ├── geo         : haversine distance
/// │   ├── proximity   : station/event association, station subsampling
/// │   ├── displacement: averaged curves, distance vs displacement
/// │   └── attenuation : power-law fit
/// ├── plot       : SVG charts
/// ├── export     : station/event association CSV
/// ├── query      : query-string decoding and per-endpoint parameters
/// └── endpoint   : tiny_http map service
/// ```

/// Public modules
pub mod analysis;
pub mod config;
pub mod dataset;
pub mod endpoint;
pub mod error;
pub mod events;
pub mod export;
pub mod ingest;
pub mod model;
pub mod plot;
pub mod query;
pub mod stations;
