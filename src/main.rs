//! Geoquake Map Service
//!
//! Loads the station displacement series and the earthquake catalog once,
//! then serves the map API until stopped:
//! 1. Reads configuration (geoquake.toml, .env, GEOQUAKE_DATA_ROOT)
//! 2. Parses every positioned station's .tenv file in parallel
//! 3. Serves station/event selection and plot requests over HTTP
//!
//! Usage:
//!   cargo run --release                              # geoquake.toml or defaults, port 8080
//!   cargo run --release -- --config site.toml        # explicit configuration file
//!   cargo run --release -- --endpoint 9000           # override the listening port
//!
//! Environment:
//!   RUST_LOG           - log verbosity (default: info)
//!   GEOQUAKE_DATA_ROOT - overrides data.root from the configuration

use geoquake_service::config::load_config;
use geoquake_service::dataset::Dataset;
use geoquake_service::endpoint;
use std::env;
use std::path::PathBuf;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("🌍 Geoquake Map Service");
    println!("=======================\n");

    // Parse command-line arguments
    let args: Vec<String> = env::args().collect();
    let mut config_path: Option<PathBuf> = None;
    let mut endpoint_port: Option<u16> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    eprintln!("Error: --config requires a path");
                    std::process::exit(1);
                }
            }
            "--endpoint" => {
                match args.get(i + 1).and_then(|p| p.parse().ok()) {
                    Some(port) => endpoint_port = Some(port),
                    None => {
                        eprintln!("Error: --endpoint requires a port number");
                        std::process::exit(1);
                    }
                }
                i += 2;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                eprintln!("Usage: {} [--config PATH] [--endpoint PORT]", args[0]);
                std::process::exit(1);
            }
        }
    }

    let mut config = match load_config(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("\n❌ Configuration error: {}\n", e);
            std::process::exit(1);
        }
    };
    if let Some(port) = endpoint_port {
        config.server.port = port;
    }

    println!("📊 Loading dataset from {}...", config.data.root.display());
    let dataset = match Dataset::load(&config) {
        Ok(dataset) => dataset,
        Err(e) => {
            eprintln!("\n❌ Failed to load dataset: {}\n", e);
            std::process::exit(1);
        }
    };

    let report = dataset.report();
    println!("✓ {} stations ({} samples)", report.stations_loaded, report.samples_loaded);
    println!("✓ {} earthquakes", report.events_loaded);
    if report.parse_warnings > 0 {
        println!("   {} malformed lines skipped", report.parse_warnings);
    }
    if !report.missing_series.is_empty() {
        println!("   {} positioned stations without a series file", report.missing_series.len());
    }
    if !report.unpositioned_series.is_empty() {
        println!("   {} series files without a position", report.unpositioned_series.len());
    }
    println!();

    println!("🚀 Starting HTTP endpoint server...");
    println!("   Press Ctrl+C to stop\n");

    if let Err(e) = endpoint::start_endpoint_server(config, dataset) {
        eprintln!("\n❌ Endpoint server error: {}", e);
        std::process::exit(1);
    }
}
