//! Station/Event Association Export
//!
//! Writes the station-to-earthquake association table used to build
//! combined datasets outside the service:
//! 1. Load configuration and the dataset
//! 2. Take the requested station subsample and qualifying events
//! 3. Write one CSV row per (station, event) association
//!
//! Usage:
//!   cargo run --bin export_associations -- --output associations.csv
//!   cargo run --bin export_associations -- --magnitude 6 --radius-km 250 --output big.csv
//!
//! Options:
//!   --config PATH          configuration file (default: geoquake.toml if present)
//!   --load-percentage P    share of stations to consider (default: 100)
//!   --magnitude M          minimum magnitude
//!   --earthquake-count N   first N qualifying events by origin time
//!   --radius-km R          fixed association radius (default: configured rule)
//!   --output FILE          CSV file to write (required)

use geoquake_service::analysis::proximity::{LoadQuery, ProximityParams};
use geoquake_service::config::load_config;
use geoquake_service::dataset::Dataset;
use geoquake_service::export::export_associations;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

fn usage(program: &str) -> ! {
    eprintln!(
        "Usage: {} [--config PATH] [--load-percentage P] [--magnitude M] \
         [--earthquake-count N] [--radius-km R] --output FILE.csv",
        program
    );
    std::process::exit(1);
}

fn parse_value<T: FromStr>(args: &[String], i: usize) -> T {
    match args.get(i + 1).map(|v| v.parse::<T>()) {
        Some(Ok(value)) => value,
        _ => {
            eprintln!("Error: {} requires a numeric value", args[i]);
            usage(&args[0]);
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("📤 Station/Event Association Export");
    println!("===================================\n");

    let args: Vec<String> = env::args().collect();
    let mut config_path: Option<PathBuf> = None;
    let mut output: Option<PathBuf> = None;
    let mut load_percentage = 100.0;
    let mut magnitude: Option<f64> = None;
    let mut earthquake_count: Option<usize> = None;
    let mut radius_km: Option<f64> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "--output" => {
                let Some(value) = args.get(i + 1) else {
                    eprintln!("Error: {} requires a path", args[i]);
                    usage(&args[0]);
                };
                if args[i] == "--config" {
                    config_path = Some(PathBuf::from(value));
                } else {
                    output = Some(PathBuf::from(value));
                }
            }
            "--load-percentage" => load_percentage = parse_value(&args, i),
            "--magnitude" => magnitude = Some(parse_value(&args, i)),
            "--earthquake-count" => earthquake_count = Some(parse_value(&args, i)),
            "--radius-km" => radius_km = Some(parse_value(&args, i)),
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                usage(&args[0]);
            }
        }
        i += 2;
    }

    let Some(output) = output else {
        eprintln!("Error: --output is required");
        usage(&args[0]);
    };

    let config = load_config(config_path.as_deref()).unwrap_or_else(|e| {
        eprintln!("\n❌ Configuration error: {}\n", e);
        std::process::exit(1);
    });

    println!("📊 Loading dataset from {}...", config.data.root.display());
    let dataset = Dataset::load(&config).unwrap_or_else(|e| {
        eprintln!("\n❌ Failed to load dataset: {}\n", e);
        std::process::exit(1);
    });
    println!(
        "✓ {} stations, {} earthquakes\n",
        dataset.stations().len(),
        dataset.events().len()
    );

    let query = LoadQuery {
        load_percentage,
        magnitude_threshold: magnitude,
        earthquake_count,
        proximity: ProximityParams::from_config(&config.correlation, radius_km),
        gap_tolerance_days: None,
        associated_only: true,
    };

    match export_associations(&dataset, &query, &output) {
        Ok(rows) => println!("✓ Wrote {} associations to {}", rows, output.display()),
        Err(e) => {
            eprintln!("\n❌ Export failed: {}\n", e);
            std::process::exit(1);
        }
    }
}
