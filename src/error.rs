/// Error taxonomy shared by the loaders, correlator, aggregator and service.
///
/// Parse problems inside a single input line are not errors: they are
/// collected as [`ParseWarning`]s, logged, and the load carries on.

use std::fmt;
use std::path::PathBuf;

/// Errors surfaced to callers of the library and to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    /// Unknown station or event id, or a missing station file.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// "station" or "event"
        kind: &'static str,
        id: String,
    },

    /// Out-of-range or otherwise unusable parameter value.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// The operation needs at least one item and none were given or resolved.
    #[error("empty selection: {0}")]
    EmptySelection(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed event catalog {path}: {source}")]
    Catalog { path: PathBuf, source: csv::Error },

    #[error("event catalog {path} is missing required column '{column}'")]
    CatalogHeader { path: PathBuf, column: &'static str },

    #[error("invalid configuration {path}: {source}")]
    Config {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value that parsed but cannot be used.
    #[error("invalid configuration {path}: {name} {reason}")]
    ConfigValue {
        path: PathBuf,
        name: &'static str,
        reason: String,
    },

    #[error("plot rendering failed: {0}")]
    Render(String),

    #[error("failed to write {path}: {source}")]
    Export { path: PathBuf, source: csv::Error },
}

impl GeoError {
    /// Stable tag used in `{"status": "error", "kind": ...}` payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            GeoError::NotFound { .. } => "not_found",
            GeoError::InvalidParameter { .. } => "invalid_parameter",
            GeoError::EmptySelection(_) => "empty_selection",
            GeoError::Io { .. } => "io",
            GeoError::Catalog { .. } | GeoError::CatalogHeader { .. } => "catalog",
            GeoError::Config { .. } | GeoError::ConfigValue { .. } => "config",
            GeoError::Render(_) => "render",
            GeoError::Export { .. } => "export",
        }
    }

    pub fn station_not_found(id: impl Into<String>) -> Self {
        GeoError::NotFound {
            kind: "station",
            id: id.into(),
        }
    }

    pub fn event_not_found(id: impl Into<String>) -> Self {
        GeoError::NotFound {
            kind: "event",
            id: id.into(),
        }
    }

    pub fn invalid(name: &str, reason: impl Into<String>) -> Self {
        GeoError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse warnings
// ---------------------------------------------------------------------------

/// A malformed input line that was skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseWarning {
    /// File or logical source the line came from (e.g. "ALBH.tenv").
    pub source: String,
    /// 1-based line number.
    pub line: usize,
    pub reason: String,
}

impl ParseWarning {
    pub fn new(source: &str, line: usize, reason: impl Into<String>) -> Self {
        Self {
            source: source.to_string(),
            line,
            reason: reason.into(),
        }
    }

    /// Emit through the `log` facade.
    pub fn log(&self) {
        log::warn!("skipped {}", self);
    }
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.source, self.line, self.reason)
    }
}
