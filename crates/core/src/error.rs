//! Error types for arcfoss

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for arcfoss operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GPX error: {0}")]
    Gpx(String),

    /// The reader for `kind` ("vector" or "raster") could not open the file.
    ///
    /// Callers probing several readers treat this as "try the next one".
    #[error("Cannot open {} as {kind}: {reason}", .path.display())]
    UnrecognizedDataset {
        kind: &'static str,
        path: PathBuf,
        reason: String,
    },

    #[error("Could not open file as either raster or vector: {}", .path.display())]
    UnsupportedDataset { path: PathBuf },

    #[error("Dataset has no features: {}", .path.display())]
    EmptyDataset { path: PathBuf },

    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),

    #[error("CRS mismatch: {0} vs {1}")]
    CrsMismatch(String, String),

    #[error("Too many geometry types: got {found}, allowed {allowed}")]
    TooManyGeometryTypes { found: usize, allowed: usize },

    #[error("Invalid geometry type(s): {found:?} (allowed: {allowed:?})")]
    InvalidGeometryTypes {
        found: Vec<String>,
        allowed: Vec<String>,
    },

    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Projection error: {0}")]
    Projection(String),

    #[error("GDAL error: {0}")]
    #[cfg(feature = "gdal")]
    Gdal(String),

    #[error("{0}")]
    Other(String),
}

#[cfg(feature = "gdal")]
impl From<gdal::errors::GdalError> for Error {
    fn from(e: gdal::errors::GdalError) -> Self {
        Error::Gdal(e.to_string())
    }
}

impl Error {
    pub(crate) fn unrecognized(
        kind: &'static str,
        path: &std::path::Path,
        reason: impl std::fmt::Display,
    ) -> Self {
        Error::UnrecognizedDataset {
            kind,
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for arcfoss operations
pub type Result<T> = std::result::Result<T, Error>;
