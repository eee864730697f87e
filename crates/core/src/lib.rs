//! # arcfoss core
//!
//! Core types, CRS handling and I/O shared by the arcfoss conversions.
//!
//! This crate provides:
//! - `Feature` / `FeatureCollection`: vector features with ordered attributes
//! - `CRS` and `Transformer`: coordinate reference systems and reprojection
//! - `BoundingBox` and raster georeferencing (`GeoTransform`, `RasterInfo`)
//! - I/O for vector and raster datasets (GDAL with the `gdal` feature,
//!   GeoJSON/GeoTIFF otherwise)

pub mod bbox;
pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod vector;

pub use bbox::BoundingBox;
pub use crs::{Transformer, CRS};
pub use error::{Error, Result};
pub use raster::{GeoTransform, RasterInfo};
pub use vector::{AttributeValue, Feature, FeatureCollection};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::bbox::BoundingBox;
    pub use crate::crs::{Transformer, CRS};
    pub use crate::error::{Error, Result};
    pub use crate::vector::{AttributeValue, Feature, FeatureCollection};
}
