//! I/O operations for reading and writing geospatial data
//!
//! With the `gdal` feature every OGR/GDAL driver is available. Without it,
//! vectors are read and written as GeoJSON and rasters are read as GeoTIFF.

#[cfg(feature = "gdal")]
mod gdal_io;
#[cfg(not(feature = "gdal"))]
mod geojson;
#[cfg(not(feature = "gdal"))]
mod native;

#[cfg(feature = "gdal")]
pub use gdal_io::{raster_info, read_vector, vector_bounds, write_vector};
#[cfg(feature = "gdal")]
pub(crate) use gdal_io::spatial_ref_from_crs;

#[cfg(not(feature = "gdal"))]
pub use geojson::{read_vector, vector_bounds, write_vector};
#[cfg(not(feature = "gdal"))]
pub use native::raster_info;

use crate::crs::CRS;
use crate::error::Result;
use crate::BoundingBox;
use std::path::Path;

/// Output format used when none is given
pub const DEFAULT_VECTOR_FORMAT: &str = "GeoJSON";

/// Envelope and CRS of a raster dataset
pub fn raster_bounds<P: AsRef<Path>>(path: P) -> Result<(BoundingBox, Option<CRS>)> {
    let info = raster_info(path)?;
    Ok((info.bounds(), info.crs))
}
