//! Raster georeferencing
//!
//! Only the metadata needed to place a raster on the map is modelled here;
//! pixel values are never read.

mod geotransform;

pub use geotransform::GeoTransform;

use crate::crs::CRS;
use crate::BoundingBox;

/// Georeferencing header of a raster dataset
#[derive(Debug, Clone, PartialEq)]
pub struct RasterInfo {
    pub rows: usize,
    pub cols: usize,
    pub transform: GeoTransform,
    pub crs: Option<CRS>,
}

impl RasterInfo {
    /// Envelope of the raster footprint in its own CRS
    pub fn bounds(&self) -> BoundingBox {
        self.transform.bounds(self.cols, self.rows)
    }
}
