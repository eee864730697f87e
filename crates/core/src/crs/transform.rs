//! Coordinate transformation between two CRS
//!
//! Axis order is always x = longitude/easting, y = latitude/northing,
//! whatever the authority definition says.

use super::CRS;
use crate::error::{Error, Result};
use geo::MapCoords;
use geo_types::{Coord, Geometry};

#[cfg(not(feature = "gdal"))]
use super::native::Projection;

enum Backend {
    Identity,
    #[cfg(not(feature = "gdal"))]
    Native { from: Projection, to: Projection },
    #[cfg(feature = "gdal")]
    Gdal(gdal::spatial_ref::CoordTransform),
}

/// Transforms coordinates from one CRS to another.
///
/// # Example
/// ```
/// use arcfoss_core::{Transformer, CRS};
///
/// let t = Transformer::new(&CRS::from_epsg(32632), &CRS::wgs84())?;
/// let (lon, lat) = t.transform(500_000.0, 0.0)?;
/// assert!((lon - 9.0).abs() < 1e-9);
/// assert!(lat.abs() < 1e-9);
/// # Ok::<(), arcfoss_core::Error>(())
/// ```
pub struct Transformer {
    backend: Backend,
}

impl Transformer {
    /// Build a transformer from `from` to `to`
    pub fn new(from: &CRS, to: &CRS) -> Result<Self> {
        if let (Some(a), Some(b)) = (from.to_epsg(), to.to_epsg()) {
            if a == b {
                return Ok(Self {
                    backend: Backend::Identity,
                });
            }
        }
        Self::build(from, to)
    }

    #[cfg(not(feature = "gdal"))]
    fn build(from: &CRS, to: &CRS) -> Result<Self> {
        let lookup = |crs: &CRS| {
            crs.to_epsg()
                .and_then(Projection::from_epsg)
                .ok_or_else(|| Error::UnsupportedCrs(format!("{crs} (build with the `gdal` feature for full CRS support)")))
        };
        Ok(Self {
            backend: Backend::Native {
                from: lookup(from)?,
                to: lookup(to)?,
            },
        })
    }

    #[cfg(feature = "gdal")]
    fn build(from: &CRS, to: &CRS) -> Result<Self> {
        use gdal::spatial_ref::CoordTransform;

        let src = crate::io::spatial_ref_from_crs(from)?;
        let dst = crate::io::spatial_ref_from_crs(to)?;
        let transform = CoordTransform::new(&src, &dst)?;
        Ok(Self {
            backend: Backend::Gdal(transform),
        })
    }

    /// True when source and target are the same CRS
    pub fn is_identity(&self) -> bool {
        matches!(self.backend, Backend::Identity)
    }

    /// Transform a single coordinate pair
    pub fn transform(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let (tx, ty) = match &self.backend {
            Backend::Identity => (x, y),
            #[cfg(not(feature = "gdal"))]
            Backend::Native { from, to } => {
                let (lon, lat) = from.to_lonlat(x, y);
                to.from_lonlat(lon, lat)
            }
            #[cfg(feature = "gdal")]
            Backend::Gdal(ct) => {
                let mut xs = [x];
                let mut ys = [y];
                ct.transform_coords(&mut xs, &mut ys, &mut [])?;
                (xs[0], ys[0])
            }
        };

        if !tx.is_finite() || !ty.is_finite() {
            return Err(Error::Projection(format!(
                "coordinate ({x}, {y}) has no finite image"
            )));
        }
        Ok((tx, ty))
    }

    /// Transform every coordinate of a geometry
    pub fn transform_geometry(&self, geometry: &Geometry<f64>) -> Result<Geometry<f64>> {
        if self.is_identity() {
            return Ok(geometry.clone());
        }
        geometry.try_map_coords(|c| {
            let (x, y) = self.transform(c.x, c.y)?;
            Ok(Coord { x, y })
        })
    }
}
