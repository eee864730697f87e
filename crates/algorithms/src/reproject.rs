//! Geometry and file reprojection

use arcfoss_core::io::{read_vector, write_vector};
use arcfoss_core::{Result, Transformer, CRS};
use geo_types::Geometry;
use std::path::Path;

/// Reproject a single geometry from `from` to `to`
///
/// # Example
/// ```
/// use arcfoss_algorithms::reproject::reproject;
/// use arcfoss_core::CRS;
/// use geo_types::{point, Geometry};
///
/// let utm = CRS::from_user_input("EPSG:32632")?;
/// let p = reproject(&utm, &CRS::wgs84(), &Geometry::Point(point!(x: 510_500.0, y: 7_042_500.0)))?;
/// let Geometry::Point(p) = p else { unreachable!() };
/// assert!((p.x() - 9.21).abs() < 0.01);
/// assert!((p.y() - 63.51).abs() < 0.01);
/// # Ok::<(), arcfoss_core::Error>(())
/// ```
pub fn reproject(from: &CRS, to: &CRS, geometry: &Geometry<f64>) -> Result<Geometry<f64>> {
    Transformer::new(from, to)?.transform_geometry(geometry)
}

/// Reproject every feature of a vector file into `to` and write it with `format`
pub fn reproject_file<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    to: &CRS,
    format: &str,
) -> Result<()> {
    let source = read_vector(input.as_ref())?;
    tracing::info!(
        "reprojecting {} features from {} to {}",
        source.len(),
        source.crs.as_ref().map(|c| c.identifier()).unwrap_or_else(|| "unknown CRS".to_string()),
        to
    );
    write_vector(&source.to_crs(to)?, output, format)
}
