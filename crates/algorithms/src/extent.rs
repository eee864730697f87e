//! Dataset extents
//!
//! The extent of a dataset is the polygon of its bounding box. Vector files
//! use the layer envelope, rasters the envelope of the pixel grid. With
//! `as_wgs84` the corner ring is reprojected to EPSG:4326, so a projected
//! extent comes back as a (slightly skewed) quadrilateral in lon/lat.

use arcfoss_core::crs::WGS84_EPSG;
use arcfoss_core::io::{raster_bounds, vector_bounds, write_vector};
use arcfoss_core::{
    AttributeValue, BoundingBox, Error, Feature, FeatureCollection, Result, Transformer, CRS,
};
use geo_types::{Geometry, Polygon};
use std::path::Path;

/// Attribute holding the source file name of each extent feature
pub const FILENAME_COLUMN: &str = "filename";

/// Which reader to open a dataset with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    Vector,
    Raster,
}

impl DatasetKind {
    fn bounds(self, path: &Path) -> Result<(BoundingBox, Option<CRS>)> {
        match self {
            DatasetKind::Vector => vector_bounds(path),
            DatasetKind::Raster => raster_bounds(path),
        }
    }
}

/// Extent polygon of a dataset opened with the given reader
pub fn extent_from_file<P: AsRef<Path>>(
    path: P,
    as_wgs84: bool,
    source: DatasetKind,
) -> Result<Polygon<f64>> {
    let path = path.as_ref();
    let (bounds, crs) = source.bounds(path)?;
    let extent = bounds.to_polygon();

    if !as_wgs84 {
        return Ok(extent);
    }
    let Some(crs) = crs else {
        tracing::warn!(
            "{} has no CRS, returning its extent untransformed",
            path.display()
        );
        return Ok(extent);
    };
    if crs.to_epsg() == Some(WGS84_EPSG) {
        return Ok(extent);
    }

    tracing::debug!("reprojecting extent of {} from {}", path.display(), crs);
    let transformer = Transformer::new(&crs, &CRS::wgs84())?;
    match transformer.transform_geometry(&Geometry::Polygon(extent))? {
        Geometry::Polygon(polygon) => Ok(polygon),
        other => Err(Error::InvalidGeometry(format!(
            "extent reprojected to {other:?}"
        ))),
    }
}

/// Extent of a dataset, trying the vector reader first and then the raster one
pub fn get_extent<P: AsRef<Path>>(path: P, as_wgs84: bool) -> Result<Polygon<f64>> {
    let path = path.as_ref();
    for kind in [DatasetKind::Vector, DatasetKind::Raster] {
        match extent_from_file(path, as_wgs84, kind) {
            Err(Error::UnrecognizedDataset { kind, reason, .. }) => {
                tracing::debug!("{} is not a {kind} dataset: {reason}", path.display());
            }
            result => return result,
        }
    }
    Err(Error::UnsupportedDataset {
        path: path.to_path_buf(),
    })
}

/// One WGS84 extent feature per input, tagged with the input's file name
pub fn extents_collection<P: AsRef<Path>>(inputs: &[P]) -> Result<FeatureCollection> {
    let mut collection = FeatureCollection::with_crs(CRS::wgs84());
    collection.add_column(FILENAME_COLUMN);

    for input in inputs {
        let path = input.as_ref();
        let extent = get_extent(path, true)?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        collection.push(
            Feature::new(Geometry::Polygon(extent))
                .with_property(FILENAME_COLUMN, AttributeValue::String(filename)),
        );
    }
    Ok(collection)
}

/// Write the WGS84 extents of `inputs` to `output` with the given driver
pub fn extents_to_features<P: AsRef<Path>, Q: AsRef<Path>>(
    inputs: &[P],
    output: Q,
    format: &str,
) -> Result<()> {
    let collection = extents_collection(inputs)?;
    tracing::info!(
        "writing {} extents to {}",
        collection.len(),
        output.as_ref().display()
    );
    write_vector(&collection, output, format)
}
