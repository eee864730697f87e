//! Vector and raster I/O using GDAL/OGR

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, RasterInfo};
use crate::vector::{AttributeValue, Feature, FeatureCollection};
use crate::BoundingBox;
use gdal::spatial_ref::{AxisMappingStrategy, SpatialRef};
use gdal::vector::{
    FieldValue, LayerAccess, LayerOptions, OGRFieldType, OGRwkbGeometryType, ToGdal,
};
use gdal::{Dataset, DriverManager};
use std::path::Path;

/// Build an OSR spatial reference with x=lon/easting, y=lat/northing axis order
pub(crate) fn spatial_ref_from_crs(crs: &CRS) -> Result<SpatialRef> {
    let mut srs = if let Some(code) = crs.epsg() {
        SpatialRef::from_epsg(code)?
    } else if let Some(wkt) = crs.wkt() {
        SpatialRef::from_wkt(wkt)?
    } else if let Some(proj) = crs.proj() {
        SpatialRef::from_proj4(proj)?
    } else {
        return Err(Error::UnsupportedCrs(crs.identifier()));
    };
    srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
    Ok(srs)
}

/// Best-effort CRS from an OSR spatial reference, preferring an EPSG code
fn crs_from_spatial_ref(srs: &mut SpatialRef) -> Option<CRS> {
    if let (Ok(name), Ok(code)) = (srs.auth_name(), srs.auth_code()) {
        if name.eq_ignore_ascii_case("EPSG") {
            return Some(CRS::from_epsg(code as u32));
        }
    }
    if srs.auto_identify_epsg().is_ok() {
        if let Ok(code) = srs.auth_code() {
            return Some(CRS::from_epsg(code as u32));
        }
    }
    srs.to_wkt().ok().map(CRS::from_wkt)
}

fn open_vector(path: &Path) -> Result<Dataset> {
    let dataset = Dataset::open(path).map_err(|e| Error::unrecognized("vector", path, e))?;
    if dataset.layer_count() == 0 {
        return Err(Error::unrecognized("vector", path, "no vector layers"));
    }
    Ok(dataset)
}

fn attribute(value: Option<FieldValue>) -> AttributeValue {
    match value {
        None => AttributeValue::Null,
        Some(FieldValue::IntegerValue(v)) => AttributeValue::Int(v as i64),
        Some(FieldValue::Integer64Value(v)) => AttributeValue::Int(v),
        Some(FieldValue::RealValue(v)) => AttributeValue::Float(v),
        Some(FieldValue::StringValue(v)) => AttributeValue::String(v),
        Some(FieldValue::DateValue(v)) => AttributeValue::String(v.to_string()),
        Some(FieldValue::DateTimeValue(v)) => AttributeValue::String(v.to_rfc3339()),
        Some(other) => AttributeValue::String(format!("{other:?}")),
    }
}

fn field_value(value: &AttributeValue) -> Option<FieldValue> {
    match value {
        AttributeValue::Null => None,
        AttributeValue::Bool(b) => Some(FieldValue::IntegerValue(*b as i32)),
        AttributeValue::Int(i) => Some(FieldValue::Integer64Value(*i)),
        AttributeValue::Float(f) => Some(FieldValue::RealValue(*f)),
        AttributeValue::String(s) => Some(FieldValue::StringValue(s.clone())),
    }
}

/// OGR field type for a column, taken from its first non-null value
fn field_type(collection: &FeatureCollection, column: &str) -> OGRFieldType::Type {
    let first = collection
        .iter()
        .filter_map(|f| f.get_property(column))
        .find(|v| !v.is_null());
    match first {
        Some(AttributeValue::Bool(_)) => OGRFieldType::OFTInteger,
        Some(AttributeValue::Int(_)) => OGRFieldType::OFTInteger64,
        Some(AttributeValue::Float(_)) => OGRFieldType::OFTReal,
        _ => OGRFieldType::OFTString,
    }
}

/// Read the first layer of any OGR-readable file
pub fn read_vector<P: AsRef<Path>>(path: P) -> Result<FeatureCollection> {
    let path = path.as_ref();
    let dataset = open_vector(path)?;
    let mut layer = dataset.layer(0)?;

    let mut collection = FeatureCollection::new();
    collection.crs = layer.spatial_ref().and_then(|mut srs| crs_from_spatial_ref(&mut srs));
    for field in layer.defn().fields() {
        collection.add_column(field.name());
    }

    for ogr_feature in layer.features() {
        let geometry = ogr_feature.geometry().map(|g| g.to_geo()).transpose()?;
        let mut feature = Feature {
            geometry,
            id: ogr_feature.fid().map(|fid| fid.to_string()),
            ..Feature::default()
        };
        for (name, value) in ogr_feature.fields() {
            feature.set_property(name, attribute(value));
        }
        collection.push(feature);
    }

    tracing::debug!("read {} features from {}", collection.len(), path.display());
    Ok(collection)
}

/// Envelope and CRS of the first layer of a vector dataset
pub fn vector_bounds<P: AsRef<Path>>(path: P) -> Result<(BoundingBox, Option<CRS>)> {
    let path = path.as_ref();
    let dataset = open_vector(path)?;
    let layer = dataset.layer(0)?;
    let envelope = layer.get_extent()?;
    let crs = layer.spatial_ref().and_then(|mut srs| crs_from_spatial_ref(&mut srs));
    Ok((
        BoundingBox::new(envelope.MinX, envelope.MinY, envelope.MaxX, envelope.MaxY),
        crs,
    ))
}

/// Write a FeatureCollection with the named OGR driver
pub fn write_vector<P: AsRef<Path>>(
    collection: &FeatureCollection,
    path: P,
    format: &str,
) -> Result<()> {
    let path = path.as_ref();
    let driver = DriverManager::get_driver_by_name(format)
        .map_err(|_| Error::UnsupportedFormat(format.to_string()))?;
    let mut dataset = driver.create_vector_only(path)?;

    let srs = collection.crs.as_ref().map(spatial_ref_from_crs).transpose()?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "layer".to_string());
    let layer = dataset.create_layer(LayerOptions {
        name: &name,
        srs: srs.as_ref(),
        ty: OGRwkbGeometryType::wkbUnknown,
        options: None,
    })?;

    let fields: Vec<(&str, OGRFieldType::Type)> = collection
        .columns
        .iter()
        .map(|c| (c.as_str(), field_type(collection, c)))
        .collect();
    layer.create_defn_fields(&fields)?;

    for feature in collection.iter() {
        let mut ogr_feature = gdal::vector::Feature::new(layer.defn())?;
        if let Some(geometry) = &feature.geometry {
            ogr_feature.set_geometry(geometry.to_gdal()?)?;
        }
        for column in &collection.columns {
            if let Some(value) = feature.get_property(column).and_then(field_value) {
                ogr_feature.set_field(column, &value)?;
            }
        }
        ogr_feature.create(&layer)?;
    }

    tracing::debug!(
        "wrote {} features to {} ({})",
        collection.len(),
        path.display(),
        format
    );
    Ok(())
}

/// Read the georeferencing header of any GDAL raster
pub fn raster_info<P: AsRef<Path>>(path: P) -> Result<RasterInfo> {
    let path = path.as_ref();
    let dataset = Dataset::open(path).map_err(|e| Error::unrecognized("raster", path, e))?;
    if dataset.raster_count() == 0 {
        return Err(Error::unrecognized("raster", path, "no raster bands"));
    }

    let (cols, rows) = dataset.raster_size();
    let transform = dataset
        .geo_transform()
        .map(GeoTransform::from_gdal)
        .unwrap_or_default();
    let crs = dataset
        .spatial_ref()
        .ok()
        .and_then(|mut srs| crs_from_spatial_ref(&mut srs));

    Ok(RasterInfo {
        rows,
        cols,
        transform,
        crs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{point, Geometry};
    use tempfile::TempDir;

    #[test]
    fn test_gpkg_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("points.gpkg");

        let mut fc = FeatureCollection::with_crs(CRS::from_epsg(32630));
        fc.add_column("name");
        fc.push(
            Feature::new(Geometry::Point(point!(x: 587_000.0, y: 6_048_000.0)))
                .with_property("name", "a"),
        );
        write_vector(&fc, &path, "GPKG").unwrap();

        let back = read_vector(&path).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back.crs.unwrap().epsg(), Some(32630));
        assert_eq!(
            back.features[0].get_property("name"),
            Some(&AttributeValue::from("a"))
        );

        let (bounds, _) = vector_bounds(&path).unwrap();
        assert_eq!(bounds.min_x, 587_000.0);
    }

    #[test]
    fn test_unknown_driver() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            write_vector(&FeatureCollection::new(), dir.path().join("x"), "NoSuchDriver"),
            Err(Error::UnsupportedFormat(_))
        ));
    }
}
