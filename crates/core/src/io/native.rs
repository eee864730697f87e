//! Native GeoTIFF header reading (without GDAL dependency)
//!
//! Uses the `tiff` crate for basic TIFF I/O. Only the georeferencing tags are
//! decoded; for other raster formats enable the `gdal` feature.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, RasterInfo};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use tiff::decoder::{ifd::Value, Decoder};
use tiff::tags::Tag;

// GeoKeys
const RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;
const RASTER_PIXEL_IS_POINT: u16 = 2;
const USER_DEFINED: u16 = 32767;

/// The GeoKeys this reader understands
#[derive(Debug, Default, PartialEq)]
struct GeoKeys {
    epsg: Option<u32>,
    pixel_is_point: bool,
}

/// Read the georeferencing header of a GeoTIFF
pub fn raster_info<P: AsRef<Path>>(path: P) -> Result<RasterInfo> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::unrecognized("raster", path, e))?;
    let mut decoder =
        Decoder::new(BufReader::new(file)).map_err(|e| Error::unrecognized("raster", path, e))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Other(format!("Cannot read dimensions: {}", e)))?;

    let keys = match find_tag(&mut decoder, path, Tag::GeoKeyDirectoryTag)? {
        Some(value) => {
            let keys = tag_values(path, Tag::GeoKeyDirectoryTag, value.into_u16_vec())?;
            parse_geokeys(&keys)
        }
        None => GeoKeys::default(),
    };

    let transform = match read_geotransform(&mut decoder, path)? {
        Some(gt) if keys.pixel_is_point => gt.center_to_corner(),
        Some(gt) => gt,
        None => {
            tracing::warn!("{} has no georeferencing tags, using pixel space", path.display());
            GeoTransform::default()
        }
    };

    Ok(RasterInfo {
        rows: height as usize,
        cols: width as usize,
        transform,
        crs: keys.epsg.map(CRS::from_epsg),
    })
}

/// `Ok(None)` when the tag is absent; a present but unreadable tag is an error
fn find_tag<R: Read + Seek>(decoder: &mut Decoder<R>, path: &Path, tag: Tag) -> Result<Option<Value>> {
    decoder
        .find_tag(tag)
        .map_err(|e| Error::Other(format!("{}: cannot read {:?}: {}", path.display(), tag, e)))
}

fn tag_values<T>(path: &Path, tag: Tag, values: tiff::TiffResult<Vec<T>>) -> Result<Vec<T>> {
    values.map_err(|e| Error::Other(format!("{}: invalid {:?}: {}", path.display(), tag, e)))
}

fn find_f64_vec<R: Read + Seek>(decoder: &mut Decoder<R>, path: &Path, tag: Tag) -> Result<Option<Vec<f64>>> {
    find_tag(decoder, path, tag)?
        .map(|value| tag_values(path, tag, value.into_f64_vec()))
        .transpose()
}

/// GeoTransform from tiepoint + pixel scale, else from the model transformation
fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>, path: &Path) -> Result<Option<GeoTransform>> {
    let scale = find_f64_vec(decoder, path, Tag::ModelPixelScaleTag)?;
    let tiepoint = find_f64_vec(decoder, path, Tag::ModelTiepointTag)?;

    if let (Some(scale), Some(tiepoint)) = (scale, tiepoint) {
        if let Some(gt) = GeoTransform::from_tiepoint_scale(&tiepoint, &scale) {
            return Ok(Some(gt));
        }
    }

    Ok(find_f64_vec(decoder, path, Tag::ModelTransformationTag)?
        .and_then(|m| GeoTransform::from_model_transformation(&m)))
}

/// GeoKeyDirectory: `[version, revision, minor, count, (key, location, count, value)*]`
///
/// A projected CRS wins over the geographic one it is based on.
fn parse_geokeys(keys: &[u16]) -> GeoKeys {
    let Some(header) = keys.get(..4) else {
        return GeoKeys::default();
    };
    let num_keys = header[3] as usize;

    let mut geographic = None;
    let mut projected = None;
    let mut pixel_is_point = false;
    for entry in keys[4..].chunks_exact(4).take(num_keys) {
        let (key_id, location, value) = (entry[0], entry[1], entry[3]);
        // location 0 means the value is stored inline
        if location != 0 {
            continue;
        }
        match key_id {
            RASTER_TYPE_KEY => pixel_is_point = value == RASTER_PIXEL_IS_POINT,
            _ if value == 0 || value == USER_DEFINED => {}
            PROJECTED_CS_TYPE_KEY => projected = Some(value as u32),
            GEOGRAPHIC_TYPE_KEY => geographic = Some(value as u32),
            _ => {}
        }
    }
    GeoKeys {
        epsg: projected.or(geographic),
        pixel_is_point,
    }
}
