//! Native GeoJSON reading/writing (without GDAL dependency)
//!
//! Uses serde for the RFC 7946 object model. The pre-RFC named `crs` member
//! is honoured on read and written for non-WGS84 collections, so projected
//! data survives a round trip.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::vector::{AttributeValue, Feature, FeatureCollection};
use crate::BoundingBox;
use geo_types::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

type Position = Vec<f64>;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
enum GeoJson {
    FeatureCollection {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        crs: Option<NamedCrs>,
        features: Vec<GeoJsonFeature>,
    },
    Feature(GeoJsonFeature),
}

#[derive(Debug, Serialize, Deserialize)]
struct NamedCrs {
    #[serde(rename = "type")]
    kind: String,
    properties: NamedCrsProperties,
}

#[derive(Debug, Serialize, Deserialize)]
struct NamedCrsProperties {
    name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeoJsonFeature {
    #[serde(rename = "type", default = "feature_tag")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<Value>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    geometry: Option<GeoJsonGeometry>,
}

fn feature_tag() -> String {
    "Feature".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
enum GeoJsonGeometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    GeometryCollection { geometries: Vec<GeoJsonGeometry> },
}

// ── GeoJSON → geo-types ─────────────────────────────────────────────────

fn coord(position: &Position) -> Result<Coord<f64>> {
    match position.as_slice() {
        [x, y, ..] => Ok(Coord { x: *x, y: *y }),
        _ => Err(Error::InvalidGeometry(format!(
            "position needs at least two values, got {}",
            position.len()
        ))),
    }
}

fn line(positions: &[Position]) -> Result<LineString<f64>> {
    positions.iter().map(coord).collect::<Result<Vec<_>>>().map(LineString::new)
}

fn polygon(rings: &[Vec<Position>]) -> Result<Polygon<f64>> {
    let mut rings = rings.iter().map(|r| line(r));
    let exterior = rings.next().transpose()?.unwrap_or_else(|| LineString::new(vec![]));
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

impl TryFrom<&GeoJsonGeometry> for Geometry<f64> {
    type Error = Error;

    fn try_from(value: &GeoJsonGeometry) -> Result<Self> {
        Ok(match value {
            GeoJsonGeometry::Point { coordinates } => Geometry::Point(Point(coord(coordinates)?)),
            GeoJsonGeometry::MultiPoint { coordinates } => Geometry::MultiPoint(MultiPoint(
                coordinates
                    .iter()
                    .map(|p| coord(p).map(Point))
                    .collect::<Result<_>>()?,
            )),
            GeoJsonGeometry::LineString { coordinates } => Geometry::LineString(line(coordinates)?),
            GeoJsonGeometry::MultiLineString { coordinates } => Geometry::MultiLineString(
                MultiLineString(coordinates.iter().map(|l| line(l)).collect::<Result<_>>()?),
            ),
            GeoJsonGeometry::Polygon { coordinates } => Geometry::Polygon(polygon(coordinates)?),
            GeoJsonGeometry::MultiPolygon { coordinates } => Geometry::MultiPolygon(MultiPolygon(
                coordinates.iter().map(|p| polygon(p)).collect::<Result<_>>()?,
            )),
            GeoJsonGeometry::GeometryCollection { geometries } => {
                Geometry::GeometryCollection(GeometryCollection(
                    geometries
                        .iter()
                        .map(Geometry::try_from)
                        .collect::<Result<_>>()?,
                ))
            }
        })
    }
}

// ── geo-types → GeoJSON ─────────────────────────────────────────────────

fn position(c: Coord<f64>) -> Position {
    vec![c.x, c.y]
}

fn positions(ls: &LineString<f64>) -> Vec<Position> {
    ls.coords().copied().map(position).collect()
}

fn rings(p: &Polygon<f64>) -> Vec<Vec<Position>> {
    std::iter::once(p.exterior())
        .chain(p.interiors())
        .map(positions)
        .collect()
}

impl From<&Geometry<f64>> for GeoJsonGeometry {
    fn from(value: &Geometry<f64>) -> Self {
        match value {
            Geometry::Point(p) => GeoJsonGeometry::Point { coordinates: position(p.0) },
            Geometry::Line(l) => GeoJsonGeometry::LineString {
                coordinates: vec![position(l.start), position(l.end)],
            },
            Geometry::LineString(ls) => GeoJsonGeometry::LineString { coordinates: positions(ls) },
            Geometry::Polygon(p) => GeoJsonGeometry::Polygon { coordinates: rings(p) },
            Geometry::MultiPoint(mp) => GeoJsonGeometry::MultiPoint {
                coordinates: mp.iter().map(|p| position(p.0)).collect(),
            },
            Geometry::MultiLineString(mls) => GeoJsonGeometry::MultiLineString {
                coordinates: mls.iter().map(positions).collect(),
            },
            Geometry::MultiPolygon(mp) => GeoJsonGeometry::MultiPolygon {
                coordinates: mp.iter().map(rings).collect(),
            },
            Geometry::GeometryCollection(gc) => GeoJsonGeometry::GeometryCollection {
                geometries: gc.iter().map(GeoJsonGeometry::from).collect(),
            },
            Geometry::Rect(r) => GeoJsonGeometry::Polygon { coordinates: rings(&r.to_polygon()) },
            Geometry::Triangle(t) => GeoJsonGeometry::Polygon { coordinates: rings(&t.to_polygon()) },
        }
    }
}

// ── Attributes ──────────────────────────────────────────────────────────

fn attribute(value: Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null,
        Value::Bool(b) => AttributeValue::Bool(b),
        Value::Number(n) => n
            .as_i64()
            .map(AttributeValue::Int)
            .unwrap_or_else(|| AttributeValue::Float(n.as_f64().unwrap_or(f64::NAN))),
        Value::String(s) => AttributeValue::String(s),
        other => AttributeValue::String(other.to_string()),
    }
}

fn json_value(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::Null => Value::Null,
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Int(i) => Value::from(*i),
        // NaN/inf have no JSON spelling
        AttributeValue::Float(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
        AttributeValue::String(s) => Value::String(s.clone()),
    }
}

fn crs_from_named(named: &NamedCrs) -> Option<CRS> {
    CRS::from_user_input(&named.properties.name).ok()
}

// ── Public API ──────────────────────────────────────────────────────────

fn parse(path: &Path) -> Result<GeoJson> {
    let file = File::open(path).map_err(|e| Error::unrecognized("vector", path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| Error::unrecognized("vector", path, e))
}

/// Read a GeoJSON file into a FeatureCollection
///
/// Collections without a `crs` member are WGS84, as RFC 7946 requires.
pub fn read_vector<P: AsRef<Path>>(path: P) -> Result<FeatureCollection> {
    let path = path.as_ref();
    let (crs, features) = match parse(path)? {
        GeoJson::FeatureCollection { crs, features, .. } => (crs, features),
        GeoJson::Feature(feature) => (None, vec![feature]),
    };

    let mut collection = FeatureCollection::with_crs(
        crs.as_ref().and_then(crs_from_named).unwrap_or_else(CRS::wgs84),
    );

    for raw in features {
        let geometry = raw.geometry.as_ref().map(Geometry::try_from).transpose()?;
        let mut feature = Feature {
            geometry,
            id: raw.id.map(|id| match id {
                Value::String(s) => s,
                other => other.to_string(),
            }),
            ..Feature::default()
        };
        for (key, value) in raw.properties.unwrap_or_default() {
            collection.add_column(key.clone());
            feature.set_property(key, attribute(value));
        }
        collection.push(feature);
    }

    tracing::debug!(
        "read {} features from {} ({})",
        collection.len(),
        path.display(),
        collection.crs.as_ref().map(|c| c.identifier()).unwrap_or_default()
    );
    Ok(collection)
}

/// Envelope and CRS of a GeoJSON file
pub fn vector_bounds<P: AsRef<Path>>(path: P) -> Result<(BoundingBox, Option<CRS>)> {
    let path = path.as_ref();
    let collection = read_vector(path)?;
    let bounds = collection.bounds().ok_or_else(|| Error::EmptyDataset {
        path: path.to_path_buf(),
    })?;
    Ok((bounds, collection.crs))
}

/// Write a FeatureCollection as GeoJSON
///
/// `format` must name the GeoJSON driver; other drivers need the `gdal` feature.
pub fn write_vector<P: AsRef<Path>>(
    collection: &FeatureCollection,
    path: P,
    format: &str,
) -> Result<()> {
    let path = path.as_ref();
    if !format.eq_ignore_ascii_case("geojson") {
        return Err(Error::UnsupportedFormat(format!(
            "{format} (only GeoJSON is available without the `gdal` feature)"
        )));
    }

    let crs = collection
        .crs
        .as_ref()
        .filter(|c| !c.is_wgs84())
        .and_then(|c| c.to_epsg())
        .map(|code| NamedCrs {
            kind: "name".to_string(),
            properties: NamedCrsProperties {
                name: format!("urn:ogc:def:crs:EPSG::{code}"),
            },
        });

    let features = collection
        .features
        .iter()
        .map(|f| GeoJsonFeature {
            kind: feature_tag(),
            id: f.id.clone().map(Value::String),
            properties: Some(
                collection
                    .columns
                    .iter()
                    .map(|c| (c.clone(), json_value(&f.property_or_null(c))))
                    .collect(),
            ),
            geometry: f.geometry.as_ref().map(GeoJsonGeometry::from),
        })
        .collect();

    let document = GeoJson::FeatureCollection {
        name: path.file_stem().map(|s| s.to_string_lossy().into_owned()),
        crs,
        features,
    };

    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, &document)?;
    tracing::debug!("wrote {} features to {}", collection.len(), path.display());
    Ok(())
}
