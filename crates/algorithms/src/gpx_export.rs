//! Vector to GPX conversion
//!
//! Point layers become GPX waypoints. Every line, and every part of a
//! multi-line, becomes its own single-segment track. A point layer whose `Type` column is `TRKPT`
//! everywhere (as written by GPS exports) is collapsed into a single track.

use arcfoss_core::io::read_vector;
use arcfoss_core::vector::geometry_type_name;
use arcfoss_core::{AttributeValue, Error, Feature, FeatureCollection, Result, CRS};
use geo_types::{Coord, Geometry, LineString, Point};
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Geometry types that can be written as GPX
pub const DEFAULT_VALID_TYPES: [&str; 2] = ["Point", "LineString"];

/// Column marking GPS track points
pub const TYPE_COLUMN: &str = "Type";
const TRACK_POINT: &str = "TRKPT";

/// Check the geometry types of a collection.
///
/// Fails with `TooManyGeometryTypes` when the collection mixes more than
/// `n_unique` types, and with `InvalidGeometryTypes` when any type is not
/// listed in `valid_types`.
pub fn check_geometry(
    collection: &FeatureCollection,
    valid_types: &[&str],
    n_unique: usize,
) -> Result<()> {
    let found = collection.geometry_types();
    if found.len() > n_unique {
        return Err(Error::TooManyGeometryTypes {
            found: found.len(),
            allowed: n_unique,
        });
    }

    let invalid: Vec<String> = found
        .iter()
        .filter(|t| !valid_types.contains(t))
        .map(|t| t.to_string())
        .collect();
    if !invalid.is_empty() {
        return Err(Error::InvalidGeometryTypes {
            found: invalid,
            allowed: valid_types.iter().map(|t| t.to_string()).collect(),
        });
    }
    Ok(())
}

/// Join point features into one line per group of `group_by` values.
///
/// Groups keep the order in which they are first seen and points keep input
/// order. Features with a null group value are dropped.
pub fn points_to_line(collection: &FeatureCollection, group_by: &[&str]) -> Result<FeatureCollection> {
    if let Some(missing) = group_by.iter().find(|c| !collection.has_column(c)) {
        return Err(Error::MissingColumn(missing.to_string()));
    }

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(Vec<AttributeValue>, Vec<Coord<f64>>)> = Vec::new();

    for feature in collection.iter() {
        let coord = match &feature.geometry {
            Some(Geometry::Point(p)) => p.0,
            Some(other) => {
                return Err(Error::InvalidGeometryTypes {
                    found: vec![geometry_type_name(other).to_string()],
                    allowed: vec!["Point".to_string()],
                })
            }
            None => continue,
        };

        let key: Vec<AttributeValue> = group_by.iter().map(|c| feature.property_or_null(c)).collect();
        if key.iter().any(AttributeValue::is_null) {
            continue;
        }

        let slot = *index.entry(format!("{key:?}")).or_insert_with(|| {
            groups.push((key, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(coord);
    }

    let mut lines = FeatureCollection {
        features: Vec::with_capacity(groups.len()),
        crs: collection.crs.clone(),
        columns: group_by.iter().map(|c| c.to_string()).collect(),
    };
    for (key, coords) in groups {
        let mut feature = Feature::new(Geometry::LineString(LineString::new(coords)));
        for (column, value) in group_by.iter().zip(key) {
            feature.set_property(*column, value);
        }
        lines.features.push(feature);
    }

    tracing::debug!("joined {} points into {} lines", collection.len(), lines.len());
    Ok(lines)
}

fn text(feature: &Feature, key: &str) -> Option<String> {
    feature
        .get_property(key)
        .filter(|v| !v.is_null())
        .map(|v| v.to_string())
}

fn waypoint(x: f64, y: f64) -> Waypoint {
    // GPX stores lon/lat; geo points are x = lon, y = lat
    Waypoint::new(Point::new(x, y))
}

fn segment(line: &LineString<f64>) -> TrackSegment {
    let mut segment = TrackSegment::default();
    segment.points = line.coords().map(|c| waypoint(c.x, c.y)).collect();
    segment
}

/// One waypoint per Point feature.
///
/// Attributes `name`, `desc`, `cmt`, `src`, `sym`, `type` and `ele` fill the
/// GPX fields of the same name.
pub fn points_to_gpx(collection: &FeatureCollection) -> Vec<Waypoint> {
    collection
        .iter()
        .filter_map(|feature| match &feature.geometry {
            Some(Geometry::Point(p)) => Some((feature, p)),
            _ => None,
        })
        .map(|(feature, p)| {
            let mut wpt = waypoint(p.x(), p.y());
            wpt.name = text(feature, "name");
            wpt.description = text(feature, "desc");
            wpt.comment = text(feature, "cmt");
            wpt.source = text(feature, "src");
            wpt.symbol = text(feature, "sym");
            wpt.type_ = text(feature, "type");
            wpt.elevation = feature.get_property("ele").and_then(AttributeValue::as_f64);
            wpt
        })
        .collect()
}

/// One single-segment track per LineString and per MultiLineString part,
/// named after the feature
pub fn linestring_to_gpx(collection: &FeatureCollection) -> Vec<Track> {
    collection
        .iter()
        .flat_map(|feature| {
            let parts: Vec<&LineString<f64>> = match &feature.geometry {
                Some(Geometry::LineString(line)) => vec![line],
                Some(Geometry::MultiLineString(lines)) => lines.iter().collect(),
                _ => Vec::new(),
            };
            parts.into_iter().map(move |line| {
                let mut track = Track::default();
                track.name = text(feature, "name");
                track.segments = vec![segment(line)];
                track
            })
        })
        .collect()
}

/// Build a GPX 1.1 document from points and lines
pub fn collection_to_gpx(collection: &FeatureCollection) -> Result<Gpx> {
    let allowed = ["Point", "LineString", "MultiLineString"];
    check_geometry(collection, &allowed, allowed.len())?;

    Ok(Gpx {
        version: GpxVersion::Gpx11,
        creator: Some(format!("arcfoss {}", env!("CARGO_PKG_VERSION"))),
        waypoints: points_to_gpx(collection),
        tracks: linestring_to_gpx(collection),
        ..Gpx::default()
    })
}

/// Write a collection of lon/lat points or lines as a GPX file
pub fn write_gpx<P: AsRef<Path>>(collection: &FeatureCollection, output: P) -> Result<()> {
    let output = output.as_ref();
    let document = collection_to_gpx(collection)?;
    let writer = BufWriter::new(File::create(output)?);
    gpx::write(&document, writer).map_err(|e| Error::Gpx(e.to_string()))?;

    tracing::debug!(
        "wrote {} waypoints and {} tracks to {}",
        document.waypoints.len(),
        document.tracks.len(),
        output.display()
    );
    Ok(())
}

/// True when every feature is a GPS track point
fn is_track_points(collection: &FeatureCollection) -> bool {
    collection.has_column(TYPE_COLUMN)
        && matches!(
            collection.unique_values(TYPE_COLUMN).as_slice(),
            [AttributeValue::String(s)] if s == TRACK_POINT
        )
}

/// Convert a point or line vector file to GPX
pub fn to_gpx<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> Result<()> {
    let input = input.as_ref();
    let source = read_vector(input)?;
    check_geometry(&source, &DEFAULT_VALID_TYPES, 1)?;

    let mut collection = source.to_crs(&CRS::wgs84())?;
    if is_track_points(&collection) {
        tracing::info!("{} holds track points, writing a single track", input.display());
        collection = points_to_line(&collection, &[TYPE_COLUMN])?;
    }
    write_gpx(&collection, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{line_string, point};

    fn points(values: &[(f64, f64, &str)]) -> FeatureCollection {
        let mut fc = FeatureCollection::with_crs(CRS::wgs84());
        for &(x, y, kind) in values {
            fc.push(Feature::new(Geometry::Point(point!(x: x, y: y))).with_property(TYPE_COLUMN, kind));
        }
        fc
    }

    #[test]
    fn test_check_geometry_mixed() {
        let mut fc = points(&[(0.0, 0.0, "WPT")]);
        fc.push(Feature::new(Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)])));

        assert!(matches!(
            check_geometry(&fc, &DEFAULT_VALID_TYPES, 1),
            Err(Error::TooManyGeometryTypes { found: 2, allowed: 1 })
        ));
        assert!(check_geometry(&fc, &DEFAULT_VALID_TYPES, 2).is_ok());
    }

    #[test]
    fn test_check_geometry_invalid_type() {
        let mut fc = FeatureCollection::new();
        fc.push(Feature::new(Geometry::Polygon(
            arcfoss_core::BoundingBox::new(0.0, 0.0, 1.0, 1.0).to_polygon(),
        )));

        match check_geometry(&fc, &DEFAULT_VALID_TYPES, 1) {
            Err(Error::InvalidGeometryTypes { found, .. }) => assert_eq!(found, vec!["Polygon"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_check_geometry_empty() {
        assert!(check_geometry(&FeatureCollection::new(), &DEFAULT_VALID_TYPES, 1).is_ok());
    }

    #[test]
    fn test_points_to_line_groups() {
        let fc = points(&[
            (0.0, 0.0, "a"),
            (5.0, 5.0, "b"),
            (1.0, 1.0, "a"),
            (6.0, 6.0, "b"),
            (2.0, 2.0, "a"),
        ]);

        let lines = points_to_line(&fc, &[TYPE_COLUMN]).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines.columns, vec![TYPE_COLUMN.to_string()]);
        assert_eq!(
            lines.features[0].geometry,
            Some(Geometry::LineString(line_string![
                (x: 0.0, y: 0.0),
                (x: 1.0, y: 1.0),
                (x: 2.0, y: 2.0)
            ]))
        );
        assert_eq!(
            lines.features[1].get_property(TYPE_COLUMN),
            Some(&AttributeValue::from("b"))
        );
    }

    #[test]
    fn test_points_to_line_missing_column() {
        let fc = points(&[(0.0, 0.0, "a")]);
        assert!(matches!(
            points_to_line(&fc, &["track"]),
            Err(Error::MissingColumn(c)) if c == "track"
        ));
    }

    #[test]
    fn test_waypoint_fields() {
        let mut fc = FeatureCollection::with_crs(CRS::wgs84());
        fc.push(
            Feature::new(Geometry::Point(point!(x: -1.2, y: 54.6)))
                .with_property("name", "cairn")
                .with_property("ele", 312.5),
        );

        let wpts = points_to_gpx(&fc);
        assert_eq!(wpts.len(), 1);
        assert_eq!(wpts[0].point().x(), -1.2);
        assert_eq!(wpts[0].point().y(), 54.6);
        assert_eq!(wpts[0].name.as_deref(), Some("cairn"));
        assert_eq!(wpts[0].elevation, Some(312.5));
    }

    #[test]
    fn test_multilinestring_track_per_part() {
        let mut fc = FeatureCollection::with_crs(CRS::wgs84());
        fc.push(Feature::new(Geometry::MultiLineString(geo_types::MultiLineString::new(vec![
            line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)],
            line_string![(x: 2.0, y: 0.0), (x: 3.0, y: 0.0), (x: 4.0, y: 0.0)],
        ]))));

        let tracks = linestring_to_gpx(&fc);
        assert_eq!(tracks.len(), 2);
        assert!(tracks.iter().all(|t| t.segments.len() == 1));
        assert_eq!(tracks[0].segments[0].points.len(), 2);
        assert_eq!(tracks[1].segments[0].points.len(), 3);
    }

    #[test]
    fn test_is_track_points() {
        assert!(is_track_points(&points(&[(0.0, 0.0, "TRKPT"), (1.0, 1.0, "TRKPT")])));
        assert!(!is_track_points(&points(&[(0.0, 0.0, "TRKPT"), (1.0, 1.0, "WPT")])));
    }
}
