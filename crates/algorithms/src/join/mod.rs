//! Conditional nearest-neighbour spatial joins
//!
//! The join is driven by the right collection: every right feature is paired
//! with its nearest left feature(s), measured as Euclidean distance in CRS
//! units. Pairs can then be restricted by a maximum distance and by equality
//! of attribute columns (`join_on`).
//!
//! # Example
//! ```
//! use arcfoss_algorithms::join::{conditional_sjoin, JoinParams};
//! use arcfoss_core::{Feature, FeatureCollection};
//! use geo_types::{point, Geometry};
//!
//! let mut stations = FeatureCollection::new();
//! stations.push(Feature::new(Geometry::Point(point!(x: 0.0, y: 0.0))).with_property("line", "A"));
//! let mut stops = FeatureCollection::new();
//! stops.push(Feature::new(Geometry::Point(point!(x: 3.0, y: 4.0))).with_property("line", "A"));
//!
//! let joined = conditional_sjoin(&stations, &stops, &JoinParams::default())?;
//! assert_eq!(joined.columns, vec!["line", "line_right", "distance"]);
//! assert_eq!(joined.features[0].get_property("distance").and_then(|d| d.as_f64()), Some(5.0));
//! # Ok::<(), arcfoss_core::Error>(())
//! ```

mod nearest;

use crate::maybe_rayon::map_indices;
use arcfoss_core::io::{read_vector, write_vector};
use arcfoss_core::{AttributeValue, Error, Feature, FeatureCollection, Result};
use nearest::NearestIndex;
use std::collections::HashMap;
use std::path::Path;

/// Suffix appended to right columns whose name also exists on the left
pub const RIGHT_SUFFIX: &str = "_right";

/// Parameters of a conditional nearest join
#[derive(Debug, Clone)]
pub struct JoinParams {
    /// Name of the output column holding the pair distance
    pub distance_col: String,
    /// Pairs farther apart than this (CRS units) are dropped
    pub max_distance: Option<f64>,
    /// Columns that must hold equal values on both sides
    pub join_on: Vec<String>,
}

impl Default for JoinParams {
    fn default() -> Self {
        Self {
            distance_col: "distance".to_string(),
            max_distance: None,
            join_on: Vec::new(),
        }
    }
}

impl JoinParams {
    /// `columns` are the attribute columns the join writes besides the
    /// distance column
    fn validate(&self, left: &FeatureCollection, right: &FeatureCollection, columns: &[String]) -> Result<()> {
        if columns.contains(&self.distance_col) {
            return Err(Error::InvalidParameter {
                name: "distance_col",
                value: self.distance_col.clone(),
                reason: "already names an output column".to_string(),
            });
        }
        if let Some(max) = self.max_distance {
            if !max.is_finite() || max < 0.0 {
                return Err(Error::InvalidParameter {
                    name: "max_distance",
                    value: max.to_string(),
                    reason: "must be a finite, non-negative distance".to_string(),
                });
            }
        }
        for column in &self.join_on {
            if !left.has_column(column) {
                return Err(Error::MissingColumn(format!("{column} (left dataset)")));
            }
            if !right.has_column(column) {
                return Err(Error::MissingColumn(format!("{column} (right dataset)")));
            }
        }
        Ok(())
    }
}

/// A matched (left, right) feature pair
#[derive(Debug, Clone, Copy, PartialEq)]
struct Pair {
    left: usize,
    right: usize,
    distance: f64,
}

/// Nearest pairs passing the distance and attribute conditions, ordered by
/// right index then left index
fn matched_pairs(
    left: &FeatureCollection,
    right: &FeatureCollection,
    params: &JoinParams,
    columns: &[String],
) -> Result<Vec<Pair>> {
    params.validate(left, right, columns)?;

    if let (Some(l), Some(r)) = (&left.crs, &right.crs) {
        if !l.is_equivalent(r) {
            tracing::warn!("joining datasets in different CRS ({} and {}), distances mix units", l, r);
        }
    }

    let index = NearestIndex::new(&left.features);
    let per_right: Vec<Vec<Pair>> = map_indices(right.features.len(), |r| {
        let Some(geometry) = &right.features[r].geometry else {
            return Vec::new();
        };
        let (hits, distance) = index.nearest(geometry, params.max_distance);
        hits.into_iter()
            .filter(|&l| {
                params.join_on.iter().all(|c| {
                    left.features[l]
                        .property_or_null(c)
                        .matches(&right.features[r].property_or_null(c))
                })
            })
            .map(|l| Pair {
                left: l,
                right: r,
                distance,
            })
            .collect()
    });

    let pairs: Vec<Pair> = per_right.into_iter().flatten().collect();
    tracing::debug!(
        "{} of {} right features matched",
        pairs.len(),
        right.len()
    );
    Ok(pairs)
}

/// Join each right feature to its nearest left feature(s).
///
/// Output rows carry the left geometry and the left columns, followed by
/// the right columns (suffixed with `_right` on name clashes) and the
/// distance column.
pub fn conditional_sjoin(
    left: &FeatureCollection,
    right: &FeatureCollection,
    params: &JoinParams,
) -> Result<FeatureCollection> {
    let right_names: HashMap<&str, String> = right
        .columns
        .iter()
        .map(|c| {
            let name = if left.has_column(c) {
                format!("{c}{RIGHT_SUFFIX}")
            } else {
                c.clone()
            };
            (c.as_str(), name)
        })
        .collect();
    let columns: Vec<String> = left
        .columns
        .iter()
        .chain(right.columns.iter().map(|c| &right_names[c.as_str()]))
        .cloned()
        .collect();

    let pairs = matched_pairs(left, right, params, &columns)?;

    let mut joined = FeatureCollection {
        features: Vec::with_capacity(pairs.len()),
        crs: left.crs.clone(),
        columns: Vec::new(),
    };
    for column in columns {
        joined.add_column(column);
    }
    joined.add_column(params.distance_col.clone());

    for pair in pairs {
        let (l, r) = (&left.features[pair.left], &right.features[pair.right]);
        let mut feature = Feature {
            geometry: l.geometry.clone(),
            id: l.id.clone(),
            ..Feature::default()
        };
        for column in &left.columns {
            feature.set_property(column.clone(), l.property_or_null(column));
        }
        for column in &right.columns {
            feature.set_property(right_names[column.as_str()].clone(), r.property_or_null(column));
        }
        feature.set_property(params.distance_col.clone(), AttributeValue::Float(pair.distance));
        joined.features.push(feature);
    }
    Ok(joined)
}

/// Right features that have a nearest left feature passing the conditions,
/// with the distance column appended
pub fn nearest_match(
    left: &FeatureCollection,
    right: &FeatureCollection,
    params: &JoinParams,
) -> Result<FeatureCollection> {
    let pairs = matched_pairs(left, right, params, &right.columns)?;

    let mut matched = FeatureCollection {
        features: Vec::with_capacity(pairs.len()),
        crs: right.crs.clone(),
        columns: right.columns.clone(),
    };
    matched.add_column(params.distance_col.clone());

    for pair in pairs {
        let mut feature = right.features[pair.right].clone();
        feature.set_property(params.distance_col.clone(), AttributeValue::Float(pair.distance));
        matched.features.push(feature);
    }
    Ok(matched)
}

/// `conditional_sjoin` between two vector files, written with `format`
pub fn conditional_sjoin_files<L, R, O>(
    left: L,
    right: R,
    output: O,
    format: &str,
    params: &JoinParams,
) -> Result<()>
where
    L: AsRef<Path>,
    R: AsRef<Path>,
    O: AsRef<Path>,
{
    let joined = conditional_sjoin(&read_vector(left)?, &read_vector(right)?, params)?;
    tracing::info!("writing {} joined features to {}", joined.len(), output.as_ref().display());
    write_vector(&joined, output, format)
}

/// `nearest_match` between two vector files, written with `format`
pub fn nearest_conditional_match<L, R, O>(
    left: L,
    right: R,
    output: O,
    format: &str,
    params: &JoinParams,
) -> Result<()>
where
    L: AsRef<Path>,
    R: AsRef<Path>,
    O: AsRef<Path>,
{
    let matched = nearest_match(&read_vector(left)?, &read_vector(right)?, params)?;
    tracing::info!("writing {} matched features to {}", matched.len(), output.as_ref().display());
    write_vector(&matched, output, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcfoss_core::CRS;
    use geo_types::{point, Geometry};

    fn place(name: &str, x: f64, y: f64, col1: &str, col2: &str) -> Feature {
        Feature::new(Geometry::Point(point!(x: x, y: y)))
            .with_property("id", name)
            .with_property("col1", col1)
            .with_property("col2", col2)
    }

    fn collection(features: Vec<Feature>) -> FeatureCollection {
        let mut fc = FeatureCollection::with_crs(CRS::wgs84());
        for f in features {
            fc.push(f);
        }
        fc
    }

    /// One point on the Tees at Middlesbrough and two candidates to its north
    fn fixtures() -> (FeatureCollection, FeatureCollection) {
        let left = collection(vec![place(
            "riverside",
            -1.2168849741005956,
            54.57827957221454795,
            "a",
            "b",
        )]);
        let right = collection(vec![
            place("river_tees", -1.21279327075493448, 54.58131930464433168, "z", "b"),
            place("hartlepool", -1.20634573821025537, 54.68589717425042807, "a", "c"),
        ]);
        (left, right)
    }

    fn ids(fc: &FeatureCollection, column: &str) -> Vec<String> {
        fc.iter().map(|f| f.property_or_null(column).to_string()).collect()
    }

    #[test]
    fn test_sjoin_no_conditions() {
        let (left, right) = fixtures();
        let joined = conditional_sjoin(&left, &right, &JoinParams::default()).unwrap();

        assert_eq!(joined.len(), 2);
        assert!(joined.has_column("distance"));
        assert_eq!(ids(&joined, "id_right"), vec!["river_tees", "hartlepool"]);
        assert_eq!(ids(&joined, "id"), vec!["riverside", "riverside"]);
        assert_eq!(
            joined.columns,
            vec!["col1", "col2", "id", "col1_right", "col2_right", "id_right", "distance"]
        );
        assert_eq!(joined.features[0].geometry, left.features[0].geometry);
    }

    #[test]
    fn test_sjoin_max_distance() {
        let (left, right) = fixtures();
        let params = JoinParams {
            max_distance: Some(0.05),
            ..JoinParams::default()
        };
        let joined = conditional_sjoin(&left, &right, &params).unwrap();
        assert_eq!(ids(&joined, "id_right"), vec!["river_tees"]);

        let d = joined.features[0].get_property("distance").and_then(AttributeValue::as_f64).unwrap();
        assert!((d - 0.005097).abs() < 1e-5, "distance {d}");
    }

    #[test]
    fn test_sjoin_join_on() {
        let (left, right) = fixtures();
        let params = JoinParams {
            join_on: vec!["col1".to_string()],
            ..JoinParams::default()
        };
        let joined = conditional_sjoin(&left, &right, &params).unwrap();
        assert_eq!(ids(&joined, "id_right"), vec!["hartlepool"]);
    }

    #[test]
    fn test_sjoin_all_conditions() {
        let (left, right) = fixtures();
        let params = JoinParams {
            max_distance: Some(0.1),
            join_on: vec!["col1".to_string(), "col2".to_string()],
            ..JoinParams::default()
        };
        assert!(conditional_sjoin(&left, &right, &params).unwrap().is_empty());
    }

    #[test]
    fn test_nearest_match_returns_right_rows() {
        let (left, right) = fixtures();
        let params = JoinParams {
            distance_col: "dist".to_string(),
            join_on: vec!["col2".to_string()],
            ..JoinParams::default()
        };
        let matched = nearest_match(&left, &right, &params).unwrap();

        assert_eq!(ids(&matched, "id"), vec!["river_tees"]);
        assert_eq!(matched.columns, vec!["col1", "col2", "id", "dist"]);
        assert_eq!(matched.features[0].geometry, right.features[0].geometry);
    }

    #[test]
    fn test_missing_join_column() {
        let (left, right) = fixtures();
        let params = JoinParams {
            join_on: vec!["route".to_string()],
            ..JoinParams::default()
        };
        assert!(matches!(
            conditional_sjoin(&left, &right, &params),
            Err(Error::MissingColumn(_))
        ));
    }

    #[test]
    fn test_negative_max_distance() {
        let (left, right) = fixtures();
        let params = JoinParams {
            max_distance: Some(-1.0),
            ..JoinParams::default()
        };
        assert!(matches!(
            nearest_match(&left, &right, &params),
            Err(Error::InvalidParameter { name: "max_distance", .. })
        ));
    }

    #[test]
    fn test_distance_col_clashes_with_left_column() {
        let left = collection(vec![
            Feature::new(Geometry::Point(point!(x: 0.0, y: 0.0))).with_property("distance", "left-value")
        ]);
        let right = collection(vec![Feature::new(Geometry::Point(point!(x: 5.0, y: 0.0))).with_property("k", 1i64)]);
        assert!(matches!(
            conditional_sjoin(&left, &right, &JoinParams::default()),
            Err(Error::InvalidParameter { name: "distance_col", .. })
        ));

        // the right side of nearest_match never carries left columns
        let matched = nearest_match(&left, &right, &JoinParams::default()).unwrap();
        assert_eq!(matched.columns, vec!["k", "distance"]);
    }

    #[test]
    fn test_distance_col_clashes_with_right_column() {
        let (left, right) = fixtures();
        let params = JoinParams {
            distance_col: "col2".to_string(),
            ..JoinParams::default()
        };
        assert!(matches!(
            nearest_match(&left, &right, &params),
            Err(Error::InvalidParameter { name: "distance_col", .. })
        ));
        // left has col2 too, so the right one is renamed, and the left one clashes
        assert!(matches!(
            conditional_sjoin(&left, &right, &params),
            Err(Error::InvalidParameter { name: "distance_col", .. })
        ));

        let params = JoinParams {
            distance_col: "col2_right".to_string(),
            ..JoinParams::default()
        };
        assert!(conditional_sjoin(&left, &right, &params).is_err());
    }

    #[test]
    fn test_null_never_matches() {
        let left = collection(vec![
            Feature::new(Geometry::Point(point!(x: 0.0, y: 0.0))).with_property("k", AttributeValue::Null)
        ]);
        let right = collection(vec![
            Feature::new(Geometry::Point(point!(x: 1.0, y: 0.0))).with_property("k", AttributeValue::Null)
        ]);
        let params = JoinParams {
            join_on: vec!["k".to_string()],
            ..JoinParams::default()
        };
        assert!(conditional_sjoin(&left, &right, &params).unwrap().is_empty());
    }

    #[test]
    fn test_right_without_geometry() {
        let (left, mut right) = fixtures();
        right.push(Feature::empty().with_property("id", "nowhere"));
        let joined = conditional_sjoin(&left, &right, &JoinParams::default()).unwrap();
        assert_eq!(joined.len(), 2);
    }
}
