//! Vector data structures: features, attributes and feature collections

use crate::crs::{Transformer, CRS};
use crate::error::Result;
use crate::BoundingBox;
use geo_types::Geometry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    /// Equality as used by attribute joins.
    ///
    /// Integers and floats compare numerically. `Null` never matches,
    /// not even another `Null`.
    pub fn matches(&self, other: &AttributeValue) -> bool {
        use AttributeValue::*;
        match (self, other) {
            (Null, _) | (_, Null) => false,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Int(a), Float(b)) | (Float(b), Int(a)) => (*a as f64) == *b,
            (String(a), String(b)) => a == b,
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(i) => Some(*i as f64),
            AttributeValue::Float(f) => Some(*f),
            AttributeValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Null => Ok(()),
            AttributeValue::Bool(b) => write!(f, "{b}"),
            AttributeValue::Int(i) => write!(f, "{i}"),
            AttributeValue::Float(v) => write!(f, "{v}"),
            AttributeValue::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::String(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::String(s)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

/// OGC simple-feature type name of a geometry ("Point", "LineString", ...)
pub fn geometry_type_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "LineString",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) | Geometry::Rect(_) | Geometry::Triangle(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
    }
}

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone, Default)]
pub struct Feature {
    /// Feature geometry
    pub geometry: Option<Geometry<f64>>,
    /// Feature attributes
    pub properties: HashMap<String, AttributeValue>,
    /// Optional feature ID
    pub id: Option<String>,
}

impl Feature {
    /// Create a new feature with geometry
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry: Some(geometry),
            properties: HashMap::new(),
            id: None,
        }
    }

    /// Create a feature with no geometry
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builder-style attribute setter
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.set_property(key, value.into());
        self
    }

    /// Set an attribute
    pub fn set_property(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.properties.insert(key.into(), value);
    }

    /// Get an attribute
    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }

    /// Attribute or `Null` when absent
    pub fn property_or_null(&self, key: &str) -> AttributeValue {
        self.properties.get(key).cloned().unwrap_or(AttributeValue::Null)
    }
}

/// Collection of features sharing a CRS and an ordered attribute schema
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
    /// CRS of every geometry in the collection, if known
    pub crs: Option<CRS>,
    /// Attribute column names in output order
    pub columns: Vec<String>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_crs(crs: CRS) -> Self {
        Self {
            crs: Some(crs),
            ..Self::default()
        }
    }

    /// Append a column name to the schema unless it is already present
    pub fn add_column(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.has_column(&name) {
            self.columns.push(name);
        }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Push a feature, extending the schema with any attribute it introduces
    pub fn push(&mut self, feature: Feature) {
        let mut new_keys: Vec<&String> = feature
            .properties
            .keys()
            .filter(|k| !self.has_column(k))
            .collect();
        new_keys.sort();
        let new_keys: Vec<String> = new_keys.into_iter().cloned().collect();
        self.columns.extend(new_keys);
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Distinct geometry type names in first-seen order
    pub fn geometry_types(&self) -> Vec<&'static str> {
        let mut types = Vec::new();
        for name in self
            .features
            .iter()
            .filter_map(|f| f.geometry.as_ref())
            .map(geometry_type_name)
        {
            if !types.contains(&name) {
                types.push(name);
            }
        }
        types
    }

    /// Distinct values of a column in first-seen order (missing values count as `Null`)
    pub fn unique_values(&self, column: &str) -> Vec<AttributeValue> {
        let mut values: Vec<AttributeValue> = Vec::new();
        for value in self.features.iter().map(|f| f.property_or_null(column)) {
            if !values.contains(&value) {
                values.push(value);
            }
        }
        values
    }

    /// Bounding box of all geometries
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.features
            .iter()
            .filter_map(|f| f.geometry.as_ref())
            .filter_map(BoundingBox::from_geometry)
            .reduce(|a, b| a.union(&b))
    }

    /// Reproject every geometry into `target`.
    ///
    /// A collection without a CRS is assumed to already be in `target`.
    pub fn to_crs(&self, target: &CRS) -> Result<FeatureCollection> {
        let Some(source) = &self.crs else {
            tracing::warn!("collection has no CRS, assuming {}", target);
            return Ok(FeatureCollection {
                crs: Some(target.clone()),
                ..self.clone()
            });
        };

        let transformer = Transformer::new(source, target)?;
        let features = self
            .features
            .iter()
            .map(|f| {
                let geometry = f
                    .geometry
                    .as_ref()
                    .map(|g| transformer.transform_geometry(g))
                    .transpose()?;
                Ok(Feature {
                    geometry,
                    properties: f.properties.clone(),
                    id: f.id.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(FeatureCollection {
            features,
            crs: Some(target.clone()),
            columns: self.columns.clone(),
        })
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{line_string, point};

    #[test]
    fn test_matches_semantics() {
        use AttributeValue::*;
        assert!(String("a".into()).matches(&String("a".into())));
        assert!(!String("a".into()).matches(&String("z".into())));
        assert!(Int(3).matches(&Float(3.0)));
        assert!(Float(3.0).matches(&Int(3)));
        assert!(!Null.matches(&Null));
        assert!(!Int(1).matches(&String("1".into())));
    }

    #[test]
    fn test_geometry_types_first_seen_order() {
        let mut fc = FeatureCollection::new();
        fc.push(Feature::new(Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)])));
        fc.push(Feature::new(Geometry::Point(point!(x: 1.0, y: 2.0))));
        fc.push(Feature::new(Geometry::Point(point!(x: 3.0, y: 4.0))));
        fc.push(Feature::empty());
        assert_eq!(fc.geometry_types(), vec!["LineString", "Point"]);
    }

    #[test]
    fn test_push_extends_schema() {
        let mut fc = FeatureCollection::new();
        fc.add_column("id");
        fc.push(Feature::empty().with_property("id", "a").with_property("col1", "b"));
        fc.push(Feature::empty().with_property("col1", "c"));
        assert_eq!(fc.columns, vec!["id", "col1"]);
        assert_eq!(
            fc.unique_values("id"),
            vec![AttributeValue::from("a"), AttributeValue::Null]
        );
    }

    #[test]
    fn test_bounds_union() {
        let mut fc = FeatureCollection::new();
        fc.push(Feature::new(Geometry::Point(point!(x: 1.0, y: 5.0))));
        fc.push(Feature::new(Geometry::Point(point!(x: -2.0, y: 3.0))));
        let bb = fc.bounds().unwrap();
        assert_eq!(bb, BoundingBox::new(-2.0, 3.0, 1.0, 5.0));
    }

    #[test]
    fn test_to_crs_reprojects() {
        let mut fc = FeatureCollection::with_crs(CRS::from_epsg(32632));
        fc.push(Feature::new(Geometry::Point(point!(x: 500_000.0, y: 0.0))).with_property("k", 1i64));
        let out = fc.to_crs(&CRS::wgs84()).unwrap();
        assert!(out.crs.as_ref().unwrap().is_wgs84());
        let Some(Geometry::Point(p)) = &out.features[0].geometry else {
            panic!("expected point");
        };
        assert!((p.x() - 9.0).abs() < 1e-9);
        assert!(p.y().abs() < 1e-9);
        assert_eq!(out.features[0].get_property("k"), Some(&AttributeValue::Int(1)));
    }
}
