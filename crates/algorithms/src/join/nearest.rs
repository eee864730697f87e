//! R-tree nearest-geometry search
//!
//! The tree indexes the envelopes of the left geometries. A query first takes
//! the envelope nearest to the query's centre as a seed; the exact distance to
//! that seed bounds the search window, and every candidate in the window is
//! measured exactly. All candidates at the minimum distance are returned.

use arcfoss_core::{BoundingBox, Feature};
use geo::{Distance, Euclidean};
use geo_types::Geometry;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

/// Envelope of one indexed geometry
struct IndexedEnvelope {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

impl PointDistance for IndexedEnvelope {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        self.aabb.distance_2(point)
    }
}

fn aabb(bounds: &BoundingBox) -> AABB<[f64; 2]> {
    AABB::from_corners([bounds.min_x, bounds.min_y], [bounds.max_x, bounds.max_y])
}

/// Spatial index over the geometries of a feature slice
pub(crate) struct NearestIndex<'a> {
    features: &'a [Feature],
    tree: RTree<IndexedEnvelope>,
}

impl<'a> NearestIndex<'a> {
    /// Index every feature with a non-empty geometry
    pub(crate) fn new(features: &'a [Feature]) -> Self {
        let envelopes = features
            .iter()
            .enumerate()
            .filter_map(|(index, feature)| {
                let bounds = BoundingBox::from_geometry(feature.geometry.as_ref()?)?;
                Some(IndexedEnvelope {
                    index,
                    aabb: aabb(&bounds),
                })
            })
            .collect();
        Self {
            features,
            tree: RTree::bulk_load(envelopes),
        }
    }

    fn distance(&self, index: usize, geometry: &Geometry<f64>) -> f64 {
        match &self.features[index].geometry {
            Some(indexed) => Euclidean::distance(indexed, geometry),
            None => f64::INFINITY,
        }
    }

    /// Indices of the features nearest to `geometry`, in ascending order,
    /// with their common distance.
    ///
    /// Empty when nothing lies within `max_distance` (inclusive).
    pub(crate) fn nearest(
        &self,
        geometry: &Geometry<f64>,
        max_distance: Option<f64>,
    ) -> (Vec<usize>, f64) {
        let none = (Vec::new(), f64::INFINITY);
        let Some(bounds) = BoundingBox::from_geometry(geometry) else {
            return none;
        };
        let (cx, cy) = bounds.center();
        let Some(seed) = self.tree.nearest_neighbor(&[cx, cy]) else {
            return none;
        };

        let seed_distance = self.distance(seed.index, geometry);
        let within = |d: f64| max_distance.map_or(true, |max| d <= max);
        let (mut best, mut hits) = if within(seed_distance) {
            (seed_distance, vec![seed.index])
        } else {
            (f64::INFINITY, Vec::new())
        };

        let radius = max_distance.map_or(seed_distance, |max| seed_distance.min(max));
        let window = aabb(&bounds.expand(radius));
        for candidate in self.tree.locate_in_envelope_intersecting(&window) {
            if candidate.index == seed.index {
                continue;
            }
            let d = self.distance(candidate.index, geometry);
            if !within(d) || d > best {
                continue;
            }
            if d < best {
                best = d;
                hits.clear();
            }
            hits.push(candidate.index);
        }

        hits.sort_unstable();
        (hits, best)
    }
}
