//! # arcfoss algorithms
//!
//! The conversions behind the `arcfoss` command line:
//!
//! - **extent**: bounding-box extents of raster/vector datasets, optionally in WGS84
//! - **gpx_export**: vector points/lines to GPX waypoints and tracks
//! - **join**: conditional nearest-neighbour spatial joins
//! - **reproject**: geometry and file reprojection

pub mod extent;
pub mod gpx_export;
pub mod join;
pub mod reproject;

mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::extent::{extent_from_file, extents_to_features, get_extent, DatasetKind};
    pub use crate::gpx_export::{check_geometry, points_to_line, to_gpx, write_gpx};
    pub use crate::join::{conditional_sjoin, nearest_match, JoinParams};
    pub use crate::reproject::{reproject, reproject_file};
    pub use arcfoss_core::prelude::*;
}
