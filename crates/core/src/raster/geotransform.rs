//! Affine pixel-to-map transform

use crate::BoundingBox;

/// Affine transform in GDAL coefficient order:
///
/// ```text
/// x = c[0] + col * c[1] + row * c[2]
/// y = c[3] + col * c[4] + row * c[5]
/// ```
///
/// `(col, row)` address pixel corners, so `(0, 0)` is the upper-left corner
/// of the raster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub coeffs: [f64; 6],
}

impl GeoTransform {
    /// North-up transform without rotation terms
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            coeffs: [origin_x, pixel_width, 0.0, origin_y, 0.0, pixel_height],
        }
    }

    pub fn from_gdal(coeffs: [f64; 6]) -> Self {
        Self { coeffs }
    }

    /// From GeoTIFF ModelTiepointTag `[I, J, K, X, Y, Z]` and
    /// ModelPixelScaleTag `[ScaleX, ScaleY, ScaleZ]`
    pub fn from_tiepoint_scale(tiepoint: &[f64], scale: &[f64]) -> Option<Self> {
        let (&[i, j, _, x, y, _], &[sx, sy, ..]) = (tiepoint.get(..6)?, scale) else {
            return None;
        };
        Some(Self::new(x - i * sx, y + j * sy, sx, -sy))
    }

    /// From the 4x4 row-major GeoTIFF ModelTransformationTag
    pub fn from_model_transformation(matrix: &[f64]) -> Option<Self> {
        let m = matrix.get(..8)?;
        Some(Self {
            coeffs: [m[3], m[0], m[1], m[7], m[4], m[5]],
        })
    }

    /// Re-anchor a transform whose origin is the centre of the first pixel
    /// (GeoTIFF RasterPixelIsPoint) on its upper-left corner
    pub fn center_to_corner(self) -> Self {
        let mut c = self.coeffs;
        c[0] -= 0.5 * (c[1] + c[2]);
        c[3] -= 0.5 * (c[4] + c[5]);
        Self { coeffs: c }
    }

    /// Map coordinates of a pixel corner
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        let c = &self.coeffs;
        (c[0] + col * c[1] + row * c[2], c[3] + col * c[4] + row * c[5])
    }

    /// Envelope of a `cols` x `rows` raster footprint
    pub fn bounds(&self, cols: usize, rows: usize) -> BoundingBox {
        let (w, h) = (cols as f64, rows as f64);
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(w, 0.0),
            self.apply(0.0, h),
            self.apply(w, h),
        ];
        corners.iter().skip(1).fold(
            BoundingBox::new(corners[0].0, corners[0].1, corners[0].0, corners[0].1),
            |bb, &(x, y)| bb.union(&BoundingBox::new(x, y, x, y)),
        )
    }
}

/// Pixel space: unit cells, y pointing down
impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_north_up_bounds() {
        let bb = GeoTransform::new(0.0, 100.0, 1.0, -1.0).bounds(100, 100);
        assert_eq!(bb, BoundingBox::new(0.0, 0.0, 100.0, 100.0));
    }

    #[test]
    fn test_from_tiepoint_scale() {
        let gt = GeoTransform::from_tiepoint_scale(
            &[0.0, 0.0, 0.0, 561_000.0, 5_935_000.0, 0.0],
            &[30.0, 30.0, 0.0],
        )
        .unwrap();
        assert_eq!(gt, GeoTransform::new(561_000.0, 5_935_000.0, 30.0, -30.0));
        assert!(GeoTransform::from_tiepoint_scale(&[0.0; 3], &[1.0, 1.0]).is_none());
    }

    #[test]
    fn test_tiepoint_not_at_origin() {
        // tiepoint at pixel (10, 20) instead of the upper-left corner
        let gt = GeoTransform::from_tiepoint_scale(&[10.0, 20.0, 0.0, 1_000.0, 2_000.0, 0.0], &[2.0, 2.0])
            .unwrap();
        assert_eq!(gt.apply(0.0, 0.0), (980.0, 2_040.0));
    }

    #[test]
    fn test_center_to_corner() {
        let gt = GeoTransform::new(100.0, 200.0, 10.0, -10.0).center_to_corner();
        assert_eq!(gt, GeoTransform::new(95.0, 205.0, 10.0, -10.0));
    }

    #[test]
    fn test_rotated_bounds() {
        let m = [
            2.0, 1.0, 0.0, 100.0, //
            0.0, -2.0, 0.0, 50.0, //
            0.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ];
        let bb = GeoTransform::from_model_transformation(&m).unwrap().bounds(10, 5);
        assert_relative_eq!(bb.min_x, 100.0);
        assert_relative_eq!(bb.max_x, 125.0);
        assert_relative_eq!(bb.min_y, 40.0);
        assert_relative_eq!(bb.max_y, 50.0);
    }
}
