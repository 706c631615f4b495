//! Affine no-shear grid warping.

use gridair_space::WarpBox;

/// A source sampling coordinate in pixel units.
///
/// `(0.0, 0.0)` is the centre of the top-left pixel and
/// `(rows - 1, cols - 1)` the centre of the bottom-right one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplePoint {
    /// Source row.
    pub y: f32,
    /// Source column.
    pub x: f32,
}

/// Output position `i` of `n` in the `[-1, 1]` convention.
#[inline]
fn unit_coord(i: usize, n: usize) -> f32 {
    if n <= 1 {
        0.0
    } else {
        -1.0 + 2.0 * i as f32 / (n - 1) as f32
    }
}

/// Convert a `[-1, 1]` coordinate to source pixel units along an axis of
/// `len` pixels.
#[inline]
fn to_pixel(c: f32, len: usize) -> f32 {
    (c + 1.0) * 0.5 * (len.saturating_sub(1)) as f32
}

/// Sampling grid for one glimpse.
///
/// Returns `out_shape.0 * out_shape.1` points in row-major order. Output
/// position `(u, v)` in `[-1, 1]^2` samples the source at
/// `(scale_y * v + offset_y, scale_x * u + offset_x)`, converted to pixel
/// units of an image of `image_shape = (rows, cols)`.
pub fn warp_grid(
    warp: WarpBox,
    image_shape: (usize, usize),
    out_shape: (usize, usize),
) -> Vec<SamplePoint> {
    let (oh, ow) = out_shape;
    let mut points = Vec::with_capacity(oh * ow);
    for i in 0..oh {
        let v = unit_coord(i, oh);
        let y = to_pixel(warp.scale_y * v + warp.offset_y, image_shape.0);
        for j in 0..ow {
            let u = unit_coord(j, ow);
            let x = to_pixel(warp.scale_x * u + warp.offset_x, image_shape.1);
            points.push(SamplePoint { y, x });
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENTITY: WarpBox = WarpBox {
        scale_x: 1.0,
        offset_x: 0.0,
        scale_y: 1.0,
        offset_y: 0.0,
    };

    #[test]
    fn identity_warp_hits_pixel_centres() {
        let grid = warp_grid(IDENTITY, (3, 5), (3, 5));
        assert_eq!(grid.len(), 15);
        assert_eq!(grid[0], SamplePoint { y: 0.0, x: 0.0 });
        assert_eq!(grid[4], SamplePoint { y: 0.0, x: 4.0 });
        assert_eq!(grid[14], SamplePoint { y: 2.0, x: 4.0 });
    }

    #[test]
    fn single_pixel_output_samples_box_centre() {
        let warp = WarpBox {
            scale_x: 0.5,
            offset_x: 0.5,
            scale_y: 0.5,
            offset_y: -0.5,
        };
        let grid = warp_grid(warp, (9, 9), (1, 1));
        // Centre (y, x) = (0.25, 0.75) of the image.
        assert_eq!(grid, vec![SamplePoint { y: 2.0, x: 6.0 }]);
    }

    #[test]
    fn half_scale_covers_central_region() {
        let warp = WarpBox {
            scale_x: 0.5,
            offset_x: 0.0,
            scale_y: 0.5,
            offset_y: 0.0,
        };
        let grid = warp_grid(warp, (5, 5), (2, 2));
        assert_eq!(grid[0], SamplePoint { y: 1.0, x: 1.0 });
        assert_eq!(grid[3], SamplePoint { y: 3.0, x: 3.0 });
    }
}
