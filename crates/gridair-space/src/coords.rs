//! Coordinate transforms between the box frames used by the layer.
//!
//! Four frames appear:
//!
//! - [`LocalBox`]: centre offset within a cell, in cell units, plus
//!   size relative to the anchor box. This is what the box builder samples.
//! - [`NormalizedBox`]: centre and size divided by the anchor box, with
//!   the centre measured from the image top-left.
//! - [`ImageBox`]: centre (or top-left corner) and size as fractions of
//!   the image, `(0, 0)` top-left and `(1, 1)` bottom-right.
//! - [`WarpBox`]: the `[-1, 1]` no-shear affine parameters consumed by
//!   the glimpse warper.
//!
//! All transforms are pure and elementwise.

use gridair_core::ConfigError;

/// Cell-local box parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalBox {
    /// Centre row offset within the cell.
    pub cell_y: f32,
    /// Centre column offset within the cell.
    pub cell_x: f32,
    /// Height as a multiple of the anchor height.
    pub height: f32,
    /// Width as a multiple of the anchor width.
    pub width: f32,
}

/// Box normalized to the anchor box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizedBox {
    /// Centre row / anchor height.
    pub yt: f32,
    /// Centre column / anchor width.
    pub xt: f32,
    /// Height / anchor height.
    pub ys: f32,
    /// Width / anchor width.
    pub xs: f32,
}

/// Box in image-fraction coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageBox {
    /// Row of the centre, or of the top edge for top-left boxes.
    pub y: f32,
    /// Column of the centre, or of the left edge for top-left boxes.
    pub x: f32,
    /// Height as a fraction of the image height.
    pub h: f32,
    /// Width as a fraction of the image width.
    pub w: f32,
}

/// No-shear affine warp parameters in the `[-1, 1]` convention.
///
/// A glimpse sample at output position `u` in `[-1, 1]` reads the source
/// at `scale * u + offset`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WarpBox {
    /// Horizontal scale.
    pub scale_x: f32,
    /// Horizontal offset.
    pub offset_x: f32,
    /// Vertical scale.
    pub scale_y: f32,
    /// Vertical offset.
    pub offset_y: f32,
}

/// Pixel geometry tying grid cells to image coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellGeometry {
    /// Pixel extent of one cell, `(rows, cols)`.
    pub pixels_per_cell: (f32, f32),
    /// Pixel offset of cell `(0, 0)` from the image origin.
    pub grid_offset: (f32, f32),
    /// Reference box size in pixels, `(height, width)`.
    pub anchor_box: (f32, f32),
}

impl CellGeometry {
    /// Validate that every extent is finite and strictly positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("pixels_per_cell", self.pixels_per_cell.0),
            ("pixels_per_cell", self.pixels_per_cell.1),
            ("anchor_box", self.anchor_box.0),
            ("anchor_box", self.anchor_box.1),
        ];
        for (name, v) in positive {
            if !v.is_finite() || v <= 0.0 {
                return Err(ConfigError::InvalidValue {
                    name,
                    reason: format!("must be finite and > 0, got {v}"),
                });
            }
        }
        for v in [self.grid_offset.0, self.grid_offset.1] {
            if !v.is_finite() {
                return Err(ConfigError::InvalidValue {
                    name: "grid_offset",
                    reason: format!("must be finite, got {v}"),
                });
            }
        }
        Ok(())
    }

    /// Anchor-normalized centre row of a cell-local offset at row `h`.
    #[inline]
    pub fn normalize_y(&self, cell_y: f32, h: f32) -> f32 {
        (self.pixels_per_cell.0 * (cell_y + h) + self.grid_offset.0) / self.anchor_box.0
    }

    /// Anchor-normalized centre column of a cell-local offset at column `w`.
    #[inline]
    pub fn normalize_x(&self, cell_x: f32, w: f32) -> f32 {
        (self.pixels_per_cell.1 * (cell_x + w) + self.grid_offset.1) / self.anchor_box.1
    }

    /// Map a cell-local box at cell `(h, w)` to anchor-normalized form.
    pub fn normalize(&self, local: LocalBox, h: usize, w: usize) -> NormalizedBox {
        NormalizedBox {
            yt: self.normalize_y(local.cell_y, h as f32),
            xt: self.normalize_x(local.cell_x, w as f32),
            ys: local.height,
            xs: local.width,
        }
    }

    /// Inverse of [`normalize`](Self::normalize).
    pub fn localize(&self, boxed: NormalizedBox, h: usize, w: usize) -> LocalBox {
        LocalBox {
            cell_y: (boxed.yt * self.anchor_box.0 - self.grid_offset.0) / self.pixels_per_cell.0
                - h as f32,
            cell_x: (boxed.xt * self.anchor_box.1 - self.grid_offset.1) / self.pixels_per_cell.1
                - w as f32,
            height: boxed.ys,
            width: boxed.xs,
        }
    }
}

/// Convert an anchor-normalized box to image fractions.
///
/// `image_shape` is `(height, width)` in pixels. With `top_left` the
/// returned position is the box's top-left corner, otherwise its centre.
pub fn coords_to_image_space(
    boxed: NormalizedBox,
    image_shape: (usize, usize),
    anchor_box: (f32, f32),
    top_left: bool,
) -> ImageBox {
    let ry = anchor_box.0 / image_shape.0 as f32;
    let rx = anchor_box.1 / image_shape.1 as f32;
    let h = boxed.ys * ry;
    let w = boxed.xs * rx;
    let mut y = boxed.yt * ry;
    let mut x = boxed.xt * rx;
    if top_left {
        y -= h / 2.0;
        x -= w / 2.0;
    }
    ImageBox { y, x, h, w }
}

impl ImageBox {
    /// Inverse of [`coords_to_image_space`].
    pub fn to_normalized(
        self,
        image_shape: (usize, usize),
        anchor_box: (f32, f32),
        top_left: bool,
    ) -> NormalizedBox {
        let ry = anchor_box.0 / image_shape.0 as f32;
        let rx = anchor_box.1 / image_shape.1 as f32;
        let (mut y, mut x) = (self.y, self.x);
        if top_left {
            y += self.h / 2.0;
            x += self.w / 2.0;
        }
        NormalizedBox {
            yt: y / ry,
            xt: x / rx,
            ys: self.h / ry,
            xs: self.w / rx,
        }
    }

    /// Warp parameters for a centre-convention box: scale by the box
    /// size, recentre by `2 * c - 1`.
    pub fn to_warp(self) -> WarpBox {
        WarpBox {
            scale_x: self.w,
            offset_x: 2.0 * self.x - 1.0,
            scale_y: self.h,
            offset_y: 2.0 * self.y - 1.0,
        }
    }
}

impl WarpBox {
    /// Inverse of [`ImageBox::to_warp`].
    pub fn to_image(self) -> ImageBox {
        ImageBox {
            y: (self.offset_y + 1.0) / 2.0,
            x: (self.offset_x + 1.0) / 2.0,
            h: self.scale_y,
            w: self.scale_x,
        }
    }
}
