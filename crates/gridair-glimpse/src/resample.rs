//! Bilinear resampling of `[H, W, D]` images.

use crate::warp::SamplePoint;

/// How samples falling outside the source image are treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Resampler {
    /// Out-of-image taps read zero.
    #[default]
    ZeroPadded,
    /// Out-of-image taps read the nearest edge pixel.
    Edge,
}

impl Resampler {
    /// `true` selects [`Resampler::Edge`].
    pub fn from_edge_flag(edge: bool) -> Self {
        if edge {
            Self::Edge
        } else {
            Self::ZeroPadded
        }
    }
}

/// Bilinearly sample one `[rows, cols, depth]` image at `point`, writing
/// `depth` channels into `out`.
///
/// `image` is row-major with channels innermost.
pub fn bilinear_sample(
    image: &[f32],
    (rows, cols, depth): (usize, usize, usize),
    point: SamplePoint,
    resampler: Resampler,
    out: &mut [f32],
) {
    out[..depth].fill(0.0);
    if rows == 0 || cols == 0 {
        return;
    }
    let (y, x) = match resampler {
        Resampler::ZeroPadded => (point.y, point.x),
        Resampler::Edge => (
            point.y.clamp(0.0, (rows - 1) as f32),
            point.x.clamp(0.0, (cols - 1) as f32),
        ),
    };
    if !y.is_finite() || !x.is_finite() {
        return;
    }

    let y0 = y.floor();
    let x0 = x.floor();
    let fy = y - y0;
    let fx = x - x0;
    let taps = [
        (y0, x0, (1.0 - fy) * (1.0 - fx)),
        (y0, x0 + 1.0, (1.0 - fy) * fx),
        (y0 + 1.0, x0, fy * (1.0 - fx)),
        (y0 + 1.0, x0 + 1.0, fy * fx),
    ];
    for (ty, tx, weight) in taps {
        if weight == 0.0 {
            continue;
        }
        let (ty, tx) = match resampler {
            Resampler::ZeroPadded => {
                if ty < 0.0 || tx < 0.0 || ty >= rows as f32 || tx >= cols as f32 {
                    continue;
                }
                (ty as usize, tx as usize)
            }
            Resampler::Edge => (
                (ty.max(0.0) as usize).min(rows - 1),
                (tx.max(0.0) as usize).min(cols - 1),
            ),
        };
        let base = (ty * cols + tx) * depth;
        for (o, &v) in out[..depth].iter_mut().zip(&image[base..base + depth]) {
            *o += weight * v;
        }
    }
}
