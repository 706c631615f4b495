//! Box latent: where an object is and how large it is.

use crate::noise::std_nonlinearity;
use crate::wheels::TrainingWheels;
use crate::{sample_normal, FieldMap};
use gridair_core::{sigmoid, ConfigError, LatentField, RandomSource, ShapeError, Tensor};
use gridair_space::{coords_to_image_space, CellGeometry, NormalizedBox, WarpBox};

/// Samples cell-local boxes from 4 (mean, std-logit) pairs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxBuilder {
    yx_range: (f32, f32),
    hw_range: (f32, f32),
    geometry: CellGeometry,
}

/// Everything the box builder produces. Every tensor has shape
/// `[..leading, 1]` except `local_box` and `normalized_box`
/// (`[..leading, 4]`).
#[derive(Clone, Debug, PartialEq)]
pub struct BoxLatent {
    /// Centre row offset within the cell, in `[min_yx, max_yx]`.
    pub cell_y: Tensor,
    /// Centre column offset within the cell, in `[min_yx, max_yx]`.
    pub cell_x: Tensor,
    /// Height relative to the anchor, in `[min_hw, max_hw]`.
    pub height: Tensor,
    /// Width relative to the anchor, in `[min_hw, max_hw]`.
    pub width: Tensor,
    /// `[cell_y, cell_x, height, width]`.
    pub local_box: Tensor,
    /// Mean of the four logits, `[..leading, 4]` split into fields on export.
    pub logit_mean: Tensor,
    /// Std of the four logits.
    pub logit_std: Tensor,
    /// Anchor-normalized centre row.
    pub yt: Tensor,
    /// Anchor-normalized centre column.
    pub xt: Tensor,
    /// `[yt, xt, ys, xs]` where `ys = height` and `xs = width`.
    pub normalized_box: Tensor,
    /// Sampled height logit.
    pub ys_logit: Tensor,
    /// Sampled width logit.
    pub xs_logit: Tensor,
}

impl BoxBuilder {
    /// Network outputs consumed: four means then four std logits.
    pub const PARAMS: usize = 8;

    /// Create a builder. Both ranges must satisfy `min < max`.
    pub fn new(
        yx_range: (f32, f32),
        hw_range: (f32, f32),
        geometry: CellGeometry,
    ) -> Result<Self, ConfigError> {
        for (name, (min, max)) in [("yx", yx_range), ("hw", hw_range)] {
            if !(min < max) || !min.is_finite() || !max.is_finite() {
                return Err(ConfigError::InvalidRange { name, min, max });
            }
        }
        geometry.validate()?;
        Ok(Self {
            yx_range,
            hw_range,
            geometry,
        })
    }

    /// Cell geometry used for normalization.
    pub fn geometry(&self) -> &CellGeometry {
        &self.geometry
    }

    /// Sample boxes from `params` of shape `[..leading, 8]`.
    ///
    /// `cell_of_row(r)` gives the grid `(h, w)` of flattened leading
    /// index `r`.
    pub fn build(
        &self,
        params: &Tensor,
        cell_of_row: impl Fn(usize) -> (usize, usize),
        noise: f32,
        wheels: TrainingWheels,
        rng: &mut dyn RandomSource,
    ) -> Result<BoxLatent, ShapeError> {
        let parts = params.split_last(&[4, 4])?;
        let mean = wheels.blend(&parts[0]);
        let std = wheels.blend(&parts[1].map(|x| std_nonlinearity(x, noise)));
        let logits = sample_normal(&mean, &std, rng)?;

        let l = logits.split_last(&[1, 1, 1, 1])?;
        let (yx_min, yx_max) = self.yx_range;
        let (hw_min, hw_max) = self.hw_range;
        let cell_y = l[0].map(|v| (yx_max - yx_min) * sigmoid(v) + yx_min);
        let cell_x = l[1].map(|v| (yx_max - yx_min) * sigmoid(v) + yx_min);
        let height = l[2].map(|v| (hw_max - hw_min) * sigmoid(v) + hw_min);
        let width = l[3].map(|v| (hw_max - hw_min) * sigmoid(v) + hw_min);

        let yt = Tensor::from_fn(cell_y.shape(), |r| {
            self.geometry
                .normalize_y(cell_y.data()[r], cell_of_row(r).0 as f32)
        });
        let xt = Tensor::from_fn(cell_x.shape(), |r| {
            self.geometry
                .normalize_x(cell_x.data()[r], cell_of_row(r).1 as f32)
        });

        let local_box = Tensor::concat_last(&[&cell_y, &cell_x, &height, &width])?;
        let normalized_box = Tensor::concat_last(&[&yt, &xt, &height, &width])?;
        let [_, _, ys_logit, xs_logit]: [Tensor; 4] =
            l.try_into().map_err(|_| ShapeError::Empty { op: "build_box" })?;

        Ok(BoxLatent {
            cell_y,
            cell_x,
            height,
            width,
            local_box,
            logit_mean: mean,
            logit_std: std,
            yt,
            xt,
            normalized_box,
            ys_logit,
            xs_logit,
        })
    }
}

impl BoxLatent {
    /// Number of flattened boxes.
    pub fn len(&self) -> usize {
        self.cell_y.len()
    }

    /// Whether there are no boxes.
    pub fn is_empty(&self) -> bool {
        self.cell_y.is_empty()
    }

    /// Anchor-normalized box `r`.
    pub fn normalized(&self, r: usize) -> NormalizedBox {
        let b = &self.normalized_box.data()[4 * r..4 * r + 4];
        NormalizedBox {
            yt: b[0],
            xt: b[1],
            ys: b[2],
            xs: b[3],
        }
    }

    /// Glimpse warp parameters for every box, in flattened order.
    pub fn warp_boxes(&self, image_shape: (usize, usize), anchor_box: (f32, f32)) -> Vec<WarpBox> {
        (0..self.len())
            .map(|r| coords_to_image_space(self.normalized(r), image_shape, anchor_box, false).to_warp())
            .collect()
    }

    /// Export into `out` under the latent field names.
    pub fn into_fields(self, out: &mut FieldMap) -> Result<(), ShapeError> {
        let means = self.logit_mean.split_last(&[1, 1, 1, 1])?;
        let stds = self.logit_std.split_last(&[1, 1, 1, 1])?;
        out.insert(LatentField::CellY, self.cell_y);
        out.insert(LatentField::CellX, self.cell_x);
        out.insert(LatentField::Height, self.height.clone());
        out.insert(LatentField::Width, self.width.clone());
        out.insert(LatentField::LocalBox, self.local_box);
        let mean_fields = [
            LatentField::CellYLogitMean,
            LatentField::CellXLogitMean,
            LatentField::HeightLogitMean,
            LatentField::WidthLogitMean,
        ];
        let std_fields = [
            LatentField::CellYLogitStd,
            LatentField::CellXLogitStd,
            LatentField::HeightLogitStd,
            LatentField::WidthLogitStd,
        ];
        for (field, t) in mean_fields.into_iter().zip(means) {
            out.insert(field, t);
        }
        for (field, t) in std_fields.into_iter().zip(stds) {
            out.insert(field, t);
        }
        out.insert(LatentField::Yt, self.yt);
        out.insert(LatentField::Xt, self.xt);
        out.insert(LatentField::Ys, self.height);
        out.insert(LatentField::Xs, self.width);
        out.insert(LatentField::NormalizedBox, self.normalized_box);
        out.insert(LatentField::YsLogit, self.ys_logit);
        out.insert(LatentField::XsLogit, self.xs_logit);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridair_test_utils::FixedRandom;
    use proptest::prelude::*;

    fn geometry() -> CellGeometry {
        CellGeometry {
            pixels_per_cell: (12.0, 12.0),
            grid_offset: (0.0, 0.0),
            anchor_box: (48.0, 48.0),
        }
    }

    fn builder() -> BoxBuilder {
        BoxBuilder::new((-0.5, 1.5), (0.0, 1.0), geometry()).unwrap()
    }

    #[test]
    fn rejects_inverted_ranges() {
        assert!(matches!(
            BoxBuilder::new((1.0, 0.0), (0.0, 1.0), geometry()),
            Err(ConfigError::InvalidRange { name: "yx", .. })
        ));
        assert!(matches!(
            BoxBuilder::new((0.0, 1.0), (0.5, 0.5), geometry()),
            Err(ConfigError::InvalidRange { name: "hw", .. })
        ));
    }

    #[test]
    fn zero_params_give_range_midpoints() {
        let params = Tensor::zeros(&[2, 8]);
        let mut rng = FixedRandom::new(0.5, 1.0);
        let b = builder()
            .build(&params, |_| (1, 2), 1.0, TrainingWheels::OFF, &mut rng)
            .unwrap();
        // std = 2 * sigmoid(0) = 1 and the normal draw is 1, so logit = 1.
        let expected_y = 2.0 * gridair_core::sigmoid(1.0) - 0.5;
        assert!((b.cell_y.data()[0] - expected_y).abs() < 1e-6);
        assert_eq!(b.local_box.shape(), &[2, 4]);
        assert_eq!(b.logit_std.data()[0], 1.0);
        let yt = (12.0 * (expected_y + 1.0)) / 48.0;
        assert!((b.yt.data()[1] - yt).abs() < 1e-6);
    }

    #[test]
    fn without_noise_logits_equal_means() {
        let params = Tensor::from_vec(&[1, 8], vec![0.3, -0.2, 1.0, -1.0, 5.0, 5.0, 5.0, 5.0]).unwrap();
        let mut rng = FixedRandom::new(0.5, 3.0);
        let b = builder()
            .build(&params, |_| (0, 0), 0.0, TrainingWheels::OFF, &mut rng)
            .unwrap();
        assert_eq!(b.ys_logit.data(), &[1.0]);
        assert_eq!(b.xs_logit.data(), &[-1.0]);
        assert!(b.logit_std.data().iter().all(|s| *s == 0.0));
    }

    #[test]
    fn fields_export_every_box_name() {
        let mut rng = FixedRandom::centred();
        let b = builder()
            .build(&Tensor::zeros(&[3, 8]), |_| (0, 0), 1.0, TrainingWheels::OFF, &mut rng)
            .unwrap();
        let mut out = FieldMap::new();
        b.into_fields(&mut out).unwrap();
        assert_eq!(out.len(), 20);
        assert_eq!(out[&LatentField::Ys], out[&LatentField::Height]);
        assert_eq!(out[&LatentField::WidthLogitStd].shape(), &[3, 1]);
    }

    #[test]
    fn wrong_param_width_is_rejected() {
        let mut rng = FixedRandom::centred();
        assert!(builder()
            .build(&Tensor::zeros(&[1, 7]), |_| (0, 0), 1.0, TrainingWheels::OFF, &mut rng)
            .is_err());
    }

    proptest! {
        #[test]
        fn samples_stay_in_configured_ranges(
            params in proptest::collection::vec(-1e4f32..1e4, 8),
            normal in -50.0f32..50.0,
        ) {
            let t = Tensor::from_vec(&[1, 8], params).unwrap();
            let mut rng = FixedRandom::new(0.5, normal);
            let b = builder().build(&t, |_| (0, 0), 1.0, TrainingWheels::OFF, &mut rng).unwrap();
            for v in b.cell_y.data().iter().chain(b.cell_x.data()) {
                prop_assert!((-0.5..=1.5).contains(v));
            }
            for v in b.height.data().iter().chain(b.width.data()) {
                prop_assert!((0.0..=1.0).contains(v));
            }
        }
    }
}
