//! Layer configuration, validation, and per-invocation switches.
//!
//! [`LayerConfig`] carries every recognized option with a usable
//! default. [`validate()`](LayerConfig::validate) checks structural
//! invariants; layer constructors call it and refuse invalid
//! configurations. Scheduled options are [`Schedule`]s evaluated at
//! [`ForwardContext::step`].

use gridair_core::ConfigError;
use gridair_glimpse::Resampler;
use gridair_latent::{
    independent_prior, AttrBuilder, BoxBuilder, NoiseSwitch, PresenceBuilder, Prior, Schedule,
    TrainingWheels,
};
use gridair_space::CellGeometry;

// ── ForwardContext ─────────────────────────────────────────────────

/// Switches that select behaviour for one forward invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ForwardContext {
    /// Training (`noisy`) or evaluation (`eval_noisy`) noise.
    pub is_training: bool,
    /// Posterior (image available, glimpses extracted) or prior mode.
    pub is_posterior: bool,
    /// Global step at which schedules are evaluated.
    pub step: u64,
}

impl Default for ForwardContext {
    fn default() -> Self {
        Self {
            is_training: true,
            is_posterior: true,
            step: 0,
        }
    }
}

impl ForwardContext {
    /// Evaluation-mode posterior pass at `step`.
    pub fn eval(step: u64) -> Self {
        Self {
            is_training: false,
            is_posterior: true,
            step,
        }
    }

    /// The `[1, 0]` (posterior) or `[0, 1]` (prior) mode flag.
    pub fn posterior_flag(&self) -> [f32; 2] {
        if self.is_posterior {
            [1.0, 0.0]
        } else {
            [0.0, 1.0]
        }
    }
}

// ── LayerConfig ────────────────────────────────────────────────────

/// Configuration shared by the sequential and convolutional grid layers.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerConfig {
    /// Glimpse spatial size `(rows, cols)`. Default: `(14, 14)`.
    pub object_shape: (usize, usize),
    /// Attribute embedding width `A`. Default: 50.
    pub attr_width: usize,
    /// Reference box size in pixels `(height, width)`. Default: `(48, 48)`.
    pub anchor_box: (f32, f32),
    /// Pixel extent of one grid cell. Default: `(12, 12)`.
    pub pixels_per_cell: (f32, f32),
    /// Pixel offset of cell `(0, 0)`. Default: `(0, 0)`.
    pub grid_offset: (f32, f32),
    /// Training-wheels weight, in `[0, 1]`. Default: 0.
    pub training_wheels: Schedule,
    /// Stochastic sampling switches. Default: noisy in both modes.
    pub noise: NoiseSwitch,
    /// Presence odds temperature. Default: 1.
    pub obj_temp: Schedule,
    /// Concrete relaxation temperature. Default: 1.
    pub obj_concrete_temp: Schedule,
    /// Box centre logit prior mean. Default: 0.
    pub yx_prior_mean: Schedule,
    /// Box centre logit prior std. Default: 1.
    pub yx_prior_std: Schedule,
    /// Box size logit prior mean. Default: `ln(0.1 / 0.9)`.
    pub hw_prior_mean: Schedule,
    /// Box size logit prior std. Default: 1.
    pub hw_prior_std: Schedule,
    /// Depth logit prior mean. Default: 0.
    pub z_prior_mean: f32,
    /// Depth logit prior std. Default: 1.
    pub z_prior_std: f32,
    /// Attribute prior mean. Default: 0.
    pub attr_prior_mean: f32,
    /// Attribute prior std. Default: 1.
    pub attr_prior_std: f32,
    /// Lower bound of the box centre offset. Default: -0.5.
    pub min_yx: f32,
    /// Upper bound of the box centre offset. Default: 1.5.
    pub max_yx: f32,
    /// Lower bound of the box size. Default: 0.
    pub min_hw: f32,
    /// Upper bound of the box size. Default: 1.
    pub max_hw: f32,
    /// Slots per cell `B`. Default: 1.
    pub n_objects_per_cell: usize,
    /// Sequential context radius `L`. Default: 1.
    pub n_lookback: usize,
    /// Features each lateral network hands to the next. Default: 100.
    pub n_passthrough_features: usize,
    /// Clamp glimpse samples to the image edge instead of zero padding.
    /// Default: false.
    pub edge_resampler: bool,
    /// Exclude the edge element from gradient updates. Default: false.
    pub fixed_edge: bool,
    /// Seed for the edge element initialization. Default: 0.
    pub seed: u64,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            object_shape: (14, 14),
            attr_width: 50,
            anchor_box: (48.0, 48.0),
            pixels_per_cell: (12.0, 12.0),
            grid_offset: (0.0, 0.0),
            training_wheels: Schedule::Constant(0.0),
            noise: NoiseSwitch::default(),
            obj_temp: Schedule::Constant(1.0),
            obj_concrete_temp: Schedule::Constant(1.0),
            yx_prior_mean: Schedule::Constant(0.0),
            yx_prior_std: Schedule::Constant(1.0),
            hw_prior_mean: Schedule::Constant((0.1f32 / 0.9).ln()),
            hw_prior_std: Schedule::Constant(1.0),
            z_prior_mean: 0.0,
            z_prior_std: 1.0,
            attr_prior_mean: 0.0,
            attr_prior_std: 1.0,
            min_yx: -0.5,
            max_yx: 1.5,
            min_hw: 0.0,
            max_hw: 1.0,
            n_objects_per_cell: 1,
            n_lookback: 1,
            n_passthrough_features: 100,
            edge_resampler: false,
            fixed_edge: false,
            seed: 0,
        }
    }
}

impl LayerConfig {
    /// Check structural invariants.
    ///
    /// # Errors
    ///
    /// Returns `Err` if:
    /// - `min_yx >= max_yx` or `min_hw >= max_hw`
    /// - `object_shape`, `attr_width` or `n_objects_per_cell` is zero
    /// - the anchor box, pixels-per-cell or grid offset is non-finite
    ///   or (except the offset) non-positive
    /// - `training_wheels` can leave `[0, 1]`
    /// - a temperature or prior std can reach zero or below
    /// - any value is NaN or infinite
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.geometry().validate()?;
        BoxBuilder::new((self.min_yx, self.max_yx), (self.min_hw, self.max_hw), self.geometry())?;
        AttrBuilder::new(self.attr_width)?;
        if self.object_shape.0 == 0 || self.object_shape.1 == 0 {
            return Err(ConfigError::ZeroSize {
                name: "object_shape",
            });
        }
        if self.n_objects_per_cell == 0 {
            return Err(ConfigError::ZeroSize {
                name: "n_objects_per_cell",
            });
        }

        self.training_wheels
            .validate_within("training_wheels", 0.0, 1.0)?;
        self.obj_temp.validate_positive("obj_temp")?;
        self.obj_concrete_temp.validate_positive("obj_concrete_temp")?;
        self.yx_prior_mean.validate("yx_prior_mean")?;
        self.yx_prior_std.validate_positive("yx_prior_std")?;
        self.hw_prior_mean.validate("hw_prior_mean")?;
        self.hw_prior_std.validate_positive("hw_prior_std")?;

        for (name, value) in [("z_prior_mean", self.z_prior_mean), ("attr_prior_mean", self.attr_prior_mean)] {
            if !value.is_finite() {
                return Err(ConfigError::InvalidValue {
                    name,
                    reason: format!("must be finite, got {value}"),
                });
            }
        }
        for (name, value) in [("z_prior_std", self.z_prior_std), ("attr_prior_std", self.attr_prior_std)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidValue {
                    name,
                    reason: format!("must be finite and > 0, got {value}"),
                });
            }
        }
        Ok(())
    }

    /// Cell geometry for the coordinate transform.
    pub fn geometry(&self) -> CellGeometry {
        CellGeometry {
            pixels_per_cell: self.pixels_per_cell,
            grid_offset: self.grid_offset,
            anchor_box: self.anchor_box,
        }
    }

    /// Glimpse resampler variant.
    pub fn resampler(&self) -> Resampler {
        Resampler::from_edge_flag(self.edge_resampler)
    }

    /// Width of one program entry: `4 + A + 1 + 1`.
    pub fn entry_width(&self) -> usize {
        4 + self.attr_width + 2
    }

    /// The independent prior with schedules evaluated at `step`.
    pub fn independent_prior(&self, step: u64) -> Prior {
        independent_prior(
            (self.yx_prior_mean.value_at(step), self.yx_prior_std.value_at(step)),
            (self.hw_prior_mean.value_at(step), self.hw_prior_std.value_at(step)),
            (self.z_prior_mean, self.z_prior_std),
            (self.attr_prior_mean, self.attr_prior_std),
        )
    }
}

// ── StepBuilders ───────────────────────────────────────────────────

/// Latent builders and blend weights resolved for one invocation.
#[derive(Clone, Copy, Debug)]
pub(crate) struct StepBuilders {
    pub boxes: BoxBuilder,
    pub attr: AttrBuilder,
    pub presence: PresenceBuilder,
    pub wheels: TrainingWheels,
    pub noise: f32,
}

impl StepBuilders {
    pub(crate) fn resolve(config: &LayerConfig, ctx: &ForwardContext) -> Result<Self, ConfigError> {
        Ok(Self {
            boxes: BoxBuilder::new(
                (config.min_yx, config.max_yx),
                (config.min_hw, config.max_hw),
                config.geometry(),
            )?,
            attr: AttrBuilder::new(config.attr_width)?,
            presence: PresenceBuilder::new(
                config.obj_temp.value_at(ctx.step),
                config.obj_concrete_temp.value_at(ctx.step),
            )?,
            wheels: TrainingWheels::new(config.training_wheels.value_at(ctx.step))?,
            noise: config.noise.level(ctx.is_training),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_config_is_valid() {
        assert!(LayerConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_inverted_yx_range() {
        let cfg = LayerConfig {
            min_yx: 1.0,
            max_yx: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidRange { name: "yx", .. })
        ));
    }

    #[test]
    fn rejects_equal_hw_bounds() {
        let cfg = LayerConfig {
            min_hw: 0.5,
            max_hw: 0.5,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidRange { name: "hw", .. })
        ));
    }

    #[test]
    fn rejects_zero_sizes() {
        let cfg = LayerConfig {
            n_objects_per_cell: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroSize { .. })));
        let cfg = LayerConfig {
            attr_width: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroSize { name: "A" })));
        let cfg = LayerConfig {
            object_shape: (4, 0),
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ZeroSize { name: "object_shape" })
        ));
    }

    #[test]
    fn rejects_bad_schedules() {
        let cfg = LayerConfig {
            training_wheels: Schedule::Linear {
                start: 2.0,
                end: 0.0,
                steps: 100,
            },
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
        let cfg = LayerConfig {
            obj_temp: Schedule::Constant(0.0),
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue { name: "obj_temp", .. })
        ));
    }

    #[test]
    fn rejects_non_positive_anchor() {
        let cfg = LayerConfig {
            anchor_box: (-1.0, 48.0),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn entry_width_counts_box_attr_depth_presence() {
        let cfg = LayerConfig {
            attr_width: 8,
            ..Default::default()
        };
        assert_eq!(cfg.entry_width(), 14);
    }

    #[test]
    fn prior_follows_schedule() {
        let cfg = LayerConfig {
            hw_prior_mean: Schedule::Linear {
                start: 0.0,
                end: -2.0,
                steps: 10,
            },
            ..Default::default()
        };
        let prior = cfg.independent_prior(10);
        assert_eq!(
            prior.get(gridair_core::LatentField::WidthLogitMean),
            Some(&gridair_latent::PriorParam::Scalar(-2.0))
        );
    }

    #[test]
    fn posterior_flag_is_one_hot() {
        assert_eq!(ForwardContext::default().posterior_flag(), [1.0, 0.0]);
        let prior = ForwardContext {
            is_posterior: false,
            ..Default::default()
        };
        assert_eq!(prior.posterior_flag(), [0.0, 1.0]);
    }

    #[test]
    fn step_builders_resolve_noise_from_mode() {
        let cfg = LayerConfig {
            noise: NoiseSwitch {
                noisy: true,
                eval_noisy: false,
            },
            ..Default::default()
        };
        let train = StepBuilders::resolve(&cfg, &ForwardContext::default()).unwrap();
        let eval = StepBuilders::resolve(&cfg, &ForwardContext::eval(0)).unwrap();
        assert_eq!(train.noise, 1.0);
        assert_eq!(eval.noise, 0.0);
    }

    proptest! {
        #[test]
        fn yx_range_validity_follows_ordering(lo in -5.0f32..5.0, hi in -5.0f32..5.0) {
            let cfg = LayerConfig {
                min_yx: lo,
                max_yx: hi,
                ..Default::default()
            };
            prop_assert_eq!(cfg.validate().is_ok(), lo < hi);
        }
    }
}
