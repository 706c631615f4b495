//! The convolutional grid object layer.
//!
//! All four lateral networks are size-preserving convolutions applied
//! to the whole `[batch, H, W, C]` feature map at once, so every cell
//! is built in parallel and cross-cell context comes from the
//! receptive field. Only one slot per cell is supported.

use gridair_core::{
    ConfigError, LatentField, LayerError, NetworkFactory, RandomSource, ShapeError, Tensor,
};
use gridair_glimpse::GlimpseExtractor;
use gridair_latent::{BoxBuilder, DepthBuilder, FieldMap, Prior};
use indexmap::IndexMap;
use tracing::{debug, info};

use crate::bundle::LatentBundle;
use crate::config::{ForwardContext, LayerConfig, StepBuilders};
use crate::state::{
    checked_output, glimpse_and_encode, insert_prop_state, posterior_flag, Geometry,
    LateralNetworks, LateralWidths,
};

struct ConvState {
    geometry: Geometry,
    networks: LateralNetworks,
}

/// Reshape every `[batch, H, W, ...]` field to `[batch, H * W, ...]`.
pub fn flatten(fields: FieldMap) -> Result<FieldMap, ShapeError> {
    fields
        .into_iter()
        .map(|(field, t)| {
            let shape = t.shape();
            if shape.len() < 3 {
                return Err(ShapeError::Rank {
                    op: "flatten",
                    expected: 3,
                    actual: shape.len(),
                });
            }
            let mut flat = vec![shape[0], shape[1] * shape[2]];
            flat.extend_from_slice(&shape[3..]);
            Ok((field, t.reshape(&flat)?))
        })
        .collect()
}

/// Parallel grid object layer over a convolutional receptive field.
pub struct ConvGridObjectLayer {
    config: LayerConfig,
    factory: Box<dyn NetworkFactory>,
    extractor: GlimpseExtractor,
    flatten: bool,
    state: Option<ConvState>,
}

impl ConvGridObjectLayer {
    /// Create a layer. With `flatten` the bundle fields are shaped
    /// `[batch, H * W, ...]` like the sequential layer's; otherwise they
    /// keep `[batch, H, W, ...]`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedSlotCount`] unless
    /// `n_objects_per_cell == 1`, or any error from
    /// [`LayerConfig::validate`].
    pub fn new(
        config: LayerConfig,
        factory: impl NetworkFactory,
        flatten: bool,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if config.n_objects_per_cell != 1 {
            return Err(ConfigError::UnsupportedSlotCount {
                slots: config.n_objects_per_cell,
            });
        }
        let extractor = GlimpseExtractor::new(config.object_shape, config.resampler())?;
        Ok(Self {
            config,
            factory: Box::new(factory),
            extractor,
            flatten,
            state: None,
        })
    }

    /// The layer configuration.
    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    /// Whether bundles are flattened to a cell axis.
    pub fn flattens(&self) -> bool {
        self.flatten
    }

    /// Whether the first forward pass has run.
    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Geometry cached at initialization.
    pub fn geometry(&self) -> Option<Geometry> {
        self.state.as_ref().map(|s| s.geometry)
    }

    /// Names of the network parameter groups. Empty before
    /// initialization.
    pub fn trainable_parameters(&self) -> Vec<String> {
        self.state
            .as_ref()
            .map(|s| s.networks.names().iter().map(|n| n.to_string()).collect())
            .unwrap_or_default()
    }

    /// The independent prior with schedules evaluated at `step`.
    pub fn independent_prior(&self, step: u64) -> Prior {
        self.config.independent_prior(step)
    }

    /// Per-element KL of `bundle` against `prior`, or against the
    /// independent prior at `step` when `prior` is `None`.
    pub fn compute_kl(
        &self,
        bundle: &LatentBundle,
        prior: Option<&Prior>,
        step: u64,
    ) -> Result<IndexMap<&'static str, Tensor>, LayerError> {
        match prior {
            Some(p) => gridair_latent::compute_kl(bundle.fields(), p),
            None => gridair_latent::compute_kl(bundle.fields(), &self.independent_prior(step)),
        }
    }

    fn build_state(
        config: &LayerConfig,
        factory: &dyn NetworkFactory,
        geometry: Geometry,
    ) -> Result<ConvState, LayerError> {
        let widths = LateralWidths {
            base: geometry.channels + 2,
            passthrough: config.n_passthrough_features,
            attr: config.attr_width,
        };
        let glimpse = [config.object_shape.0, config.object_shape.1, geometry.image.2];
        let networks = LateralNetworks::build(factory, widths, Some(geometry.grid), glimpse)?;
        info!(
            rows = geometry.grid.0,
            cols = geometry.grid.1,
            batch = geometry.batch,
            "convolutional grid layer initialized"
        );
        Ok(ConvState { geometry, networks })
    }

    /// Run the layer on `image` `[batch, Hi, Wi, D]` and `features`
    /// `[batch, H, W, C]`.
    ///
    /// # Errors
    ///
    /// Fails on malformed inputs, on a geometry that differs from the
    /// first invocation, or when a network returns the wrong shape.
    pub fn forward(
        &mut self,
        image: &Tensor,
        features: &Tensor,
        ctx: &ForwardContext,
        prop_state: Option<&Tensor>,
        rng: &mut dyn RandomSource,
    ) -> Result<LatentBundle, LayerError> {
        let geometry = Geometry::of(image, features)?;
        let state = match self.state {
            Some(ref state) => {
                state.geometry.check(&geometry)?;
                state
            }
            None => &*self.state.insert(Self::build_state(
                &self.config,
                self.factory.as_ref(),
                geometry,
            )?),
        };
        let config = &self.config;
        let steps = StepBuilders::resolve(config, ctx)?;
        let flatten_output = self.flatten;
        let nets = &state.networks;

        let (h, w) = geometry.grid;
        let batch = geometry.batch;
        debug!(
            variant = "convolutional",
            is_posterior = ctx.is_posterior,
            rows = h,
            cols = w,
            batch,
            "grid layer forward"
        );

        let lead = [batch, h, w];
        let pass = config.n_passthrough_features;
        let a = config.attr_width;

        let flag = posterior_flag(&lead, ctx.posterior_flag());
        let base = Tensor::concat_last(&[features, &flag])?;

        let box_out = checked_output(nets.box_net.as_ref(), &base, BoxBuilder::PARAMS + pass)?;
        let parts = box_out.split_last(&[BoxBuilder::PARAMS, pass])?;
        let boxes = steps.boxes.build(
            &parts[0],
            |r| ((r / w) % h, r % w),
            steps.noise,
            steps.wheels,
            rng,
        )?;

        let warps = boxes.warp_boxes(geometry.image_hw(), config.anchor_box);
        let (glimpse, encoded) = glimpse_and_encode(
            &self.extractor,
            nets.encoder.as_ref(),
            image,
            &warps,
            &lead,
            geometry.image.2,
            ctx.is_posterior,
        )?;

        let attr_in = Tensor::concat_last(&[&base, &parts[1], &encoded, &boxes.local_box])?;
        let attr_out = checked_output(nets.attr_net.as_ref(), &attr_in, 2 * a + pass)?;
        let attr_parts = attr_out.split_last(&[2 * a, pass])?;
        let attr = steps.attr.build(&attr_parts[0], steps.noise, rng)?;

        let z_in = Tensor::concat_last(&[&base, &attr_parts[1], &boxes.local_box, &attr.attr])?;
        let z_out = checked_output(nets.z_net.as_ref(), &z_in, DepthBuilder::PARAMS + pass)?;
        let z_parts = z_out.split_last(&[DepthBuilder::PARAMS, pass])?;
        let depth = DepthBuilder.build(&z_parts[0], steps.noise, steps.wheels, rng)?;

        let obj_in = Tensor::concat_last(&[
            &base,
            &z_parts[1],
            &boxes.local_box,
            &attr.attr,
            &depth.z,
        ])?;
        let obj_logit = checked_output(nets.obj_net.as_ref(), &obj_in, 1)?;
        let presence = steps
            .presence
            .build(&obj_logit, steps.noise, steps.wheels, rng)?;

        let mut fields = FieldMap::with_capacity(LatentField::ALL.len());
        boxes.into_fields(&mut fields)?;
        attr.into_fields(&mut fields);
        fields.insert(LatentField::Glimpse, glimpse);
        depth.into_fields(&mut fields);
        presence.into_fields(&mut fields);

        let mut fields = if flatten_output {
            flatten(fields)?
        } else {
            fields
        };
        if let Some(ps) = prop_state {
            let flat_lead = [batch, h * w];
            let ps_lead: &[usize] = if flatten_output { &flat_lead } else { &lead };
            insert_prop_state(&mut fields, ps, ps_lead)?;
        }
        LatentBundle::seal(fields)
    }
}

impl std::fmt::Debug for ConvGridObjectLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConvGridObjectLayer")
            .field("config", &self.config)
            .field("flatten", &self.flatten)
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}
