//! The sequential (autoregressive) grid object layer.
//!
//! Cell-slots are visited in canonical `(h, w, b)` order. Each one reads
//! the entries its causal neighbours already wrote to a
//! [`ProgramArena`], runs the box, attribute, depth and presence
//! builders, and writes its own entry back. Networks, the edge element
//! and the context plan are built on the first forward pass and reused
//! afterwards.

use gridair_arena::ProgramArena;
use gridair_core::{
    ConfigError, LatentField, LayerError, NetworkFactory, RandomSource, ShapeError, Tensor,
};
use gridair_glimpse::GlimpseExtractor;
use gridair_latent::{BoxBuilder, DepthBuilder, FieldMap, Prior};
use gridair_space::{CellSlot, ContextPlan, GridShape};
use indexmap::IndexMap;
use tracing::{debug, info, trace};

use crate::bundle::LatentBundle;
use crate::config::{ForwardContext, LayerConfig, StepBuilders};
use crate::edge::EdgeElement;
use crate::state::{
    checked_output, glimpse_and_encode, insert_prop_state, posterior_flag, Geometry,
    LateralNetworks, LateralWidths,
};

/// Everything built on the first forward pass.
struct SequentialState {
    geometry: Geometry,
    grid: GridShape,
    plan: ContextPlan,
    edge: EdgeElement,
    networks: LateralNetworks,
}

impl SequentialState {
    fn build(
        config: &LayerConfig,
        factory: &dyn NetworkFactory,
        geometry: Geometry,
    ) -> Result<Self, LayerError> {
        let grid = GridShape::new(geometry.grid.0, geometry.grid.1, config.n_objects_per_cell)?;
        let plan = ContextPlan::compile(grid, config.n_lookback);
        let edge = EdgeElement::init(config.attr_width, config.fixed_edge, config.seed);
        let widths = LateralWidths {
            base: geometry.channels + plan.context_size() * config.entry_width() + 2,
            passthrough: config.n_passthrough_features,
            attr: config.attr_width,
        };
        let glimpse = [config.object_shape.0, config.object_shape.1, geometry.image.2];
        let networks = LateralNetworks::build(factory, widths, None, glimpse)?;
        info!(
            rows = grid.rows(),
            cols = grid.cols(),
            slots = grid.slots(),
            batch = geometry.batch,
            context_size = plan.context_size(),
            entry_width = config.entry_width(),
            "sequential grid layer initialized"
        );
        Ok(Self {
            geometry,
            grid,
            plan,
            edge,
            networks,
        })
    }

    /// Build one cell-slot and return its entry and latent fields.
    #[allow(clippy::too_many_arguments)]
    fn build_slot(
        &self,
        config: &LayerConfig,
        extractor: &GlimpseExtractor,
        steps: &StepBuilders,
        arena: &ProgramArena,
        edge: &Tensor,
        image: &Tensor,
        cell_features: &Tensor,
        flag: &Tensor,
        slot: CellSlot,
        is_posterior: bool,
        rng: &mut dyn RandomSource,
    ) -> Result<(Tensor, FieldMap), LayerError> {
        let batch = self.geometry.batch;
        let pass = config.n_passthrough_features;
        let a = config.attr_width;
        let nets = &self.networks;

        let context = arena.resolve(&self.plan, slot, edge)?;
        let base = Tensor::concat_last(&[cell_features, &context, flag])?;

        let box_out = checked_output(nets.box_net.as_ref(), &base, BoxBuilder::PARAMS + pass)?;
        let [box_params, pass_box]: [Tensor; 2] = split_pair(&box_out, BoxBuilder::PARAMS, pass)?;
        let (h, w) = (slot.h, slot.w);
        let boxes = steps
            .boxes
            .build(&box_params, |_| (h, w), steps.noise, steps.wheels, rng)?;

        let warps = boxes.warp_boxes(self.geometry.image_hw(), config.anchor_box);
        let (glimpse, encoded) = glimpse_and_encode(
            extractor,
            nets.encoder.as_ref(),
            image,
            &warps,
            &[batch],
            self.geometry.image.2,
            is_posterior,
        )?;

        let attr_in = Tensor::concat_last(&[&base, &pass_box, &encoded, &boxes.local_box])?;
        let attr_out = checked_output(nets.attr_net.as_ref(), &attr_in, 2 * a + pass)?;
        let [attr_params, pass_attr] = split_pair(&attr_out, 2 * a, pass)?;
        let attr = steps.attr.build(&attr_params, steps.noise, rng)?;

        let z_in = Tensor::concat_last(&[&base, &pass_attr, &boxes.local_box, &attr.attr])?;
        let z_out = checked_output(nets.z_net.as_ref(), &z_in, DepthBuilder::PARAMS + pass)?;
        let [z_params, pass_z] = split_pair(&z_out, DepthBuilder::PARAMS, pass)?;
        let depth = DepthBuilder.build(&z_params, steps.noise, steps.wheels, rng)?;

        let obj_in =
            Tensor::concat_last(&[&base, &pass_z, &boxes.local_box, &attr.attr, &depth.z])?;
        let obj_logit = checked_output(nets.obj_net.as_ref(), &obj_in, 1)?;
        let presence = steps
            .presence
            .build(&obj_logit, steps.noise, steps.wheels, rng)?;

        let entry =
            Tensor::concat_last(&[&boxes.local_box, &attr.attr, &depth.z, &presence.obj])?;

        let mut fields = FieldMap::with_capacity(LatentField::ALL.len());
        boxes.into_fields(&mut fields)?;
        attr.into_fields(&mut fields);
        fields.insert(LatentField::Glimpse, glimpse);
        depth.into_fields(&mut fields);
        presence.into_fields(&mut fields);
        Ok((entry, fields))
    }
}

fn split_pair(t: &Tensor, first: usize, second: usize) -> Result<[Tensor; 2], ShapeError> {
    t.split_last(&[first, second])?
        .try_into()
        .map_err(|_| ShapeError::InvalidSplit {
            sizes: vec![first, second],
            axis_len: t.last_dim(),
        })
}

/// Stack per-cell-slot field maps along a new axis 1.
fn stack_fields(per_slot: Vec<FieldMap>) -> Result<FieldMap, ShapeError> {
    let mut columns: IndexMap<LatentField, Vec<Tensor>> = IndexMap::new();
    for fields in per_slot {
        for (field, t) in fields {
            columns.entry(field).or_default().push(t);
        }
    }
    columns
        .into_iter()
        .map(|(field, parts)| Ok((field, Tensor::stack(&parts, 1)?)))
        .collect()
}

/// Autoregressive grid object layer.
///
/// Produces one latent bundle entry per cell-slot, with every field
/// shaped `[batch, H * W * B, ...]` in canonical order.
pub struct GridObjectLayer {
    config: LayerConfig,
    factory: Box<dyn NetworkFactory>,
    extractor: GlimpseExtractor,
    state: Option<SequentialState>,
}

impl GridObjectLayer {
    /// Create a layer. Networks are requested from `factory` on the
    /// first forward pass.
    ///
    /// # Errors
    ///
    /// Returns the first violation reported by
    /// [`LayerConfig::validate`].
    pub fn new(config: LayerConfig, factory: impl NetworkFactory) -> Result<Self, ConfigError> {
        config.validate()?;
        let extractor = GlimpseExtractor::new(config.object_shape, config.resampler())?;
        Ok(Self {
            config,
            factory: Box::new(factory),
            extractor,
            state: None,
        })
    }

    /// The layer configuration.
    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    /// Whether the first forward pass has run.
    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Geometry cached at initialization.
    pub fn geometry(&self) -> Option<Geometry> {
        self.state.as_ref().map(|s| s.geometry)
    }

    /// The edge element, once initialized.
    pub fn edge_element(&self) -> Option<&EdgeElement> {
        self.state.as_ref().map(|s| &s.edge)
    }

    /// Names of the parameter groups an external trainer should update.
    ///
    /// Empty before initialization. The edge weights are omitted when
    /// `fixed_edge` is set.
    pub fn trainable_parameters(&self) -> Vec<String> {
        let Some(state) = &self.state else {
            return Vec::new();
        };
        let mut names: Vec<String> = state.networks.names().iter().map(|n| n.to_string()).collect();
        if !state.edge.is_fixed() {
            names.push("edge_weights".to_string());
        }
        names
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

    /// Run the layer.
    ///
    /// `image` is `[batch, Hi, Wi, D]` and `features` `[batch, H, W, C]`.
    /// `prop_state`, if given, is `[rows, D']` (or `[D']`); its first row
    /// is broadcast to every cell-slot.
    ///
    /// # Errors
    ///
    /// Fails on malformed inputs, on a geometry that differs from the
    /// first invocation, or when a network returns the wrong width.
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
            None => &*self
                .state
                .insert(SequentialState::build(&self.config, self.factory.as_ref(), geometry)?),
        };
        debug!(
            variant = "sequential",
            is_posterior = ctx.is_posterior,
            rows = state.grid.rows(),
            cols = state.grid.cols(),
            slots = state.grid.slots(),
            batch = geometry.batch,
            "grid layer forward"
        );

        let steps = StepBuilders::resolve(&self.config, ctx)?;
        let batch = geometry.batch;
        let mut arena = ProgramArena::new(state.grid, batch, self.config.entry_width());
        let edge = state.edge.tiled(batch);
        let flag = posterior_flag(&[batch], ctx.posterior_flag());

        let mut per_slot = Vec::with_capacity(state.grid.cell_slot_count());
        let mut cell_features = None;
        for slot in state.grid.canonical_ordering() {
            trace!(h = slot.h, w = slot.w, b = slot.b, "building cell-slot");
            if slot.b == 0 {
                cell_features = Some(features.select(1, slot.h)?.select(1, slot.w)?);
            }
            let cell = cell_features
                .as_ref()
                .ok_or(ShapeError::Empty { op: "cell features" })?;
            let (entry, fields) = state.build_slot(
                &self.config,
                &self.extractor,
                &steps,
                &arena,
                &edge,
                image,
                cell,
                &flag,
                slot,
                ctx.is_posterior,
                rng,
            )?;
            arena.write(slot, &entry)?;
            per_slot.push(fields);
        }

        let mut fields = stack_fields(per_slot)?;
        if let Some(ps) = prop_state {
            insert_prop_state(&mut fields, ps, &[batch, state.grid.cell_slot_count()])?;
        }
        LatentBundle::seal(fields)
    }
}

impl std::fmt::Debug for GridObjectLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridObjectLayer")
            .field("config", &self.config)
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridair_test_utils::{ConstFactory, FixedRandom};

    fn small_config() -> LayerConfig {
        LayerConfig {
            object_shape: (3, 3),
            attr_width: 2,
            n_passthrough_features: 3,
            ..Default::default()
        }
    }

    #[test]
    fn stack_fields_adds_slot_axis() {
        let mut a = FieldMap::new();
        a.insert(LatentField::Obj, Tensor::full(&[2, 1], 0.0));
        let mut b = FieldMap::new();
        b.insert(LatentField::Obj, Tensor::full(&[2, 1], 1.0));
        let out = stack_fields(vec![a, b]).unwrap();
        let obj = &out[&LatentField::Obj];
        assert_eq!(obj.shape(), &[2, 2, 1]);
        assert_eq!(obj.data(), &[0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn context_width_feeds_box_network_input() {
        let mut layer = GridObjectLayer::new(small_config(), ConstFactory::zeros()).unwrap();
        let image = Tensor::zeros(&[1, 24, 24, 3]);
        let features = Tensor::zeros(&[1, 2, 2, 5]);
        layer
            .forward(&image, &features, &ForwardContext::default(), None, &mut FixedRandom::centred())
            .unwrap();
        let state = layer.state.as_ref().unwrap();
        // 5 features + 4 context entries of width 8 + 2 flag columns
        assert_eq!(state.networks.box_net.spec().input_shape, vec![5 + 4 * 8 + 2]);
    }

    #[test]
    fn trainable_parameters_respect_fixed_edge() {
        let image = Tensor::zeros(&[1, 24, 24, 3]);
        let features = Tensor::zeros(&[1, 1, 1, 2]);
        let mut rng = FixedRandom::centred();

        let mut layer = GridObjectLayer::new(small_config(), ConstFactory::zeros()).unwrap();
        assert!(layer.trainable_parameters().is_empty());
        layer
            .forward(&image, &features, &ForwardContext::default(), None, &mut rng)
            .unwrap();
        let names = layer.trainable_parameters();
        assert_eq!(names.len(), 6);
        assert_eq!(names.last().map(String::as_str), Some("edge_weights"));

        let cfg = LayerConfig {
            fixed_edge: true,
            ..small_config()
        };
        let mut layer = GridObjectLayer::new(cfg, ConstFactory::zeros()).unwrap();
        layer
            .forward(&image, &features, &ForwardContext::default(), None, &mut rng)
            .unwrap();
        assert!(!layer.trainable_parameters().iter().any(|n| n == "edge_weights"));
    }

    #[test]
    fn kl_defaults_to_independent_prior() {
        let mut layer = GridObjectLayer::new(small_config(), ConstFactory::zeros()).unwrap();
        let bundle = layer
            .forward(
                &Tensor::zeros(&[1, 24, 24, 1]),
                &Tensor::zeros(&[1, 1, 2, 1]),
                &ForwardContext::default(),
                None,
                &mut FixedRandom::centred(),
            )
            .unwrap();
        let kl = layer.compute_kl(&bundle, None, 0).unwrap();
        assert_eq!(kl.len(), 6);
        assert_eq!(kl["attr_kl"].shape(), &[1, 2, 2]);
        assert!(kl.values().all(|t| t.data().iter().all(|v| v.is_finite() && *v >= -1e-5)));
    }
}
