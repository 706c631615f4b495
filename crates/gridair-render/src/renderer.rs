//! [`ObjectRenderer`]: decode attributes to sprites and composite them.

use gridair_core::{
    sigmoid, ConfigError, LatentField, LayerError, Network, NetworkFactory, NetworkKind,
    NetworkRole, NetworkSpec, ShapeError, Tensor,
};
use gridair_layer::LatentBundle;
use gridair_space::{coords_to_image_space, ImageBox, NormalizedBox};
use tracing::{debug, info};

use crate::compositor::{composite, SpriteLayer};
use crate::config::{Flight, RenderConfig, RenderMode};

/// Importance floor keeping faint objects visible to the compositor.
const MIN_IMPORTANCE: f32 = 0.01;

/// The latents of one flight that rendering consumes.
///
/// All four tensors share leading dims `[batch, ..objects]`.
#[derive(Clone, Copy, Debug)]
pub struct FlightObjects<'a> {
    /// `[.., A]` attribute vectors.
    pub attr: &'a Tensor,
    /// `[.., 1]` presence.
    pub obj: &'a Tensor,
    /// `[.., 1]` depth.
    pub z: &'a Tensor,
    /// `[.., 4]` anchor-normalized `(yt, xt, ys, xs)`.
    pub normalized_box: &'a Tensor,
}

impl<'a> FlightObjects<'a> {
    /// Borrow the rendering fields of a layer's bundle.
    pub fn from_bundle(bundle: &'a LatentBundle) -> Result<Self, LayerError> {
        Ok(Self {
            attr: bundle.require(LatentField::Attr)?,
            obj: bundle.require(LatentField::Obj)?,
            z: bundle.require(LatentField::Z)?,
            normalized_box: bundle.require(LatentField::NormalizedBox)?,
        })
    }
}

/// Result of one render call.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderOutput {
    /// Per flight, `[.., rows, cols, D + 1]` decoded color and alpha
    /// before presence is applied.
    pub appearance: Vec<Tensor>,
    /// The composited `[B, H, W, D]` image; `None` in
    /// [`RenderMode::AppearanceOnly`].
    pub output: Option<Tensor>,
}

struct RendererState {
    attr_width: usize,
    depth: usize,
    decoders: Vec<Box<dyn Network>>,
}

/// Renders one or more flights of objects over a background.
///
/// One decoder per flight is requested from the factory on the first
/// call, sized from the attribute width and background depth seen then.
pub struct ObjectRenderer {
    flights: Vec<Flight>,
    config: RenderConfig,
    factory: Box<dyn NetworkFactory>,
    state: Option<RendererState>,
}

impl ObjectRenderer {
    /// Create a renderer for `flights`.
    ///
    /// # Errors
    ///
    /// Rejects an empty flight list, an invalid flight, or an invalid
    /// [`RenderConfig`].
    pub fn new(
        flights: Vec<Flight>,
        config: RenderConfig,
        factory: impl NetworkFactory,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if flights.is_empty() {
            return Err(ConfigError::ZeroSize { name: "flights" });
        }
        for flight in &flights {
            flight.validate()?;
        }
        Ok(Self {
            flights,
            config,
            factory: Box::new(factory),
            state: None,
        })
    }

    /// Configured flights.
    pub fn flights(&self) -> &[Flight] {
        &self.flights
    }

    /// Renderer configuration.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Whether the decoders have been built.
    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    fn build_state(
        flights: &[Flight],
        factory: &dyn NetworkFactory,
        attr_width: usize,
        depth: usize,
    ) -> Result<RendererState, ConfigError> {
        let decoders = flights
            .iter()
            .enumerate()
            .map(|(i, f)| {
                factory.build(&NetworkSpec {
                    role: NetworkRole::ObjectDecoder { flight: i },
                    kind: NetworkKind::Dense,
                    input_shape: vec![attr_width],
                    output_shape: vec![f.object_shape.0, f.object_shape.1, depth + 1],
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        info!(flights = flights.len(), attr_width, depth, "object renderer initialized");
        Ok(RendererState {
            attr_width,
            depth,
            decoders,
        })
    }

    /// Render `objects` (one entry per flight) over `background`
    /// `[B, H, W, D]`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FlightCountMismatch`] if `objects` and the
    /// configured flights differ in number,
    /// [`LayerError::GeometryChanged`] if the attribute width or image
    /// depth differ from the first call, and shape errors for
    /// inconsistent inputs.
    pub fn render(
        &mut self,
        objects: &[FlightObjects<'_>],
        background: &Tensor,
        mode: RenderMode,
    ) -> Result<RenderOutput, LayerError> {
        if objects.len() != self.flights.len() {
            return Err(ConfigError::FlightCountMismatch {
                expected: self.flights.len(),
                actual: objects.len(),
            }
            .into());
        }
        let &[batch, rows, cols, depth] = background.shape() else {
            return Err(ShapeError::Rank {
                op: "background",
                expected: 4,
                actual: background.rank(),
            }
            .into());
        };
        let attr_width = objects[0].attr.last_dim();
        let state = match self.state {
            Some(ref state) => {
                if (state.attr_width, state.depth) != (attr_width, depth) {
                    return Err(LayerError::GeometryChanged {
                        what: "background",
                        expected: vec![state.attr_width, state.depth],
                        actual: vec![attr_width, depth],
                    });
                }
                state
            }
            None => &*self.state.insert(Self::build_state(
                &self.flights,
                self.factory.as_ref(),
                attr_width,
                depth,
            )?),
        };
        debug!(?mode, flights = self.flights.len(), batch, rows, cols, "render");

        let mut appearance = Vec::with_capacity(objects.len());
        let mut layers = Vec::with_capacity(objects.len());
        for ((flight, objs), decoder) in self.flights.iter().zip(objects).zip(&state.decoders) {
            let decoded = decode(&self.config, decoder.as_ref(), flight, objs.attr, depth)?;
            if mode != RenderMode::AppearanceOnly {
                layers.push(sprites(&self.config, flight, objs, &decoded, (rows, cols), mode)?);
            }
            appearance.push(decoded);
        }

        let output = match mode {
            RenderMode::AppearanceOnly => None,
            RenderMode::Full => Some(composite(&layers, background)?),
            RenderMode::MaskOnly => Some(composite(&layers, &background.zeros_like())?),
        };
        Ok(RenderOutput { appearance, output })
    }
}

/// Decode `attr` to `[.., rows, cols, D + 1]` color and alpha in `[0, 1]`.
fn decode(
    config: &RenderConfig,
    decoder: &dyn Network,
    flight: &Flight,
    attr: &Tensor,
    depth: usize,
) -> Result<Tensor, LayerError> {
    let logits = decoder.forward(attr)?;
    let (sh, sw) = flight.object_shape;
    let mut expected = attr.shape()[..attr.rank().saturating_sub(1)].to_vec();
    expected.extend_from_slice(&[sh, sw, depth + 1]);
    if logits.shape() != expected.as_slice() {
        return Err(LayerError::Network {
            name: decoder.name().to_string(),
            reason: format!("expected output shape {expected:?}, got {:?}", logits.shape()),
        });
    }
    let cfg = *config;
    let channels = depth + 1;
    let mut channel = 0usize;
    Ok(logits.map(|x| {
        let scaled = if channel < depth {
            x * cfg.color_logit_scale
        } else {
            x * cfg.alpha_logit_scale + cfg.alpha_logit_bias
        };
        channel = (channel + 1) % channels;
        sigmoid(scaled)
    }))
}

/// Build the compositor layer for one flight.
fn sprites(
    config: &RenderConfig,
    flight: &Flight,
    objs: &FlightObjects<'_>,
    appearance: &Tensor,
    image_shape: (usize, usize),
    mode: RenderMode,
) -> Result<SpriteLayer, LayerError> {
    let lead = &objs.attr.shape()[..objs.attr.rank().saturating_sub(1)];
    let (&batch, rest) = lead
        .split_first()
        .ok_or(ShapeError::Empty { op: "render objects" })?;
    let n: usize = rest.iter().product();
    let count = batch * n;
    for (op, t, width) in [("obj", objs.obj, 1), ("z", objs.z, 1), ("normalized_box", objs.normalized_box, 4)] {
        if t.len() != count * width {
            return Err(ShapeError::Mismatch {
                op,
                expected: vec![count, width],
                actual: t.shape().to_vec(),
            }
            .into());
        }
    }

    let (sh, sw) = flight.object_shape;
    let depth = appearance.last_dim() - 1;
    let pixels = sh * sw;
    let temp = config.importance_temp;
    let decoded = appearance.data();
    let mut maps = Vec::with_capacity(count * pixels * (depth + 2));
    for g in 0..count {
        let presence = objs.obj.data()[g];
        let z = objs.z.data()[g];
        for p in 0..pixels {
            let texel = &decoded[(g * pixels + p) * (depth + 1)..(g * pixels + p + 1) * (depth + 1)];
            if mode == RenderMode::MaskOnly {
                maps.extend(std::iter::repeat_n(1.0, depth));
            } else {
                maps.extend_from_slice(&texel[..depth]);
            }
            let alpha = texel[depth] * presence;
            maps.push(alpha);
            maps.push((alpha * z / temp).max(MIN_IMPORTANCE));
        }
    }
    let maps = Tensor::from_vec(&[batch, n, sh, sw, depth + 2], maps)?;

    let boxes: Vec<ImageBox> = objs
        .normalized_box
        .data()
        .chunks_exact(4)
        .map(|b| {
            let boxed = NormalizedBox {
                yt: b[0],
                xt: b[1],
                ys: b[2],
                xs: b[3],
            };
            coords_to_image_space(boxed, image_shape, flight.anchor_box, true)
        })
        .collect();
    Ok(SpriteLayer::new(maps, boxes)?)
}

impl std::fmt::Debug for ObjectRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectRenderer")
            .field("flights", &self.flights)
            .field("config", &self.config)
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridair_test_utils::ConstFactory;

    fn flight() -> Flight {
        Flight {
            anchor_box: (8.0, 8.0),
            object_shape: (2, 2),
        }
    }

    #[test]
    fn new_rejects_empty_flights() {
        assert!(matches!(
            ObjectRenderer::new(vec![], RenderConfig::default(), ConstFactory::zeros()),
            Err(ConfigError::ZeroSize { name: "flights" })
        ));
    }

    #[test]
    fn decode_scales_color_and_alpha_separately() {
        let cfg = RenderConfig {
            color_logit_scale: 2.0,
            alpha_logit_scale: 0.5,
            alpha_logit_bias: 1.0,
            importance_temp: 1.0,
        };
        let factory = ConstFactory::new(1.0);
        let mut r = ObjectRenderer::new(vec![flight()], cfg, factory).unwrap();
        let attr = Tensor::zeros(&[1, 1, 3]);
        let obj = Tensor::ones(&[1, 1, 1]);
        let z = Tensor::ones(&[1, 1, 1]);
        let boxes = Tensor::from_vec(&[1, 1, 4], vec![0.5, 0.5, 1.0, 1.0]).unwrap();
        let objects = [FlightObjects {
            attr: &attr,
            obj: &obj,
            z: &z,
            normalized_box: &boxes,
        }];
        let out = r
            .render(&objects, &Tensor::zeros(&[1, 8, 8, 2]), RenderMode::AppearanceOnly)
            .unwrap();
        assert!(out.output.is_none());
        let app = &out.appearance[0];
        assert_eq!(app.shape(), &[1, 1, 2, 2, 3]);
        for texel in app.data().chunks(3) {
            assert!((texel[0] - sigmoid(2.0)).abs() < 1e-6);
            assert!((texel[1] - sigmoid(2.0)).abs() < 1e-6);
            assert!((texel[2] - sigmoid(1.5)).abs() < 1e-6);
        }
    }

    #[test]
    fn flight_count_must_match() {
        let mut r = ObjectRenderer::new(vec![flight(), flight()], RenderConfig::default(), ConstFactory::zeros())
            .unwrap();
        let t = Tensor::zeros(&[1, 1, 1]);
        let boxes = Tensor::zeros(&[1, 1, 4]);
        let objects = [FlightObjects {
            attr: &t,
            obj: &t,
            z: &t,
            normalized_box: &boxes,
        }];
        let err = r
            .render(&objects, &Tensor::zeros(&[1, 4, 4, 1]), RenderMode::Full)
            .unwrap_err();
        assert_eq!(
            err,
            LayerError::Config(ConfigError::FlightCountMismatch {
                expected: 2,
                actual: 1
            })
        );
    }
}
