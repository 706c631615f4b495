//! State captured on first invocation and helpers shared by both layer
//! variants.

use gridair_core::{
    LatentField, LayerError, Network, NetworkFactory, NetworkKind, NetworkRole, NetworkSpec,
    ShapeError, Tensor,
};
use gridair_glimpse::GlimpseExtractor;
use gridair_latent::FieldMap;
use gridair_space::WarpBox;

/// Image and feature geometry cached at initialization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    /// Batch size.
    pub batch: usize,
    /// Image `(height, width, depth)`.
    pub image: (usize, usize, usize),
    /// Feature grid `(H, W)`.
    pub grid: (usize, usize),
    /// Feature channels.
    pub channels: usize,
}

fn rank4(op: &'static str, t: &Tensor) -> Result<[usize; 4], ShapeError> {
    match *t.shape() {
        [a, b, c, d] => Ok([a, b, c, d]),
        _ => Err(ShapeError::Rank {
            op,
            expected: 4,
            actual: t.rank(),
        }),
    }
}

impl Geometry {
    /// Read geometry from `[B, Hi, Wi, D]` image and `[B, H, W, C]` features.
    pub fn of(image: &Tensor, features: &Tensor) -> Result<Self, LayerError> {
        let [batch, ih, iw, depth] = rank4("image", image)?;
        let [fb, h, w, c] = rank4("features", features)?;
        if fb != batch {
            return Err(ShapeError::Mismatch {
                op: "features batch",
                expected: vec![batch],
                actual: vec![fb],
            }
            .into());
        }
        if batch == 0 || h == 0 || w == 0 {
            return Err(ShapeError::Empty { op: "grid layer input" }.into());
        }
        Ok(Self {
            batch,
            image: (ih, iw, depth),
            grid: (h, w),
            channels: c,
        })
    }

    /// Fail if `other` differs from the cached geometry.
    pub fn check(&self, other: &Self) -> Result<(), LayerError> {
        if (self.batch, self.image) != (other.batch, other.image) {
            return Err(LayerError::GeometryChanged {
                what: "image",
                expected: vec![self.batch, self.image.0, self.image.1, self.image.2],
                actual: vec![other.batch, other.image.0, other.image.1, other.image.2],
            });
        }
        if (self.grid, self.channels) != (other.grid, other.channels) {
            return Err(LayerError::GeometryChanged {
                what: "features",
                expected: vec![self.batch, self.grid.0, self.grid.1, self.channels],
                actual: vec![other.batch, other.grid.0, other.grid.1, other.channels],
            });
        }
        Ok(())
    }

    /// Image `(height, width)`.
    pub fn image_hw(&self) -> (usize, usize) {
        (self.image.0, self.image.1)
    }
}

/// The five sub-networks a grid layer owns.
pub(crate) struct LateralNetworks {
    pub box_net: Box<dyn Network>,
    pub attr_net: Box<dyn Network>,
    pub z_net: Box<dyn Network>,
    pub obj_net: Box<dyn Network>,
    pub encoder: Box<dyn Network>,
}

/// Input and output widths of the four lateral networks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct LateralWidths {
    pub base: usize,
    pub passthrough: usize,
    pub attr: usize,
}

impl LateralWidths {
    pub fn box_io(&self) -> (usize, usize) {
        (self.base, 8 + self.passthrough)
    }

    pub fn attr_io(&self) -> (usize, usize) {
        (
            self.base + self.passthrough + self.attr + 4,
            2 * self.attr + self.passthrough,
        )
    }

    pub fn z_io(&self) -> (usize, usize) {
        (self.base + self.passthrough + 4 + self.attr, 2 + self.passthrough)
    }

    pub fn obj_io(&self) -> (usize, usize) {
        (self.base + self.passthrough + 4 + self.attr + 1, 1)
    }
}

impl LateralNetworks {
    /// Build all five networks. `spatial` is `Some((H, W))` for
    /// size-preserving convolutional laterals.
    pub fn build(
        factory: &dyn NetworkFactory,
        widths: LateralWidths,
        spatial: Option<(usize, usize)>,
        glimpse_shape: [usize; 3],
    ) -> Result<Self, LayerError> {
        let lateral = |role: NetworkRole, (input, output): (usize, usize)| {
            let spec = match spatial {
                None => NetworkSpec::dense(role, input, output),
                Some((h, w)) => NetworkSpec {
                    role,
                    kind: NetworkKind::SpatialConv,
                    input_shape: vec![h, w, input],
                    output_shape: vec![h, w, output],
                },
            };
            factory.build(&spec)
        };
        let encoder_spec = NetworkSpec {
            role: NetworkRole::ObjectEncoder,
            kind: NetworkKind::Dense,
            input_shape: glimpse_shape.to_vec(),
            output_shape: vec![widths.attr],
        };
        Ok(Self {
            box_net: lateral(NetworkRole::Box, widths.box_io())?,
            attr_net: lateral(NetworkRole::Attr, widths.attr_io())?,
            z_net: lateral(NetworkRole::Z, widths.z_io())?,
            obj_net: lateral(NetworkRole::Obj, widths.obj_io())?,
            encoder: factory.build(&encoder_spec)?,
        })
    }

    /// Network names in build order.
    pub fn names(&self) -> [&str; 5] {
        [
            self.box_net.name(),
            self.attr_net.name(),
            self.z_net.name(),
            self.obj_net.name(),
            self.encoder.name(),
        ]
    }
}

/// Check a network output's trailing width before splitting it.
pub(crate) fn checked_output(
    net: &dyn Network,
    input: &Tensor,
    width: usize,
) -> Result<Tensor, LayerError> {
    let out = net.forward(input)?;
    if out.rank() == 0 || out.last_dim() != width {
        return Err(LayerError::Network {
            name: net.name().to_string(),
            reason: format!("expected output width {width}, got shape {:?}", out.shape()),
        });
    }
    Ok(out)
}

/// Extract and encode glimpses, or return zeros in prior mode.
///
/// `lead` is the leading shape of the boxes (`[batch]` or
/// `[batch, H, W]`); the glimpse is `[..lead, oh, ow, D]` and the
/// encoding `[..lead, A]`.
pub(crate) fn glimpse_and_encode(
    extractor: &GlimpseExtractor,
    encoder: &dyn Network,
    image: &Tensor,
    warps: &[WarpBox],
    lead: &[usize],
    depth: usize,
    is_posterior: bool,
) -> Result<(Tensor, Tensor), LayerError> {
    let (oh, ow) = extractor.object_shape();
    let mut shape = lead.to_vec();
    shape.extend_from_slice(&[oh, ow, depth]);
    let glimpse = if is_posterior {
        extractor.extract(image, warps)?.reshape(&shape)?
    } else {
        Tensor::zeros(&shape)
    };
    // The encoder runs in both modes so the two share structure.
    let encoded = encoder.forward(&glimpse)?;
    let encoded = if is_posterior {
        encoded
    } else {
        encoded.zeros_like()
    };
    Ok((glimpse, encoded))
}

/// The `[..lead, 2]` mode flag.
pub(crate) fn posterior_flag(lead: &[usize], flag: [f32; 2]) -> Tensor {
    let mut shape = lead.to_vec();
    shape.push(2);
    Tensor::from_fn(&shape, |i| flag[i % 2])
}

/// Broadcast the first row of `prop_state` to `[..lead, D]` under both
/// propagation-state fields.
pub(crate) fn insert_prop_state(
    fields: &mut FieldMap,
    prop_state: &Tensor,
    lead: &[usize],
) -> Result<(), LayerError> {
    let row = match prop_state.rank() {
        1 => prop_state.clone(),
        2 => prop_state.select(0, 0)?,
        actual => {
            return Err(ShapeError::Rank {
                op: "prop_state",
                expected: 2,
                actual,
            }
            .into())
        }
    };
    let mut tiled = row;
    for &n in lead.iter().rev() {
        tiled = tiled.tile_leading(n);
    }
    fields.insert(LatentField::PropState, tiled.clone());
    fields.insert(LatentField::PriorPropState, tiled);
    Ok(())
}
