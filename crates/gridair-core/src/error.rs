//! Error types for the gridair object layer.
//!
//! Organized by subsystem: tensor shapes, configuration, the program
//! arena, and the umbrella [`LayerError`] returned by forward passes.
//! Every variant is a contract violation: callers are expected to fix
//! their inputs, not retry.

use std::error::Error;
use std::fmt;

/// Errors from tensor construction and shape manipulation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShapeError {
    /// The number of elements does not match the product of the shape.
    ElementCount {
        /// The requested shape.
        shape: Vec<usize>,
        /// Number of elements actually supplied.
        actual: usize,
    },
    /// Two shapes that must agree do not.
    Mismatch {
        /// What was being attempted.
        op: &'static str,
        /// The expected shape.
        expected: Vec<usize>,
        /// The shape that was found.
        actual: Vec<usize>,
    },
    /// A tensor has the wrong number of dimensions.
    Rank {
        /// What was being attempted.
        op: &'static str,
        /// Required rank.
        expected: usize,
        /// Rank that was found.
        actual: usize,
    },
    /// Split sizes do not sum to the size of the split axis.
    InvalidSplit {
        /// Sizes requested.
        sizes: Vec<usize>,
        /// Size of the axis being split.
        axis_len: usize,
    },
    /// An axis index is out of range for the tensor's rank.
    AxisOutOfRange {
        /// Requested axis.
        axis: usize,
        /// Rank of the tensor.
        rank: usize,
    },
    /// An index exceeds the size of its axis.
    IndexOutOfRange {
        /// Axis being indexed.
        axis: usize,
        /// Requested index.
        index: usize,
        /// Size of the axis.
        len: usize,
    },
    /// An operation received no inputs where at least one is required.
    Empty {
        /// What was being attempted.
        op: &'static str,
    },
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ElementCount { shape, actual } => {
                write!(f, "shape {shape:?} needs {} elements, got {actual}", shape.iter().product::<usize>())
            }
            Self::Mismatch { op, expected, actual } => {
                write!(f, "{op}: expected shape {expected:?}, got {actual:?}")
            }
            Self::Rank { op, expected, actual } => {
                write!(f, "{op}: expected rank {expected}, got {actual}")
            }
            Self::InvalidSplit { sizes, axis_len } => {
                write!(f, "split sizes {sizes:?} do not sum to axis length {axis_len}")
            }
            Self::AxisOutOfRange { axis, rank } => {
                write!(f, "axis {axis} out of range for rank {rank}")
            }
            Self::IndexOutOfRange { axis, index, len } => {
                write!(f, "index {index} out of range for axis {axis} of size {len}")
            }
            Self::Empty { op } => write!(f, "{op}: no input tensors"),
        }
    }
}

impl Error for ShapeError {}

/// Errors detected while validating layer or renderer configuration.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// A `(min, max)` range is empty or inverted.
    InvalidRange {
        /// Name of the option pair (e.g. `"yx"`).
        name: &'static str,
        /// Configured lower bound.
        min: f32,
        /// Configured upper bound.
        max: f32,
    },
    /// A scalar option is NaN, infinite, or outside its legal domain.
    InvalidValue {
        /// Name of the option.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
    /// A size-like option is zero.
    ZeroSize {
        /// Name of the option.
        name: &'static str,
    },
    /// The convolutional layer only supports one slot per cell.
    UnsupportedSlotCount {
        /// Configured slot count.
        slots: usize,
    },
    /// The renderer was given a different number of object groups than
    /// it has flights configured.
    FlightCountMismatch {
        /// Configured flights.
        expected: usize,
        /// Groups supplied.
        actual: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRange { name, min, max } => {
                write!(f, "min_{name} ({min}) must be strictly less than max_{name} ({max})")
            }
            Self::InvalidValue { name, reason } => write!(f, "invalid {name}: {reason}"),
            Self::ZeroSize { name } => write!(f, "{name} must be at least 1"),
            Self::UnsupportedSlotCount { slots } => write!(
                f,
                "convolutional grid layer supports exactly 1 object per cell, got {slots}"
            ),
            Self::FlightCountMismatch { expected, actual } => {
                write!(f, "renderer has {expected} flights but received {actual} object groups")
            }
        }
    }
}

impl Error for ConfigError {}

/// Errors from the write-once program arena.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// The `(h, w, b)` index is outside the arena.
    OutOfBounds {
        /// Offending index.
        index: (usize, usize, usize),
        /// Arena extent.
        extent: (usize, usize, usize),
    },
    /// A write arrived out of raster-then-slot order.
    OutOfOrder {
        /// Index that was written.
        index: (usize, usize, usize),
        /// Index the arena expected next.
        expected: (usize, usize, usize),
    },
    /// A slot was read before it was written.
    NotWritten {
        /// Index that was read.
        index: (usize, usize, usize),
    },
    /// A written entry has the wrong width or batch size.
    EntryShape {
        /// Expected `[batch, width]`.
        expected: Vec<usize>,
        /// Shape supplied.
        actual: Vec<usize>,
    },
    /// Every slot has already been written.
    Full,
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds { index, extent } => {
                write!(f, "program index {index:?} out of bounds for extent {extent:?}")
            }
            Self::OutOfOrder { index, expected } => {
                write!(f, "program write at {index:?} out of order, expected {expected:?}")
            }
            Self::NotWritten { index } => write!(f, "program entry {index:?} read before write"),
            Self::EntryShape { expected, actual } => {
                write!(f, "program entry must have shape {expected:?}, got {actual:?}")
            }
            Self::Full => write!(f, "program arena is full"),
        }
    }
}

impl Error for ArenaError {}

/// Errors from a layer or renderer forward pass.
#[derive(Clone, Debug, PartialEq)]
pub enum LayerError {
    /// A tensor had the wrong shape.
    Shape(ShapeError),
    /// Configuration was rejected.
    Config(ConfigError),
    /// The program arena rejected an access.
    Arena(ArenaError),
    /// Input geometry differs from the geometry cached on first use.
    GeometryChanged {
        /// Which quantity changed (e.g. `"image"`).
        what: &'static str,
        /// Shape cached at initialization.
        expected: Vec<usize>,
        /// Shape supplied now.
        actual: Vec<usize>,
    },
    /// A bundle is missing a field required downstream.
    MissingField {
        /// Name of the missing field.
        name: String,
    },
    /// A sub-network failed.
    Network {
        /// Name of the network.
        name: String,
        /// Human-readable description of the failure.
        reason: String,
    },
}

impl fmt::Display for LayerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shape(e) => write!(f, "shape: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Arena(e) => write!(f, "arena: {e}"),
            Self::GeometryChanged { what, expected, actual } => write!(
                f,
                "{what} shape changed after initialization: expected {expected:?}, got {actual:?}"
            ),
            Self::MissingField { name } => write!(f, "latent bundle has no field '{name}'"),
            Self::Network { name, reason } => write!(f, "network '{name}' failed: {reason}"),
        }
    }
}

impl Error for LayerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Shape(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Arena(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ShapeError> for LayerError {
    fn from(e: ShapeError) -> Self {
        Self::Shape(e)
    }
}

impl From<ConfigError> for LayerError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<ArenaError> for LayerError {
    fn from(e: ArenaError) -> Self {
        Self::Arena(e)
    }
}
