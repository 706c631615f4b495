//! Names of the fields carried in a latent bundle.

use std::fmt;

/// One named entry of a latent bundle.
///
/// Every field is stored with leading dimensions `[batch, cells]`
/// (or `[batch, H, W]` for an unflattened convolutional bundle)
/// followed by the field's own trailing shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LatentField {
    /// Box centre offset within the cell, rows. Trailing `[1]`.
    CellY,
    /// Box centre offset within the cell, columns. Trailing `[1]`.
    CellX,
    /// Box height relative to the anchor box. Trailing `[1]`.
    Height,
    /// Box width relative to the anchor box. Trailing `[1]`.
    Width,
    /// `(cell_y, cell_x, height, width)`. Trailing `[4]`.
    LocalBox,
    /// Mean of the `cell_y` logit.
    CellYLogitMean,
    /// Mean of the `cell_x` logit.
    CellXLogitMean,
    /// Mean of the height logit.
    HeightLogitMean,
    /// Mean of the width logit.
    WidthLogitMean,
    /// Std of the `cell_y` logit.
    CellYLogitStd,
    /// Std of the `cell_x` logit.
    CellXLogitStd,
    /// Std of the height logit.
    HeightLogitStd,
    /// Std of the width logit.
    WidthLogitStd,
    /// Box centre row, normalized to the anchor box.
    Yt,
    /// Box centre column, normalized to the anchor box.
    Xt,
    /// Box height, normalized to the anchor box.
    Ys,
    /// Box width, normalized to the anchor box.
    Xs,
    /// `(yt, xt, ys, xs)`. Trailing `[4]`.
    NormalizedBox,
    /// Pre-sigmoid height sample.
    YsLogit,
    /// Pre-sigmoid width sample.
    XsLogit,
    /// Attribute sample. Trailing `[A]`.
    Attr,
    /// Attribute mean. Trailing `[A]`.
    AttrMean,
    /// Attribute std. Trailing `[A]`.
    AttrStd,
    /// Extracted crop. Trailing `[oh, ow, depth]`.
    Glimpse,
    /// Mean of the depth logit.
    ZLogitMean,
    /// Std of the depth logit.
    ZLogitStd,
    /// Depth logit sample.
    ZLogit,
    /// Depth in `(0, 1)`.
    Z,
    /// Clipped, temperature-scaled presence log-odds.
    ObjLogOdds,
    /// `sigmoid(obj_log_odds)`.
    ObjProb,
    /// Presence value before the final sigmoid.
    ObjPreSigmoid,
    /// Presence score in `[0, 1]`.
    Obj,
    /// Broadcast propagation state.
    PropState,
    /// Broadcast propagation state seen by the prior.
    PriorPropState,
}

impl LatentField {
    /// Every field, in bundle order.
    pub const ALL: [LatentField; 34] = [
        Self::CellY,
        Self::CellX,
        Self::Height,
        Self::Width,
        Self::LocalBox,
        Self::CellYLogitMean,
        Self::CellXLogitMean,
        Self::HeightLogitMean,
        Self::WidthLogitMean,
        Self::CellYLogitStd,
        Self::CellXLogitStd,
        Self::HeightLogitStd,
        Self::WidthLogitStd,
        Self::Yt,
        Self::Xt,
        Self::Ys,
        Self::Xs,
        Self::NormalizedBox,
        Self::YsLogit,
        Self::XsLogit,
        Self::Attr,
        Self::AttrMean,
        Self::AttrStd,
        Self::Glimpse,
        Self::ZLogitMean,
        Self::ZLogitStd,
        Self::ZLogit,
        Self::Z,
        Self::ObjLogOdds,
        Self::ObjProb,
        Self::ObjPreSigmoid,
        Self::Obj,
        Self::PropState,
        Self::PriorPropState,
    ];

    /// Snake-case name used by downstream loss and visualization code.
    pub fn name(self) -> &'static str {
        match self {
            Self::CellY => "cell_y",
            Self::CellX => "cell_x",
            Self::Height => "height",
            Self::Width => "width",
            Self::LocalBox => "local_box",
            Self::CellYLogitMean => "cell_y_logit_mean",
            Self::CellXLogitMean => "cell_x_logit_mean",
            Self::HeightLogitMean => "height_logit_mean",
            Self::WidthLogitMean => "width_logit_mean",
            Self::CellYLogitStd => "cell_y_logit_std",
            Self::CellXLogitStd => "cell_x_logit_std",
            Self::HeightLogitStd => "height_logit_std",
            Self::WidthLogitStd => "width_logit_std",
            Self::Yt => "yt",
            Self::Xt => "xt",
            Self::Ys => "ys",
            Self::Xs => "xs",
            Self::NormalizedBox => "normalized_box",
            Self::YsLogit => "ys_logit",
            Self::XsLogit => "xs_logit",
            Self::Attr => "attr",
            Self::AttrMean => "attr_mean",
            Self::AttrStd => "attr_std",
            Self::Glimpse => "glimpse",
            Self::ZLogitMean => "z_logit_mean",
            Self::ZLogitStd => "z_logit_std",
            Self::ZLogit => "z_logit",
            Self::Z => "z",
            Self::ObjLogOdds => "obj_log_odds",
            Self::ObjProb => "obj_prob",
            Self::ObjPreSigmoid => "obj_pre_sigmoid",
            Self::Obj => "obj",
            Self::PropState => "prop_state",
            Self::PriorPropState => "prior_prop_state",
        }
    }

    /// Look a field up by its snake-case name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }
}

impl fmt::Display for LatentField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for field in LatentField::ALL {
            assert_eq!(LatentField::from_name(field.name()), Some(field));
        }
        assert_eq!(LatentField::from_name("nope"), None);
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<_> = LatentField::ALL.iter().map(|f| f.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), LatentField::ALL.len());
    }
}
