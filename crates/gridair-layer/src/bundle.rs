//! The named-field output of a grid layer.

use gridair_core::{LatentField, LayerError, ShapeError, Tensor};
use gridair_latent::FieldMap;

/// Latent tensors for every cell-slot plus derived object counts.
///
/// Every field shares leading dims `[batch, cells]` (or `[batch, H, W]`
/// for an unflattened convolutional bundle). A bundle is built once per
/// forward pass and never mutated afterwards; it exposes only shared
/// access.
#[derive(Clone, Debug, PartialEq)]
pub struct LatentBundle {
    fields: FieldMap,
    pred_n_objects: Tensor,
    pred_n_objects_hard: Tensor,
}

impl LatentBundle {
    /// Seal `fields`, deriving the soft and hard object counts from
    /// [`LatentField::Obj`].
    pub(crate) fn seal(fields: FieldMap) -> Result<Self, LayerError> {
        let obj = fields.get(&LatentField::Obj).ok_or_else(|| LayerError::MissingField {
            name: LatentField::Obj.name().to_string(),
        })?;
        let pred_n_objects = obj.sum_per_batch()?;
        let pred_n_objects_hard = obj.map(f32::round_ties_even).sum_per_batch()?;
        Ok(Self {
            fields,
            pred_n_objects,
            pred_n_objects_hard,
        })
    }

    /// Look up a field.
    pub fn get(&self, field: LatentField) -> Option<&Tensor> {
        self.fields.get(&field)
    }

    /// Look up a field that must be present.
    pub fn require(&self, field: LatentField) -> Result<&Tensor, LayerError> {
        self.get(field).ok_or_else(|| LayerError::MissingField {
            name: field.name().to_string(),
        })
    }

    /// Whether `field` is present.
    pub fn contains(&self, field: LatentField) -> bool {
        self.fields.contains_key(&field)
    }

    /// All fields in insertion order.
    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    /// Iterate `(field, tensor)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (LatentField, &Tensor)> {
        self.fields.iter().map(|(k, v)| (*k, v))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the bundle has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `[batch]` sum of presence over every cell-slot.
    pub fn pred_n_objects(&self) -> &Tensor {
        &self.pred_n_objects
    }

    /// `[batch]` sum of rounded presence over every cell-slot.
    pub fn pred_n_objects_hard(&self) -> &Tensor {
        &self.pred_n_objects_hard
    }

    /// Batch size.
    pub fn batch_size(&self) -> Result<usize, ShapeError> {
        self.pred_n_objects.dim(0)
    }

    /// Consume into the raw field map.
    pub fn into_fields(self) -> FieldMap {
        self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_obj(values: Vec<f32>) -> LatentBundle {
        let mut fields = FieldMap::new();
        fields.insert(LatentField::Obj, Tensor::from_vec(&[2, 3, 1], values).unwrap());
        LatentBundle::seal(fields).unwrap()
    }

    #[test]
    fn counts_sum_per_batch() {
        let b = with_obj(vec![0.2, 0.7, 0.9, 0.0, 0.4, 1.0]);
        assert!((b.pred_n_objects().data()[0] - 1.8).abs() < 1e-6);
        assert_eq!(b.pred_n_objects_hard().data(), &[2.0, 1.0]);
        assert_eq!(b.batch_size(), Ok(2));
    }

    #[test]
    fn half_rounds_to_even() {
        let b = with_obj(vec![0.5, 0.5, 0.5, 0.5, 0.5, 0.5]);
        assert_eq!(b.pred_n_objects_hard().data(), &[0.0, 0.0]);
    }

    #[test]
    fn sealing_requires_presence() {
        assert!(matches!(
            LatentBundle::seal(FieldMap::new()),
            Err(LayerError::MissingField { .. })
        ));
    }

    #[test]
    fn require_reports_missing_name() {
        let b = with_obj(vec![0.0; 6]);
        assert_eq!(
            b.require(LatentField::Attr).unwrap_err(),
            LayerError::MissingField {
                name: "attr".to_string()
            }
        );
        assert!(b.contains(LatentField::Obj));
    }
}
