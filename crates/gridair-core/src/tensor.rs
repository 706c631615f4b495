//! Dense row-major `f32` tensor.
//!
//! [`Tensor`] is the single data carrier of the workspace: feature maps,
//! images, latent fields and network parameters are all tensors. The
//! layout is contiguous row-major; the last axis is the fastest-varying.
//! Shapes are stored inline in a [`SmallVec`] since no tensor in the
//! layer exceeds six dimensions (`[batch, H, W, oh, ow, depth]`).

use crate::error::ShapeError;
use smallvec::SmallVec;

/// Tensor shape, inline for up to six dimensions.
pub type Shape = SmallVec<[usize; 6]>;

/// A dense, contiguous, row-major tensor of `f32`.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    shape: Shape,
    data: Vec<f32>,
}

impl Tensor {
    /// Wrap `data` with the given shape.
    ///
    /// Returns `Err(ShapeError::ElementCount)` if `data.len()` does not
    /// equal the product of `shape`.
    pub fn from_vec(shape: &[usize], data: Vec<f32>) -> Result<Self, ShapeError> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(ShapeError::ElementCount {
                shape: shape.to_vec(),
                actual: data.len(),
            });
        }
        Ok(Self {
            shape: SmallVec::from_slice(shape),
            data,
        })
    }

    /// A tensor filled with `value`.
    pub fn full(shape: &[usize], value: f32) -> Self {
        let n = shape.iter().product();
        Self {
            shape: SmallVec::from_slice(shape),
            data: vec![value; n],
        }
    }

    /// A tensor filled with zeros.
    pub fn zeros(shape: &[usize]) -> Self {
        Self::full(shape, 0.0)
    }

    /// A tensor filled with ones.
    pub fn ones(shape: &[usize]) -> Self {
        Self::full(shape, 1.0)
    }

    /// A zero tensor with the same shape as `self`.
    pub fn zeros_like(&self) -> Self {
        Self::zeros(&self.shape)
    }

    /// Build a tensor by evaluating `f` at every flat index.
    pub fn from_fn(shape: &[usize], f: impl FnMut(usize) -> f32) -> Self {
        let n: usize = shape.iter().product();
        Self {
            shape: SmallVec::from_slice(shape),
            data: (0..n).map(f).collect(),
        }
    }

    /// The shape.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Size of `axis`.
    pub fn dim(&self, axis: usize) -> Result<usize, ShapeError> {
        self.shape.get(axis).copied().ok_or(ShapeError::AxisOutOfRange {
            axis,
            rank: self.rank(),
        })
    }

    /// Size of the last axis, or 1 for a scalar.
    pub fn last_dim(&self) -> usize {
        self.shape.last().copied().unwrap_or(1)
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the tensor has zero elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat element storage.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Mutable flat element storage.
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Consume the tensor and return its storage.
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Flat offset of a full multi-index.
    pub fn offset(&self, index: &[usize]) -> Result<usize, ShapeError> {
        if index.len() != self.rank() {
            return Err(ShapeError::Rank {
                op: "offset",
                expected: self.rank(),
                actual: index.len(),
            });
        }
        let mut off = 0usize;
        for (axis, (&i, &n)) in index.iter().zip(self.shape.iter()).enumerate() {
            if i >= n {
                return Err(ShapeError::IndexOutOfRange { axis, index: i, len: n });
            }
            off = off * n + i;
        }
        Ok(off)
    }

    /// Element at a full multi-index.
    pub fn get(&self, index: &[usize]) -> Result<f32, ShapeError> {
        Ok(self.data[self.offset(index)?])
    }

    /// Reinterpret the storage with a new shape of equal element count.
    pub fn reshape(&self, shape: &[usize]) -> Result<Self, ShapeError> {
        Self::from_vec(shape, self.data.clone())
    }

    /// Value copy with no gradient lineage.
    ///
    /// Forward values are unchanged; the copy marks the branch of an
    /// expression that an external trainer must treat as constant.
    pub fn detach(&self) -> Self {
        self.clone()
    }

    /// Apply `f` elementwise.
    pub fn map(&self, mut f: impl FnMut(f32) -> f32) -> Self {
        Self {
            shape: self.shape.clone(),
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Combine two same-shape tensors elementwise.
    pub fn zip_map(
        &self,
        other: &Self,
        mut f: impl FnMut(f32, f32) -> f32,
    ) -> Result<Self, ShapeError> {
        if self.shape != other.shape {
            return Err(ShapeError::Mismatch {
                op: "zip_map",
                expected: self.shape.to_vec(),
                actual: other.shape.to_vec(),
            });
        }
        Ok(Self {
            shape: self.shape.clone(),
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(&a, &b)| f(a, b))
                .collect(),
        })
    }

    /// Concatenate tensors along their last axis.
    ///
    /// All inputs must share the same leading dimensions. Zero-width
    /// inputs are allowed and contribute nothing.
    pub fn concat_last(parts: &[&Tensor]) -> Result<Self, ShapeError> {
        let first = parts.first().ok_or(ShapeError::Empty { op: "concat_last" })?;
        if first.rank() == 0 {
            return Err(ShapeError::Rank {
                op: "concat_last",
                expected: 1,
                actual: 0,
            });
        }
        let lead = &first.shape[..first.rank() - 1];
        let rows: usize = lead.iter().product();
        let mut width = 0usize;
        for p in parts {
            if p.rank() != first.rank() || &p.shape[..p.rank() - 1] != lead {
                return Err(ShapeError::Mismatch {
                    op: "concat_last",
                    expected: first.shape.to_vec(),
                    actual: p.shape.to_vec(),
                });
            }
            width += p.last_dim();
        }
        let mut data = Vec::with_capacity(rows * width);
        for r in 0..rows {
            for p in parts {
                let w = p.last_dim();
                data.extend_from_slice(&p.data[r * w..(r + 1) * w]);
            }
        }
        let mut shape: Shape = SmallVec::from_slice(lead);
        shape.push(width);
        Ok(Self { shape, data })
    }

    /// Split along the last axis into consecutive chunks of `sizes`.
    pub fn split_last(&self, sizes: &[usize]) -> Result<Vec<Self>, ShapeError> {
        let width = self.last_dim();
        if sizes.iter().sum::<usize>() != width || self.rank() == 0 {
            return Err(ShapeError::InvalidSplit {
                sizes: sizes.to_vec(),
                axis_len: width,
            });
        }
        let lead = &self.shape[..self.rank() - 1];
        let rows: usize = lead.iter().product();
        let mut out = Vec::with_capacity(sizes.len());
        let mut start = 0usize;
        for &s in sizes {
            let mut data = Vec::with_capacity(rows * s);
            for r in 0..rows {
                let base = r * width + start;
                data.extend_from_slice(&self.data[base..base + s]);
            }
            let mut shape: Shape = SmallVec::from_slice(lead);
            shape.push(s);
            out.push(Self { shape, data });
            start += s;
        }
        Ok(out)
    }

    /// Stack same-shape tensors along a new `axis`.
    pub fn stack(parts: &[Tensor], axis: usize) -> Result<Self, ShapeError> {
        let first = parts.first().ok_or(ShapeError::Empty { op: "stack" })?;
        if axis > first.rank() {
            return Err(ShapeError::AxisOutOfRange {
                axis,
                rank: first.rank(),
            });
        }
        for p in parts {
            if p.shape != first.shape {
                return Err(ShapeError::Mismatch {
                    op: "stack",
                    expected: first.shape.to_vec(),
                    actual: p.shape.to_vec(),
                });
            }
        }
        let outer: usize = first.shape[..axis].iter().product();
        let inner: usize = first.shape[axis..].iter().product();
        let mut data = Vec::with_capacity(first.len() * parts.len());
        for o in 0..outer {
            for p in parts {
                data.extend_from_slice(&p.data[o * inner..(o + 1) * inner]);
            }
        }
        let mut shape = first.shape.clone();
        shape.insert(axis, parts.len());
        Ok(Self { shape, data })
    }

    /// Remove `axis` by taking element `index` along it.
    pub fn select(&self, axis: usize, index: usize) -> Result<Self, ShapeError> {
        let n = self.dim(axis)?;
        if index >= n {
            return Err(ShapeError::IndexOutOfRange { axis, index, len: n });
        }
        let outer: usize = self.shape[..axis].iter().product();
        let inner: usize = self.shape[axis + 1..].iter().product();
        let mut data = Vec::with_capacity(outer * inner);
        for o in 0..outer {
            let base = (o * n + index) * inner;
            data.extend_from_slice(&self.data[base..base + inner]);
        }
        let mut shape = self.shape.clone();
        shape.remove(axis);
        Ok(Self { shape, data })
    }

    /// Sum every element that shares the same index on axis 0.
    ///
    /// Returns a `[batch]` tensor.
    pub fn sum_per_batch(&self) -> Result<Self, ShapeError> {
        let batch = self.dim(0)?;
        let per = if batch == 0 { 0 } else { self.len() / batch };
        let data = (0..batch)
            .map(|b| self.data[b * per..(b + 1) * per].iter().sum())
            .collect();
        Ok(Self {
            shape: SmallVec::from_slice(&[batch]),
            data,
        })
    }

    /// Repeat a `[..inner]` tensor `n` times along a new leading axis.
    pub fn tile_leading(&self, n: usize) -> Self {
        let mut data = Vec::with_capacity(self.len() * n);
        for _ in 0..n {
            data.extend_from_slice(&self.data);
        }
        let mut shape = self.shape.clone();
        shape.insert(0, n);
        Self { shape, data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn t(shape: &[usize], data: &[f32]) -> Tensor {
        Tensor::from_vec(shape, data.to_vec()).unwrap()
    }

    #[test]
    fn from_vec_rejects_wrong_count() {
        assert!(matches!(
            Tensor::from_vec(&[2, 3], vec![0.0; 5]),
            Err(ShapeError::ElementCount { actual: 5, .. })
        ));
    }

    #[test]
    fn concat_last_interleaves_rows() {
        let a = t(&[2, 1], &[1.0, 2.0]);
        let b = t(&[2, 2], &[10.0, 11.0, 20.0, 21.0]);
        let c = Tensor::concat_last(&[&a, &b]).unwrap();
        assert_eq!(c.shape(), &[2, 3]);
        assert_eq!(c.data(), &[1.0, 10.0, 11.0, 2.0, 20.0, 21.0]);
    }

    #[test]
    fn concat_last_accepts_zero_width() {
        let a = t(&[2, 1], &[1.0, 2.0]);
        let empty = Tensor::zeros(&[2, 0]);
        let c = Tensor::concat_last(&[&a, &empty]).unwrap();
        assert_eq!(c, a);
    }

    #[test]
    fn concat_last_rejects_leading_mismatch() {
        let a = t(&[2, 1], &[1.0, 2.0]);
        let b = t(&[3, 1], &[1.0, 2.0, 3.0]);
        assert!(Tensor::concat_last(&[&a, &b]).is_err());
    }

    #[test]
    fn split_last_inverts_concat() {
        let c = t(&[2, 3], &[1.0, 10.0, 11.0, 2.0, 20.0, 21.0]);
        let parts = c.split_last(&[1, 2]).unwrap();
        assert_eq!(parts[0].data(), &[1.0, 2.0]);
        assert_eq!(parts[1].data(), &[10.0, 11.0, 20.0, 21.0]);
        assert!(c.split_last(&[1, 1]).is_err());
    }

    #[test]
    fn stack_inserts_axis() {
        let a = t(&[2, 1], &[1.0, 2.0]);
        let b = t(&[2, 1], &[3.0, 4.0]);
        let s = Tensor::stack(&[a, b], 1).unwrap();
        assert_eq!(s.shape(), &[2, 2, 1]);
        assert_eq!(s.data(), &[1.0, 3.0, 2.0, 4.0]);
    }

    #[test]
    fn select_drops_axis() {
        // [1, 2, 2, 1]: (h, w) -> h * 10 + w
        let x = t(&[1, 2, 2, 1], &[0.0, 1.0, 10.0, 11.0]);
        let row = x.select(1, 1).unwrap();
        assert_eq!(row.shape(), &[1, 2, 1]);
        let cell = row.select(1, 0).unwrap();
        assert_eq!(cell.data(), &[10.0]);
    }

    #[test]
    fn sum_per_batch_reduces_trailing() {
        let x = t(&[2, 2, 1], &[0.5, 0.5, 1.0, 0.0]);
        assert_eq!(x.sum_per_batch().unwrap().data(), &[1.0, 1.0]);
    }

    #[test]
    fn tile_leading_repeats() {
        let v = t(&[2], &[1.0, 2.0]);
        let tiled = v.tile_leading(3);
        assert_eq!(tiled.shape(), &[3, 2]);
        assert_eq!(tiled.data(), &[1.0, 2.0, 1.0, 2.0, 1.0, 2.0]);
    }

    proptest! {
        #[test]
        fn stack_then_select_recovers_part(rows in 1usize..4, cols in 1usize..4, n in 1usize..4, pick in 0usize..4) {
            let pick = pick % n;
            let parts: Vec<Tensor> = (0..n)
                .map(|k| Tensor::from_fn(&[rows, cols], |i| (k * 100 + i) as f32))
                .collect();
            let stacked = Tensor::stack(&parts, 1).unwrap();
            prop_assert_eq!(stacked.select(1, pick).unwrap(), parts[pick].clone());
        }
    }
}
