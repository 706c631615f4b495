//! [`ProgramArena`]: contiguous `(h, w, b)`-indexed entry storage.

use gridair_core::{ArenaError, Tensor};
use gridair_space::{CellSlot, ContextPlan, ContextSource, GridShape};

/// Program entries for one forward pass.
///
/// All entries are packed into one `Vec<f32>` of length
/// `H * W * B * batch * width`. Slot `rank` occupies
/// `[rank * batch * width, (rank + 1) * batch * width)` in `[batch, width]`
/// row-major layout. Because writes are strictly ordered, the set of
/// written slots is always the prefix `0..cursor`.
#[derive(Debug)]
pub struct ProgramArena {
    grid: GridShape,
    batch: usize,
    width: usize,
    data: Vec<f32>,
    cursor: usize,
}

impl ProgramArena {
    /// Allocate an empty arena for `grid` holding `[batch, width]` entries.
    pub fn new(grid: GridShape, batch: usize, width: usize) -> Self {
        Self {
            grid,
            batch,
            width,
            data: vec![0.0; grid.cell_slot_count() * batch * width],
            cursor: 0,
        }
    }

    /// Grid extent.
    pub fn grid(&self) -> GridShape {
        self.grid
    }

    /// Width of one entry.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of entries written so far.
    pub fn written(&self) -> usize {
        self.cursor
    }

    /// Whether every slot has been written.
    pub fn is_complete(&self) -> bool {
        self.cursor == self.grid.cell_slot_count()
    }

    /// Memory usage of the entry storage in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }

    fn extent(&self) -> (usize, usize, usize) {
        (self.grid.rows(), self.grid.cols(), self.grid.slots())
    }

    fn rank_of(&self, slot: CellSlot) -> Result<usize, ArenaError> {
        self.grid
            .canonical_rank(slot)
            .ok_or(ArenaError::OutOfBounds {
                index: slot.as_tuple(),
                extent: self.extent(),
            })
    }

    /// Record the entry for `slot`.
    ///
    /// `slot` must be the next cell-slot in canonical order and `entry`
    /// must have shape `[batch, width]`.
    pub fn write(&mut self, slot: CellSlot, entry: &Tensor) -> Result<(), ArenaError> {
        let rank = self.rank_of(slot)?;
        if self.is_complete() {
            return Err(ArenaError::Full);
        }
        if rank != self.cursor {
            // The cursor is in range because the arena is not full.
            let expected = self
                .grid
                .slot_at_rank(self.cursor)
                .map(CellSlot::as_tuple)
                .unwrap_or_default();
            return Err(ArenaError::OutOfOrder {
                index: slot.as_tuple(),
                expected,
            });
        }
        if entry.shape() != [self.batch, self.width] {
            return Err(ArenaError::EntryShape {
                expected: vec![self.batch, self.width],
                actual: entry.shape().to_vec(),
            });
        }
        let stride = self.batch * self.width;
        self.data[rank * stride..(rank + 1) * stride].copy_from_slice(entry.data());
        self.cursor += 1;
        Ok(())
    }

    /// The `[batch * width]` row-major storage of a written entry.
    pub fn read(&self, slot: CellSlot) -> Result<&[f32], ArenaError> {
        let rank = self.rank_of(slot)?;
        if rank >= self.cursor {
            return Err(ArenaError::NotWritten {
                index: slot.as_tuple(),
            });
        }
        let stride = self.batch * self.width;
        Ok(&self.data[rank * stride..(rank + 1) * stride])
    }

    /// Assemble the `[batch, context_size * width]` context for `slot`.
    ///
    /// Every [`ContextSource::Edge`] resolves to `edge`, which must have
    /// shape `[batch, width]`. With an empty plan the result has zero
    /// width.
    pub fn resolve(
        &self,
        plan: &ContextPlan,
        slot: CellSlot,
        edge: &Tensor,
    ) -> Result<Tensor, ArenaError> {
        if edge.shape() != [self.batch, self.width] {
            return Err(ArenaError::EntryShape {
                expected: vec![self.batch, self.width],
                actual: edge.shape().to_vec(),
            });
        }
        let sources = plan.sources(slot).ok_or(ArenaError::OutOfBounds {
            index: slot.as_tuple(),
            extent: self.extent(),
        })?;

        let n = sources.len();
        let row_width = n * self.width;
        let mut data = vec![0.0f32; self.batch * row_width];
        for (i, source) in sources.iter().enumerate() {
            let entry = match source {
                ContextSource::Program(p) => self.read(*p)?,
                ContextSource::Edge => edge.data(),
            };
            for r in 0..self.batch {
                let dst = r * row_width + i * self.width;
                data[dst..dst + self.width]
                    .copy_from_slice(&entry[r * self.width..(r + 1) * self.width]);
            }
        }
        let len = data.len();
        Tensor::from_vec(&[self.batch, row_width], data).map_err(|_| ArenaError::EntryShape {
            expected: vec![self.batch, row_width],
            actual: vec![len],
        })
    }
}
