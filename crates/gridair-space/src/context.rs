//! Causal neighbourhood planning for autoregressive grid layers.
//!
//! For cell-slot `(h, w, b)` the context consists of:
//!
//! 1. the first `floor((2L+1)^2 / 2)` positions of the `(2L+1) x (2L+1)`
//!    window centred on `(h, w)`, in raster order (exactly the window
//!    positions that precede the centre), each contributing all `B` slots;
//! 2. the current cell's `B - 1` "previous slot" positions, aligned so
//!    that the most recent earlier slot comes last.
//!
//! Out-of-bounds neighbours and not-yet-built slots resolve to
//! [`ContextSource::Edge`]. The number of sources is the same for every
//! cell-slot, so the assembled context has a position-invariant width.

use crate::grid::{CellSlot, GridShape};

/// Where one context entry comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContextSource {
    /// A previously built program entry.
    Program(CellSlot),
    /// The learned edge placeholder.
    Edge,
}

/// Compiled context layout for a fixed grid and lookback radius.
///
/// `sources[rank]` lists the context entries for the cell-slot at
/// canonical position `rank`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextPlan {
    grid: GridShape,
    lookback: usize,
    context_size: usize,
    sources: Vec<Vec<ContextSource>>,
}

impl ContextPlan {
    /// Number of context entries for a grid with `slots` per cell and
    /// lookback radius `lookback`: `B * floor((2L+1)^2 / 2) + (B - 1)`.
    pub fn context_size_for(slots: usize, lookback: usize) -> usize {
        let window = 2 * lookback + 1;
        slots * (window * window / 2) + slots.saturating_sub(1)
    }

    /// Compile the plan for every cell-slot of `grid`.
    pub fn compile(grid: GridShape, lookback: usize) -> Self {
        let context_size = Self::context_size_for(grid.slots(), lookback);
        let sources = grid
            .canonical_ordering()
            .into_iter()
            .map(|slot| Self::sources_for(grid, lookback, slot))
            .collect();
        Self {
            grid,
            lookback,
            context_size,
            sources,
        }
    }

    fn sources_for(grid: GridShape, lookback: usize, slot: CellSlot) -> Vec<ContextSource> {
        let window = 2 * lookback + 1;
        let n_locs = window * window / 2;
        let b_count = grid.slots();
        let mut out = Vec::with_capacity(Self::context_size_for(b_count, lookback));

        for idx in 0..n_locs {
            let i = (idx / window) as isize + slot.h as isize - lookback as isize;
            let j = (idx % window) as isize + slot.w as isize - lookback as isize;
            for k in 0..b_count {
                if grid.contains_cell(i, j) {
                    out.push(ContextSource::Program(CellSlot::new(i as usize, j as usize, k)));
                } else {
                    out.push(ContextSource::Edge);
                }
            }
        }

        // Earlier slots of the current cell, right-aligned on `b`.
        let offset = slot.b as isize - (b_count as isize - 1);
        for k in 0..b_count.saturating_sub(1) {
            let kk = k as isize + offset;
            if kk < 0 {
                out.push(ContextSource::Edge);
            } else {
                out.push(ContextSource::Program(CellSlot::new(slot.h, slot.w, kk as usize)));
            }
        }
        out
    }

    /// The grid this plan was compiled for.
    pub fn grid(&self) -> GridShape {
        self.grid
    }

    /// Lookback radius `L`.
    pub fn lookback(&self) -> usize {
        self.lookback
    }

    /// Entries per cell-slot.
    pub fn context_size(&self) -> usize {
        self.context_size
    }

    /// Context sources for `slot`, or `None` if it lies outside the grid.
    pub fn sources(&self, slot: CellSlot) -> Option<&[ContextSource]> {
        let rank = self.grid.canonical_rank(slot)?;
        Some(&self.sources[rank])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn context_size_formula() {
        assert_eq!(ContextPlan::context_size_for(1, 1), 4);
        assert_eq!(ContextPlan::context_size_for(2, 1), 9);
        assert_eq!(ContextPlan::context_size_for(1, 0), 0);
        assert_eq!(ContextPlan::context_size_for(3, 2), 3 * 12 + 2);
    }

    #[test]
    fn width_is_constant_for_3x3x2_lookback_1() {
        let grid = GridShape::new(3, 3, 2).unwrap();
        let plan = ContextPlan::compile(grid, 1);
        for slot in grid.canonical_ordering() {
            assert_eq!(plan.sources(slot).unwrap().len(), 9, "slot {slot:?}");
        }
    }

    #[test]
    fn origin_uses_edge_for_upper_and_left_neighbours() {
        let grid = GridShape::new(3, 3, 2).unwrap();
        let plan = ContextPlan::compile(grid, 1);
        let src = plan.sources(CellSlot::new(0, 0, 0)).unwrap();
        // Window positions: (-1,-1), (-1,0), (-1,1), (0,-1); all out of bounds.
        assert!(src[..8].iter().all(|s| *s == ContextSource::Edge));
        // Slot 0 has no earlier slot in its own cell.
        assert_eq!(src[8], ContextSource::Edge);

        let src = plan.sources(CellSlot::new(0, 0, 1)).unwrap();
        assert_eq!(src[8], ContextSource::Program(CellSlot::new(0, 0, 0)));
    }

    #[test]
    fn interior_cell_reads_preceding_window() {
        let grid = GridShape::new(3, 3, 1).unwrap();
        let plan = ContextPlan::compile(grid, 1);
        let src = plan.sources(CellSlot::new(1, 1, 0)).unwrap();
        assert_eq!(
            src,
            &[
                ContextSource::Program(CellSlot::new(0, 0, 0)),
                ContextSource::Program(CellSlot::new(0, 1, 0)),
                ContextSource::Program(CellSlot::new(0, 2, 0)),
                ContextSource::Program(CellSlot::new(1, 0, 0)),
            ]
        );
    }

    #[test]
    fn right_edge_cell_pads_beyond_last_column() {
        let grid = GridShape::new(2, 2, 1).unwrap();
        let plan = ContextPlan::compile(grid, 1);
        let src = plan.sources(CellSlot::new(1, 1, 0)).unwrap();
        assert_eq!(src[2], ContextSource::Edge);
        assert_eq!(src[3], ContextSource::Program(CellSlot::new(1, 0, 0)));
    }

    proptest! {
        #[test]
        fn sources_always_precede_target(
            rows in 1usize..5,
            cols in 1usize..5,
            slots in 1usize..4,
            lookback in 0usize..3,
        ) {
            let grid = GridShape::new(rows, cols, slots).unwrap();
            let plan = ContextPlan::compile(grid, lookback);
            for slot in grid.canonical_ordering() {
                let rank = grid.canonical_rank(slot).unwrap();
                let src = plan.sources(slot).unwrap();
                prop_assert_eq!(src.len(), plan.context_size());
                for s in src {
                    if let ContextSource::Program(p) = s {
                        prop_assert!(grid.canonical_rank(*p).unwrap() < rank);
                    }
                }
            }
        }
    }
}
