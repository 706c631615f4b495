//! The `H x W x B` cell-slot lattice.

use gridair_core::ConfigError;

/// Index of one slot within one grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellSlot {
    /// Grid row.
    pub h: usize,
    /// Grid column.
    pub w: usize,
    /// Slot within the cell.
    pub b: usize,
}

impl CellSlot {
    /// Construct from `(h, w, b)`.
    pub fn new(h: usize, w: usize, b: usize) -> Self {
        Self { h, w, b }
    }

    /// As an `(h, w, b)` tuple.
    pub fn as_tuple(self) -> (usize, usize, usize) {
        (self.h, self.w, self.b)
    }
}

/// Extent of the cell-slot lattice.
///
/// Construction rejects zero-sized axes, so every `GridShape` holds at
/// least one cell-slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridShape {
    rows: usize,
    cols: usize,
    slots: usize,
}

impl GridShape {
    /// Create a grid of `rows * cols` cells with `slots` objects per cell.
    pub fn new(rows: usize, cols: usize, slots: usize) -> Result<Self, ConfigError> {
        if rows == 0 {
            return Err(ConfigError::ZeroSize { name: "grid rows" });
        }
        if cols == 0 {
            return Err(ConfigError::ZeroSize { name: "grid cols" });
        }
        if slots == 0 {
            return Err(ConfigError::ZeroSize {
                name: "n_objects_per_cell",
            });
        }
        Ok(Self { rows, cols, slots })
    }

    /// Number of rows (`H`).
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns (`W`).
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Slots per cell (`B`).
    pub fn slots(&self) -> usize {
        self.slots
    }

    /// Number of cells, `H * W`.
    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Number of cell-slots, `H * W * B`.
    pub fn cell_slot_count(&self) -> usize {
        self.rows * self.cols * self.slots
    }

    /// Whether `(h, w)` lies inside the grid. Accepts signed input so
    /// callers can probe neighbours without underflow.
    pub fn contains_cell(&self, h: isize, w: isize) -> bool {
        h >= 0 && w >= 0 && (h as usize) < self.rows && (w as usize) < self.cols
    }

    /// All cell-slots in visiting order: row, then column, then slot.
    pub fn canonical_ordering(&self) -> Vec<CellSlot> {
        let mut out = Vec::with_capacity(self.cell_slot_count());
        for h in 0..self.rows {
            for w in 0..self.cols {
                for b in 0..self.slots {
                    out.push(CellSlot { h, w, b });
                }
            }
        }
        out
    }

    /// Position of `slot` in [`canonical_ordering`](Self::canonical_ordering),
    /// or `None` if it lies outside the grid.
    pub fn canonical_rank(&self, slot: CellSlot) -> Option<usize> {
        if slot.h >= self.rows || slot.w >= self.cols || slot.b >= self.slots {
            return None;
        }
        Some((slot.h * self.cols + slot.w) * self.slots + slot.b)
    }

    /// Inverse of [`canonical_rank`](Self::canonical_rank).
    pub fn slot_at_rank(&self, rank: usize) -> Option<CellSlot> {
        if rank >= self.cell_slot_count() {
            return None;
        }
        let b = rank % self.slots;
        let cell = rank / self.slots;
        Some(CellSlot {
            h: cell / self.cols,
            w: cell % self.cols,
            b,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_axes() {
        assert!(matches!(GridShape::new(0, 2, 1), Err(ConfigError::ZeroSize { .. })));
        assert!(matches!(GridShape::new(2, 0, 1), Err(ConfigError::ZeroSize { .. })));
        assert!(matches!(
            GridShape::new(2, 2, 0),
            Err(ConfigError::ZeroSize { name: "n_objects_per_cell" })
        ));
    }

    #[test]
    fn ordering_is_row_then_col_then_slot() {
        let g = GridShape::new(2, 2, 2).unwrap();
        let order: Vec<_> = g.canonical_ordering().into_iter().map(CellSlot::as_tuple).collect();
        assert_eq!(
            order,
            vec![
                (0, 0, 0),
                (0, 0, 1),
                (0, 1, 0),
                (0, 1, 1),
                (1, 0, 0),
                (1, 0, 1),
                (1, 1, 0),
                (1, 1, 1),
            ]
        );
    }

    #[test]
    fn rank_matches_ordering() {
        let g = GridShape::new(3, 4, 2).unwrap();
        for (i, slot) in g.canonical_ordering().into_iter().enumerate() {
            assert_eq!(g.canonical_rank(slot), Some(i));
            assert_eq!(g.slot_at_rank(i), Some(slot));
        }
        assert_eq!(g.canonical_rank(CellSlot::new(3, 0, 0)), None);
        assert_eq!(g.slot_at_rank(24), None);
    }

    #[test]
    fn contains_cell_handles_negatives() {
        let g = GridShape::new(2, 3, 1).unwrap();
        assert!(g.contains_cell(1, 2));
        assert!(!g.contains_cell(-1, 0));
        assert!(!g.contains_cell(0, 3));
    }
}
