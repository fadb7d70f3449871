//! Grid layout: size plus the fixed set of black cells.

use std::collections::BTreeSet;

use crate::{CellCoord, GridError, Result};

/// Shape of a square crossword grid.
///
/// Black cells are fixed at construction; there is no way to reclassify a
/// cell afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridLayout {
    size: usize,
    black: BTreeSet<CellCoord>,
}

impl GridLayout {
    /// Create a layout, validating the size and every black cell.
    pub fn new(size: usize, black: impl IntoIterator<Item = CellCoord>) -> Result<Self> {
        if size == 0 || size.checked_mul(size).is_none() {
            return Err(GridError::InvalidSize(size));
        }
        let black: BTreeSet<_> = black.into_iter().collect();
        if let Some(&cell) = black.iter().find(|c| !c.is_within(size)) {
            return Err(GridError::CellOutOfBounds { cell, size });
        }
        Ok(Self { size, black })
    }

    /// A layout with no black cells.
    pub fn open(size: usize) -> Result<Self> {
        Self::new(size, [])
    }

    /// Side length of the grid.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Total number of cells (`size²`, which cannot overflow once built).
    pub fn cell_count(&self) -> usize {
        self.size * self.size
    }

    /// Number of cells that can hold letters.
    pub fn addressable_count(&self) -> usize {
        self.cell_count() - self.black.len()
    }

    /// Whether the coordinate lies inside the grid.
    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.is_within(self.size)
    }

    /// Whether the cell is black.
    pub fn is_black(&self, cell: CellCoord) -> bool {
        self.black.contains(&cell)
    }

    /// Whether the cell is inside the grid and not black.
    pub fn is_addressable(&self, cell: CellCoord) -> bool {
        self.contains(cell) && !self.is_black(cell)
    }

    /// Black cells in row-major order.
    pub fn black_squares(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.black.iter().copied()
    }

    /// The black-cell set.
    pub fn black_set(&self) -> &BTreeSet<CellCoord> {
        &self.black
    }

    /// Addressable cells in row-major order.
    pub fn addressable(&self) -> impl Iterator<Item = CellCoord> + '_ {
        CellCoord::all(self.size).filter(move |c| !self.black.contains(c))
    }
}
