//! Structure inference.
//!
//! Recovers `{size, black cells}` either directly from an observation of the
//! puzzle or, when no black-cell list was captured, from the cells that ever
//! received a letter.

use std::collections::BTreeSet;

use crate::{
    CellCoord, GridLayout, Result, DAILY_GRID_SIZE, MAX_GRID_SIZE, MINI_GRID_SIZE, MIN_GRID_SIZE,
};

/// Accepted grid sizes for direct detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridBounds {
    /// Smallest accepted side length
    pub min_size: usize,
    /// Largest accepted side length
    pub max_size: usize,
    /// Sizes preferred when candidate counts disagree
    pub canonical_sizes: Vec<usize>,
}

impl Default for GridBounds {
    fn default() -> Self {
        Self {
            min_size: MIN_GRID_SIZE,
            max_size: MAX_GRID_SIZE,
            canonical_sizes: vec![MINI_GRID_SIZE, DAILY_GRID_SIZE],
        }
    }
}

impl GridBounds {
    /// Whether `size` lies in `[min_size, max_size]`.
    pub fn contains(&self, size: usize) -> bool {
        (self.min_size..=self.max_size).contains(&size)
    }

    /// Whether `size` is one of the canonical puzzle sizes.
    pub fn is_canonical(&self, size: usize) -> bool {
        self.canonical_sizes.contains(&size)
    }
}

/// What a structure probe saw on the live puzzle.
///
/// Several probes may report different cell counts; all of them go into
/// `cell_counts` and [`choose_cell_count`] picks one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructureObservation {
    /// Candidate cell counts, one per probe that found something
    pub cell_counts: Vec<usize>,
    /// Explicitly observed black cells (may be empty)
    pub black_squares: Vec<CellCoord>,
}

impl StructureObservation {
    /// Observation from a single probe.
    pub fn new(cell_count: usize, black_squares: Vec<CellCoord>) -> Self {
        Self {
            cell_counts: vec![cell_count],
            black_squares,
        }
    }
}

/// Integer square root, if `n` is a perfect square.
pub fn perfect_square_root(n: usize) -> Option<usize> {
    let mut root = (n as f64).sqrt() as usize;
    // Correct float rounding in either direction
    while root * root > n {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= n {
        root += 1;
    }
    (root * root == n).then_some(root)
}

/// Pick one cell count among disagreeing candidates.
///
/// Only perfect squares whose root lies within `bounds` are eligible. Among
/// those a canonical size wins, then the larger count. Returns
/// `(count, size)`.
pub fn choose_cell_count(counts: &[usize], bounds: &GridBounds) -> Option<(usize, usize)> {
    counts
        .iter()
        .filter_map(|&count| perfect_square_root(count).map(|size| (count, size)))
        .filter(|&(_, size)| bounds.contains(size))
        .max_by_key(|&(count, size)| (bounds.is_canonical(size), count))
}

/// Direct mode: build a layout from an observation.
///
/// Returns `None` when no candidate count is an in-bounds perfect square, or
/// when an observed black cell lies outside the chosen grid.
pub fn detect_structure(
    observation: &StructureObservation,
    bounds: &GridBounds,
) -> Option<GridLayout> {
    let (_, size) = choose_cell_count(&observation.cell_counts, bounds)?;
    GridLayout::new(size, observation.black_squares.iter().copied()).ok()
}

/// Inferred mode: every cell never targeted by a letter is black.
///
/// This is a closed-world assumption and is only sound on a complete log.
/// On a partial log any cell the solver has not reached yet is reported
/// black as well; callers that care must wait for the final log.
pub fn infer_black_squares(
    size: usize,
    letter_cells: impl IntoIterator<Item = CellCoord>,
) -> BTreeSet<CellCoord> {
    let lettered: BTreeSet<_> = letter_cells.into_iter().filter(|c| c.is_within(size)).collect();
    CellCoord::all(size).filter(|c| !lettered.contains(c)).collect()
}

/// Inferred mode as a layout.
pub fn infer_layout(
    size: usize,
    letter_cells: impl IntoIterator<Item = CellCoord>,
) -> Result<GridLayout> {
    GridLayout::new(size, infer_black_squares(size, letter_cells))
}
