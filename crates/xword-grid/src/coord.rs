//! Cell coordinates on a square grid.
//!
//! Cells are addressed by `(row, col)` with row-major linear indices, so the
//! i-th cell of an N×N grid sits at `(i / N, i % N)`.

/// A cell position in a square grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellCoord {
    /// Row, counted from the top
    pub row: usize,
    /// Column, counted from the left
    pub col: usize,
}

impl CellCoord {
    /// Top-left cell.
    pub const ORIGIN: Self = Self { row: 0, col: 0 };

    /// Create a new coordinate.
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Coordinate of the `index`-th cell in row-major order.
    ///
    /// `size` must be positive.
    pub const fn from_index(index: usize, size: usize) -> Self {
        Self {
            row: index / size,
            col: index % size,
        }
    }

    /// Row-major linear index of this cell.
    pub const fn index(&self, size: usize) -> usize {
        self.row * size + self.col
    }

    /// Whether the cell lies inside a `size`×`size` grid.
    pub const fn is_within(&self, size: usize) -> bool {
        self.row < size && self.col < size
    }

    /// Iterate every cell of a `size`×`size` grid in row-major order.
    ///
    /// Yields nothing when `size²` does not fit in a `usize`.
    pub fn all(size: usize) -> impl Iterator<Item = Self> {
        let count = size.checked_mul(size).unwrap_or(0);
        (0..count).map(move |i| Self::from_index(i, size))
    }
}

impl From<(usize, usize)> for CellCoord {
    fn from((row, col): (usize, usize)) -> Self {
        Self { row, col }
    }
}

impl std::fmt::Display for CellCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_round_trips() {
        for size in 1..=21 {
            for i in 0..size * size {
                let cell = CellCoord::from_index(i, size);
                assert!(cell.is_within(size));
                assert_eq!(cell.index(size), i);
            }
        }
    }

    #[test]
    fn row_major_order() {
        let cells: Vec<_> = CellCoord::all(3).collect();
        assert_eq!(cells.len(), 9);
        assert_eq!(cells[0], CellCoord::ORIGIN);
        assert_eq!(cells[2], CellCoord::new(0, 2));
        assert_eq!(cells[3], CellCoord::new(1, 0));
        assert_eq!(cells[8], CellCoord::new(2, 2));

        // Sorting matches row-major order
        let mut sorted = cells.clone();
        sorted.sort();
        assert_eq!(sorted, cells);
    }

    #[test]
    fn all_on_overflowing_size_is_empty() {
        assert_eq!(CellCoord::all(1 << 32).next(), None);
        assert_eq!(CellCoord::all(0).count(), 0);
    }

    #[test]
    fn bounds_check() {
        assert!(CellCoord::new(4, 4).is_within(5));
        assert!(!CellCoord::new(5, 0).is_within(5));
        assert!(!CellCoord::new(0, 5).is_within(5));
    }

    #[test]
    fn display() {
        assert_eq!(CellCoord::new(2, 3).to_string(), "(2, 3)");
    }
}
