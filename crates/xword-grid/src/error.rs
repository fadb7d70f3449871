//! Error types for xword-grid.

use thiserror::Error;

use crate::CellCoord;

/// Result type for grid operations.
pub type Result<T> = std::result::Result<T, GridError>;

/// Errors that can occur while building a grid layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    /// Grid size must be positive.
    #[error("invalid grid size: {0}")]
    InvalidSize(usize),

    /// A coordinate lies outside the grid.
    #[error("cell {cell} is outside a {size}x{size} grid")]
    CellOutOfBounds { cell: CellCoord, size: usize },
}
