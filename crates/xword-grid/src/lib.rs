//! Crossword Grid Topology
//!
//! Square crossword grids addressed by `(row, col)` and the structure
//! inference that recovers their shape.
//!
//! # Cell classification
//!
//! Every cell of an N×N grid is either *black* (never addressable) or
//! *addressable* (can hold a letter, be selected, be highlighted). The
//! classification is fixed once a [`GridLayout`] is built.
//!
//! # Structure inference
//!
//! Two modes produce a layout:
//!
//! - **Direct**: from an observed cell count plus an explicit black-cell
//!   list. See [`detect_structure`].
//! - **Inferred**: from the letter placements of a finished action log, under
//!   a closed-world assumption. See [`infer_black_squares`].

mod coord;
mod error;
mod inference;
mod layout;

pub use coord::CellCoord;
pub use error::{GridError, Result};
pub use inference::{
    choose_cell_count, detect_structure, infer_black_squares, infer_layout, perfect_square_root,
    GridBounds, StructureObservation,
};
pub use layout::GridLayout;

/// Grid size used by the daily mini puzzle.
pub const MINI_GRID_SIZE: usize = 5;

/// Grid size used by the standard daily puzzle.
pub const DAILY_GRID_SIZE: usize = 15;

/// Smallest grid accepted by default.
pub const MIN_GRID_SIZE: usize = 3;

/// Largest grid accepted by default (Sunday-sized).
pub const MAX_GRID_SIZE: usize = 21;

const _: () = assert!(MIN_GRID_SIZE <= MINI_GRID_SIZE && DAILY_GRID_SIZE <= MAX_GRID_SIZE);
