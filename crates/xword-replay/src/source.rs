//! The recorder's view of a live puzzle.
//!
//! A [`CellSource`] is whatever can read the puzzle being solved: a page
//! scraper, a terminal game, a simulation. The recorder is generic over it
//! and assumes nothing about the underlying structure.

use std::collections::BTreeMap;

use tokio::sync::mpsc;
use xword_grid::{CellCoord, StructureObservation};

use crate::recording::Clues;

/// Cursor and word-highlight flags of one cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub selected: bool,
    pub highlighted: bool,
}

/// Everything a structure probe could read off the puzzle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PuzzleObservation {
    pub structure: StructureObservation,
    pub title: Option<String>,
    pub date: Option<String>,
    pub cell_numbers: BTreeMap<CellCoord, u32>,
    pub clues: Clues,
}

/// Capability set the recorder needs from a live puzzle.
pub trait CellSource {
    /// Opaque handle to one grid cell.
    type Cell;

    /// Probe the puzzle structure. `None` when nothing grid-like is found.
    fn observe_structure(&self) -> Option<PuzzleObservation>;

    /// Every grid cell in row-major order, black cells included.
    fn find_cells(&self) -> Vec<Self::Cell>;

    /// Current letter in the cell, if any.
    fn cell_text(&self, cell: &Self::Cell) -> Option<char>;

    fn selection_state(&self, cell: &Self::Cell) -> SelectionState;
}

/// Receiving end of a change-notification subscription.
///
/// Each `()` means "something may have changed"; the recorder debounces
/// them. Closing the sender ends the subscription.
pub type ChangeFeed = mpsc::UnboundedReceiver<()>;

/// Sending end handed to whatever observes the live puzzle.
pub type ChangeNotifier = mpsc::UnboundedSender<()>;

/// Create a change-notification subscription.
pub fn change_feed() -> (ChangeNotifier, ChangeFeed) {
    mpsc::unbounded_channel()
}
