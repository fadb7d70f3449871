//! In-memory puzzle that behaves like a solving UI, for demos and tests.

use std::sync::{Arc, Mutex, MutexGuard};

use xword_grid::{CellCoord, GridLayout, StructureObservation};

use crate::recording::PuzzleMetadata;
use crate::source::{
    change_feed, CellSource, ChangeFeed, ChangeNotifier, PuzzleObservation, SelectionState,
};

#[derive(Debug)]
struct PuzzleModel {
    layout: GridLayout,
    metadata: PuzzleMetadata,
    letters: Vec<Option<char>>,
    cursor: Option<CellCoord>,
    visible: bool,
    subscribers: Vec<ChangeNotifier>,
}

impl PuzzleModel {
    fn slot(&self, cell: CellCoord) -> usize {
        cell.index(self.layout.size())
    }

    /// Across word containing `cell`: the run of addressable cells in its row.
    fn word(&self, cell: CellCoord) -> Vec<CellCoord> {
        let size = self.layout.size();
        let mut start = cell.col;
        while start > 0 && self.layout.is_addressable(CellCoord::new(cell.row, start - 1)) {
            start -= 1;
        }
        (start..size)
            .map(|col| CellCoord::new(cell.row, col))
            .take_while(|c| self.layout.is_addressable(*c))
            .collect()
    }

    fn highlighted(&self) -> Vec<CellCoord> {
        self.cursor.map(|c| self.word(c)).unwrap_or_default()
    }

    /// Tell subscribers something moved; closed subscriptions are dropped.
    fn changed(&mut self) {
        self.subscribers.retain(|tx| tx.send(()).is_ok());
    }
}

/// A shared handle to a simulated puzzle. Clones see the same puzzle.
///
/// Every mutation sends a change notification to each subscriber, the way a
/// DOM observer fires on each attribute touched.
#[derive(Debug, Clone)]
pub struct SimulatedPuzzle {
    model: Arc<Mutex<PuzzleModel>>,
}

impl SimulatedPuzzle {
    pub fn new(layout: GridLayout) -> Self {
        Self::with_metadata(layout, PuzzleMetadata::default())
    }

    pub fn with_metadata(layout: GridLayout, metadata: PuzzleMetadata) -> Self {
        let letters = vec![None; layout.cell_count()];
        Self {
            model: Arc::new(Mutex::new(PuzzleModel {
                layout,
                metadata,
                letters,
                cursor: None,
                visible: true,
                subscribers: Vec::new(),
            })),
        }
    }

    fn model(&self) -> MutexGuard<'_, PuzzleModel> {
        match self.model.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> ChangeFeed {
        let (tx, rx) = change_feed();
        self.model().subscribers.push(tx);
        rx
    }

    /// Hide or show the grid to structure probes.
    pub fn set_visible(&self, visible: bool) {
        self.model().visible = visible;
    }

    /// Put the cursor on `cell` and highlight its across word.
    pub fn click(&self, cell: CellCoord) {
        let mut model = self.model();
        if model.layout.is_addressable(cell) {
            model.cursor = Some(cell);
            model.changed();
        }
    }

    /// Type at the cursor, then advance within the word.
    pub fn type_letter(&self, letter: char) {
        let mut model = self.model();
        let Some(cell) = model.cursor else { return };
        let slot = model.slot(cell);
        model.letters[slot] = Some(letter.to_ascii_uppercase());
        model.changed();

        let next = CellCoord::new(cell.row, cell.col + 1);
        if model.layout.is_addressable(next) {
            model.cursor = Some(next);
            model.changed();
        }
    }

    /// Clear the cursor cell, or step back and clear if it is already empty.
    pub fn backspace(&self) {
        let mut model = self.model();
        let Some(cell) = model.cursor else { return };
        let slot = model.slot(cell);
        if model.letters[slot].is_some() {
            model.letters[slot] = None;
        } else if cell.col > 0
            && model.layout.is_addressable(CellCoord::new(cell.row, cell.col - 1))
        {
            let prev = CellCoord::new(cell.row, cell.col - 1);
            let prev_slot = model.slot(prev);
            model.cursor = Some(prev);
            model.letters[prev_slot] = None;
        }
        model.changed();
    }

    /// Remove the cursor entirely.
    pub fn blur(&self) {
        let mut model = self.model();
        model.cursor = None;
        model.changed();
    }

    /// Write a letter directly, without moving the cursor.
    pub fn set_letter(&self, cell: CellCoord, letter: Option<char>) {
        let mut model = self.model();
        if model.layout.is_addressable(cell) {
            let slot = model.slot(cell);
            model.letters[slot] = letter.map(|c| c.to_ascii_uppercase());
            model.changed();
        }
    }

    pub fn letter_at(&self, cell: CellCoord) -> Option<char> {
        let model = self.model();
        model.letters.get(model.slot(cell)).copied().flatten()
    }
}

impl CellSource for SimulatedPuzzle {
    type Cell = CellCoord;

    fn observe_structure(&self) -> Option<PuzzleObservation> {
        let model = self.model();
        if !model.visible {
            return None;
        }
        Some(PuzzleObservation {
            structure: StructureObservation::new(
                model.layout.cell_count(),
                model.layout.black_squares().collect(),
            ),
            title: Some(model.metadata.title.clone()).filter(|t| !t.is_empty()),
            date: Some(model.metadata.date.clone()).filter(|d| !d.is_empty()),
            cell_numbers: model.metadata.cell_numbers.clone(),
            clues: model.metadata.clues.clone(),
        })
    }

    fn find_cells(&self) -> Vec<CellCoord> {
        let model = self.model();
        if !model.visible {
            return Vec::new();
        }
        CellCoord::all(model.layout.size()).collect()
    }

    fn cell_text(&self, cell: &CellCoord) -> Option<char> {
        self.letter_at(*cell)
    }

    fn selection_state(&self, cell: &CellCoord) -> SelectionState {
        let model = self.model();
        SelectionState {
            selected: model.cursor == Some(*cell),
            highlighted: model.highlighted().contains(cell),
        }
    }
}
