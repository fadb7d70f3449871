//! Rendered grid state and the action-application function.
//!
//! Playback and seek share [`GridState::apply`]: playback applies one action
//! at a time as the clock passes it, seek rebuilds from a blank grid by
//! applying a prefix of the log. Render commands come from diffing two
//! states, so both paths draw the same way.

use serde::Serialize;
use xword_grid::{CellCoord, GridLayout};

use crate::action::{Action, ActionKind, HighlightOp, SelectOp};
use crate::error::{Error, Result};
use crate::render::RenderCommand;

/// Visual state of one cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CellView {
    pub black: bool,
    pub number: Option<u32>,
    pub letter: Option<char>,
    pub selected: bool,
    pub highlighted: bool,
}

/// Visual state of the whole grid at one point in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridState {
    size: usize,
    cells: Vec<CellView>,
    completed: bool,
}

impl GridState {
    /// Blank grid: no letters, no selection, no highlight.
    pub fn blank(layout: &GridLayout) -> Self {
        let cells = CellCoord::all(layout.size())
            .map(|cell| CellView {
                black: layout.is_black(cell),
                ..CellView::default()
            })
            .collect();
        Self {
            size: layout.size(),
            cells,
            completed: false,
        }
    }

    /// Attach clue numbers to addressable cells.
    pub fn with_numbers<'a>(
        mut self,
        numbers: impl IntoIterator<Item = (&'a CellCoord, &'a u32)>,
    ) -> Self {
        for (cell, &number) in numbers {
            if let Some(view) = self.cell_mut(*cell) {
                if !view.black {
                    view.number = Some(number);
                }
            }
        }
        self
    }

    /// Rebuild the state after the first `up_to` actions, starting from
    /// `blank`. Returns the state and how many actions were skipped as
    /// malformed.
    pub fn from_actions(blank: &GridState, actions: &[Action], up_to: usize) -> (Self, usize) {
        let mut grid = blank.clone();
        let mut skipped = 0;
        for (index, action) in actions.iter().take(up_to).enumerate() {
            if let Err(e) = grid.apply_in_place(action) {
                tracing::warn!(index, error = %e, "skipping action");
                skipped += 1;
            }
        }
        (grid, skipped)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn cell(&self, cell: CellCoord) -> Option<&CellView> {
        cell.is_within(self.size).then(|| &self.cells[cell.index(self.size)])
    }

    fn cell_mut(&mut self, cell: CellCoord) -> Option<&mut CellView> {
        if cell.is_within(self.size) {
            Some(&mut self.cells[cell.index(self.size)])
        } else {
            None
        }
    }

    pub fn letter_at(&self, cell: CellCoord) -> Option<char> {
        self.cell(cell).and_then(|c| c.letter)
    }

    pub fn is_black(&self, cell: CellCoord) -> bool {
        self.cell(cell).is_some_and(|c| c.black)
    }

    /// Whether a `Complete` action has been applied.
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Cells and their views in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (CellCoord, &CellView)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, view)| (CellCoord::from_index(i, self.size), view))
    }

    pub fn selected_cells(&self) -> Vec<CellCoord> {
        self.cells().filter(|(_, v)| v.selected).map(|(c, _)| c).collect()
    }

    pub fn highlighted_cells(&self) -> Vec<CellCoord> {
        self.cells().filter(|(_, v)| v.highlighted).map(|(c, _)| c).collect()
    }

    /// Apply one action, returning the new state.
    ///
    /// The receiver is left untouched. A malformed action (target outside
    /// the grid or on a black cell, unusable letter) is an error and the
    /// caller skips it.
    pub fn apply(&self, action: &Action) -> Result<GridState> {
        let mut next = self.clone();
        next.apply_in_place(action)?;
        Ok(next)
    }

    /// Validate then mutate; on error nothing has changed.
    pub(crate) fn apply_in_place(&mut self, action: &Action) -> Result<()> {
        match &action.kind {
            ActionKind::CellSelected { row, col, op } => {
                let cell = self.addressable(CellCoord::new(*row, *col))?;
                match op {
                    SelectOp::Select => {
                        // One cursor at a time
                        for view in &mut self.cells {
                            view.selected = false;
                        }
                        self.cells[cell].selected = true;
                    }
                    SelectOp::Deselect => self.cells[cell].selected = false,
                }
            }
            ActionKind::WordHighlighted { cells, op } => {
                let targets = match op {
                    HighlightOp::Highlight => {
                        if let Some(bad) = cells.iter().find(|c| !c.is_within(self.size)) {
                            return Err(Error::MalformedAction(format!(
                                "highlight cell {bad} outside grid"
                            )));
                        }
                        cells
                            .iter()
                            .map(|c| c.index(self.size))
                            .filter(|&i| !self.cells[i].black)
                            .collect::<Vec<_>>()
                    }
                    HighlightOp::Clear => Vec::new(),
                };
                for view in &mut self.cells {
                    view.highlighted = false;
                }
                for i in targets {
                    self.cells[i].highlighted = true;
                }
            }
            ActionKind::Letter { row, col, letter } => {
                if letter.is_whitespace() || letter.is_control() {
                    return Err(Error::MalformedAction(format!("unusable letter {letter:?}")));
                }
                let cell = self.addressable(CellCoord::new(*row, *col))?;
                self.cells[cell].letter = Some(letter.to_ascii_uppercase());
            }
            ActionKind::Delete { row, col } => {
                let cell = self.addressable(CellCoord::new(*row, *col))?;
                self.cells[cell].letter = None;
            }
            ActionKind::Complete { .. } => self.completed = true,
        }
        Ok(())
    }

    fn addressable(&self, cell: CellCoord) -> Result<usize> {
        match self.cell(cell) {
            None => Err(Error::MalformedAction(format!(
                "cell {cell} outside {0}x{0} grid",
                self.size
            ))),
            Some(view) if view.black => {
                Err(Error::MalformedAction(format!("cell {cell} is black")))
            }
            Some(_) => Ok(cell.index(self.size)),
        }
    }

    /// Commands that turn a display showing `previous` into one showing
    /// `self`.
    ///
    /// Completion is a one-shot notice: it is emitted only when this state
    /// is completed and `previous` was not.
    pub fn changes_since(&self, previous: &GridState, completion_ms: u64) -> Vec<RenderCommand> {
        let mut commands = Vec::new();
        let mut unlit = Vec::new();
        let mut lit = Vec::new();

        for (i, (now, before)) in self.cells.iter().zip(&previous.cells).enumerate() {
            let cell = CellCoord::from_index(i, self.size);
            if now.letter != before.letter {
                commands.push(RenderCommand::SetCellLetter {
                    row: cell.row,
                    col: cell.col,
                    letter: now.letter,
                });
            }
            if now.selected != before.selected {
                commands.push(RenderCommand::SetCellSelected {
                    row: cell.row,
                    col: cell.col,
                    selected: now.selected,
                });
            }
            match (before.highlighted, now.highlighted) {
                (true, false) => unlit.push(cell),
                (false, true) => lit.push(cell),
                _ => {}
            }
        }

        if !unlit.is_empty() {
            commands.push(RenderCommand::SetCellHighlighted { cells: unlit, highlighted: false });
        }
        if !lit.is_empty() {
            commands.push(RenderCommand::SetCellHighlighted { cells: lit, highlighted: true });
        }
        if self.completed && !previous.completed {
            commands.push(RenderCommand::ShowCompletion { duration_ms: completion_ms });
        }
        commands
    }
}
