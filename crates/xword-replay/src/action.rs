//! Recorded actions: the unit of history in a recording.
//!
//! Actions serialize flat, with the kind in a `type` tag and the timestamp in
//! `ms`, e.g. `{"ms": 500.0, "type": "letter", "row": 0, "col": 1, "letter": "A"}`.

use serde::{Deserialize, Deserializer, Serialize};
use xword_grid::CellCoord;

/// Selection change on a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectOp {
    Select,
    Deselect,
}

/// Word highlight change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightOp {
    /// Replace the highlighted word with `cells`
    Highlight,
    /// Remove every highlight
    Clear,
}

/// What happened, and where.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ActionKind {
    /// A cell gained or lost the cursor
    #[serde(rename = "select")]
    CellSelected {
        row: usize,
        col: usize,
        #[serde(rename = "action")]
        op: SelectOp,
    },

    /// The highlighted word changed; `cells` is the whole new word
    #[serde(rename = "highlight")]
    WordHighlighted {
        #[serde(default)]
        cells: Vec<CellCoord>,
        #[serde(rename = "action")]
        op: HighlightOp,
    },

    /// A letter was typed (or overwritten) in a cell
    Letter { row: usize, col: usize, letter: char },

    /// A cell was emptied
    #[serde(alias = "clear")]
    Delete { row: usize, col: usize },

    /// The puzzle reported itself solved
    Complete {
        #[serde(default)]
        message: String,
    },
}

impl ActionKind {
    pub fn select(cell: CellCoord) -> Self {
        Self::CellSelected { row: cell.row, col: cell.col, op: SelectOp::Select }
    }

    pub fn deselect(cell: CellCoord) -> Self {
        Self::CellSelected { row: cell.row, col: cell.col, op: SelectOp::Deselect }
    }

    pub fn highlight(cells: Vec<CellCoord>) -> Self {
        Self::WordHighlighted { cells, op: HighlightOp::Highlight }
    }

    pub fn clear_highlight() -> Self {
        Self::WordHighlighted { cells: Vec::new(), op: HighlightOp::Clear }
    }

    pub fn letter(cell: CellCoord, letter: char) -> Self {
        Self::Letter { row: cell.row, col: cell.col, letter }
    }

    pub fn delete(cell: CellCoord) -> Self {
        Self::Delete { row: cell.row, col: cell.col }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self::Complete { message: message.into() }
    }

    /// The single cell this action targets, if it targets exactly one.
    pub fn target(&self) -> Option<CellCoord> {
        match self {
            Self::CellSelected { row, col, .. }
            | Self::Letter { row, col, .. }
            | Self::Delete { row, col } => Some(CellCoord::new(*row, *col)),
            Self::WordHighlighted { .. } | Self::Complete { .. } => None,
        }
    }

    /// Short name of the kind, as used in the `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CellSelected { .. } => "select",
            Self::WordHighlighted { .. } => "highlight",
            Self::Letter { .. } => "letter",
            Self::Delete { .. } => "delete",
            Self::Complete { .. } => "complete",
        }
    }
}

/// One timestamped entry of the action log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Milliseconds since recording start
    pub ms: f64,
    #[serde(flatten)]
    pub kind: ActionKind,
}

impl Action {
    /// Create an action at `ms` milliseconds into the recording.
    pub fn new(ms: f64, kind: ActionKind) -> Self {
        Self { ms, kind }
    }

    /// The cell a `Letter` action fills.
    pub fn letter_target(&self) -> Option<CellCoord> {
        match self.kind {
            ActionKind::Letter { row, col, .. } => Some(CellCoord::new(row, col)),
            _ => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.kind, ActionKind::Complete { .. })
    }
}

/// Deserialize an action list, dropping entries that do not decode.
///
/// One unreadable action must not void a whole recording; each dropped
/// entry is logged with its position.
pub(crate) fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Vec<Action>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    let mut actions = Vec::with_capacity(raw.len());
    for (index, value) in raw.into_iter().enumerate() {
        match serde_json::from_value::<Action>(value) {
            Ok(action) if action.ms.is_finite() && action.ms >= 0.0 => actions.push(action),
            Ok(action) => {
                tracing::warn!(index, ms = action.ms, "dropping action with invalid timestamp");
            }
            Err(e) => {
                tracing::warn!(index, error = %e, "dropping malformed action");
            }
        }
    }
    Ok(actions)
}
