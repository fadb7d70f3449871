//! The recording aggregate: puzzle structure, metadata and the action log.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use xword_grid::{infer_black_squares, CellCoord, GridLayout};

use crate::action::{self, Action};
use crate::error::{Error, Result};

/// One clue in a direction list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clue {
    pub number: u32,
    pub text: String,
}

/// Across and down clue lists, each ordered by number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clues {
    #[serde(default)]
    pub across: Vec<Clue>,
    #[serde(default)]
    pub down: Vec<Clue>,
}

impl Clues {
    /// Sort both lists by clue number.
    pub fn sorted(mut self) -> Self {
        self.across.sort_by_key(|c| c.number);
        self.down.sort_by_key(|c| c.number);
        self
    }
}

/// Descriptive puzzle data captured once at recording start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PuzzleMetadata {
    pub title: String,
    pub date: String,
    pub cell_numbers: BTreeMap<CellCoord, u32>,
    pub clues: Clues,
}

/// A finished (or in-progress) solve recording.
///
/// Owned by the recorder until stop; afterwards a read-only value handed to
/// persistence and any number of replays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    pub grid_size: usize,
    #[serde(default, with = "coord_pairs")]
    pub black_squares: BTreeSet<CellCoord>,
    #[serde(default, with = "cell_number_list")]
    pub cell_numbers: BTreeMap<CellCoord, u32>,
    #[serde(default)]
    pub puzzle_title: String,
    #[serde(default)]
    pub puzzle_date: String,
    #[serde(default)]
    pub clues: Clues,
    #[serde(deserialize_with = "action::deserialize_lenient")]
    pub actions: Vec<Action>,
    pub start_time: DateTime<Utc>,
    /// Total solve time in milliseconds
    #[serde(default)]
    pub total_time: f64,
}

impl Recording {
    /// An empty recording for `layout`, started at `start_time`.
    pub fn new(layout: &GridLayout, metadata: PuzzleMetadata, start_time: DateTime<Utc>) -> Self {
        Self {
            grid_size: layout.size(),
            black_squares: layout.black_set().clone(),
            cell_numbers: metadata.cell_numbers,
            puzzle_title: metadata.title,
            puzzle_date: metadata.date,
            clues: metadata.clues,
            actions: Vec::new(),
            start_time,
            total_time: 0.0,
        }
    }

    /// Grid layout from the recorded size and black squares.
    pub fn layout(&self) -> Result<GridLayout> {
        Ok(GridLayout::new(self.grid_size, self.black_squares.iter().copied())?)
    }

    /// Cells that received a letter at any point in the log.
    pub fn letter_cells(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.actions.iter().filter_map(Action::letter_target)
    }

    /// Black squares inferred from the log (closed world, see
    /// [`xword_grid::infer_black_squares`]).
    pub fn inferred_black_squares(&self) -> BTreeSet<CellCoord> {
        infer_black_squares(self.grid_size, self.letter_cells())
    }

    /// Playable length: the recorded total, or the last action if later.
    pub fn duration_ms(&self) -> f64 {
        let last = self.actions.last().map_or(0.0, |a| a.ms);
        self.total_time.max(last)
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// Check the invariants a replay relies on.
    pub fn validate(&self) -> Result<()> {
        if self.grid_size == 0 {
            return Err(Error::InvalidRecording("grid size must be positive".into()));
        }
        if !self.total_time.is_finite() || self.total_time < 0.0 {
            return Err(Error::InvalidRecording(format!("invalid total time {}", self.total_time)));
        }
        self.layout()?;
        Ok(())
    }

    /// Parse a plain JSON recording.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Black squares as `[[row, col], ...]`.
mod coord_pairs {
    use std::collections::BTreeSet;

    use serde::{Deserialize, Deserializer, Serializer};
    use xword_grid::CellCoord;

    pub fn serialize<S: Serializer>(
        cells: &BTreeSet<CellCoord>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(cells.iter().map(|c| [c.row, c.col]))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeSet<CellCoord>, D::Error> {
        let pairs = Vec::<[usize; 2]>::deserialize(deserializer)?;
        Ok(pairs.into_iter().map(|[row, col]| CellCoord::new(row, col)).collect())
    }
}

/// Cell numbers as `[{row, col, number}, ...]`.
mod cell_number_list {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use xword_grid::CellCoord;

    #[derive(Serialize, Deserialize)]
    struct CellNumber {
        row: usize,
        col: usize,
        number: u32,
    }

    pub fn serialize<S: Serializer>(
        numbers: &BTreeMap<CellCoord, u32>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(numbers.iter().map(|(cell, &number)| CellNumber {
            row: cell.row,
            col: cell.col,
            number,
        }))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<CellCoord, u32>, D::Error> {
        let list = Vec::<CellNumber>::deserialize(deserializer)?;
        Ok(list
            .into_iter()
            .map(|n| (CellCoord::new(n.row, n.col), n.number))
            .collect())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::action::ActionKind;
    use serde_json::json;

    /// The three-action mini used across the replay tests.
    pub(crate) fn scenario_recording() -> Recording {
        let layout = GridLayout::open(5).unwrap();
        let mut recording = Recording::new(&layout, PuzzleMetadata::default(), Utc::now());
        recording.actions = vec![
            Action::new(0.0, ActionKind::letter(CellCoord::new(0, 0), 'C')),
            Action::new(500.0, ActionKind::letter(CellCoord::new(0, 1), 'A')),
            Action::new(1000.0, ActionKind::complete("Puzzle completed!")),
        ];
        recording.total_time = 1000.0;
        recording
    }

    #[test]
    fn json_uses_camel_case_and_pairs() {
        let mut recording = scenario_recording();
        recording.black_squares.insert(CellCoord::new(4, 0));
        recording.cell_numbers.insert(CellCoord::new(0, 0), 1);

        let value = serde_json::to_value(&recording).unwrap();
        assert_eq!(value["gridSize"], 5);
        assert_eq!(value["blackSquares"], json!([[4, 0]]));
        assert_eq!(value["cellNumbers"], json!([{"row": 0, "col": 0, "number": 1}]));
        assert_eq!(value["totalTime"], 1000.0);
        assert_eq!(value["actions"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn json_round_trip() {
        let mut recording = scenario_recording();
        recording.clues.across.push(Clue { number: 1, text: "Feline".into() });
        let text = recording.to_json().unwrap();
        assert_eq!(Recording::from_json(&text).unwrap(), recording);
    }

    #[test]
    fn missing_actions_is_an_error() {
        let text = json!({"gridSize": 5, "startTime": "2024-01-01T00:00:00Z"}).to_string();
        assert!(Recording::from_json(&text).is_err());
    }

    #[test]
    fn inferred_black_squares_from_letters() {
        let recording = scenario_recording();
        let black = recording.inferred_black_squares();
        assert_eq!(black.len(), 23);
        assert!(!black.contains(&CellCoord::new(0, 0)));
        assert!(!black.contains(&CellCoord::new(0, 1)));
    }

    #[test]
    fn duration_covers_late_actions() {
        let mut recording = scenario_recording();
        recording.total_time = 800.0;
        assert_eq!(recording.duration_ms(), 1000.0);
    }

    #[test]
    fn validate_rejects_bad_structure() {
        let mut recording = scenario_recording();
        recording.grid_size = 0;
        assert!(matches!(recording.validate(), Err(Error::InvalidRecording(_))));

        let mut recording = scenario_recording();
        recording.black_squares.insert(CellCoord::new(9, 9));
        assert!(matches!(recording.validate(), Err(Error::Grid(_))));

        let mut recording = scenario_recording();
        recording.total_time = f64::NAN;
        assert!(recording.validate().is_err());
    }

    #[test]
    fn clues_sort_by_number() {
        let clues = Clues {
            across: vec![
                Clue { number: 6, text: "b".into() },
                Clue { number: 1, text: "a".into() },
            ],
            down: vec![],
        }
        .sorted();
        assert_eq!(clues.across[0].number, 1);
    }
}
