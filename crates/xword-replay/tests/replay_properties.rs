//! Property tests for replay determinism.

use std::time::Duration;

use chrono::{DateTime, Utc};
use proptest::prelude::*;
use xword_grid::{CellCoord, GridLayout};
use xword_replay::document::{decode, encode};
use xword_replay::{
    Action, ActionKind, Clue, CommandBuffer, EngineConfig, PlaybackState, PuzzleMetadata, Recording,
    RenderCommand, Replay,
};

const SIZE: usize = 5;
const QUANTUM: Duration = Duration::from_millis(100);

fn layout() -> GridLayout {
    let black = [CellCoord::new(0, 4), CellCoord::new(2, 2), CellCoord::new(4, 0)];
    GridLayout::new(SIZE, black).unwrap()
}

fn start_time() -> DateTime<Utc> {
    "2024-03-01T12:00:00Z".parse().unwrap()
}

/// Cells including one row past the edge, so some actions are malformed.
fn arb_cell() -> impl Strategy<Value = CellCoord> {
    (0..SIZE + 1, 0..SIZE).prop_map(|(row, col)| CellCoord::new(row, col))
}

fn arb_kind() -> impl Strategy<Value = ActionKind> {
    prop_oneof![
        4 => (arb_cell(), prop::char::range('A', 'Z'))
            .prop_map(|(cell, letter)| ActionKind::letter(cell, letter)),
        2 => arb_cell().prop_map(ActionKind::delete),
        2 => arb_cell().prop_map(ActionKind::select),
        1 => arb_cell().prop_map(ActionKind::deselect),
        1 => (0..SIZE).prop_map(|row| {
            ActionKind::highlight((0..SIZE).map(|col| CellCoord::new(row, col)).collect())
        }),
        1 => Just(ActionKind::clear_highlight()),
        1 => Just(ActionKind::complete("Puzzle completed!")),
    ]
}

/// Recordings whose action times sit either on whole milliseconds (often
/// on a tick boundary) or on half milliseconds.
fn arb_recording() -> impl Strategy<Value = Recording> {
    (
        prop::collection::vec(
            (prop_oneof![0u32..400, (0u32..4).prop_map(|n| n * 100)], arb_kind()),
            0..40,
        ),
        0u32..500,
        prop_oneof![Just(0.0), Just(0.5)],
    )
        .prop_map(|(steps, tail, offset)| {
            let mut recording = Recording::new(&layout(), PuzzleMetadata::default(), start_time());
            let mut elapsed = 0.0;
            for (gap, kind) in steps {
                elapsed += f64::from(gap);
                recording.actions.push(Action::new(elapsed + offset, kind));
            }
            recording.total_time =
                recording.actions.last().map_or(0.0, |a| a.ms) + f64::from(tail);
            recording
        })
}

fn loaded(recording: Recording) -> Replay<CommandBuffer> {
    let mut replay = Replay::new(CommandBuffer::new(), EngineConfig::default());
    replay.load(recording).unwrap();
    replay
}

fn is_cell_command(command: &RenderCommand) -> bool {
    matches!(
        command,
        RenderCommand::SetCellLetter { .. }
            | RenderCommand::SetCellSelected { .. }
            | RenderCommand::SetCellHighlighted { .. }
            | RenderCommand::ShowCompletion { .. }
    )
}

proptest! {
    #[test]
    fn seek_is_idempotent(recording in arb_recording(), fraction in 0.0f64..=1.0) {
        let mut replay = loaded(recording);
        replay.seek(fraction);
        let first = replay.grid().unwrap().clone();
        replay.sink_mut().take();

        replay.seek(fraction);
        prop_assert_eq!(replay.grid().unwrap(), &first);
        prop_assert!(!replay.sink().commands().iter().any(is_cell_command));
    }

    #[test]
    fn seek_matches_playback(recording in arb_recording(), ticks in 0usize..60) {
        let mut played = loaded(recording.clone());
        played.play();
        for _ in 0..ticks {
            if played.tick(QUANTUM) != PlaybackState::Playing {
                break;
            }
        }

        let mut sought = loaded(recording);
        let duration = sought.duration_ms();
        if duration > 0.0 {
            sought.seek(played.position_ms() / duration);
        }

        // An empty log never moves off a blank grid either way
        prop_assert_eq!(played.grid().unwrap(), sought.grid().unwrap());
    }

    #[test]
    fn playback_applies_each_action_once(recording in arb_recording()) {
        let total = recording.actions.len();
        let has_complete = recording.actions.iter().any(Action::is_complete);
        let mut replay = loaded(recording);
        replay.play();

        let mut last = replay.next_action_index();
        let mut ticks = 0;
        while replay.tick(QUANTUM) == PlaybackState::Playing {
            prop_assert!(replay.next_action_index() >= last);
            last = replay.next_action_index();
            ticks += 1;
            prop_assert!(ticks < 10_000);
        }

        prop_assert_eq!(replay.state(), PlaybackState::Finished);
        prop_assert_eq!(replay.next_action_index(), total);
        prop_assert_eq!(replay.sink().completions(), usize::from(has_complete));
    }

    #[test]
    fn black_squares_never_change(
        recording in arb_recording(),
        fractions in prop::collection::vec(0.0f64..=1.0, 1..8),
    ) {
        let layout = layout();
        let mut replay = loaded(recording);
        for fraction in fractions {
            replay.seek(fraction);
            replay.play();
            replay.tick(QUANTUM);
            for (cell, view) in replay.grid().unwrap().cells() {
                prop_assert_eq!(view.black, layout.is_black(cell));
                if view.black {
                    prop_assert!(view.letter.is_none() && !view.selected && !view.highlighted);
                }
            }
        }
    }

    #[test]
    fn document_round_trip(
        mut recording in arb_recording(),
        title in "[A-Za-z ]{0,20}",
        clues in prop::collection::vec((1u32..30, "[a-z ]{1,12}"), 0..6),
    ) {
        recording.puzzle_title = title;
        recording.puzzle_date = "2024-03-01".into();
        recording.cell_numbers.insert(CellCoord::new(0, 0), 1);
        recording.cell_numbers.insert(CellCoord::new(1, 3), 5);
        recording.clues.across = clues
            .into_iter()
            .map(|(number, text)| Clue { number, text })
            .collect();

        let document = encode(&recording).unwrap();
        prop_assert_eq!(decode(&document).unwrap(), recording);
    }
}
