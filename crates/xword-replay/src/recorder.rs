//! Recording engine.
//!
//! Turns change notifications from a [`CellSource`] into an action log.
//!
//! # Lifecycle
//!
//! `Idle → Recording → Stopped`. Stopped is terminal: the recording has been
//! handed out by value and a new recorder is needed to record again.
//!
//! # Change detection
//!
//! Notifications only arm a debounce window. When the window passes with no
//! further notification, one diff pass compares every addressable cell
//! against the baseline captured at the previous pass and appends an action
//! per difference. The word highlight is diffed as a whole: one
//! `WordHighlighted` action carries the complete new word.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use xword_grid::{detect_structure, CellCoord, GridLayout};

use crate::action::{Action, ActionKind};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::log::ActionLog;
use crate::notify::{Notice, Notifier};
use crate::recording::{PuzzleMetadata, Recording};
use crate::source::{CellSource, SelectionState};

/// Where the recorder is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording,
    Stopped,
}

/// A restartable quiet-period timer.
#[derive(Debug, Clone)]
pub struct Debounce {
    window: Duration,
    deadline: Option<Duration>,
}

impl Debounce {
    pub fn new(window: Duration) -> Self {
        Self { window, deadline: None }
    }

    /// Start the window at `now`, cancelling any pending one.
    pub fn arm(&mut self, now: Duration) {
        self.deadline = Some(now + self.window);
    }

    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Disarm and report true if the window has elapsed.
    pub fn fire_if_due(&mut self, now: Duration) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Last observed state of one cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CellBaseline {
    text: Option<char>,
    selection: SelectionState,
}

/// Per-recording state, dropped at stop.
struct Session<H> {
    recording: Recording,
    log: ActionLog,
    cells: Vec<(CellCoord, H)>,
    baseline: HashMap<CellCoord, CellBaseline>,
    highlighted: Vec<CellCoord>,
    debounce: Debounce,
}

/// Records one solve from a live [`CellSource`].
pub struct Recorder<S: CellSource> {
    source: S,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    config: EngineConfig,
    state: RecorderState,
    session: Option<Session<S::Cell>>,
}

impl<S: CellSource> Recorder<S> {
    /// Create an idle recorder.
    pub fn new(
        source: S,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        config: EngineConfig,
    ) -> Self {
        Self {
            source,
            clock,
            notifier,
            config,
            state: RecorderState::Idle,
            session: None,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub(crate) fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Actions logged so far (empty unless recording).
    pub fn actions(&self) -> &[Action] {
        self.session.as_ref().map_or(&[], |s| s.log.actions())
    }

    /// When the pending debounce window closes, if one is armed.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.session.as_ref().and_then(|s| s.debounce.deadline())
    }

    /// Begin recording.
    ///
    /// Detects the grid, snapshots every cell into the baseline and logs
    /// bootstrap actions for the selection and highlight already on screen,
    /// so the log never depends on out-of-band initial state.
    pub fn start(&mut self) -> Result<()> {
        match self.state {
            RecorderState::Recording => return Err(Error::RecordingAlreadyActive),
            RecorderState::Stopped => return Err(Error::RecorderStopped),
            RecorderState::Idle => {}
        }

        let Some((layout, metadata)) = self.detect() else {
            self.notifier.notify(Notice::StructureNotFound);
            return Err(Error::StructureNotFound);
        };

        let cells = self.collect_cells(&layout);
        if cells.is_empty() {
            self.notifier.notify(Notice::StructureNotFound);
            return Err(Error::StructureNotFound);
        }

        let now = self.clock.now();
        let mut log = ActionLog::new();
        log.start(now);
        let recording = Recording::new(&layout, metadata, Utc::now());

        let mut baseline = HashMap::with_capacity(cells.len());
        let mut highlighted = Vec::new();
        for (coord, handle) in &cells {
            let text = self.read_text(handle);
            let selection = self.source.selection_state(handle);

            if self.config.bootstrap_letters {
                if let Some(letter) = text {
                    log.add_action(now, ActionKind::letter(*coord, letter));
                }
            }
            if selection.selected {
                log.add_action(now, ActionKind::select(*coord));
            }
            if selection.highlighted {
                highlighted.push(*coord);
            }
            baseline.insert(*coord, CellBaseline { text, selection });
        }
        if !highlighted.is_empty() {
            log.add_action(now, ActionKind::highlight(highlighted.clone()));
        }

        tracing::info!(
            grid_size = layout.size(),
            black_squares = layout.black_set().len(),
            bootstrap_actions = log.len(),
            "recording started"
        );
        self.notifier.notify(Notice::RecordingStarted { grid_size: layout.size() });

        self.session = Some(Session {
            recording,
            log,
            cells,
            baseline,
            highlighted,
            debounce: Debounce::new(self.config.debounce),
        });
        self.state = RecorderState::Recording;
        Ok(())
    }

    fn detect(&self) -> Option<(GridLayout, PuzzleMetadata)> {
        let observation = self.source.observe_structure()?;
        let layout = detect_structure(&observation.structure, &self.config.bounds)?;
        let metadata = PuzzleMetadata {
            title: observation.title.unwrap_or_default(),
            date: observation
                .date
                .unwrap_or_else(|| Utc::now().date_naive().to_string()),
            cell_numbers: observation
                .cell_numbers
                .into_iter()
                .filter(|(cell, _)| layout.is_addressable(*cell))
                .collect(),
            clues: observation.clues.sorted(),
        };
        Some((layout, metadata))
    }

    /// Map handles onto addressable coordinates in row-major order.
    fn collect_cells(&self, layout: &GridLayout) -> Vec<(CellCoord, S::Cell)> {
        let handles = self.source.find_cells();
        if handles.len() != layout.cell_count() {
            tracing::warn!(
                found = handles.len(),
                expected = layout.cell_count(),
                "cell count does not match grid size"
            );
        }
        handles
            .into_iter()
            .take(layout.cell_count())
            .enumerate()
            .map(|(i, handle)| (CellCoord::from_index(i, layout.size()), handle))
            .filter(|(coord, _)| layout.is_addressable(*coord))
            .collect()
    }

    fn read_text(&self, handle: &S::Cell) -> Option<char> {
        self.source
            .cell_text(handle)
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_uppercase())
    }

    /// A change notification arrived: restart the debounce window.
    pub fn on_change(&mut self) {
        let now = self.clock.now();
        match self.session.as_mut() {
            Some(session) => session.debounce.arm(now),
            None => tracing::debug!("change notification while not recording"),
        }
    }

    /// Run the diff pass if the debounce window has elapsed. Returns the
    /// number of actions logged.
    pub fn poll(&mut self) -> usize {
        let now = self.clock.now();
        let due = self
            .session
            .as_mut()
            .is_some_and(|s| s.debounce.fire_if_due(now));
        if due {
            self.diff_pass()
        } else {
            0
        }
    }

    /// Cancel any pending window and diff immediately.
    pub fn flush(&mut self) -> usize {
        match self.session.as_mut() {
            Some(session) => session.debounce.disarm(),
            None => return 0,
        }
        self.diff_pass()
    }

    /// Append an action stamped now. Logged no-op when not recording.
    pub fn record(&mut self, kind: ActionKind) -> bool {
        let now = self.clock.now();
        match self.session.as_mut() {
            Some(session) => session.log.add_action(now, kind),
            None => {
                tracing::warn!(kind = kind.name(), "not recording; dropping action");
                false
            }
        }
    }

    /// Compare the live puzzle with the baseline and log the differences.
    fn diff_pass(&mut self) -> usize {
        let now = self.clock.now();
        let source = &self.source;
        let Some(session) = self.session.as_mut() else {
            return 0;
        };
        let before = session.log.len();

        let mut current = Vec::with_capacity(session.cells.len());
        for (coord, handle) in &session.cells {
            let text = source
                .cell_text(handle)
                .filter(|c| !c.is_whitespace())
                .map(|c| c.to_ascii_uppercase());
            let selection = source.selection_state(handle);
            current.push((*coord, CellBaseline { text, selection }));
        }

        // Letters first, then cursor moves, then the word highlight
        for (coord, now_cell) in &current {
            let previous = session.baseline.get(coord).copied().unwrap_or_default();
            if now_cell.text != previous.text {
                let kind = match now_cell.text {
                    Some(letter) => ActionKind::letter(*coord, letter),
                    None => ActionKind::delete(*coord),
                };
                session.log.add_action(now, kind);
            }
        }

        let mut highlighted = Vec::new();
        for (coord, now_cell) in &current {
            let previous = session.baseline.get(coord).copied().unwrap_or_default();
            if now_cell.selection.selected != previous.selection.selected {
                let kind = if now_cell.selection.selected {
                    ActionKind::select(*coord)
                } else {
                    ActionKind::deselect(*coord)
                };
                session.log.add_action(now, kind);
            }
            if now_cell.selection.highlighted {
                highlighted.push(*coord);
            }
        }

        if highlighted != session.highlighted {
            let kind = if highlighted.is_empty() {
                ActionKind::clear_highlight()
            } else {
                ActionKind::highlight(highlighted.clone())
            };
            session.log.add_action(now, kind);
            session.highlighted = highlighted;
        }

        session.baseline.extend(current);

        let emitted = session.log.len() - before;
        if emitted > 0 {
            tracing::debug!(emitted, at_ms = session.log.elapsed_ms(now), "diff pass");
        }
        emitted
    }

    /// Stop recording and hand over the finished recording.
    ///
    /// A pending debounce window is flushed first, then disarmed; nothing
    /// fires after this returns. Calling again is a no-op error.
    pub fn stop(&mut self) -> Result<Recording> {
        if self.state != RecorderState::Recording {
            tracing::debug!(state = ?self.state, "stop while not recording");
            return Err(Error::RecordingNotActive);
        }
        self.flush();

        let now = self.clock.now();
        let Some(mut session) = self.session.take() else {
            return Err(Error::RecordingNotActive);
        };
        session.debounce.disarm();
        let total_time = session.log.freeze(now).unwrap_or(0.0);

        let mut recording = session.recording;
        recording.actions = session.log.into_actions();
        recording.total_time = total_time;
        self.state = RecorderState::Stopped;

        self.notifier.notify(Notice::RecordingStopped {
            total_time_ms: total_time,
            action_count: recording.actions.len(),
        });
        Ok(recording)
    }

    /// The puzzle reported itself solved: log `Complete` and stop.
    pub fn complete(&mut self, message: impl Into<String>) -> Result<Recording> {
        if self.state != RecorderState::Recording {
            return Err(Error::RecordingNotActive);
        }
        // Capture the final keystrokes before the completion marker
        self.flush();
        self.record(ActionKind::complete(message));
        self.stop()
    }
}
