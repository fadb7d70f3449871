//! Replay engine: plays a recording back onto a render sink.
//!
//! The logical clock only moves on [`Replay::tick`]; whoever owns the engine
//! decides how often to call it (see [`crate::driver::PlaybackDriver`]).
//! Seeking rebuilds the grid from blank by re-applying a prefix of the log,
//! because actions have no inverse.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use xword_grid::GridLayout;

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::grid_state::GridState;
use crate::recording::Recording;
use crate::render::{format_clock, RenderCommand, RenderSink};

/// Current state of playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    /// No recording loaded yet
    Loading,
    /// Loaded, clock at zero, never played
    Ready,
    /// Clock advancing on each tick
    Playing,
    /// Clock frozen
    Paused,
    /// Every action has been applied
    Finished,
}

/// Everything that exists once a recording is loaded.
struct Loaded {
    recording: Recording,
    blank: GridState,
    grid: GridState,
    /// Actions dropped at load for going back in time
    dropped: usize,
    /// Malformed actions skipped in the applied prefix
    skipped: usize,
}

/// Replay controller for one recording.
pub struct Replay<R: RenderSink> {
    sink: R,
    config: EngineConfig,
    loaded: Option<Loaded>,
    state: PlaybackState,
    position_ms: f64,
    next_index: usize,
    speed: f64,
}

impl<R: RenderSink> Replay<R> {
    /// Create an empty controller drawing into `sink`.
    pub fn new(sink: R, config: EngineConfig) -> Self {
        Self {
            sink,
            config,
            loaded: None,
            state: PlaybackState::Loading,
            position_ms: 0.0,
            next_index: 0,
            speed: 1.0,
        }
    }

    /// Load a recording, replacing any previous one.
    ///
    /// Out-of-order actions are dropped. An empty black-square list is
    /// backfilled from the letters in the log. The grid skeleton is drawn
    /// once here and its black cells never change afterwards.
    pub fn load(&mut self, mut recording: Recording) -> Result<()> {
        let bounds = &self.config.bounds;
        if !bounds.contains(recording.grid_size) {
            return Err(Error::InvalidRecording(format!(
                "grid size {} outside {}..={}",
                recording.grid_size, bounds.min_size, bounds.max_size
            )));
        }
        recording.validate()?;

        let before = recording.actions.len();
        let mut floor = 0.0;
        recording.actions.retain(|action| {
            let in_order = action.ms >= floor;
            if in_order {
                floor = action.ms;
            } else {
                tracing::warn!(
                    ms = action.ms,
                    floor,
                    kind = action.kind.name(),
                    "dropping out-of-order action"
                );
            }
            in_order
        });
        let dropped = before - recording.actions.len();

        if recording.black_squares.is_empty() {
            if recording.letter_cells().next().is_some() {
                recording.black_squares = recording.inferred_black_squares();
                tracing::debug!(
                    inferred = recording.black_squares.len(),
                    "black squares inferred from letters"
                );
            } else {
                tracing::warn!("no black squares and no letters; treating grid as open");
            }
        }

        let layout = GridLayout::new(recording.grid_size, recording.black_squares.iter().copied())?;
        let blank = GridState::blank(&layout).with_numbers(&recording.cell_numbers);

        self.sink.render(RenderCommand::BuildGrid {
            size: layout.size(),
            black_squares: layout.black_squares().collect(),
        });
        for (cell, view) in blank.cells() {
            if let Some(number) = view.number {
                self.sink.render(RenderCommand::SetCellNumber {
                    row: cell.row,
                    col: cell.col,
                    number,
                });
            }
        }
        self.sink.render(RenderCommand::timer(0.0));
        self.sink.render(RenderCommand::SetScrubberPosition { fraction: 0.0 });

        tracing::info!(
            grid_size = layout.size(),
            actions = recording.actions.len(),
            dropped,
            duration_ms = recording.duration_ms(),
            "recording loaded"
        );

        self.loaded = Some(Loaded {
            recording,
            grid: blank.clone(),
            blank,
            dropped,
            skipped: 0,
        });
        self.state = PlaybackState::Ready;
        self.position_ms = 0.0;
        self.next_index = 0;
        Ok(())
    }

    /// Start or resume playback.
    ///
    /// From `Paused` the clock resumes where it was frozen. From `Finished`
    /// playback re-enters at the last index and finishes again on the spot;
    /// use `seek(0.0)` to watch from the start.
    pub fn play(&mut self) {
        match self.state {
            PlaybackState::Loading => {
                tracing::warn!("play before a recording is loaded");
                return;
            }
            PlaybackState::Playing => return,
            PlaybackState::Ready | PlaybackState::Paused | PlaybackState::Finished => {}
        }
        self.state = PlaybackState::Playing;
        tracing::debug!(position_ms = self.position_ms, "playing");

        // Actions stamped at or before the current position apply at once
        self.advance();
    }

    /// Freeze the logical clock.
    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
            tracing::debug!(position_ms = self.position_ms, "paused");
        }
    }

    /// Change the speed multiplier for subsequent ticks.
    pub fn set_speed(&mut self, multiplier: f64) -> Result<()> {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(Error::InvalidSpeed(multiplier));
        }
        self.speed = multiplier;
        Ok(())
    }

    /// Advance the logical clock by one wall-clock quantum.
    pub fn tick(&mut self, quantum: Duration) -> PlaybackState {
        if self.state != PlaybackState::Playing {
            return self.state;
        }
        let step = quantum.as_nanos() as f64 / 1_000_000.0 * self.speed;
        self.position_ms = (self.position_ms + step).min(self.duration_ms());
        self.advance();
        self.state
    }

    /// Jump to `fraction` of the recording.
    ///
    /// The fraction is clamped into `[0, 1]`. Seeking an empty log does
    /// nothing. A playing replay keeps playing from the new position.
    pub fn seek(&mut self, fraction: f64) {
        let completion_ms = self.config.completion_ms();
        let Some(loaded) = self.loaded.as_mut() else {
            tracing::warn!("seek before a recording is loaded");
            return;
        };
        let actions = &loaded.recording.actions;
        if actions.is_empty() {
            tracing::debug!("seek on empty log ignored");
            return;
        }

        let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
        // Snap to microseconds so a position read back as a fraction lands
        // on the same action boundary
        let target = (loaded.recording.duration_ms() * fraction * 1e3).round() / 1e3;
        let index = actions.partition_point(|a| a.ms <= target);

        let (grid, skipped) = GridState::from_actions(&loaded.blank, actions, index);
        for command in grid.changes_since(&loaded.grid, completion_ms) {
            self.sink.render(command);
        }
        loaded.grid = grid;
        loaded.skipped = skipped;
        let total = actions.len();

        self.next_index = index;
        self.position_ms = target;
        self.state = if index == total {
            PlaybackState::Finished
        } else if self.state == PlaybackState::Playing {
            PlaybackState::Playing
        } else {
            PlaybackState::Paused
        };
        self.render_clock();

        tracing::debug!(
            fraction,
            target_ms = target,
            next_index = index,
            state = ?self.state,
            "seek"
        );
    }

    /// Apply every pending action at or before the current position.
    fn advance(&mut self) {
        let completion_ms = self.config.completion_ms();
        let Some(loaded) = self.loaded.as_mut() else {
            return;
        };
        let actions = &loaded.recording.actions;
        let before = loaded.grid.clone();

        while let Some(action) = actions.get(self.next_index) {
            if action.ms > self.position_ms {
                break;
            }
            if let Err(e) = loaded.grid.apply_in_place(action) {
                tracing::warn!(index = self.next_index, error = %e, "skipping action");
                loaded.skipped += 1;
            }
            self.next_index += 1;
        }

        for command in loaded.grid.changes_since(&before, completion_ms) {
            self.sink.render(command);
        }

        if self.next_index >= actions.len() {
            self.state = PlaybackState::Finished;
            tracing::info!(
                position_ms = self.position_ms,
                skipped = loaded.skipped,
                "playback finished"
            );
        }
        self.render_clock();
    }

    fn render_clock(&mut self) {
        let fraction = self.progress();
        self.sink.render(RenderCommand::timer(self.position_ms));
        self.sink.render(RenderCommand::SetScrubberPosition { fraction });
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Logical clock in milliseconds.
    pub fn position_ms(&self) -> f64 {
        self.position_ms
    }

    /// Index of the first action not yet applied.
    pub fn next_action_index(&self) -> usize {
        self.next_index
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Playable length of the loaded recording (zero when none).
    pub fn duration_ms(&self) -> f64 {
        self.loaded.as_ref().map_or(0.0, |l| l.recording.duration_ms())
    }

    /// Position as a fraction of the duration.
    pub fn progress(&self) -> f64 {
        let duration = self.duration_ms();
        if duration > 0.0 {
            (self.position_ms / duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Grid as currently rendered.
    pub fn grid(&self) -> Option<&GridState> {
        self.loaded.as_ref().map(|l| &l.grid)
    }

    pub fn recording(&self) -> Option<&Recording> {
        self.loaded.as_ref().map(|l| &l.recording)
    }

    /// Actions dropped at load plus malformed actions skipped so far.
    pub fn skipped_actions(&self) -> usize {
        self.loaded.as_ref().map_or(0, |l| l.dropped + l.skipped)
    }

    pub fn sink(&self) -> &R {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut R {
        &mut self.sink
    }

    pub fn into_sink(self) -> R {
        self.sink
    }

    pub fn status(&self) -> PlaybackStatus {
        PlaybackStatus::from(self)
    }
}

/// Playback status for sending to a frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackStatus {
    pub state: PlaybackState,
    pub position_ms: f64,
    pub duration_ms: f64,
    pub timer: String,
    pub next_action_index: usize,
    pub total_actions: usize,
    pub speed: f64,
    pub progress: f64,
    pub skipped_actions: usize,
}

impl<R: RenderSink> From<&Replay<R>> for PlaybackStatus {
    fn from(replay: &Replay<R>) -> Self {
        Self {
            state: replay.state,
            position_ms: replay.position_ms,
            duration_ms: replay.duration_ms(),
            timer: format_clock(replay.position_ms),
            next_action_index: replay.next_index,
            total_actions: replay.recording().map_or(0, |r| r.actions.len()),
            speed: replay.speed,
            progress: replay.progress(),
            skipped_actions: replay.skipped_actions(),
        }
    }
}
