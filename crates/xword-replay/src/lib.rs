//! Crossword Solve Recording and Replay
//!
//! Records a crossword solve as a timestamped action log and plays it back
//! with pause, variable speed and random-access seek.
//!
//! # Architecture
//!
//! - **Recorder**: Watches a live puzzle through a [`CellSource`], debounces
//!   change notifications and diffs cell state into [`Action`]s
//! - **Recording**: Immutable value holding structure, metadata and the log
//! - **Replay**: Re-applies the log onto a [`RenderSink`]; seek rebuilds the
//!   grid from blank by prefix replay
//! - **Drivers**: Tokio tasks that own the debounce and tick timers
//! - **Document codec**: Typed key/value form for document stores
//! - **Server**: REST playback controls and a WebSocket render stream
//!
//! # Usage
//!
//! ```ignore
//! let mut replay = Replay::new(CommandBuffer::new(), EngineConfig::default());
//! replay.load(recording)?;
//! replay.seek(0.5);
//! replay.play();
//! replay.tick(Duration::from_millis(100));
//! ```

mod action;
mod clock;
mod config;
pub mod document;
mod driver;
mod error;
mod grid_state;
mod log;
mod notify;
mod playback;
mod recorder;
mod recording;
mod render;
mod server;
mod simulation;
mod source;

pub use action::{Action, ActionKind, HighlightOp, SelectOp};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{EngineConfig, ServerConfig};
pub use document::{parse_recording, Document};
pub use driver::{PlaybackDriver, RecorderDriver};
pub use error::{Error, Result};
pub use grid_state::{CellView, GridState};
pub use log::ActionLog;
pub use notify::{Notice, NoticeLog, Notifier, TracingNotifier};
pub use playback::{PlaybackState, PlaybackStatus, Replay};
pub use recorder::{Debounce, Recorder, RecorderState};
pub use recording::{Clue, Clues, PuzzleMetadata, Recording};
pub use render::{format_clock, CommandBuffer, RenderCommand, RenderSink};
pub use server::{BroadcastSink, ReplayServer};
pub use simulation::SimulatedPuzzle;
pub use source::{
    change_feed, CellSource, ChangeFeed, ChangeNotifier, PuzzleObservation, SelectionState,
};
