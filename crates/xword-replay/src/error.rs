//! Error types for xword-replay.

use thiserror::Error;
use xword_grid::GridError;

/// Result type for recording and replay operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while recording or replaying.
#[derive(Debug, Error)]
pub enum Error {
    /// No valid grid could be detected on the live puzzle.
    #[error("no puzzle structure detected")]
    StructureNotFound,

    /// `start` called while a recording is in progress.
    #[error("recording already active")]
    RecordingAlreadyActive,

    /// `stop` (or a recording-only call) made while not recording.
    #[error("recording not active")]
    RecordingNotActive,

    /// The recorder already produced its recording and cannot be restarted.
    #[error("recorder already stopped; create a new recorder to record again")]
    RecorderStopped,

    /// A single action could not be applied to the grid.
    #[error("malformed action: {0}")]
    MalformedAction(String),

    /// The recording cannot be replayed.
    #[error("invalid recording: {0}")]
    InvalidRecording(String),

    /// A typed document could not be converted.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Playback speed must be a positive finite multiplier.
    #[error("invalid playback speed: {0}")]
    InvalidSpeed(f64),

    /// Grid layout error
    #[error("grid error: {0}")]
    Grid(#[from] GridError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
