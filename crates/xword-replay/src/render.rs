//! Render protocol between the replay engine and whatever draws the grid.
//!
//! The engine never touches a display; it emits [`RenderCommand`]s into a
//! [`RenderSink`] supplied at construction.

use serde::{Deserialize, Serialize};
use xword_grid::CellCoord;

/// One instruction for the rendering collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RenderCommand {
    /// Lay out a fresh grid skeleton
    BuildGrid {
        size: usize,
        black_squares: Vec<CellCoord>,
    },

    /// Draw a clue number in a cell corner
    SetCellNumber { row: usize, col: usize, number: u32 },

    /// Show a letter, or empty the cell when `letter` is `None`
    SetCellLetter {
        row: usize,
        col: usize,
        letter: Option<char>,
    },

    SetCellSelected { row: usize, col: usize, selected: bool },

    SetCellHighlighted { cells: Vec<CellCoord>, highlighted: bool },

    /// One-shot "solved" notice, shown for `duration_ms`
    ShowCompletion { duration_ms: u64 },

    /// Logical clock readout
    SetTimerDisplay { ms: f64, text: String },

    /// Scrubber position in `[0, 1]`
    SetScrubberPosition { fraction: f64 },
}

impl RenderCommand {
    pub fn timer(ms: f64) -> Self {
        Self::SetTimerDisplay { ms, text: format_clock(ms) }
    }
}

/// Receives render commands.
pub trait RenderSink {
    fn render(&mut self, command: RenderCommand);
}

impl<F: FnMut(RenderCommand)> RenderSink for F {
    fn render(&mut self, command: RenderCommand) {
        self(command)
    }
}

/// Sink that keeps every command, for inspection.
#[derive(Debug, Default, Clone)]
pub struct CommandBuffer {
    commands: Vec<RenderCommand>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    /// Take the buffered commands, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<RenderCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Number of completion notices emitted so far.
    pub fn completions(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, RenderCommand::ShowCompletion { .. }))
            .count()
    }
}

impl RenderSink for CommandBuffer {
    fn render(&mut self, command: RenderCommand) {
        self.commands.push(command);
    }
}

/// Format milliseconds as `mm:ss`.
pub fn format_clock(ms: f64) -> String {
    let seconds = (ms.max(0.0) / 1000.0).floor() as u64;
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_format() {
        assert_eq!(format_clock(0.0), "00:00");
        assert_eq!(format_clock(999.0), "00:00");
        assert_eq!(format_clock(61_500.0), "01:01");
        assert_eq!(format_clock(600_000.0), "10:00");
        assert_eq!(format_clock(-40.0), "00:00");
    }

    #[test]
    fn command_serialization() {
        let cmd = RenderCommand::SetCellLetter { row: 1, col: 2, letter: Some('Q') };
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("set_cell_letter"));

        let parsed: RenderCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, cmd);
    }

    #[test]
    fn buffer_counts_completions() {
        let mut buffer = CommandBuffer::new();
        buffer.render(RenderCommand::timer(0.0));
        buffer.render(RenderCommand::ShowCompletion { duration_ms: 3000 });
        assert_eq!(buffer.completions(), 1);
        assert_eq!(buffer.take().len(), 2);
        assert!(buffer.commands().is_empty());
    }

    #[test]
    fn closures_are_sinks() {
        let mut seen = Vec::new();
        {
            let mut sink = |cmd: RenderCommand| seen.push(cmd);
            sink.render(RenderCommand::SetScrubberPosition { fraction: 0.5 });
        }
        assert_eq!(seen.len(), 1);
    }
}
