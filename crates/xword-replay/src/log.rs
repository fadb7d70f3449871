//! Append-only action log.

use std::time::Duration;

use crate::action::{Action, ActionKind};

/// Timestamps actions relative to a start instant and appends them.
///
/// Entries are never reordered or removed. Appending before [`start`] or
/// after [`freeze`] is a logged no-op.
///
/// [`start`]: ActionLog::start
/// [`freeze`]: ActionLog::freeze
#[derive(Debug, Default)]
pub struct ActionLog {
    origin: Option<Duration>,
    frozen: bool,
    actions: Vec<Action>,
}

impl ActionLog {
    /// Create an unstarted log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin timing at `now`. Has no effect on a started log.
    pub fn start(&mut self, now: Duration) {
        if self.origin.is_none() {
            self.origin = Some(now);
        }
    }

    pub fn is_open(&self) -> bool {
        self.origin.is_some() && !self.frozen
    }

    /// Milliseconds from start to `now` (zero if not started).
    pub fn elapsed_ms(&self, now: Duration) -> f64 {
        self.origin
            .map(|origin| now.saturating_sub(origin).as_nanos() as f64 / 1_000_000.0)
            .unwrap_or(0.0)
    }

    /// Append `kind` stamped at `now`. Returns whether it was appended.
    pub fn add_action(&mut self, now: Duration, kind: ActionKind) -> bool {
        if !self.is_open() {
            tracing::warn!(kind = kind.name(), "action log not open; dropping action");
            return false;
        }
        // Ties are fine, going backwards is not
        let floor = self.actions.last().map_or(0.0, |a| a.ms);
        let ms = self.elapsed_ms(now).max(floor);
        self.actions.push(Action::new(ms, kind));
        true
    }

    /// Close the log and return the total elapsed time in milliseconds.
    ///
    /// Returns `None` if the log was never started or is already frozen.
    pub fn freeze(&mut self, now: Duration) -> Option<f64> {
        if !self.is_open() {
            return None;
        }
        self.frozen = true;
        let floor = self.actions.last().map_or(0.0, |a| a.ms);
        Some(self.elapsed_ms(now).max(floor))
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Consume the log, yielding its actions.
    pub fn into_actions(self) -> Vec<Action> {
        self.actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xword_grid::CellCoord;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn no_op_before_start() {
        let mut log = ActionLog::new();
        assert!(!log.add_action(ms(5), ActionKind::complete("early")));
        assert!(log.is_empty());
    }

    #[test]
    fn stamps_relative_to_start() {
        let mut log = ActionLog::new();
        log.start(ms(1_000));
        log.add_action(ms(1_000), ActionKind::select(CellCoord::ORIGIN));
        log.add_action(ms(1_250), ActionKind::letter(CellCoord::ORIGIN, 'C'));

        let stamps: Vec<_> = log.actions().iter().map(|a| a.ms).collect();
        assert_eq!(stamps, vec![0.0, 250.0]);
    }

    #[test]
    fn timestamps_never_decrease() {
        let mut log = ActionLog::new();
        log.start(ms(100));
        log.add_action(ms(300), ActionKind::letter(CellCoord::ORIGIN, 'A'));
        // Clock reading earlier than the last entry
        log.add_action(ms(200), ActionKind::delete(CellCoord::ORIGIN));
        assert_eq!(log.actions()[1].ms, 200.0);
    }

    #[test]
    fn frozen_log_rejects_appends() {
        let mut log = ActionLog::new();
        log.start(ms(0));
        log.add_action(ms(10), ActionKind::letter(CellCoord::ORIGIN, 'A'));

        assert_eq!(log.freeze(ms(40)), Some(40.0));
        assert!(!log.add_action(ms(50), ActionKind::complete("late")));
        assert_eq!(log.len(), 1);

        // Second freeze is a no-op
        assert_eq!(log.freeze(ms(60)), None);
    }

    #[test]
    fn restart_keeps_origin() {
        let mut log = ActionLog::new();
        log.start(ms(10));
        log.start(ms(90));
        assert_eq!(log.elapsed_ms(ms(110)), 100.0);
    }
}
