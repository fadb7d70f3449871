//! Status notices from the recorder to the user-facing layer.

use std::sync::Mutex;

/// Something the person solving should hear about.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    RecordingStarted { grid_size: usize },
    RecordingStopped { total_time_ms: f64, action_count: usize },
    StructureNotFound,
}

/// Receives recorder notices. Injected at construction, never global.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Logs notices through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice {
            Notice::RecordingStarted { grid_size } => {
                tracing::info!(grid_size, "recording started");
            }
            Notice::RecordingStopped { total_time_ms, action_count } => {
                tracing::info!(total_time_ms, action_count, "recording stopped");
            }
            Notice::StructureNotFound => {
                tracing::warn!("could not find the puzzle grid");
            }
        }
    }
}

/// Keeps every notice, for inspection.
#[derive(Debug, Default)]
pub struct NoticeLog {
    notices: Mutex<Vec<Notice>>,
}

impl NoticeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        match self.notices.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Notifier for NoticeLog {
    fn notify(&self, notice: Notice) {
        match self.notices.lock() {
            Ok(mut guard) => guard.push(notice),
            Err(poisoned) => poisoned.into_inner().push(notice),
        }
    }
}
