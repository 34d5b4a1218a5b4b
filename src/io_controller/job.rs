use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

use crate::core_logic::WipeStatus;

/// Lifecycle of one fill job.
///
/// ```text
///   Idle ──→ Running ──→ Stopping ──→ Completed
///               │            │
///               ├────────────┴──→ Failed
///               └──→ Completed
/// ```
///
/// `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WipeState {
    Idle,
    Running,
    Stopping,
    Completed,
    Failed,
}

impl WipeState {
    pub fn is_terminal(self) -> bool {
        matches!(self, WipeState::Completed | WipeState::Failed)
    }

    pub fn is_active(self) -> bool {
        matches!(self, WipeState::Running | WipeState::Stopping)
    }

    fn to_u8(self) -> u8 {
        match self {
            WipeState::Idle => 0,
            WipeState::Running => 1,
            WipeState::Stopping => 2,
            WipeState::Completed => 3,
            WipeState::Failed => 4,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => WipeState::Running,
            2 => WipeState::Stopping,
            3 => WipeState::Completed,
            4 => WipeState::Failed,
            _ => WipeState::Idle,
        }
    }
}

/// Thread-safe cell holding a job's `WipeState`. Clones observe the same job.
#[derive(Debug, Clone)]
pub struct JobState {
    state: Arc<AtomicU8>,
}

impl Default for JobState {
    fn default() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(WipeState::Idle.to_u8())),
        }
    }
}

impl JobState {
    pub fn get(&self) -> WipeState {
        WipeState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn begin(&self) -> bool {
        self.swap(WipeState::Idle, WipeState::Running)
    }

    /// `Running -> Stopping`. Returns false if the job was not running.
    pub(crate) fn request_stop(&self) -> bool {
        self.swap(WipeState::Running, WipeState::Stopping)
    }

    pub(crate) fn finish(&self, status: &WipeStatus) {
        let terminal = match status {
            WipeStatus::Completed(_) => WipeState::Completed,
            WipeStatus::Failed(_) => WipeState::Failed,
        };
        let _ = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                if WipeState::from_u8(current).is_terminal() {
                    None
                } else {
                    Some(terminal.to_u8())
                }
            });
    }

    fn swap(&self, from: WipeState, to: WipeState) -> bool {
        self.state
            .compare_exchange(from.to_u8(), to.to_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
