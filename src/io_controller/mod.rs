mod cancel;
mod job;
mod progress;
mod volume;
mod write;

#[cfg(test)]
pub(crate) mod testing;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;

pub use cancel::CancelToken;
pub use job::{JobState, WipeState};
pub use progress::{EventSink, NullSink, ProgressUpdate};
pub use volume::{FreeSpace, VolumeFreeSpace};

/// One free-space wipe: fills `target_path` with zero blocks until the
/// volume runs out of space, a write fails, or the caller cancels.
///
/// An engine runs a single job; `run` and `spawn` consume it.
pub struct FillEngine {
    target_path: PathBuf,
    block_size: usize,
    tick_interval: Duration,
    volume: Arc<dyn FreeSpace>,
    state: JobState,
}

impl FillEngine {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_config(path, AppConfig::default())
    }

    pub fn with_config(path: impl Into<PathBuf>, config: AppConfig) -> Self {
        let target_path = path.into();
        let volume = Arc::new(VolumeFreeSpace::for_target(&target_path));
        Self {
            target_path,
            block_size: config.block_size,
            tick_interval: config.progress_interval(),
            volume,
            state: JobState::default(),
        }
    }

    /// Replaces the free-space source, e.g. with a quota-aware or fake volume.
    pub fn with_volume(mut self, volume: Arc<dyn FreeSpace>) -> Self {
        self.volume = volume;
        self
    }

    #[cfg(test)]
    pub(crate) fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Handle observing this job's lifecycle; stays valid after the engine is consumed.
    pub fn state(&self) -> JobState {
        self.state.clone()
    }
}
