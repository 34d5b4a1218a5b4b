use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, info, warn};
use thiserror::Error;

use crate::config::AppConfig;
use crate::core_logic::{WipeReport, WipeStatus};
use crate::io_controller::{CancelToken, EventSink, FillEngine, JobState, WipeState};

/// Reasons a start request is rejected before the engine is involved.
#[derive(Debug, Error)]
pub enum StartError {
    #[error("The base directory does not exist: {}", .0.display())]
    MissingDirectory(PathBuf),
    #[error("The file name is empty.")]
    EmptyFileName,
    #[error("A wipe is already running.")]
    AlreadyRunning,
    #[error("Unable to start the fill thread: {0}")]
    Spawn(#[source] io::Error),
}

struct ActiveJob {
    target: PathBuf,
    cancel: CancelToken,
    state: JobState,
    handle: JoinHandle<WipeReport>,
}

/// Accepts start/cancel commands and keeps at most one fill job alive.
pub struct WipeController {
    config: AppConfig,
    job: Option<ActiveJob>,
    reaped: Option<WipeReport>,
}

impl WipeController {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            job: None,
            reaped: None,
        }
    }

    /// Joins `file_name` onto `base_dir`, rejecting a missing directory or empty name.
    pub fn resolve_target(base_dir: &Path, file_name: &str) -> Result<PathBuf, StartError> {
        if !base_dir.is_dir() {
            return Err(StartError::MissingDirectory(base_dir.to_path_buf()));
        }
        if file_name.trim().is_empty() {
            return Err(StartError::EmptyFileName);
        }
        Ok(base_dir.join(file_name))
    }

    pub fn start(
        &mut self,
        base_dir: &Path,
        file_name: &str,
        sink: Arc<dyn EventSink>,
    ) -> Result<PathBuf, StartError> {
        let target = Self::resolve_target(base_dir, file_name)?;
        self.start_path(&target, sink)?;
        Ok(target)
    }

    /// Starts a job writing to `target`. Any overwrite confirmation must
    /// already have happened.
    pub fn start_path(&mut self, target: &Path, sink: Arc<dyn EventSink>) -> Result<(), StartError> {
        if self.is_running() {
            return Err(StartError::AlreadyRunning);
        }
        match target.parent() {
            Some(parent) if parent.as_os_str().is_empty() || parent.is_dir() => {}
            Some(parent) => return Err(StartError::MissingDirectory(parent.to_path_buf())),
            None => return Err(StartError::EmptyFileName),
        }
        if target.file_name().is_none() {
            return Err(StartError::EmptyFileName);
        }

        // Reap a finished job nobody waited on before replacing it.
        if let Some(report) = self.wait() {
            debug!("Previous job ended unobserved: {:?}", report.status);
            self.reaped = Some(report);
        }

        let engine = FillEngine::with_config(target, self.config);
        let state = engine.state();
        let cancel = CancelToken::new();
        let handle = engine
            .spawn(cancel.clone(), sink)
            .map_err(StartError::Spawn)?;

        info!("Started wipe of {}", target.display());
        self.job = Some(ActiveJob {
            target: target.to_path_buf(),
            cancel,
            state,
            handle,
        });
        Ok(())
    }

    /// Asks the active job to stop at its next block boundary. No-op when idle.
    pub fn cancel(&self) {
        if let Some(job) = &self.job {
            if job.state.request_stop() {
                info!("Stop requested for {}", job.target.display());
            }
            if job.state.get().is_active() {
                job.cancel.cancel();
            }
        }
    }

    pub fn state(&self) -> WipeState {
        self.job
            .as_ref()
            .map(|job| job.state.get())
            .unwrap_or(WipeState::Idle)
    }

    pub fn is_running(&self) -> bool {
        self.job
            .as_ref()
            .map(|job| !job.handle.is_finished())
            .unwrap_or(false)
    }

    pub fn target(&self) -> Option<&Path> {
        self.job.as_ref().map(|job| job.target.as_path())
    }

    /// Report of a finished job that was replaced by `start` without a `wait`.
    pub fn reaped_report(&self) -> Option<&WipeReport> {
        self.reaped.as_ref()
    }

    /// Blocks until the current job ends and returns its report.
    pub fn wait(&mut self) -> Option<WipeReport> {
        let job = self.job.take()?;
        match job.handle.join() {
            Ok(report) => Some(report),
            Err(_) => {
                warn!("Fill thread for {} panicked", job.target.display());
                Some(WipeReport {
                    status: WipeStatus::Failed("fill thread panicked".to_string()),
                    total_bytes_written: 0,
                    elapsed: Duration::ZERO,
                })
            }
        }
    }
}
