mod app;
mod config;
mod controller;
mod core_logic;
mod io_controller;

pub use crate::app::{Cli, run_cli};
pub use crate::config::{AppConfig, ConfigError, DEFAULT_BLOCK_SIZE};
pub use crate::controller::{StartError, WipeController};
pub use crate::core_logic::{StopReason, WipeReport, WipeStatus};
pub use crate::io_controller::{
    CancelToken, EventSink, FillEngine, FreeSpace, JobState, NullSink, ProgressUpdate,
    VolumeFreeSpace, WipeState,
};
