use std::io;
use std::time::Duration;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    UserStopped,
    Exhausted,
}

/// Terminal status of a fill job, delivered once through `EventSink::done`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum WipeStatus {
    Completed(StopReason),
    Failed(String),
}

impl WipeStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, WipeStatus::Failed(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WipeReport {
    pub status: WipeStatus,
    pub total_bytes_written: u64,
    pub elapsed: Duration,
}

/// The block written on every iteration. Built once per job and never mutated.
pub fn zero_block(block_size: usize) -> Box<[u8]> {
    vec![0u8; block_size].into_boxed_slice()
}

/// Decides what a failed write means, using the free space observed at
/// failure time. Less than one block left is the expected end of a wipe.
pub fn classify_failure(
    free_bytes: io::Result<u64>,
    block_size: usize,
    error: &io::Error,
) -> WipeStatus {
    match free_bytes {
        Ok(free) if free < block_size as u64 => WipeStatus::Completed(StopReason::Exhausted),
        _ => WipeStatus::Failed(error.to_string()),
    }
}

pub fn throughput_bps(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    bytes as f64 / secs
}

/// Remaining free space divided by the last interval's throughput, in whole
/// seconds. `None` when nothing was written during the interval.
pub fn estimate_time_left(free_bytes: u64, throughput_bps: f64) -> Option<Duration> {
    if !(throughput_bps > 0.0) {
        return None;
    }
    let secs = free_bytes as f64 / throughput_bps;
    Some(Duration::from_secs(secs as u64))
}
