use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use log::{debug, info, warn};

use crate::core_logic::{self, StopReason, WipeReport, WipeStatus};

use super::progress::TickMeter;
use super::{CancelToken, EventSink, FillEngine};

struct FillOutcome {
    status: WipeStatus,
    total_bytes: u64,
    short_write: bool,
}

struct WriteFailure {
    error: io::Error,
    short: bool,
}

/// A fill target whose length can be cut back after a short write.
pub(crate) trait Truncate {
    fn truncate_to(&self, len: u64) -> io::Result<()>;
}

impl Truncate for File {
    fn truncate_to(&self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

/// Writes one whole block. Anything less than the full block is a failure.
fn write_block<W: Write>(writer: &mut W, block: &[u8]) -> Result<(), WriteFailure> {
    loop {
        match writer.write(block) {
            Ok(count) if count == block.len() => return Ok(()),
            Ok(count) => {
                return Err(WriteFailure {
                    error: io::Error::new(
                        ErrorKind::WriteZero,
                        format!("short write: {} of {} bytes", count, block.len()),
                    ),
                    short: true,
                });
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(error) => {
                return Err(WriteFailure {
                    error,
                    short: false,
                });
            }
        }
    }
}

impl FillEngine {
    /// Creates (truncating) the target file and fills it until exhaustion,
    /// failure or cancellation. Blocks the calling thread.
    pub fn run(self, cancel: &CancelToken, sink: &dyn EventSink) -> WipeReport {
        self.state.begin();
        let start_time = Instant::now();

        info!(
            "Fill start. Target={}, BlockSize={}",
            self.target_path.display(),
            self.block_size
        );

        let outcome = match self.open_target() {
            Ok(file) => self.fill_file(file, cancel, sink, start_time),
            Err(e) => {
                warn!("Unable to open {}: {}", self.target_path.display(), e);
                FillOutcome {
                    status: WipeStatus::Failed(format!(
                        "Unable to open target for writing: {}",
                        e
                    )),
                    total_bytes: 0,
                    short_write: false,
                }
            }
        };

        self.finish(outcome, start_time, sink)
    }

    /// Runs the fill loop against an arbitrary writer instead of the target
    /// file. The writer is dropped before `done` is delivered.
    pub fn run_with_writer<W: Write>(
        self,
        writer: W,
        cancel: &CancelToken,
        sink: &dyn EventSink,
    ) -> WipeReport {
        self.state.begin();
        let start_time = Instant::now();
        let outcome = {
            let mut writer = writer;
            self.fill(&mut writer, cancel, sink, start_time)
        };
        self.finish(outcome, start_time, sink)
    }

    /// Runs the job on a dedicated thread. The job is `Running` as soon as
    /// this returns `Ok`.
    pub fn spawn(
        self,
        cancel: CancelToken,
        sink: Arc<dyn EventSink>,
    ) -> io::Result<JoinHandle<WipeReport>> {
        let state = self.state();
        state.begin();
        thread::Builder::new()
            .name("wipefree-fill".to_string())
            .spawn(move || self.run(&cancel, sink.as_ref()))
            .map_err(|e| {
                state.finish(&WipeStatus::Failed(e.to_string()));
                e
            })
    }

    fn open_target(&self) -> io::Result<File> {
        if self.block_size == 0 {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                "Block size must be greater than zero.",
            ));
        }
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.target_path)
    }

    fn fill_file<F: Write + Truncate>(
        &self,
        mut file: F,
        cancel: &CancelToken,
        sink: &dyn EventSink,
        start_time: Instant,
    ) -> FillOutcome {
        let outcome = self.fill(&mut file, cancel, sink, start_time);
        if outcome.short_write {
            // Drop the partial tail so the file stays a whole number of blocks.
            if let Err(e) = file.truncate_to(outcome.total_bytes) {
                warn!(
                    "Unable to trim partial block from {}: {}",
                    self.target_path.display(),
                    e
                );
            }
        }
        outcome
    }

    fn fill<W: Write>(
        &self,
        writer: &mut W,
        cancel: &CancelToken,
        sink: &dyn EventSink,
        start_time: Instant,
    ) -> FillOutcome {
        if self.block_size == 0 {
            return FillOutcome {
                status: WipeStatus::Failed("Block size must be greater than zero.".to_string()),
                total_bytes: 0,
                short_write: false,
            };
        }

        let block = core_logic::zero_block(self.block_size);
        let mut meter = TickMeter::new(self.tick_interval, start_time);
        let mut short_write = false;

        let status = loop {
            if self.observe_cancel(cancel) {
                info!("Fill stopped by user.");
                break WipeStatus::Completed(StopReason::UserStopped);
            }

            if let Err(failure) = write_block(writer, &block) {
                short_write = failure.short;
                let free = self.volume.free_bytes();
                let status = core_logic::classify_failure(free, self.block_size, &failure.error);
                match &status {
                    WipeStatus::Completed(_) => info!("Fill stopped: volume full."),
                    WipeStatus::Failed(_) => warn!(
                        "Write failure at offset {}: {}",
                        meter.total_bytes(),
                        failure.error
                    ),
                }
                break status;
            }
            meter.record(block.len());

            let now = Instant::now();
            if meter.is_due(now) {
                let update = meter.tick(now, self.query_free_space());
                debug!(
                    "Written {} bytes, {:.0} B/s",
                    update.total_bytes, update.throughput_bps
                );
                sink.progress(update);
            }
        };

        if meter.has_unreported() {
            // The closing update still honors the tick interval.
            let wait = meter.remaining(Instant::now());
            if !wait.is_zero() {
                thread::sleep(wait);
            }
            sink.progress(meter.tick(Instant::now(), self.query_free_space()));
        }

        FillOutcome {
            status,
            total_bytes: meter.total_bytes(),
            short_write,
        }
    }

    /// Moves a running job to `Stopping` once the token is seen set.
    fn observe_cancel(&self, cancel: &CancelToken) -> bool {
        if !cancel.is_cancelled() {
            return false;
        }
        self.state.request_stop();
        true
    }

    fn query_free_space(&self) -> Option<u64> {
        match self.volume.free_bytes() {
            Ok(free) => Some(free),
            Err(e) => {
                debug!("Free space query failed: {}", e);
                None
            }
        }
    }

    fn finish(&self, outcome: FillOutcome, start_time: Instant, sink: &dyn EventSink) -> WipeReport {
        self.state.finish(&outcome.status);
        let report = WipeReport {
            status: outcome.status,
            total_bytes_written: outcome.total_bytes,
            elapsed: start_time.elapsed(),
        };
        info!(
            "Fill complete: {} bytes, {:.2}s, status={:?}",
            report.total_bytes_written,
            report.elapsed.as_secs_f64(),
            report.status
        );
        sink.done(&report);
        report
    }
}
