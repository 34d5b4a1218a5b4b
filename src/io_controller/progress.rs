use std::time::{Duration, Instant};

use serde::Serialize;

use crate::core_logic::{self, WipeReport};

#[derive(Debug, Clone, Serialize)]
pub struct ProgressUpdate {
    pub total_bytes: u64,
    pub throughput_bps: f64,
    pub elapsed: Duration,
    /// Absent when nothing was written during the last interval.
    pub time_left: Option<Duration>,
}

/// Receives the engine's outbound notifications.
///
/// `progress` is called from the engine thread at most once per tick
/// interval; `done` is called exactly once per job and is always last.
pub trait EventSink: Send + Sync {
    fn progress(&self, update: ProgressUpdate);
    fn done(&self, report: &WipeReport);
}

/// Sink for callers that only care about the returned report.
pub struct NullSink;

impl EventSink for NullSink {
    fn progress(&self, _update: ProgressUpdate) {}
    fn done(&self, _report: &WipeReport) {}
}

/// Byte and time accounting for one job.
pub(super) struct TickMeter {
    interval: Duration,
    start_time: Instant,
    last_tick_time: Instant,
    total_bytes: u64,
    bytes_since_last_tick: u64,
    last_reported: u64,
    ticked: bool,
}

impl TickMeter {
    pub(super) fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            start_time: now,
            last_tick_time: now,
            total_bytes: 0,
            bytes_since_last_tick: 0,
            last_reported: 0,
            ticked: false,
        }
    }

    pub(super) fn record(&mut self, bytes: usize) {
        self.total_bytes += bytes as u64;
        self.bytes_since_last_tick += bytes as u64;
    }

    pub(super) fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub(super) fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.start_time)
    }

    pub(super) fn is_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_tick_time) >= self.interval
    }

    /// Time left before another update may be emitted. Zero until the first tick.
    pub(super) fn remaining(&self, now: Instant) -> Duration {
        if !self.ticked {
            return Duration::ZERO;
        }
        self.interval
            .saturating_sub(now.saturating_duration_since(self.last_tick_time))
    }

    pub(super) fn has_unreported(&self) -> bool {
        self.total_bytes != self.last_reported
    }

    /// Closes the current interval and restarts the tick clock.
    pub(super) fn tick(&mut self, now: Instant, free_bytes: Option<u64>) -> ProgressUpdate {
        let interval = now.saturating_duration_since(self.last_tick_time);
        let throughput_bps = core_logic::throughput_bps(self.bytes_since_last_tick, interval);
        let time_left =
            free_bytes.and_then(|free| core_logic::estimate_time_left(free, throughput_bps));

        self.bytes_since_last_tick = 0;
        self.last_tick_time = now;
        self.last_reported = self.total_bytes;
        self.ticked = true;

        ProgressUpdate {
            total_bytes: self.total_bytes,
            throughput_bps,
            elapsed: self.elapsed(now),
            time_left,
        }
    }
}
