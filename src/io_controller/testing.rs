//! In-memory doubles for driving the fill loop without a real disk.

use std::fs::File;
use std::io::{self, ErrorKind, Write};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::core_logic::WipeReport;

use super::write::Truncate;
use super::{CancelToken, EventSink, FreeSpace, ProgressUpdate};

#[derive(Default)]
struct VolumeState {
    free: u64,
    written: u64,
    writes: usize,
    fail_after: Option<(usize, ErrorKind, &'static str)>,
    short_after: Option<usize>,
    cancel_on_write: Option<(usize, CancelToken)>,
    delay: Duration,
}

/// A capacity-limited volume. Writes that do not fit fail with `StorageFull`
/// and leave the volume untouched.
#[derive(Clone, Default)]
pub(crate) struct MemoryVolume {
    inner: Arc<Mutex<VolumeState>>,
}

impl MemoryVolume {
    pub(crate) fn with_free(free: u64) -> Self {
        let volume = Self::default();
        volume.inner.lock().unwrap().free = free;
        volume
    }

    /// After `writes` successful writes, every further write fails with `kind`.
    pub(crate) fn failing_after(self, writes: usize, kind: ErrorKind, message: &'static str) -> Self {
        self.inner.lock().unwrap().fail_after = Some((writes, kind, message));
        self
    }

    /// After `writes` successful writes, the next write accepts half a buffer.
    pub(crate) fn short_after(self, writes: usize) -> Self {
        self.inner.lock().unwrap().short_after = Some(writes);
        self
    }

    /// Cancels `token` while the `nth` write (1-based) is in flight.
    pub(crate) fn cancel_during_write(self, nth: usize, token: CancelToken) -> Self {
        self.inner.lock().unwrap().cancel_on_write = Some((nth, token));
        self
    }

    pub(crate) fn write_delay(self, delay: Duration) -> Self {
        self.inner.lock().unwrap().delay = delay;
        self
    }

    pub(crate) fn written(&self) -> u64 {
        self.inner.lock().unwrap().written
    }

    pub(crate) fn writer(&self) -> MemoryWriter {
        MemoryWriter {
            volume: self.clone(),
        }
    }
}

impl FreeSpace for MemoryVolume {
    fn free_bytes(&self) -> io::Result<u64> {
        Ok(self.inner.lock().unwrap().free)
    }
}

pub(crate) struct MemoryWriter {
    volume: MemoryVolume,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let delay = self.volume.inner.lock().unwrap().delay;
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        let mut state = self.volume.inner.lock().unwrap();
        if let Some((after, kind, message)) = state.fail_after {
            if state.writes >= after {
                return Err(io::Error::new(kind, message));
            }
        }

        let mut len = buf.len();
        if state.short_after == Some(state.writes) {
            len /= 2;
        }
        if len as u64 > state.free {
            return Err(io::Error::new(ErrorKind::StorageFull, "No space left on device"));
        }

        state.free -= len as u64;
        state.written += len as u64;
        state.writes += 1;
        if let Some((nth, token)) = &state.cancel_on_write {
            if *nth == state.writes {
                token.cancel();
            }
        }
        Ok(len)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A real file whose write after `short_after` whole writes lands only half a buffer.
pub(crate) struct ShortWriteFile {
    file: File,
    short_after: usize,
    writes: usize,
}

impl ShortWriteFile {
    pub(crate) fn new(file: File, short_after: usize) -> Self {
        Self {
            file,
            short_after,
            writes: 0,
        }
    }
}

impl Write for ShortWriteFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let len = if self.writes == self.short_after {
            buf.len() / 2
        } else {
            buf.len()
        };
        self.writes += 1;
        self.file.write(&buf[..len])
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Truncate for ShortWriteFile {
    fn truncate_to(&self, len: u64) -> io::Result<()> {
        self.file.truncate_to(len)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Event {
    Progress(ProgressUpdate),
    Done(WipeReport),
}

/// Records every notification; optionally cancels a token on the first progress update.
#[derive(Default)]
pub(crate) struct RecordingSink {
    events: Mutex<Vec<Event>>,
    progress_times: Mutex<Vec<Instant>>,
    cancel_on_progress: Option<CancelToken>,
}

impl RecordingSink {
    pub(crate) fn cancelling(token: CancelToken) -> Self {
        Self {
            cancel_on_progress: Some(token),
            ..Self::default()
        }
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn progress_updates(&self) -> Vec<ProgressUpdate> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Progress(update) => Some(update),
                Event::Done(_) => None,
            })
            .collect()
    }

    /// Wall-clock arrival time of each progress update.
    pub(crate) fn progress_times(&self) -> Vec<Instant> {
        self.progress_times.lock().unwrap().clone()
    }

    pub(crate) fn done_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, Event::Done(_)))
            .count()
    }
}

impl EventSink for RecordingSink {
    fn progress(&self, update: ProgressUpdate) {
        self.progress_times.lock().unwrap().push(Instant::now());
        if let Some(token) = &self.cancel_on_progress {
            token.cancel();
        }
        self.events.lock().unwrap().push(Event::Progress(update));
    }

    fn done(&self, report: &WipeReport) {
        self.events.lock().unwrap().push(Event::Done(report.clone()));
    }
}
