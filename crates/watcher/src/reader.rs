//! Event reader and dispatcher
//!
//! Owns the read buffer and the shutdown protocol:
//! 1. Register the watch (the channel is released on every exit path)
//! 2. Read, frame, decode and render until shutdown or a fatal error
//! 3. Unregister the watch and close the channel exactly once

use crate::channel::{EventSource, RawRead, WatchId};
use crate::config::WatcherConfig;
use crate::error::WatchError;
use crate::event::DecodedEvent;
use crate::mask::EventMask;
use crate::record::{self, BUFFER_LEN};
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Cooperative shutdown flag
///
/// Set once (typically from a signal handler), observed by the read loop
/// before every read. Clones share the same flag.
///
/// The check and the blocking read are not atomic. A request that lands
/// after the check but before the read starts is only seen once that read
/// returns: on the next event, or when a second signal interrupts it.
/// Closing this window would need `ppoll`/`signalfd`, which the loop does
/// not use.
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken(Arc<AtomicBool>);

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to stop. Async-signal-safe.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Consumer of decoded events
pub trait Render {
    /// A read completed and its events follow
    fn begin_read(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// One decoded event
    fn event(&mut self, event: &DecodedEvent) -> io::Result<()>;

    /// All events of the current read were delivered
    fn end_read(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// The loop has ended; called by the owner of the renderer, not the reader
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Reader diagnostics, returned on clean shutdown
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Reads that returned data
    pub reads: u64,

    /// Reads interrupted by a signal
    pub interrupted_reads: u64,

    /// Events rendered
    pub events: u64,

    /// Queue overflow events seen
    pub overflows: u64,

    /// The kernel removed the watch (object deleted or unmounted)
    pub watch_removed: bool,
}

/// Fixed-capacity read buffer, never resized
pub struct ReadBuffer {
    bytes: [u8; BUFFER_LEN],
}

impl ReadBuffer {
    pub fn new() -> Self {
        Self {
            bytes: [0; BUFFER_LEN],
        }
    }

    pub fn capacity(&self) -> usize {
        BUFFER_LEN
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// The first `len` bytes, clamped to capacity
    pub fn filled(&self, len: usize) -> &[u8] {
        &self.bytes[..len.min(BUFFER_LEN)]
    }
}

impl Default for ReadBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped ownership of a channel and its single watch
///
/// [`Registration::release`] unregisters the watch (if still live) and closes
/// the channel. It runs at most once: later calls, including the one from
/// `Drop`, do nothing.
pub struct Registration<S: EventSource> {
    source: S,
    watch: Option<WatchId>,
    released: bool,
}

impl<S: EventSource> Registration<S> {
    /// Take ownership of an open channel
    pub fn new(source: S) -> Self {
        Self {
            source,
            watch: None,
            released: false,
        }
    }

    /// Register the single watch
    pub fn watch(&mut self, path: &Path, mask: EventMask) -> Result<WatchId, WatchError> {
        let id = self.source.watch(path, mask)?;
        info!("Watching {} (wd {}, mask {:#x})", path.display(), id.raw(), mask.bits());
        self.watch = Some(id);
        Ok(id)
    }

    /// Active watch, if any
    pub fn watch_id(&self) -> Option<WatchId> {
        self.watch
    }

    /// The kernel already removed the watch; don't unregister it again
    pub fn forget_watch(&mut self) {
        self.watch = None;
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Best-effort release of the watch and the channel
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        if let Some(id) = self.watch.take() {
            match self.source.unwatch(id) {
                Ok(()) => debug!("Removed watch {}", id.raw()),
                Err(e) => warn!("{}", e),
            }
        }

        match self.source.close() {
            Ok(()) => debug!("Closed notification channel"),
            Err(e) => warn!("{}", e),
        }
    }
}

impl<S: EventSource> Drop for Registration<S> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Watch `path` on a fresh inotify channel until shutdown
#[cfg(target_os = "linux")]
pub fn run<R: Render + ?Sized>(
    path: &Path,
    config: &WatcherConfig,
    shutdown: &ShutdownToken,
    render: &mut R,
) -> Result<RunSummary, WatchError> {
    let channel = crate::channel::InotifyChannel::open()?;
    run_with(channel, path, config, shutdown, render)
}

/// Watch `path` on an already-open source until shutdown
///
/// The source is released before returning, whatever the outcome.
pub fn run_with<S, R>(
    source: S,
    path: &Path,
    config: &WatcherConfig,
    shutdown: &ShutdownToken,
    render: &mut R,
) -> Result<RunSummary, WatchError>
where
    S: EventSource,
    R: Render + ?Sized,
{
    let mut registration = Registration::new(source);
    registration.watch(path, config.watch_mask())?;

    let mut summary = RunSummary::default();
    let outcome = read_loop(&mut registration, shutdown, render, &mut summary);
    registration.release();

    info!(
        "Reader stopped: {} reads, {} interrupted, {} events, {} overflows",
        summary.reads, summary.interrupted_reads, summary.events, summary.overflows
    );
    outcome.map(|()| summary)
}

fn read_loop<S, R>(
    registration: &mut Registration<S>,
    shutdown: &ShutdownToken,
    render: &mut R,
    summary: &mut RunSummary,
) -> Result<(), WatchError>
where
    S: EventSource,
    R: Render + ?Sized,
{
    let mut buffer = ReadBuffer::new();

    while !shutdown.is_requested() {
        let filled = match registration.source_mut().read_raw(buffer.as_mut_slice())? {
            RawRead::Interrupted => {
                summary.interrupted_reads += 1;
                trace!("Read interrupted, shutdown requested: {}", shutdown.is_requested());
                continue;
            }
            RawRead::Bytes(n) => n,
        };
        summary.reads += 1;
        debug!("Read {} bytes", filled);

        let records = record::frame(buffer.filled(filled))?;
        render.begin_read().map_err(WatchError::Output)?;

        for record in records {
            let event = DecodedEvent::decode(&record?);
            observe(registration, &event, summary);
            render.event(&event).map_err(WatchError::Output)?;
        }

        render.end_read().map_err(WatchError::Output)?;
    }

    Ok(())
}

fn observe<S: EventSource>(
    registration: &mut Registration<S>,
    event: &DecodedEvent,
    summary: &mut RunSummary,
) {
    summary.events += 1;

    if event.is_overflow() {
        summary.overflows += 1;
        warn!("Kernel event queue overflowed, events were lost");
    }

    if event.is_watch_removed() && registration.watch_id().map(WatchId::raw) == Some(event.wd) {
        warn!("Watch {} was removed by the kernel, no further events", event.wd);
        registration.forget_watch();
        summary.watch_removed = true;
    }
}
