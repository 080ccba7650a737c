//! inotify reading for inwatch
//!
//! This crate provides the single-watch inotify pipeline:
//! - Notification channel wrapping the kernel facility
//! - Bounds-checked framing of the raw record stream
//! - Decoding into labelled events
//! - A blocking read loop with cooperative, signal-driven shutdown

pub mod channel;
pub mod config;
pub mod error;
pub mod event;
pub mod mask;
pub mod reader;
pub mod record;

pub use channel::{EventSource, RawRead, WatchId};
pub use config::WatcherConfig;
pub use error::WatchError;
pub use event::DecodedEvent;
pub use mask::{EventMask, CATEGORIES};
pub use reader::{run_with, Registration, Render, RunSummary, ShutdownToken};

#[cfg(target_os = "linux")]
pub use channel::InotifyChannel;
#[cfg(target_os = "linux")]
pub use reader::run;
