//! Notification channel
//!
//! [`EventSource`] is the seam between the read loop and the OS facility.
//! [`InotifyChannel`] implements it on Linux; tests drive the loop with
//! scripted sources instead.

use crate::error::WatchError;
use crate::mask::EventMask;
use std::path::Path;

/// Opaque watch identifier handed out by a successful registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(i32);

impl WatchId {
    pub fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Raw watch descriptor, as it appears in event records
    pub fn raw(self) -> i32 {
        self.0
    }
}

/// Outcome of one blocking read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawRead {
    /// This many bytes were written to the front of the buffer
    Bytes(usize),
    /// A signal arrived before any data; check for shutdown and retry
    Interrupted,
}

/// Producer of raw inotify bytes
///
/// `unwatch` and `close` are release operations: callers log their errors
/// and carry on.
pub trait EventSource {
    /// Register interest in `path`
    fn watch(&mut self, path: &Path, mask: EventMask) -> Result<WatchId, WatchError>;

    /// Block until records are available and copy them into `buf`
    fn read_raw(&mut self, buf: &mut [u8]) -> Result<RawRead, WatchError>;

    /// Remove a registration
    fn unwatch(&mut self, id: WatchId) -> Result<(), WatchError>;

    /// Release the underlying channel
    fn close(&mut self) -> Result<(), WatchError>;
}

#[cfg(target_os = "linux")]
pub use linux::InotifyChannel;

#[cfg(target_os = "linux")]
mod linux {
    use super::{EventSource, RawRead, WatchId};
    use crate::error::WatchError;
    use crate::mask::EventMask;
    use nix::errno::Errno;
    use nix::unistd;
    use std::ffi::CString;
    use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};
    use std::os::unix::ffi::OsStrExt;
    use std::path::Path;

    /// inotify descriptor
    ///
    /// Opened close-on-exec and blocking. Dropping without [`EventSource::close`]
    /// still closes the descriptor, silently.
    #[derive(Debug)]
    pub struct InotifyChannel {
        fd: Option<OwnedFd>,
    }

    impl InotifyChannel {
        /// Acquire a new inotify instance
        pub fn open() -> Result<Self, WatchError> {
            // SAFETY: no pointers involved; a non-negative return is a fresh fd we own.
            let raw = unsafe { libc::inotify_init1(libc::IN_CLOEXEC) };
            let raw = Errno::result(raw).map_err(WatchError::ChannelUnavailable)?;
            // SAFETY: raw was just returned by inotify_init1 and nothing else owns it.
            let fd = unsafe { OwnedFd::from_raw_fd(raw) };

            tracing::debug!(fd = raw, "opened inotify channel");
            Ok(Self { fd: Some(fd) })
        }

        /// Whether `close` has not run yet
        pub fn is_open(&self) -> bool {
            self.fd.is_some()
        }

        fn raw_fd(&self) -> Result<RawFd, Errno> {
            self.fd.as_ref().map(AsRawFd::as_raw_fd).ok_or(Errno::EBADF)
        }
    }

    impl EventSource for InotifyChannel {
        fn watch(&mut self, path: &Path, mask: EventMask) -> Result<WatchId, WatchError> {
            let not_watchable = |source| WatchError::PathNotWatchable {
                path: path.to_path_buf(),
                source,
            };

            let c_path = CString::new(path.as_os_str().as_bytes())
                .map_err(|_| not_watchable(Errno::EINVAL))?;
            let fd = self.raw_fd().map_err(not_watchable)?;

            // SAFETY: c_path is a valid NUL-terminated string for the duration of the call.
            let wd = unsafe { libc::inotify_add_watch(fd, c_path.as_ptr(), mask.bits()) };
            let wd = Errno::result(wd).map_err(not_watchable)?;
            Ok(WatchId::new(wd))
        }

        fn read_raw(&mut self, buf: &mut [u8]) -> Result<RawRead, WatchError> {
            let fd = self.raw_fd().map_err(WatchError::FatalRead)?;

            match unistd::read(fd, buf) {
                Ok(n) => Ok(RawRead::Bytes(n)),
                Err(Errno::EINTR) => Ok(RawRead::Interrupted),
                Err(e) => Err(WatchError::FatalRead(e)),
            }
        }

        fn unwatch(&mut self, id: WatchId) -> Result<(), WatchError> {
            let release = |source| WatchError::Release {
                what: "watch",
                source,
            };

            let fd = self.raw_fd().map_err(release)?;
            // SAFETY: plain syscall on integers.
            let ret = unsafe { libc::inotify_rm_watch(fd, id.raw()) };
            Errno::result(ret).map(drop).map_err(release)
        }

        fn close(&mut self) -> Result<(), WatchError> {
            let Some(fd) = self.fd.take() else {
                return Ok(());
            };

            // Ownership moves out of the OwnedFd, so this is the only close
            unistd::close(fd.into_raw_fd()).map_err(|source| WatchError::Release {
                what: "inotify channel",
                source,
            })
        }
    }

}
