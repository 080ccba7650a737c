use crate::record::FrameError;
use nix::errno::Errno;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to create inotify file descriptor: {0}")]
    ChannelUnavailable(#[source] Errno),

    #[error("failed to add '{}' to the watch list: {source}", path.display())]
    PathNotWatchable {
        path: PathBuf,
        #[source]
        source: Errno,
    },

    #[error("error reading inotify file descriptor: {0}")]
    FatalRead(#[source] Errno),

    #[error("malformed inotify stream: {0}")]
    MalformedStream(#[from] FrameError),

    #[error("failed to write event output")]
    Output(#[source] std::io::Error),

    #[error("failed to release {what}: {source}")]
    Release {
        what: &'static str,
        #[source]
        source: Errno,
    },
}

impl WatchError {
    /// Raised before the read loop was entered
    pub fn is_startup(&self) -> bool {
        matches!(
            self,
            WatchError::ChannelUnavailable(_) | WatchError::PathNotWatchable { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_classification() {
        assert!(WatchError::ChannelUnavailable(Errno::EMFILE).is_startup());
        assert!(WatchError::PathNotWatchable {
            path: PathBuf::from("/missing"),
            source: Errno::ENOENT,
        }
        .is_startup());
        assert!(!WatchError::FatalRead(Errno::EIO).is_startup());
        assert!(!WatchError::MalformedStream(FrameError::ShortRead { len: 3 }).is_startup());
    }

    #[test]
    fn test_messages_name_the_path() {
        let err = WatchError::PathNotWatchable {
            path: PathBuf::from("/no/such/dir"),
            source: Errno::ENOENT,
        };
        assert!(err.to_string().contains("/no/such/dir"));
    }
}
