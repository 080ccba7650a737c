//! Watcher configuration

use crate::mask::EventMask;
use serde::{Deserialize, Serialize};

/// Watcher configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Categories to report (default: all of them)
    #[serde(default)]
    pub mask: EventMask,

    /// Dereference the path if it is a symlink (default: true)
    #[serde(default = "default_true")]
    pub follow_symlinks: bool,

    /// Refuse to watch anything but a directory (default: false)
    #[serde(default)]
    pub only_dir: bool,
}

impl WatcherConfig {
    /// Mask passed to the registration: interest bits plus registration flags
    pub fn watch_mask(&self) -> EventMask {
        let mut mask = self.mask;
        if !self.follow_symlinks {
            mask |= EventMask::DONT_FOLLOW;
        }
        if self.only_dir {
            mask |= EventMask::ONLYDIR;
        }
        mask
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            mask: EventMask::ALL_CATEGORIES,
            follow_symlinks: true,
            only_dir: false,
        }
    }
}

fn default_true() -> bool {
    true
}
