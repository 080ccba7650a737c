//! Interest masks and event category labels
//!
//! The kernel reports what happened as a `u32` bit-set. [`EventMask`] is the
//! typed view of that set, and [`CATEGORIES`] is the fixed, ordered table used
//! to turn a raw mask into human-readable labels.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Set of inotify event categories
    ///
    /// Values are the Linux ABI constants from `<sys/inotify.h>`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct EventMask: u32 {
        /// File was accessed (read)
        const ACCESS = 0x0000_0001;
        /// File was modified
        const MODIFY = 0x0000_0002;
        /// Metadata changed (permissions, timestamps, link count, ...)
        const ATTRIB = 0x0000_0004;
        /// File opened for writing was closed
        const CLOSE_WRITE = 0x0000_0008;
        /// File or directory not opened for writing was closed
        const CLOSE_NOWRITE = 0x0000_0010;
        /// File or directory was opened
        const OPEN = 0x0000_0020;
        /// Entry moved out of the watched directory
        const MOVED_FROM = 0x0000_0040;
        /// Entry moved into the watched directory
        const MOVED_TO = 0x0000_0080;
        /// Entry created in the watched directory
        const CREATE = 0x0000_0100;
        /// Entry deleted from the watched directory
        const DELETE = 0x0000_0200;
        /// Watched file or directory itself was deleted
        const DELETE_SELF = 0x0000_0400;
        /// Watched file or directory itself was moved
        const MOVE_SELF = 0x0000_0800;
        /// Filesystem containing the watched object was unmounted
        const UNMOUNT = 0x0000_2000;
        /// Kernel event queue overflowed (watch descriptor is -1)
        const Q_OVERFLOW = 0x0000_4000;
        /// Watch was removed, explicitly or because the object went away
        const IGNORED = 0x0000_8000;
        /// Subject of the event is a directory
        const ISDIR = 0x4000_0000;

        /// Registration flag: only watch the path if it is a directory
        const ONLYDIR = 0x0100_0000;
        /// Registration flag: do not dereference the path if it is a symlink
        const DONT_FOLLOW = 0x0200_0000;
    }
}

impl EventMask {
    /// Every reportable category, the default interest mask
    pub const ALL_CATEGORIES: Self = Self::ACCESS
        .union(Self::MODIFY)
        .union(Self::ATTRIB)
        .union(Self::CLOSE_WRITE)
        .union(Self::CLOSE_NOWRITE)
        .union(Self::OPEN)
        .union(Self::MOVED_FROM)
        .union(Self::MOVED_TO)
        .union(Self::CREATE)
        .union(Self::DELETE)
        .union(Self::DELETE_SELF)
        .union(Self::MOVE_SELF)
        .union(Self::UNMOUNT)
        .union(Self::Q_OVERFLOW)
        .union(Self::IGNORED)
        .union(Self::ISDIR);

    /// Labels of every category set in this mask, in canonical order
    pub fn labels(self) -> Vec<&'static str> {
        labels_for(self.bits())
    }
}

impl Default for EventMask {
    fn default() -> Self {
        Self::ALL_CATEGORIES
    }
}

/// One reportable event category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    /// The category's bit
    pub bit: EventMask,
    /// Label shown to users
    pub label: &'static str,
    /// Name of the kernel constant
    pub symbol: &'static str,
}

impl Category {
    const fn new(bit: EventMask, label: &'static str, symbol: &'static str) -> Self {
        Self { bit, label, symbol }
    }

    /// Whether this category's bit is set in a raw mask
    pub fn matches(&self, raw_mask: u32) -> bool {
        raw_mask & self.bit.bits() != 0
    }
}

/// All reportable categories in ascending bit order
///
/// Label derivation walks this table front to back, so the labels for a given
/// mask always come out in the same sequence.
pub static CATEGORIES: [Category; 16] = [
    Category::new(EventMask::ACCESS, "accessed", "IN_ACCESS"),
    Category::new(EventMask::MODIFY, "modified", "IN_MODIFY"),
    Category::new(EventMask::ATTRIB, "attribute-changed", "IN_ATTRIB"),
    Category::new(EventMask::CLOSE_WRITE, "closed-after-write", "IN_CLOSE_WRITE"),
    Category::new(EventMask::CLOSE_NOWRITE, "closed-without-write", "IN_CLOSE_NOWRITE"),
    Category::new(EventMask::OPEN, "opened", "IN_OPEN"),
    Category::new(EventMask::MOVED_FROM, "moved-from", "IN_MOVED_FROM"),
    Category::new(EventMask::MOVED_TO, "moved-to", "IN_MOVED_TO"),
    Category::new(EventMask::CREATE, "created", "IN_CREATE"),
    Category::new(EventMask::DELETE, "deleted", "IN_DELETE"),
    Category::new(EventMask::DELETE_SELF, "deleted-self", "IN_DELETE_SELF"),
    Category::new(EventMask::MOVE_SELF, "moved-self", "IN_MOVE_SELF"),
    Category::new(EventMask::UNMOUNT, "unmounted", "IN_UNMOUNT"),
    Category::new(EventMask::Q_OVERFLOW, "queue-overflow", "IN_Q_OVERFLOW"),
    Category::new(EventMask::IGNORED, "watch-removed", "IN_IGNORED"),
    Category::new(EventMask::ISDIR, "is-directory", "IN_ISDIR"),
];

/// Labels for every known category set in `raw_mask`
///
/// Bits that do not belong to a known category are skipped.
pub fn labels_for(raw_mask: u32) -> Vec<&'static str> {
    CATEGORIES
        .iter()
        .filter(|category| category.matches(raw_mask))
        .map(|category| category.label)
        .collect()
}

/// Look up a category by label or kernel symbol (case-insensitive)
///
/// Accepts `created`, `IN_CREATE` and `create`.
pub fn parse_category(name: &str) -> Option<EventMask> {
    let name = name.trim();
    CATEGORIES
        .iter()
        .find(|category| {
            category.label.eq_ignore_ascii_case(name)
                || category.symbol.eq_ignore_ascii_case(name)
                || category.symbol[3..].eq_ignore_ascii_case(name)
        })
        .map(|category| category.bit)
}
