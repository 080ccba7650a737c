//! Decoded, renderer-facing events

use crate::mask::{labels_for, EventMask};
use crate::record::RawRecord;
use serde::Serialize;

/// Structured view of one raw record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedEvent {
    /// Watch descriptor (-1 for queue overflow)
    pub wd: i32,
    /// Raw mask value, unknown bits included
    pub mask: u32,
    /// Rename correlation cookie
    pub cookie: u32,
    /// Declared name length, padding included
    pub len: u32,
    /// Name relative to the watched directory, empty when absent
    pub name: String,
    /// Matched category labels in canonical order
    pub labels: Vec<&'static str>,
}

impl DecodedEvent {
    /// Decode a framed record
    ///
    /// An overflow record's name is not meaningful and is left empty.
    pub fn decode(record: &RawRecord<'_>) -> Self {
        let overflow = record.mask & EventMask::Q_OVERFLOW.bits() != 0;
        let name = if overflow {
            String::new()
        } else {
            String::from_utf8_lossy(record.name_bytes()).into_owned()
        };

        Self {
            wd: record.wd,
            mask: record.mask,
            cookie: record.cookie,
            len: record.len,
            name,
            labels: labels_for(record.mask),
        }
    }

    /// Typed view of the mask
    pub fn event_mask(&self) -> EventMask {
        EventMask::from_bits_retain(self.mask)
    }

    /// The kernel dropped events because its queue was full
    pub fn is_overflow(&self) -> bool {
        self.event_mask().contains(EventMask::Q_OVERFLOW)
    }

    /// No further events will arrive for this watch descriptor
    pub fn is_watch_removed(&self) -> bool {
        self.event_mask().contains(EventMask::IGNORED)
    }

    /// The subject of the event is a directory
    pub fn is_dir(&self) -> bool {
        self.event_mask().contains(EventMask::ISDIR)
    }
}
