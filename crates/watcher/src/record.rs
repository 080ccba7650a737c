//! Framing of the inotify byte stream
//!
//! A single `read` on an inotify descriptor returns zero or more packed
//! records. Each record is a fixed 16-byte header (`wd`, `mask`, `cookie`,
//! `len`) followed by `len` bytes of NUL-padded name. The kernel never splits
//! a record across reads and already pads `len` to its own alignment, so a
//! record occupies exactly `HEADER_LEN + len` bytes.
//!
//! [`frame`] walks a filled byte range with explicit bounds checks; nothing
//! here reinterprets the buffer as a typed struct.

use std::iter::FusedIterator;
use thiserror::Error;

/// Size of the fixed record header (`struct inotify_event` without its name)
pub const HEADER_LEN: usize = 16;

/// Longest filename the kernel can report (Linux `NAME_MAX`)
pub const NAME_MAX: usize = 255;

/// Read buffer capacity: room for one maximal record plus a terminating NUL
pub const BUFFER_LEN: usize = HEADER_LEN + NAME_MAX + 1;

#[cfg(target_os = "linux")]
const _: () = assert!(HEADER_LEN == std::mem::size_of::<libc::inotify_event>());

/// Field offsets inside the header
const WD_OFFSET: usize = 0;
const MASK_OFFSET: usize = 4;
const COOKIE_OFFSET: usize = 8;
const LEN_OFFSET: usize = 12;

/// Framing failure for one batch of bytes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("read returned {len} bytes, fewer than one {HEADER_LEN}-byte event header")]
    ShortRead { len: usize },

    #[error("event header at offset {offset} overruns the {filled} bytes read")]
    HeaderOverrun { offset: usize, filled: usize },

    #[error("event name of {name_len} bytes at offset {offset} overruns the {filled} bytes read")]
    NameOverrun {
        offset: usize,
        name_len: usize,
        filled: usize,
    },
}

/// One framed record, borrowing its name from the read buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRecord<'a> {
    /// Watch descriptor the record belongs to (-1 on queue overflow)
    pub wd: i32,
    /// Raw event mask
    pub mask: u32,
    /// Rename correlation cookie, zero for everything else
    pub cookie: u32,
    /// Declared name length, including padding
    pub len: u32,
    /// Name bytes exactly as declared, padding included
    pub name: &'a [u8],
}

impl<'a> RawRecord<'a> {
    /// Name bytes up to (not including) the first NUL
    pub fn name_bytes(&self) -> &'a [u8] {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.name.len());
        &self.name[..end]
    }

    /// Bytes this record occupies in the stream
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.name.len()
    }
}

/// Frame a filled byte range into records
///
/// Fails up front if the range cannot hold even one header. The returned
/// iterator yields records in stream order and stops after the first framing
/// error, so no record past a bad header is ever produced.
pub fn frame(bytes: &[u8]) -> Result<Records<'_>, FrameError> {
    if bytes.len() < HEADER_LEN {
        return Err(FrameError::ShortRead { len: bytes.len() });
    }

    Ok(Records {
        bytes,
        offset: 0,
        failed: false,
    })
}

/// Lazy, single-pass iterator over the records in one read
#[derive(Debug)]
pub struct Records<'a> {
    bytes: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> Records<'a> {
    /// Offset of the next unread byte
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn next_record(&mut self) -> Result<RawRecord<'a>, FrameError> {
        let filled = self.bytes.len();
        let offset = self.offset;

        let header = self
            .bytes
            .get(offset..offset + HEADER_LEN)
            .ok_or(FrameError::HeaderOverrun { offset, filled })?;

        let len = read_u32(header, LEN_OFFSET);
        let name_len = len as usize;
        let name_start = offset + HEADER_LEN;
        let name = name_start
            .checked_add(name_len)
            .and_then(|end| self.bytes.get(name_start..end))
            .ok_or(FrameError::NameOverrun {
                offset,
                name_len,
                filled,
            })?;

        let record = RawRecord {
            wd: read_u32(header, WD_OFFSET) as i32,
            mask: read_u32(header, MASK_OFFSET),
            cookie: read_u32(header, COOKIE_OFFSET),
            len,
            name,
        };
        self.offset = name_start + name_len;
        Ok(record)
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = Result<RawRecord<'a>, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.bytes.len() {
            return None;
        }

        let result = self.next_record();
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}

impl FusedIterator for Records<'_> {}

/// Append one record to `out` in kernel layout
///
/// The name gets a NUL terminator and is padded to a multiple of
/// `HEADER_LEN`, matching what the kernel delivers. An empty name produces a
/// header-only record. Used to build synthetic streams for tests and
/// benchmarks.
pub fn encode(out: &mut Vec<u8>, wd: i32, mask: u32, cookie: u32, name: &[u8]) {
    let padded = if name.is_empty() {
        0
    } else {
        (name.len() + 1).next_multiple_of(HEADER_LEN)
    };

    out.extend_from_slice(&wd.to_ne_bytes());
    out.extend_from_slice(&mask.to_ne_bytes());
    out.extend_from_slice(&cookie.to_ne_bytes());
    out.extend_from_slice(&(padded as u32).to_ne_bytes());
    out.extend_from_slice(name);
    out.resize(out.len() + padded - name.len(), 0);
}

fn read_u32(header: &[u8], at: usize) -> u32 {
    u32::from_ne_bytes([header[at], header[at + 1], header[at + 2], header[at + 3]])
}
