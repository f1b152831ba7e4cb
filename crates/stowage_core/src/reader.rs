//! Random-access reader over a single stored value.
//!
//! A [`RangeReader`] emulates a seekable file handle on top of a backend
//! that can only fetch byte ranges. It keeps a cursor position and the
//! value's total length (fetched once, when the reader is opened) and turns
//! every read into one `get_range` call for exactly the bytes requested.
//!
//! ## States
//!
//! ```text
//!   open(key) ──► Open ──close()──► Closed
//!                  │  ▲               │
//!     tell/seek/read  │               └── every operation fails
//!                  └──┘                   (close() itself is a no-op)
//! ```
//!
//! ## Positioning
//!
//! | Whence      | Code | New position         |
//! |-------------|------|----------------------|
//! | `Start`     | 0    | `offset`             |
//! | `Current`   | 1    | `position + offset`  |
//! | `End`       | 2    | `len + offset`       |
//!
//! A resulting position below zero is rejected and leaves the cursor where
//! it was. Positions past the end are allowed; reads there return nothing.

use std::fmt;
use std::io;
use std::sync::Arc;

use stowage_storage::StorageBackend;
use tracing::trace;

use crate::error::{StoreError, StoreResult};
use crate::key::Key;

/// Reference point for a seek offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Whence {
    /// Relative to the start of the value.
    Start = 0,
    /// Relative to the current position.
    Current = 1,
    /// Relative to the end of the value.
    End = 2,
}

impl Whence {
    /// Returns the conventional numeric code (0, 1, or 2).
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for Whence {
    type Error = StoreError;

    fn try_from(code: i32) -> StoreResult<Self> {
        match code {
            0 => Ok(Self::Start),
            1 => Ok(Self::Current),
            2 => Ok(Self::End),
            other => Err(StoreError::invalid_operation(format!(
                "invalid whence code {other}, expected 0, 1 or 2"
            ))),
        }
    }
}

enum ReaderState {
    Open(Arc<dyn StorageBackend>),
    Closed,
}

/// A seekable cursor over one stored value.
///
/// Created by `open` on a store. Not safe to drive from several callers at
/// once: every method that moves the cursor takes `&mut self`.
///
/// Besides its own `tell`/`seek`/`read_bytes` API, the reader implements
/// [`io::Read`] and [`io::Seek`], so it can be handed to anything that
/// consumes a standard reader.
pub struct RangeReader {
    key: Key,
    len: u64,
    position: u64,
    state: ReaderState,
}

impl RangeReader {
    /// Opens a reader on `key`, fetching the value's length once.
    pub(crate) fn open(backend: Arc<dyn StorageBackend>, key: Key) -> StoreResult<Self> {
        let len = backend.size(key.as_str())?;
        trace!(key = %key, len, "opened range reader");
        Ok(Self {
            key,
            len,
            position: 0,
            state: ReaderState::Open(backend),
        })
    }

    fn backend(&self) -> StoreResult<&Arc<dyn StorageBackend>> {
        match &self.state {
            ReaderState::Open(backend) => Ok(backend),
            ReaderState::Closed => Err(StoreError::invalid_operation(format!(
                "reader for {} is closed",
                self.key
            ))),
        }
    }

    /// Returns the key this reader is positioned over.
    #[must_use]
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Returns the value's total length as observed when the reader was opened.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns true if the value was empty when the reader was opened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self.state, ReaderState::Closed)
    }

    /// Reports whether the reader can be read from.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidOperation`] if the reader is closed.
    pub fn readable(&self) -> StoreResult<bool> {
        self.backend().map(|_| true)
    }

    /// Reports whether the reader supports seeking.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidOperation`] if the reader is closed.
    pub fn seekable(&self) -> StoreResult<bool> {
        self.backend().map(|_| true)
    }

    /// Returns the current position.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidOperation`] if the reader is closed.
    pub fn tell(&self) -> StoreResult<u64> {
        self.backend()?;
        Ok(self.position)
    }

    /// Moves the cursor and returns the new position. No bytes are fetched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidOperation`] if the reader is closed or
    /// the resulting position would be negative. The position is unchanged
    /// on error.
    pub fn seek(&mut self, offset: i64, whence: Whence) -> StoreResult<u64> {
        let base = match whence {
            Whence::Start => 0,
            Whence::Current => self.position,
            Whence::End => self.len,
        };
        self.reposition(base, offset)
    }

    /// Like [`seek`](Self::seek), taking a raw whence code.
    ///
    /// # Errors
    ///
    /// Additionally fails with [`StoreError::InvalidOperation`] if `whence`
    /// is not 0, 1 or 2.
    pub fn seek_code(&mut self, offset: i64, whence: i32) -> StoreResult<u64> {
        self.backend()?;
        self.seek(offset, Whence::try_from(whence)?)
    }

    fn reposition(&mut self, base: u64, offset: i64) -> StoreResult<u64> {
        self.backend()?;
        let target = i128::from(base) + i128::from(offset);
        if target < 0 {
            return Err(StoreError::invalid_operation(format!(
                "seek to negative position {target}"
            )));
        }
        let target = u64::try_from(target).map_err(|_| {
            StoreError::invalid_operation(format!("seek position {target} is out of range"))
        })?;
        self.position = target;
        Ok(target)
    }

    /// Reads up to `limit` bytes from the current position, or everything
    /// up to the end if `limit` is `None`.
    ///
    /// Returns an empty vector at or past the end of the value. The cursor
    /// advances by the number of bytes returned.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidOperation`] if the reader is closed, or
    /// the backend's error if the range fetch fails.
    pub fn read_bytes(&mut self, limit: Option<usize>) -> StoreResult<Vec<u8>> {
        let backend = self.backend()?;
        if self.position >= self.len {
            return Ok(Vec::new());
        }

        let remaining = self.len - self.position;
        let wanted = match limit {
            Some(limit) => (limit as u64).min(remaining),
            None => remaining,
        };
        if wanted == 0 {
            return Ok(Vec::new());
        }
        let wanted = usize::try_from(wanted).map_err(|_| {
            StoreError::invalid_operation(format!("cannot read {wanted} bytes into memory"))
        })?;

        trace!(key = %self.key, position = self.position, len = wanted, "range fetch");
        let data = backend.get_range(self.key.as_str(), self.position, wanted)?;
        self.position += data.len() as u64;
        Ok(data)
    }

    /// Reads everything from the current position to the end.
    ///
    /// # Errors
    ///
    /// See [`read_bytes`](Self::read_bytes).
    pub fn read_to_end_bytes(&mut self) -> StoreResult<Vec<u8>> {
        self.read_bytes(None)
    }

    /// Closes the reader, releasing its backend reference.
    ///
    /// Closing twice is allowed. The stored value is not affected.
    pub fn close(&mut self) {
        if !self.is_closed() {
            trace!(key = %self.key, "closed range reader");
            self.state = ReaderState::Closed;
        }
    }
}

impl fmt::Debug for RangeReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RangeReader")
            .field("key", &self.key)
            .field("len", &self.len)
            .field("position", &self.position)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl io::Read for RangeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.read_bytes(Some(buf.len()))?;
        buf[..data.len()].copy_from_slice(&data);
        Ok(data.len())
    }
}

impl io::Seek for RangeReader {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let position = match pos {
            io::SeekFrom::Start(n) => self.reposition(n, 0)?,
            io::SeekFrom::Current(n) => self.reposition(self.position, n)?,
            io::SeekFrom::End(n) => self.reposition(self.len, n)?,
        };
        Ok(position)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.tell()?)
    }
}
