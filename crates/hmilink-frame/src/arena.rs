use bytes::{Bytes, BytesMut};
use hmilink_transport::ByteChannel;

use crate::error::Result;

const INITIAL_CAPACITY: usize = 512;

/// Growable receive buffer with index-based views.
///
/// Bytes are appended in place from the channel; the allocation survives
/// [`RxArena::reset`], so repeated attempts do not reallocate.
#[derive(Debug)]
pub struct RxArena {
    buf: BytesMut,
}

impl RxArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    /// Create an empty arena with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True when nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Drop all buffered bytes, keeping the allocation.
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Everything buffered.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Byte at `index`.
    pub fn get(&self, index: usize) -> Option<u8> {
        self.buf.get(index).copied()
    }

    /// View of `len` bytes starting at `start`, if fully buffered.
    pub fn window(&self, start: usize, len: usize) -> Option<&[u8]> {
        let end = start.checked_add(len)?;
        self.buf.get(start..end)
    }

    /// Copy a fully buffered window out as an owned buffer.
    pub fn copy_window(&self, start: usize, len: usize) -> Option<Bytes> {
        self.window(start, len).map(Bytes::copy_from_slice)
    }

    /// First occurrence of `pattern` starting at or after `from`.
    pub fn find(&self, pattern: [u8; 2], from: usize) -> Option<usize> {
        self.buf
            .get(from..)?
            .windows(2)
            .position(|w| w == pattern.as_slice())
            .map(|pos| from + pos)
    }

    /// Append every byte the channel currently has, without blocking.
    ///
    /// Returns how many bytes were appended.
    pub fn fill_from<C: ByteChannel + ?Sized>(&mut self, channel: &mut C) -> Result<usize> {
        let available = channel.bytes_available()?;
        if available == 0 {
            return Ok(0);
        }

        let start = self.buf.len();
        self.buf.resize(start + available, 0);

        let mut filled = 0usize;
        while filled < available {
            let n = match channel.read_available(&mut self.buf[start + filled..]) {
                Ok(n) => n,
                Err(err) => {
                    self.buf.truncate(start + filled);
                    return Err(err.into());
                }
            };
            if n == 0 {
                break;
            }
            filled += n;
        }

        self.buf.truncate(start + filled);
        Ok(filled)
    }
}

impl Default for RxArena {
    fn default() -> Self {
        Self::new()
    }
}
