use std::fmt;
use std::ops::Range;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::trace;

use crate::error::{MirrorError, Result};
use crate::text::{decode_text, encode_text, TextEncoding};

/// Number of addressable 16-bit registers.
pub const WORD_COUNT: usize = 0x1_0000;

/// Default cap on encoded text length, in bytes.
pub const DEFAULT_MAX_TEXT_LEN: usize = 240;

const BYTE_COUNT: usize = WORD_COUNT * 2;

/// Thread-safe image of the controller's register space.
///
/// Registers are stored in wire order. Every accessor takes the mirror's own
/// lock for the duration of the memory touch only; a read-modify-write that
/// spans a protocol round trip must be serialized by the caller.
pub struct MemoryMirror {
    memory: Mutex<Box<[u8]>>,
    max_text_len: usize,
}

impl MemoryMirror {
    /// Create a zeroed mirror.
    pub fn new() -> Self {
        Self::with_max_text_len(DEFAULT_MAX_TEXT_LEN)
    }

    /// Create a zeroed mirror with a custom text length cap (bytes).
    pub fn with_max_text_len(max_text_len: usize) -> Self {
        Self {
            memory: Mutex::new(vec![0u8; BYTE_COUNT].into_boxed_slice()),
            max_text_len,
        }
    }

    /// Text length cap in bytes.
    pub fn max_text_len(&self) -> usize {
        self.max_text_len
    }

    /// Check that `words` registers starting at `address` exist.
    pub fn check_range(&self, address: u16, words: usize) -> Result<()> {
        byte_range(address, words).map(|_| ())
    }

    /// Store register bytes exactly as they appear on the wire.
    pub fn write_raw(&self, address: u16, bytes: &[u8]) -> Result<()> {
        if bytes.len() % 2 != 0 {
            return Err(MirrorError::InvalidArgument(format!(
                "raw register data must be whole words, got {} bytes",
                bytes.len()
            )));
        }
        let range = byte_range(address, bytes.len() / 2)?;
        self.lock()[range].copy_from_slice(bytes);
        trace!(address, len = bytes.len(), "mirror raw write");
        Ok(())
    }

    /// Store one host-order word.
    pub fn write_word(&self, address: u16, value: u16) -> Result<()> {
        self.write_words(address, &[value])
    }

    /// Store host-order words.
    pub fn write_words(&self, address: u16, values: &[u16]) -> Result<()> {
        let range = byte_range(address, values.len())?;
        let mut memory = self.lock();
        for (slot, value) in memory[range].chunks_exact_mut(2).zip(values) {
            slot.copy_from_slice(&value.to_be_bytes());
        }
        Ok(())
    }

    /// Store text.
    ///
    /// The destination extent (the text cap, clipped to the end of the
    /// register space) is zeroed first so a shorter string leaves no stale
    /// trailing characters.
    pub fn write_text(&self, address: u16, text: &str, encoding: TextEncoding) -> Result<()> {
        let encoded = encode_text(text, encoding, self.max_text_len);
        let range = byte_range(address, encoded.len() / 2)?;

        let clear_end = (range.start + (self.max_text_len & !1)).min(BYTE_COUNT);
        let mut memory = self.lock();
        memory[range.start..clear_end.max(range.end)].fill(0);
        memory[range].copy_from_slice(&encoded);
        Ok(())
    }

    /// Zero every register.
    pub fn clear(&self) {
        self.lock().fill(0);
    }

    /// Register bytes in wire order.
    pub fn read_bytes(&self, address: u16, words: usize) -> Result<Vec<u8>> {
        let range = byte_range(address, words)?;
        Ok(self.lock()[range].to_vec())
    }

    /// One word in host order.
    pub fn read_word(&self, address: u16) -> Result<u16> {
        let range = byte_range(address, 1)?;
        let memory = self.lock();
        Ok(u16::from_be_bytes([memory[range.start], memory[range.start + 1]]))
    }

    /// Words in host order.
    pub fn read_words(&self, address: u16, words: usize) -> Result<Vec<u16>> {
        let range = byte_range(address, words)?;
        let memory = self.lock();
        Ok(memory[range]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect())
    }

    /// Decode `byte_len` bytes of text, trailing zero padding removed.
    pub fn read_text(&self, address: u16, byte_len: usize, encoding: TextEncoding) -> Result<String> {
        let mut bytes = self.read_bytes(address, byte_len.div_ceil(2))?;
        bytes.truncate(byte_len);
        Ok(decode_text(&bytes, encoding))
    }

    fn lock(&self) -> MutexGuard<'_, Box<[u8]>> {
        // Plain bytes cannot be left inconsistent by a panicking holder.
        self.memory.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryMirror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryMirror")
            .field("words", &WORD_COUNT)
            .field("max_text_len", &self.max_text_len)
            .finish()
    }
}

fn byte_range(address: u16, words: usize) -> Result<Range<usize>> {
    let start = usize::from(address);
    match start.checked_add(words) {
        Some(end) if end <= WORD_COUNT => Ok(start * 2..end * 2),
        _ => Err(MirrorError::OutOfRange { address, words }),
    }
}
