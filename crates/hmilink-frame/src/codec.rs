use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::framing::{DgusFraming, Framing};

/// Header (2) + length byte (1).
pub const PREFIX_SIZE: usize = 3;

/// Trailing checksum size.
pub const CHECKSUM_SIZE: usize = 2;

/// Largest payload a single frame can carry: the length byte tops out at 255
/// and already counts opcode, address and checksum.
pub const MAX_PAYLOAD: usize = u8::MAX as usize - 5;

/// Largest word count a read command may request.
pub const MAX_READ_WORDS: u8 = 128;

/// Largest word count a single read reply can carry: the reply spends one
/// payload byte on the echoed word count.
pub const MAX_REPLY_WORDS: u8 = ((MAX_PAYLOAD - 1) / 2) as u8;

/// Marker carried by a write acknowledgment.
pub const WRITE_ACK: [u8; 2] = *b"OK";

/// Default per-attempt receive timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(200);

/// Default number of additional receive attempts after the first one.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default sleep between channel polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Command identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Write registers.
    Write = 0x82,
    /// Read registers.
    Read = 0x83,
}

impl Opcode {
    /// Decode an opcode byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x82 => Some(Self::Write),
            0x83 => Some(Self::Read),
            _ => None,
        }
    }

    /// The wire value.
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// One complete frame, header through checksum.
///
/// Frames are only produced by [`FrameCodec`] and [`crate::FrameReceiver`],
/// both of which guarantee at least [`PREFIX_SIZE`] + 5 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    raw: Bytes,
}

impl Frame {
    pub(crate) fn from_raw(raw: Bytes) -> Self {
        debug_assert!(raw.len() >= PREFIX_SIZE + 5);
        Self { raw }
    }

    /// The frame as it appears on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Consume the frame and return its wire bytes.
    pub fn into_bytes(self) -> Bytes {
        self.raw
    }

    /// Total wire size.
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Always false; a frame carries at least a header and a checksum.
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// The declared length byte.
    pub fn length_byte(&self) -> u8 {
        self.raw[2]
    }

    /// Raw opcode byte.
    pub fn opcode_byte(&self) -> u8 {
        self.raw[3]
    }

    /// Decoded opcode, if recognized.
    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::from_byte(self.opcode_byte())
    }

    /// Register address (big-endian on the wire).
    pub fn address(&self) -> u16 {
        u16::from_be_bytes([self.raw[4], self.raw[5]])
    }

    /// The checksummed region: opcode through end of payload.
    pub fn body(&self) -> &[u8] {
        &self.raw[PREFIX_SIZE..self.raw.len() - CHECKSUM_SIZE]
    }

    /// Bytes after the address, before the checksum.
    pub fn payload(&self) -> &[u8] {
        &self.raw[PREFIX_SIZE + 3..self.raw.len() - CHECKSUM_SIZE]
    }

    /// The trailing checksum (sent low byte first).
    pub fn checksum(&self) -> u16 {
        let n = self.raw.len();
        u16::from_le_bytes([self.raw[n - 2], self.raw[n - 1]])
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.raw
    }
}

/// Builds command frames for a framing variant.
#[derive(Debug, Clone, Default)]
pub struct FrameCodec<F = DgusFraming> {
    framing: F,
}

impl FrameCodec {
    /// Codec for the default `5A A5` framing.
    pub fn new() -> Self {
        Self::with_framing(DgusFraming)
    }
}

impl<F: Framing> FrameCodec<F> {
    /// Codec for an explicit framing variant.
    pub fn with_framing(framing: F) -> Self {
        Self { framing }
    }

    /// The framing in use.
    pub fn framing(&self) -> &F {
        &self.framing
    }

    /// Build a write-register command carrying `data` verbatim.
    ///
    /// ```text
    /// ┌──────────┬─────┬──────┬─────────────┬──────────┬──────────────┐
    /// │ 5A A5    │ len │ 0x82 │ addr (2B BE)│ data ... │ crc (2B LE)  │
    /// └──────────┴─────┴──────┴─────────────┴──────────┴──────────────┘
    /// ```
    pub fn build_write_command(&self, address: u16, data: &[u8]) -> Result<Frame> {
        if data.is_empty() {
            return Err(FrameError::InvalidArgument(
                "write command needs at least one data byte".to_string(),
            ));
        }
        if data.len() > MAX_PAYLOAD {
            return Err(FrameError::OutOfRange {
                what: "write payload",
                value: data.len(),
                max: MAX_PAYLOAD,
            });
        }

        let mut body = BytesMut::with_capacity(3 + data.len());
        body.put_u8(Opcode::Write.as_byte());
        body.put_u16(address);
        body.put_slice(data);
        self.encode(&body)
    }

    /// Build a read-register command for `word_count` words.
    ///
    /// The wire carries a byte count (`word_count * 2`) in a single byte, so a
    /// full 128-word read travels as `0x00`.
    pub fn build_read_command(&self, address: u16, word_count: u8) -> Result<Frame> {
        if word_count == 0 {
            return Err(FrameError::InvalidArgument(
                "read command needs at least one word".to_string(),
            ));
        }
        if word_count > MAX_READ_WORDS {
            return Err(FrameError::OutOfRange {
                what: "read word count",
                value: usize::from(word_count),
                max: usize::from(MAX_READ_WORDS),
            });
        }

        let mut body = BytesMut::with_capacity(4);
        body.put_u8(Opcode::Read.as_byte());
        body.put_u16(address);
        body.put_u8(word_count.wrapping_mul(2));
        self.encode(&body)
    }

    /// Build the acknowledgment a controller sends after a successful write.
    pub fn build_write_ack(&self) -> Frame {
        let mut body = BytesMut::with_capacity(1 + WRITE_ACK.len());
        body.put_u8(Opcode::Write.as_byte());
        body.put_slice(&WRITE_ACK);
        // Three body bytes always fit the length byte.
        self.encode_unchecked(&body)
    }

    /// Build the reply a controller sends for a read: echoed address, word
    /// count, then the register bytes.
    pub fn build_read_reply(&self, address: u16, data: &[u8]) -> Result<Frame> {
        if data.len() % 2 != 0 {
            return Err(FrameError::InvalidArgument(format!(
                "register data must be whole words, got {} bytes",
                data.len()
            )));
        }
        let max = usize::from(MAX_REPLY_WORDS) * 2;
        if data.len() > max {
            return Err(FrameError::OutOfRange {
                what: "read reply data",
                value: data.len(),
                max,
            });
        }

        let mut body = BytesMut::with_capacity(4 + data.len());
        body.put_u8(Opcode::Read.as_byte());
        body.put_u16(address);
        body.put_u8((data.len() / 2) as u8);
        body.put_slice(data);
        self.encode(&body)
    }

    fn encode(&self, body: &[u8]) -> Result<Frame> {
        let length = body.len() + CHECKSUM_SIZE;
        if length > usize::from(u8::MAX) {
            return Err(FrameError::OutOfRange {
                what: "frame length",
                value: length,
                max: usize::from(u8::MAX),
            });
        }
        Ok(self.encode_unchecked(body))
    }

    fn encode_unchecked(&self, body: &[u8]) -> Frame {
        let length = body.len() + CHECKSUM_SIZE;
        let mut dst = BytesMut::with_capacity(PREFIX_SIZE + length);
        dst.put_slice(&self.framing.header());
        dst.put_u8(length as u8);
        dst.put_slice(body);
        dst.put_u16_le(self.framing.checksum(body));
        Frame::from_raw(dst.freeze())
    }
}

/// Build a write-register command with the default framing.
pub fn build_write_command(address: u16, data: &[u8]) -> Result<Frame> {
    FrameCodec::new().build_write_command(address, data)
}

/// Build a read-register command with the default framing.
pub fn build_read_command(address: u16, word_count: u8) -> Result<Frame> {
    FrameCodec::new().build_read_command(address, word_count)
}

/// Configuration for frame reception.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Wall-clock budget of a single receive attempt. Default: 200 ms.
    pub timeout: Duration,
    /// Additional attempts after the first one times out. Default: 2.
    pub max_retries: u32,
    /// Sleep between non-blocking channel polls. Default: 1 ms.
    pub poll_interval: Duration,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}
