//! Framing variants.
//!
//! Every variant shares the outer shape (2-byte header, 1-byte length, body,
//! 2-byte checksum sent low byte first); a [`Framing`] picks the header bytes,
//! the checksum algorithm and the smallest legal length byte.

use crate::checksum;

/// Header bytes of the default framing.
pub const HEADER: [u8; 2] = [0x5A, 0xA5];

/// Smallest legal length byte: opcode (1) + address (2) + checksum (2).
pub const MIN_LENGTH: usize = 5;

/// A framing variant understood by the codec, receiver and answer processor.
pub trait Framing {
    /// Fixed bytes that open every frame.
    fn header(&self) -> [u8; 2];

    /// Smallest value of the length byte a frame may declare.
    fn min_length(&self) -> usize {
        MIN_LENGTH
    }

    /// Checksum over the opcode-through-payload region.
    fn checksum(&self, body: &[u8]) -> u16;
}

/// `5A A5` header with a CRC-16/Modbus checksum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DgusFraming;

impl Framing for DgusFraming {
    fn header(&self) -> [u8; 2] {
        HEADER
    }

    fn checksum(&self, body: &[u8]) -> u16 {
        checksum::checksum(body)
    }
}

impl<F: Framing + ?Sized> Framing for &F {
    fn header(&self) -> [u8; 2] {
        (**self).header()
    }

    fn min_length(&self) -> usize {
        (**self).min_length()
    }

    fn checksum(&self, body: &[u8]) -> u16 {
        (**self).checksum(body)
    }
}
