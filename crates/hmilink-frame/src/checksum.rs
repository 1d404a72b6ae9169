//! CRC-16/Modbus checksum.
//!
//! Reflected polynomial `0xA001`, initial register `0xFFFF`, no final XOR.
//! The lookup table is generated at compile time and shared by the whole
//! process.

use crate::error::{FrameError, Result};

/// Reflected generator polynomial.
pub const POLYNOMIAL: u16 = 0xA001;

/// Initial register value.
pub const INITIAL: u16 = 0xFFFF;

static TABLE: [u16; 256] = build_table();

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u16;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ POLYNOMIAL
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// The lookup table.
pub fn table() -> &'static [u16; 256] {
    &TABLE
}

/// Compute the checksum of `bytes`.
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes.iter().fold(INITIAL, |reg, &byte| {
        (reg >> 8) ^ TABLE[((reg ^ u16::from(byte)) & 0xFF) as usize]
    })
}

/// Copy `bytes` and append their checksum, low byte first.
pub fn append_checksum(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 2);
    out.extend_from_slice(bytes);
    out.extend_from_slice(&checksum(bytes).to_le_bytes());
    out
}

/// Check `bytes` against an expected checksum.
pub fn verify(bytes: &[u8], expected: u16) -> bool {
    checksum(bytes) == expected
}

/// Check `bytes` against a checksum as it appears on the wire (2 bytes, little-endian).
pub fn verify_bytes(bytes: &[u8], received: &[u8]) -> Result<bool> {
    let received: [u8; 2] = received.try_into().map_err(|_| {
        FrameError::InvalidArgument(format!(
            "checksum must be 2 bytes, got {}",
            received.len()
        ))
    })?;
    Ok(verify(bytes, u16::from_le_bytes(received)))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn standard_check_value() {
        assert_eq!(checksum(b"123456789"), 0x4B37);
    }

    #[test]
    fn empty_input_is_initial_register() {
        assert_eq!(checksum(&[]), INITIAL);
    }

    #[test]
    fn table_matches_known_entries() {
        let table = table();
        assert_eq!(table[0], 0x0000);
        assert_eq!(table[1], 0xC0C1);
        assert_eq!(table[2], 0xC181);
        assert_eq!(table[255], 0x4040);
    }

    #[test]
    fn append_places_low_byte_first() {
        let framed = append_checksum(b"123456789");
        assert_eq!(&framed[9..], &[0x37, 0x4B]);
    }

    #[test]
    fn verify_bytes_rejects_wrong_size() {
        let err = verify_bytes(b"abc", &[0x00]).unwrap_err();
        assert!(matches!(err, FrameError::InvalidArgument(_)));
        let err = verify_bytes(b"abc", &[0x00, 0x01, 0x02]).unwrap_err();
        assert!(matches!(err, FrameError::InvalidArgument(_)));
    }

    #[test]
    fn verify_bytes_accepts_wire_checksum() {
        let framed = append_checksum(&[0x83, 0x10, 0x00, 0x02]);
        let (body, crc) = framed.split_at(framed.len() - 2);
        assert!(verify_bytes(body, crc).unwrap());
    }

    proptest! {
        #[test]
        fn verify_accepts_own_checksum(bytes in proptest::collection::vec(any::<u8>(), 0..300)) {
            prop_assert!(verify(&bytes, checksum(&bytes)));
        }

        #[test]
        fn single_bit_flip_is_detected(
            bytes in proptest::collection::vec(any::<u8>(), 1..300),
            index in any::<proptest::sample::Index>(),
            bit in 0u8..8,
        ) {
            let original = checksum(&bytes);
            let mut flipped = bytes.clone();
            let i = index.index(flipped.len());
            flipped[i] ^= 1 << bit;
            prop_assert!(!verify(&flipped, original));
        }
    }
}
