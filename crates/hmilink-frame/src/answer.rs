use tracing::debug;

use crate::codec::{Opcode, CHECKSUM_SIZE, PREFIX_SIZE, WRITE_ACK};
use crate::error::{FrameError, Result};
use crate::framing::{DgusFraming, Framing};

/// Smallest buffer that can hold a reply: header (2) + length (1) +
/// opcode (1) + address or marker (2) + checksum (2).
pub const MIN_ANSWER_SIZE: usize = 8;

/// What a validated reply turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    /// The controller acknowledged a write.
    WriteAck,
    /// The controller returned register data; it has been handed to the sink.
    ReadData { address: u16, word_count: u8 },
}

/// Validates reply frames and dispatches their contents.
#[derive(Debug, Clone, Default)]
pub struct AnswerProcessor<F = DgusFraming> {
    framing: F,
}

impl AnswerProcessor {
    /// Processor for the default framing.
    pub fn new() -> Self {
        Self::with_framing(DgusFraming)
    }
}

impl<F: Framing> AnswerProcessor<F> {
    /// Processor for an explicit framing variant.
    pub fn with_framing(framing: F) -> Self {
        Self { framing }
    }

    /// Validate `frame` and dispatch it.
    ///
    /// The header is located again inside `frame`, so leading noise is
    /// tolerated. Read data is passed to `sink` exactly as received, register
    /// bytes in wire order; the sink runs only after every check has passed.
    pub fn process<S>(&self, frame: &[u8], mut sink: S) -> Result<Answer>
    where
        S: FnMut(u16, &[u8]),
    {
        if frame.len() < MIN_ANSWER_SIZE {
            return Err(FrameError::InvalidInput {
                len: frame.len(),
                min: MIN_ANSWER_SIZE,
            });
        }

        let frame = self.locate(frame)?;
        let body = &frame[PREFIX_SIZE..frame.len() - CHECKSUM_SIZE];
        let received = u16::from_le_bytes([frame[frame.len() - 2], frame[frame.len() - 1]]);
        let computed = self.framing.checksum(body);
        if computed != received {
            return Err(FrameError::ChecksumMismatch {
                expected: computed,
                actual: received,
            });
        }

        let opcode = body[0];
        match Opcode::from_byte(opcode) {
            Some(Opcode::Write) => {
                if body[1..] != WRITE_ACK {
                    debug!(payload = ?&body[1..], "write reply without acknowledgment");
                    return Err(FrameError::WriteNotAcknowledged);
                }
                Ok(Answer::WriteAck)
            }
            Some(Opcode::Read) => {
                if body.len() < 4 {
                    return Err(FrameError::Malformed(format!(
                        "read reply body too short ({} bytes)",
                        body.len()
                    )));
                }
                let address = u16::from_be_bytes([body[1], body[2]]);
                let word_count = body[3];
                let needed = usize::from(word_count) * 2;
                let data = &body[4..];
                if data.len() != needed {
                    return Err(FrameError::Malformed(format!(
                        "read reply declares {word_count} words but carries {} bytes",
                        data.len()
                    )));
                }

                sink(address, data);
                Ok(Answer::ReadData {
                    address,
                    word_count,
                })
            }
            None => Err(FrameError::UnknownCommand(opcode)),
        }
    }

    /// Slice out exactly the declared frame, starting at the first header
    /// whose length byte is plausible.
    fn locate<'a>(&self, buf: &'a [u8]) -> Result<&'a [u8]> {
        let header = self.framing.header();
        let min_length = self.framing.min_length();
        let mut from = 0;

        loop {
            let offset = buf[from..]
                .windows(2)
                .position(|w| w == header.as_slice())
                .map(|pos| from + pos)
                .ok_or_else(|| FrameError::Malformed("no frame header found".to_string()))?;

            let length = buf
                .get(offset + 2)
                .map(|&b| usize::from(b))
                .ok_or_else(|| FrameError::Malformed("missing length byte".to_string()))?;
            if length < min_length {
                debug!(offset, length, "skipping header with invalid length");
                from = offset + 1;
                continue;
            }

            let total = PREFIX_SIZE + length;
            return buf.get(offset..offset + total).ok_or_else(|| {
                FrameError::Malformed(format!(
                    "declared length {length} exceeds {} available bytes",
                    buf.len() - offset - PREFIX_SIZE
                ))
            });
        }
    }
}

/// Validate and dispatch `frame` with the default framing.
pub fn process_answer<S>(frame: &[u8], sink: S) -> Result<Answer>
where
    S: FnMut(u16, &[u8]),
{
    AnswerProcessor::new().process(frame, sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::append_checksum;
    use crate::codec::{build_write_command, FrameCodec};

    fn frame_from_body(body: &[u8]) -> Vec<u8> {
        let mut out = vec![0x5A, 0xA5, (body.len() + 2) as u8];
        out.extend_from_slice(&append_checksum(body));
        out
    }

    fn collect(frame: &[u8]) -> (Result<Answer>, Vec<(u16, Vec<u8>)>) {
        let mut calls = Vec::new();
        let result = process_answer(frame, |addr, data| calls.push((addr, data.to_vec())));
        (result, calls)
    }

    #[test]
    fn write_ack_invokes_no_sink() {
        let command = build_write_command(0x5000, &[0x00, 0x01]).unwrap();
        assert_eq!(command.opcode(), Some(Opcode::Write));

        let ack = FrameCodec::new().build_write_ack();
        let (result, calls) = collect(ack.as_bytes());
        assert_eq!(result.unwrap(), Answer::WriteAck);
        assert!(calls.is_empty());
    }

    #[test]
    fn read_reply_delivers_raw_bytes() {
        let reply = FrameCodec::new()
            .build_read_reply(0x5000, &[0x12, 0x34, 0xAB, 0xCD])
            .unwrap();
        let (result, calls) = collect(reply.as_bytes());

        assert_eq!(
            result.unwrap(),
            Answer::ReadData {
                address: 0x5000,
                word_count: 2
            }
        );
        assert_eq!(calls, vec![(0x5000, vec![0x12, 0x34, 0xAB, 0xCD])]);
    }

    #[test]
    fn short_buffer_is_invalid_input() {
        let (result, _) = collect(&[0x5A, 0xA5, 0x05, 0x82]);
        assert!(matches!(
            result,
            Err(FrameError::InvalidInput { len: 4, min: 8 })
        ));
    }

    #[test]
    fn leading_noise_is_tolerated() {
        let ack = FrameCodec::new().build_write_ack();
        let mut wire = vec![0x00, 0xFF, 0x13];
        wire.extend_from_slice(ack.as_bytes());
        let (result, _) = collect(&wire);
        assert_eq!(result.unwrap(), Answer::WriteAck);
    }

    #[test]
    fn declared_length_beyond_buffer_is_malformed() {
        let reply = FrameCodec::new()
            .build_read_reply(0x0000, &[0u8; 8])
            .unwrap();
        let truncated = &reply.as_bytes()[..reply.len() - 3];
        let (result, calls) = collect(truncated);
        assert!(matches!(result, Err(FrameError::Malformed(_))));
        assert!(calls.is_empty());
    }

    #[test]
    fn missing_header_is_malformed() {
        let (result, _) = collect(&[0u8; 12]);
        assert!(matches!(result, Err(FrameError::Malformed(_))));
    }

    #[test]
    fn corrupted_checksum_is_rejected() {
        let reply = FrameCodec::new()
            .build_read_reply(0x5000, &[0x12, 0x34])
            .unwrap();
        let mut wire = reply.as_bytes().to_vec();
        wire[7] ^= 0x01;
        let (result, calls) = collect(&wire);
        assert!(matches!(result, Err(FrameError::ChecksumMismatch { .. })));
        assert!(calls.is_empty());
    }

    #[test]
    fn unknown_opcode_is_rejected() {
        let wire = frame_from_body(&[0x84, 0x00, 0x10]);
        let (result, _) = collect(&wire);
        assert!(matches!(result, Err(FrameError::UnknownCommand(0x84))));
    }

    #[test]
    fn write_reply_without_ok_is_not_acknowledged() {
        let wire = frame_from_body(&[0x82, b'N', b'O']);
        let (result, _) = collect(&wire);
        assert!(matches!(result, Err(FrameError::WriteNotAcknowledged)));

        let wire = frame_from_body(&[0x82, b'O', b'K', 0x00]);
        let (result, _) = collect(&wire);
        assert!(matches!(result, Err(FrameError::WriteNotAcknowledged)));
    }

    #[test]
    fn read_reply_with_inconsistent_word_count_is_malformed() {
        let wire = frame_from_body(&[0x83, 0x50, 0x00, 0x03, 0x12, 0x34]);
        let (result, calls) = collect(&wire);
        assert!(matches!(result, Err(FrameError::Malformed(_))));
        assert!(calls.is_empty());
    }

    #[test]
    fn read_reply_with_surplus_data_is_malformed() {
        let wire = frame_from_body(&[0x83, 0x50, 0x00, 0x01, 0x12, 0x34, 0x56, 0x78]);
        let (result, calls) = collect(&wire);
        assert!(matches!(result, Err(FrameError::Malformed(_))));
        assert!(calls.is_empty());
    }

    #[test]
    fn noise_header_with_short_length_is_skipped() {
        let ack = FrameCodec::new().build_write_ack();
        let mut wire = vec![0x5A, 0xA5, 0x02];
        wire.extend_from_slice(ack.as_bytes());
        let (result, _) = collect(&wire);
        assert_eq!(result.unwrap(), Answer::WriteAck);
    }

    #[test]
    fn only_short_length_headers_is_malformed() {
        let (result, _) = collect(&[0x5A, 0xA5, 0x02, 0x5A, 0xA5, 0x01, 0x00, 0x00]);
        assert!(matches!(result, Err(FrameError::Malformed(_))));
    }

    #[test]
    fn read_reply_without_word_count_is_malformed() {
        let wire = frame_from_body(&[0x83, 0x50, 0x00]);
        let (result, _) = collect(&wire);
        assert!(matches!(result, Err(FrameError::Malformed(_))));
    }
}
