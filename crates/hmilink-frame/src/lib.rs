//! Command framing for serial-attached HMI controllers.
//!
//! Every frame on the wire looks like:
//! - A 2-byte header (`0x5A 0xA5`) for stream synchronization
//! - A 1-byte length counting everything after it
//! - A 1-byte opcode (`0x82` write, `0x83` read) and a big-endian register address
//! - The payload, then a CRC-16/Modbus checksum sent low byte first
//!
//! [`FrameCodec`] builds outbound commands, [`FrameReceiver`] reassembles
//! replies from a trickling byte stream, and [`AnswerProcessor`] validates and
//! dispatches them.

pub mod answer;
pub mod arena;
pub mod checksum;
pub mod codec;
pub mod error;
pub mod framing;
pub mod receiver;

pub use answer::{process_answer, Answer, AnswerProcessor, MIN_ANSWER_SIZE};
pub use arena::RxArena;
pub use checksum::{append_checksum, checksum, verify, verify_bytes};
pub use codec::{
    build_read_command, build_write_command, Frame, FrameCodec, FrameConfig, Opcode,
    CHECKSUM_SIZE, MAX_PAYLOAD, MAX_READ_WORDS, MAX_REPLY_WORDS, PREFIX_SIZE, WRITE_ACK,
};
pub use error::{FrameError, Result};
pub use framing::{DgusFraming, Framing, HEADER, MIN_LENGTH};
pub use receiver::{FrameReceiver, ReceiveState};
