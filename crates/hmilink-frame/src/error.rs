use hmilink_transport::TransportError;

/// Errors that can occur while building, receiving or processing frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Malformed caller input, e.g. a checksum buffer of the wrong size.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The buffer handed to the answer processor is too short to be a frame.
    #[error("invalid input ({len} bytes, need at least {min})")]
    InvalidInput { len: usize, min: usize },

    /// A value exceeds a wire limit.
    #[error("{what} out of range ({value}, max {max})")]
    OutOfRange {
        what: &'static str,
        value: usize,
        max: usize,
    },

    /// No valid frame was assembled within the retry budget.
    #[error("no frame received after {attempts} attempts")]
    Timeout { attempts: u32 },

    /// The received checksum does not match the frame contents.
    #[error("checksum mismatch (computed 0x{expected:04X}, received 0x{actual:04X})")]
    ChecksumMismatch { expected: u16, actual: u16 },

    /// Declared lengths are inconsistent with the bytes actually present.
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// The opcode is neither write nor read.
    #[error("unknown command opcode 0x{0:02X}")]
    UnknownCommand(u8),

    /// A write reply did not carry the acknowledgment marker.
    #[error("write not acknowledged")]
    WriteNotAcknowledged,

    /// The byte channel failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, FrameError>;
