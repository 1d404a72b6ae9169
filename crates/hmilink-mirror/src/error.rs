/// Errors that can occur when touching the register mirror.
#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    /// The requested range runs past the end of the register space.
    #[error("register range out of bounds (address 0x{address:04X}, {words} words)")]
    OutOfRange { address: u16, words: usize },

    /// Malformed caller input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, MirrorError>;
