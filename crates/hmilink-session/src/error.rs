use hmilink_frame::{Answer, FrameError};
use hmilink_mirror::MirrorError;
use hmilink_transport::TransportError;

/// Errors that can occur during a panel request.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Register mirror error.
    #[error("mirror error: {0}")]
    Mirror(#[from] MirrorError),

    /// The reply was valid but does not answer the request that was sent.
    #[error("unexpected reply to request at 0x{address:04X}: {answer:?}")]
    UnexpectedReply { address: u16, answer: Answer },
}

pub type Result<T> = std::result::Result<T, SessionError>;
