use std::fmt;
use std::io;

use hmilink_frame::FrameError;
use hmilink_mirror::MirrorError;
use hmilink_session::SessionError;
use hmilink_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Connect { source, .. } | TransportError::Io(source) => {
            io_error(context, source)
        }
        TransportError::Closed => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Transport(err) => transport_error(context, err),
        FrameError::Timeout { .. } => CliError::new(TIMEOUT, format!("{context}: {err}")),
        FrameError::InvalidArgument(_) | FrameError::OutOfRange { .. } => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        FrameError::InvalidInput { .. }
        | FrameError::ChecksumMismatch { .. }
        | FrameError::Malformed(_)
        | FrameError::UnknownCommand(_)
        | FrameError::WriteNotAcknowledged => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

pub fn mirror_error(context: &str, err: MirrorError) -> CliError {
    CliError::new(USAGE, format!("{context}: {err}"))
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    match err {
        SessionError::Transport(err) => transport_error(context, err),
        SessionError::Frame(err) => frame_error(context, err),
        SessionError::Mirror(err) => mirror_error(context, err),
        SessionError::UnexpectedReply { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}
