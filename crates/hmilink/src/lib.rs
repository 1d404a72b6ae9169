//! Binary command protocol stack for serial-attached HMI controllers.
//!
//! hmilink encodes register write/read commands into CRC-checked frames,
//! reassembles replies from an unreliable byte stream, and keeps a local
//! image of the controller's 16-bit register space.
//!
//! # Crate Structure
//!
//! - [`transport`]: Duplex byte channel abstraction
//! - [`frame`]: Command framing, CRC-16, frame reassembly and reply validation
//! - [`mirror`]: Thread-safe register mirror with endianness-aware accessors
//! - [`session`]: Request/response sessions and a controller simulator (behind `session` feature)

/// Re-export transport types.
pub mod transport {
    pub use hmilink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use hmilink_frame::*;
}

/// Re-export mirror types.
pub mod mirror {
    pub use hmilink_mirror::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use hmilink_session::*;
}
