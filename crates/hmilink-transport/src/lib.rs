//! Duplex byte channel abstraction.
//!
//! The protocol layers above only need three things from the link to the
//! controller: write bytes, report how many bytes are waiting, and read the
//! waiting bytes without blocking. [`ByteChannel`] captures exactly that.
//!
//! Provided channels:
//! - [`MemoryChannel`]: scripted in-memory channel for tests and simulators
//! - [`FdChannel`]: any already-open file descriptor (tty, Unix socket) on Unix
//!
//! Opening and configuring a physical serial port is left to the caller.

pub mod error;
pub mod memory;
pub mod traits;

#[cfg(unix)]
pub mod fd;

pub use error::{Result, TransportError};
pub use memory::MemoryChannel;
pub use traits::ByteChannel;

#[cfg(unix)]
pub use fd::FdChannel;
