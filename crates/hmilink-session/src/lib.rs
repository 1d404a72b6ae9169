//! Request/response sessions against an HMI controller.
//!
//! A [`Panel`] owns one byte channel and runs each request as a single
//! blocking unit: build the command, write it, wait for the reply, validate
//! it, and update the local [`MemoryMirror`](hmilink_mirror::MemoryMirror).
//!
//! [`ControllerSim`] answers requests the way a controller does and backs the
//! tests and the CLI `simulate` command.

pub mod error;
pub mod panel;
pub mod sim;

pub use error::{Result, SessionError};
pub use panel::{Panel, PanelConfig};
pub use sim::ControllerSim;
