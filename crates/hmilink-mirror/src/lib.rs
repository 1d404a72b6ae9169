//! Local image of the controller's register space.
//!
//! The controller exposes 65536 word-addressed 16-bit registers. The mirror
//! keeps them in wire order (big-endian) and converts to host order exactly
//! once, at the accessor boundary. Raw byte accessors copy without
//! conversion, so bytes delivered by a read reply can be stored verbatim.

pub mod error;
pub mod mirror;
pub mod text;

pub use error::{MirrorError, Result};
pub use mirror::{MemoryMirror, DEFAULT_MAX_TEXT_LEN, WORD_COUNT};
pub use text::{decode_text, encode_text, TextEncoding};
