//! tlslog Protocol - Wire framing and severity types
//!
//! This crate provides the pure, allocation-light pieces every other crate
//! builds on:
//! - `frame_length` - find where the next frame ends in a stream buffer
//! - `parse_frame` - validate one octet-counted frame and decode its PRI
//! - `ParsedRecord` - the priority-tagged body produced by the framer
//! - `Level` - the severities the collector knows how to route
//! - `ColorCode` - 16-color console palette with ANSI SGR rendering
//!
//! # Wire Format
//!
//! ```text
//! <octet-count> <PRI>message text
//!              ^---- counted from here, separator space included
//! ```
//!
//! Frames may share a TLS read or span several. Nothing here touches I/O.

mod color;
mod error;
mod frame;
mod level;

pub use color::{COLOR_NAMES, ColorCode, RESET};
pub use error::FrameError;
pub use frame::{ParsedRecord, SEVERITY_MODULUS, encode_frame, frame_length, parse_frame};
pub use level::Level;
