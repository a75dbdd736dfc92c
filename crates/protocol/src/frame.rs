//! Octet-counted frame parsing
//!
//! A frame looks like `17 <166>hello world`. The decimal prefix declares the
//! number of bytes from the separating space (inclusive) to the end of the
//! frame.
//!
//! On a stream, [`frame_length`] tells the reader where the next frame ends
//! so back-to-back frames in one read can be split apart and a frame split
//! across reads can be reassembled. [`parse_frame`] then validates one
//! complete frame; a frame whose declared and actual counts differ is
//! rejected outright, never truncated.
//!
//! # Example
//!
//! ```
//! use tlslog_protocol::parse_frame;
//!
//! let record = parse_frame(b"17 <166>hello world").unwrap();
//! assert_eq!(record.priority, 166);
//! assert_eq!(record.severity, 6);
//! assert_eq!(record.rendered_body, "<166>hello world");
//! ```

use crate::error::FrameError;
use crate::level::Level;

/// PRI is `facility * 8 + severity`
pub const SEVERITY_MODULUS: u32 = 8;

/// Separator between the octet count and the rest of the frame
const SEPARATOR: u8 = b' ';

/// Digits in `usize::MAX`; a longer prefix can never be valid
const MAX_COUNT_DIGITS: usize = 20;

/// A validated frame with its decoded priority
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRecord {
    /// Raw PRI value
    pub priority: u32,
    /// `priority % 8`
    pub severity: u8,
    /// Frame without the octet-count prefix; the `<PRI>` token is kept
    pub rendered_body: String,
}

impl ParsedRecord {
    /// Routable level for this record, `None` for unsupported severities
    #[inline]
    pub fn level(&self) -> Option<Level> {
        Level::from_severity(self.severity)
    }
}

/// Validate and decode one raw frame
///
/// # Errors
///
/// - `BadLength` when the prefix before the first space is missing, empty,
///   or not a decimal number
/// - `LengthMismatch` when the declared count differs from the bytes
///   counted from the separator to the end
/// - `BadPriority` when no `<digits>` token follows the separator
pub fn parse_frame(raw: &[u8]) -> Result<ParsedRecord, FrameError> {
    let Some(sep) = raw.iter().position(|&b| b == SEPARATOR) else {
        return Err(FrameError::bad_length(raw));
    };

    let prefix = &raw[..sep];
    let declared =
        parse_decimal::<usize>(prefix).ok_or_else(|| FrameError::bad_length(prefix))?;

    // counted from the separator, not from the body
    let actual = raw.len() - sep;
    if declared != actual {
        return Err(FrameError::length_mismatch(declared, actual));
    }

    let body = &raw[sep + 1..];
    let priority = parse_priority(body).ok_or(FrameError::BadPriority)?;

    Ok(ParsedRecord {
        priority,
        severity: (priority % SEVERITY_MODULUS) as u8,
        rendered_body: String::from_utf8_lossy(body).into_owned(),
    })
}

/// Total length of the frame at the start of a stream buffer
///
/// Returns `Ok(None)` while more bytes are needed to know or complete the
/// frame, and `Ok(Some(len))` once `buf[..len]` holds one whole frame. The
/// length is the prefix plus the declared count.
///
/// # Errors
///
/// - `BadLength` when the prefix is empty, holds a non-digit, declares zero
///   bytes, or runs past the longest possible count without a separator
/// - `TooLarge` when the declared frame exceeds `max_len` bytes
///
/// ```
/// use tlslog_protocol::frame_length;
///
/// let stream = b"17 <166>hello world12 <11>failure";
/// assert_eq!(frame_length(stream, 1024), Ok(Some(19)));
/// assert_eq!(frame_length(&stream[19..], 1024), Ok(Some(14)));
/// assert_eq!(frame_length(b"17 <166>hel", 1024), Ok(None));
/// ```
pub fn frame_length(buf: &[u8], max_len: usize) -> Result<Option<usize>, FrameError> {
    let window = &buf[..buf.len().min(MAX_COUNT_DIGITS + 1)];
    let Some(sep) = window.iter().position(|&b| b == SEPARATOR) else {
        if window.len() > MAX_COUNT_DIGITS || !window.iter().all(u8::is_ascii_digit) {
            return Err(FrameError::bad_length(window));
        }
        return Ok(None);
    };

    let prefix = &buf[..sep];
    let declared = parse_decimal::<usize>(prefix)
        .filter(|&declared| declared > 0)
        .ok_or_else(|| FrameError::bad_length(prefix))?;

    let length = sep.saturating_add(declared);
    if length > max_len {
        return Err(FrameError::too_large(length, max_len));
    }

    Ok((buf.len() >= length).then_some(length))
}

/// Build a frame for `body`, the inverse of [`parse_frame`]
///
/// Used by the `test` client and by tests.
pub fn encode_frame(body: &str) -> String {
    format!("{} {}", body.len() + 1, body)
}

/// Locate `<` and the following `>` and parse the digits between them
fn parse_priority(body: &[u8]) -> Option<u32> {
    let open = body.iter().position(|&b| b == b'<')?;
    let rest = &body[open + 1..];
    let close = rest.iter().position(|&b| b == b'>')?;
    parse_decimal::<u32>(&rest[..close])
}

/// Strict ASCII decimal: non-empty, digits only, no sign, no overflow
fn parse_decimal<T: std::str::FromStr>(digits: &[u8]) -> Option<T> {
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}

#[cfg(test)]
#[path = "frame_test.rs"]
mod frame_test;
