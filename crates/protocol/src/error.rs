//! Frame error types
//!
//! Every variant is scoped to one record: the caller drops the frame and
//! keeps reading from the connection. On a stream, `BadLength` also means
//! the frame boundary is lost, so the caller discards what it has buffered.

use thiserror::Error;

/// Errors produced while validating a raw frame
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Octet-count prefix missing, empty, or not a decimal number
    #[error("invalid octet count '{prefix}'")]
    BadLength { prefix: String },

    /// Declared octet count differs from the bytes actually received
    #[error("length mismatch: declared {declared} bytes, received {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    /// Declared frame does not fit in the read buffer
    #[error("frame of {length} bytes exceeds the {max} byte limit")]
    TooLarge { length: usize, max: usize },

    /// `<PRI>` bracket missing or not a decimal number
    #[error("missing or invalid <PRI> field")]
    BadPriority,
}

impl FrameError {
    /// Create a bad length error, keeping a bounded copy of the prefix
    #[inline]
    pub fn bad_length(prefix: &[u8]) -> Self {
        const MAX_PREFIX: usize = 32;
        let shown = &prefix[..prefix.len().min(MAX_PREFIX)];
        Self::BadLength {
            prefix: String::from_utf8_lossy(shown).into_owned(),
        }
    }

    /// Create a length mismatch error
    #[inline]
    pub fn length_mismatch(declared: usize, actual: usize) -> Self {
        Self::LengthMismatch { declared, actual }
    }

    /// Create a frame too large error
    #[inline]
    pub fn too_large(length: usize, max: usize) -> Self {
        Self::TooLarge { length, max }
    }
}
