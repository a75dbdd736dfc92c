//! Pipeline error types
//!
//! Every variant is scoped to a single record. The caller decides whether
//! to keep reading; only `SinkClosed` means no further record can succeed.

use thiserror::Error;
use tlslog_protocol::FrameError;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Frame failed validation and was dropped
    #[error("malformed frame: {0}")]
    Frame(#[from] FrameError),

    /// Severity has no configured color, record dropped from every sink
    #[error("unsupported severity {severity} (priority {priority})")]
    UnsupportedSeverity { priority: u32, severity: u8 },

    /// Sink queue is closed
    #[error("sink queue closed: {0}")]
    SinkClosed(String),
}

impl PipelineError {
    /// True when the pipeline is shutting down and no later record can be routed
    #[inline]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::SinkClosed(_))
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::from(FrameError::BadPriority);
        assert!(err.to_string().contains("malformed frame"));
        assert!(!err.is_closed());

        let err = PipelineError::UnsupportedSeverity {
            priority: 12,
            severity: 4,
        };
        assert!(err.to_string().contains("severity 4"));
        assert!(err.to_string().contains("priority 12"));

        let err = PipelineError::SinkClosed("file".into());
        assert!(err.to_string().contains("file"));
        assert!(err.is_closed());
    }
}
