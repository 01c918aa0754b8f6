//! Scan pipeline error types
//!
//! One typed enum for everything a scan can refuse or abort on. Advisory
//! failures (alert delivery, evidence file writes) are logged where they
//! happen and never surface here.

use thiserror::Error;

/// Errors surfaced by the scan pipeline
#[derive(Debug, Error)]
pub enum ScanError {
    /// Scan requested before the classifier model finished loading
    #[error("classifier model is not ready")]
    ModelNotReady,

    /// Video source missing, revoked, or unable to produce a frame
    #[error("video source unavailable: {0}")]
    SourceUnavailable(String),

    /// Classifier call failed for a frame. The session aborts instead of
    /// skipping the frame, since a skipped frame could hide a positive.
    #[error("inference failed on frame {frame_index}: {message}")]
    InferenceFailure { frame_index: usize, message: String },

    /// A second scan was started while one is active on the same source
    #[error("a scan is already in progress")]
    ScanInProgress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ScanError::SourceUnavailable("camera revoked".to_string());
        assert_eq!(err.to_string(), "video source unavailable: camera revoked");

        let err = ScanError::InferenceFailure {
            frame_index: 3,
            message: "tensor shape mismatch".to_string(),
        };
        assert!(err.to_string().contains("frame 3"));
    }
}
