//! Camera capture layer
//!
//! The pipeline never talks to camera hardware directly; it pulls frames
//! on demand from a `FrameSource`. Live capture backends are external
//! collaborators; a file-backed source is provided so the pipeline can run
//! against recorded stills.

pub mod file;
pub mod frame;
pub mod sampler;

pub use file::FileSource;
pub use frame::Frame;
pub use sampler::{FrameSampler, SessionWindow};

use async_trait::async_trait;

use crate::error::ScanError;

/// On-demand frame provider backing a scan
///
/// Implementations return the current frame at the moment of request; the
/// sampler never buffers ahead. A source that can no longer produce frames
/// fails with `SourceUnavailable`, which aborts the scan.
#[async_trait]
pub trait FrameSource: Send {
    /// Capture the current frame.
    async fn next_frame(&mut self) -> Result<Frame, ScanError>;
}
