//! Fixed-window frame sampling
//!
//! A scan samples a bounded number of frames derived from the configured
//! duration and target rate. The sampler pulls each frame at the moment of
//! request and never buffers ahead; pacing between frames belongs to the
//! scan loop.

use std::time::Duration;

use crate::capture::frame::Frame;
use crate::capture::FrameSource;
use crate::error::ScanError;

/// Frame count and inter-frame delay for one scan
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionWindow {
    /// Frames sampled per scan, always at least 1
    pub frame_count: usize,
    /// Real-time pause between consecutive frames
    pub inter_frame_delay: Duration,
}

impl SessionWindow {
    /// Derive a window from scan duration and target sampling rate.
    ///
    /// `frame_count = max(1, floor(seconds * fps))`; a window never rounds
    /// down to zero frames.
    pub fn from_rate(seconds: f64, fps: u32) -> Self {
        let frame_count = ((seconds * fps as f64).floor() as usize).max(1);
        let inter_frame_delay = if fps > 0 {
            Duration::from_secs_f64(1.0 / fps as f64)
        } else {
            Duration::ZERO
        };
        Self {
            frame_count,
            inter_frame_delay,
        }
    }
}

/// Pulls exactly one window's worth of frames from a source
///
/// Finite and not restartable; a fresh sampler is created per scan.
pub struct FrameSampler<'a, S: FrameSource + ?Sized> {
    source: &'a mut S,
    window: SessionWindow,
    taken: usize,
}

impl<'a, S: FrameSource + ?Sized> FrameSampler<'a, S> {
    /// Create a sampler over a source for one session window
    pub fn new(source: &'a mut S, window: SessionWindow) -> Self {
        Self {
            source,
            window,
            taken: 0,
        }
    }

    /// Frames still owed by this sampler
    pub fn remaining(&self) -> usize {
        self.window.frame_count - self.taken
    }

    /// Capture the next frame, or `None` once the window is exhausted.
    ///
    /// A source failure surfaces as `SourceUnavailable` and leaves the
    /// sampler finished.
    pub async fn next_frame(&mut self) -> Option<Result<Frame, ScanError>> {
        if self.taken >= self.window.frame_count {
            return None;
        }
        match self.source.next_frame().await {
            Ok(frame) => {
                self.taken += 1;
                Some(Ok(frame))
            }
            Err(err) => {
                self.taken = self.window.frame_count;
                Some(Err(err))
            }
        }
    }
}
