//! Object-classifier signal
//!
//! Wraps a pretrained multi-class detector behind a trait and reduces its
//! detections to a single "unauthorized object present" boolean using a
//! class allow-list and confidence cutoff. Model loading and inference
//! backends live outside this crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::capture::frame::Frame;

/// One classifier output: a labeled box with a confidence score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    /// Class label from the model's vocabulary
    pub class: String,
    /// Confidence score (0.0 - 1.0)
    pub score: f32,
    /// Bounding box (x, y, width, height) in source pixels
    pub bbox: (f32, f32, f32, f32),
}

/// Pretrained multi-class object detector
///
/// Implementations run whatever model they like; the pipeline only needs
/// labeled boxes with scores.
#[async_trait]
pub trait Classifier: Send {
    /// Whether the model has finished loading. Scans are rejected until
    /// this returns true.
    fn is_ready(&self) -> bool {
        true
    }

    /// Run detection on one frame.
    async fn detect(&mut self, frame: &Frame) -> anyhow::Result<Vec<Detection>>;
}

/// Class labels treated as unauthorized exam materials, plus the
/// confidence cutoff a detection must reach to count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassAllowList {
    /// Labels checked by exact string match
    pub classes: Vec<String>,
    /// Minimum confidence, inclusive
    pub min_score: f32,
}

impl Default for ClassAllowList {
    fn default() -> Self {
        Self {
            classes: ["book", "cell phone", "laptop", "remote", "tv"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            min_score: 0.55,
        }
    }
}

impl ClassAllowList {
    /// Reduce a frame's detections to the class signal: true when any
    /// detection carries an allow-listed label at or above the cutoff.
    pub fn any_flagged(&self, detections: &[Detection]) -> bool {
        detections.iter().any(|d| self.matches(d))
    }

    /// Exact-label, inclusive-score membership test for one detection
    pub fn matches(&self, detection: &Detection) -> bool {
        detection.score >= self.min_score && self.classes.iter().any(|c| c == &detection.class)
    }
}

/// Scripted classifier for tests and model-less runs
///
/// Pops one queued detection batch per frame, then keeps returning empty
/// results once the script runs out.
#[derive(Debug, Default)]
pub struct StubClassifier {
    script: VecDeque<Vec<Detection>>,
    ready: bool,
}

impl StubClassifier {
    /// A ready classifier that never detects anything
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            ready: true,
        }
    }

    /// A ready classifier that replays the given per-frame batches
    pub fn with_script(script: Vec<Vec<Detection>>) -> Self {
        Self {
            script: script.into(),
            ready: true,
        }
    }

    /// A classifier still "loading"; scans against it are rejected
    pub fn not_ready() -> Self {
        Self {
            script: VecDeque::new(),
            ready: false,
        }
    }
}

#[async_trait]
impl Classifier for StubClassifier {
    fn is_ready(&self) -> bool {
        self.ready
    }

    async fn detect(&mut self, _frame: &Frame) -> anyhow::Result<Vec<Detection>> {
        Ok(self.script.pop_front().unwrap_or_default())
    }
}
