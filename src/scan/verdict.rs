//! Verdict aggregation and evidence capture
//!
//! Folds per-frame signals into one session-level verdict. The flag is
//! sticky: one positive frame marks the whole session, and later clean
//! frames never revert it. Evidence is composited from the first flagged
//! frame, so the still always depicts the triggering moment.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::capture::frame::Frame;
use crate::vision::classifier::Detection;
use crate::vision::{overlay, FrameSignals};

/// Who is being scanned, as entered by the operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectIdentity {
    pub name: String,
    pub roll_number: String,
}

impl SubjectIdentity {
    /// Sentinel used when the operator never entered an identity
    pub const UNKNOWN: &'static str = "Unknown";

    /// Build an identity from operator input, trimming whitespace and
    /// falling back to the sentinel for blank fields.
    pub fn from_input(name: &str, roll_number: &str) -> Self {
        Self {
            name: clean_field(name),
            roll_number: clean_field(roll_number),
        }
    }
}

impl Default for SubjectIdentity {
    fn default() -> Self {
        Self {
            name: Self::UNKNOWN.to_string(),
            roll_number: Self::UNKNOWN.to_string(),
        }
    }
}

fn clean_field(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        SubjectIdentity::UNKNOWN.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Operator-editable identity shared between the UI side and scans
///
/// Scans snapshot the value at verdict time; edits after a scan never
/// touch verdicts already produced.
#[derive(Debug, Clone, Default)]
pub struct SubjectRegistry {
    inner: Arc<RwLock<SubjectIdentity>>,
}

impl SubjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the identity from operator input
    pub fn set(&self, name: &str, roll_number: &str) {
        *self.inner.write() = SubjectIdentity::from_input(name, roll_number);
    }

    /// Copy of the current identity
    pub fn snapshot(&self) -> SubjectIdentity {
        self.inner.read().clone()
    }
}

/// Final outcome of one scan session, immutable once created
#[derive(Debug, Clone)]
pub struct Verdict {
    /// Id of the scan that produced this verdict
    pub scan_id: Uuid,
    /// Whether any frame tripped either detection signal
    pub has_unauthorized_material: bool,
    /// PNG evidence still, present exactly when the verdict is positive
    pub evidence_png: Option<Vec<u8>>,
    /// Identity snapshot taken when the verdict was created
    pub subject: SubjectIdentity,
    /// Wall-clock end of the scan
    pub timestamp: DateTime<Utc>,
}

/// Sticky aggregation of frame signals across one sampling window
#[derive(Debug, Default)]
pub struct VerdictAggregator {
    /// First flagged frame and its detections, kept for evidence
    evidence: Option<(Frame, Vec<Detection>)>,
    frames_seen: usize,
}

impl VerdictAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any observed frame has tripped a signal so far
    pub fn is_flagged(&self) -> bool {
        self.evidence.is_some()
    }

    /// Fold one frame's signals into the session state.
    ///
    /// The first flagged frame is retained for the evidence still; later
    /// frames, flagged or not, never replace it.
    pub fn observe(&mut self, frame: &Frame, signals: &FrameSignals) {
        self.frames_seen += 1;
        if signals.flagged() && self.evidence.is_none() {
            debug!(
                "frame {} tripped: class={} paper={}",
                self.frames_seen, signals.class_flag, signals.paper_flag
            );
            self.evidence = Some((frame.clone(), signals.detections.clone()));
        }
    }

    /// Close the window and emit the verdict, compositing the evidence
    /// still when the session was flagged.
    pub fn finalize(self, scan_id: Uuid, subject: SubjectIdentity) -> Verdict {
        let has_unauthorized_material = self.evidence.is_some();
        let evidence_png = self
            .evidence
            .map(|(frame, detections)| overlay::encode_evidence(&frame, &detections));

        Verdict {
            scan_id,
            has_unauthorized_material,
            evidence_png,
            subject,
            timestamp: Utc::now(),
        }
    }
}
