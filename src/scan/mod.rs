//! Scan orchestration
//!
//! One `ScanSession` drives a whole scan: derive the sampling window, pull
//! frames one at a time, evaluate both detection signals on each, feed the
//! aggregator, and emit a single verdict. Sessions against the same video
//! source are serialized through a `ScanGate`.

pub mod verdict;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, info};
use uuid::Uuid;

use crate::capture::sampler::{FrameSampler, SessionWindow};
use crate::capture::FrameSource;
use crate::error::ScanError;
use crate::vision::classifier::Classifier;
use crate::vision::{overlay, ClassAllowList, FrameSignals, PaperHeuristic};

pub use verdict::{SubjectIdentity, SubjectRegistry, Verdict, VerdictAggregator};

/// Observer for per-frame progress, purely presentational
///
/// Implementations receive the annotated overlay for display. Nothing an
/// observer does can change the verdict.
pub trait ScanObserver: Send {
    /// Called after each frame's signals are evaluated
    fn on_frame(&mut self, report: &FrameReport);
}

/// Per-frame progress handed to observers
#[derive(Debug)]
pub struct FrameReport {
    /// Zero-based index within the session window
    pub frame_index: usize,
    /// Total frames in the window
    pub frame_count: usize,
    /// Signals evaluated on this frame
    pub signals: FrameSignals,
    /// Frame composited with its detection boxes
    pub overlay: image::RgbaImage,
}

/// Serializes scans against one video source
///
/// Classifier and capture state behind a source are not safe to share
/// between overlapping scans, so a second scan fails fast instead of
/// interleaving.
#[derive(Debug, Clone, Default)]
pub struct ScanGate {
    active: Arc<AtomicBool>,
}

impl ScanGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the gate for one scan; fails when a scan already holds it
    fn acquire(&self) -> Result<GateGuard, ScanError> {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            Ok(GateGuard {
                active: Arc::clone(&self.active),
            })
        } else {
            Err(ScanError::ScanInProgress)
        }
    }
}

/// Releases the gate when the scan finishes or is abandoned
struct GateGuard {
    active: Arc<AtomicBool>,
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

/// One camera scan: window, per-frame signals, aggregation
pub struct ScanSession<'a> {
    classifier: &'a mut dyn Classifier,
    heuristic: PaperHeuristic,
    allow_list: ClassAllowList,
    window: SessionWindow,
    gate: ScanGate,
    observer: Option<&'a mut dyn ScanObserver>,
}

impl<'a> ScanSession<'a> {
    pub fn new(
        classifier: &'a mut dyn Classifier,
        heuristic: PaperHeuristic,
        allow_list: ClassAllowList,
        window: SessionWindow,
        gate: ScanGate,
    ) -> Self {
        Self {
            classifier,
            heuristic,
            allow_list,
            window,
            gate,
            observer: None,
        }
    }

    /// Attach a presentation observer
    pub fn with_observer(mut self, observer: &'a mut dyn ScanObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Run the scan against a source and emit one verdict.
    ///
    /// The model must be ready and the gate free before the first frame is
    /// requested. Frames are processed strictly one at a time; the loop
    /// always completes the full window, with no early exit on the first
    /// positive. Source loss or an inference failure aborts the session
    /// without a verdict. Dropping the returned future between frames
    /// abandons the scan: the pacing timer dies with it and no verdict is
    /// emitted.
    pub async fn run(
        mut self,
        source: &mut dyn FrameSource,
        subject: SubjectIdentity,
    ) -> Result<Verdict, ScanError> {
        if !self.classifier.is_ready() {
            return Err(ScanError::ModelNotReady);
        }
        let _guard = self.gate.acquire()?;

        let scan_id = Uuid::new_v4();
        info!(
            "scan {scan_id}: {} frame(s), {:?} between frames",
            self.window.frame_count, self.window.inter_frame_delay
        );

        let mut aggregator = VerdictAggregator::new();
        let mut sampler = FrameSampler::new(source, self.window);
        let mut frame_index = 0usize;

        while let Some(frame) = sampler.next_frame().await {
            let frame = frame?;
            let detections =
                self.classifier
                    .detect(&frame)
                    .await
                    .map_err(|err| ScanError::InferenceFailure {
                        frame_index,
                        message: format!("{err:#}"),
                    })?;

            let signals = FrameSignals {
                class_flag: self.allow_list.any_flagged(&detections),
                paper_flag: self.heuristic.assess(&frame),
                detections,
            };
            debug!(
                "scan {scan_id}: frame {}/{}: class={} paper={} ({:?} after capture)",
                frame_index + 1,
                self.window.frame_count,
                signals.class_flag,
                signals.paper_flag,
                frame.timestamp.elapsed()
            );
            aggregator.observe(&frame, &signals);

            if let Some(observer) = self.observer.as_mut() {
                let overlay = overlay::annotate(&frame, &signals.detections);
                observer.on_frame(&FrameReport {
                    frame_index,
                    frame_count: self.window.frame_count,
                    signals,
                    overlay,
                });
            }

            frame_index += 1;
            sleep(self.window.inter_frame_delay).await;
        }

        let verdict = aggregator.finalize(scan_id, subject);
        info!(
            "scan {scan_id}: verdict {}",
            if verdict.has_unauthorized_material {
                "FLAGGED"
            } else {
                "clean"
            }
        );
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;

    use crate::capture::frame::Frame;
    use crate::vision::classifier::{Detection, StubClassifier};
    use crate::vision::HeuristicConfig;

    /// Source yielding uniform dark frames, optionally failing partway
    struct DarkSource {
        served: usize,
        fail_at: Option<usize>,
    }

    impl DarkSource {
        fn new() -> Self {
            Self {
                served: 0,
                fail_at: None,
            }
        }

        fn failing_at(index: usize) -> Self {
            Self {
                served: 0,
                fail_at: Some(index),
            }
        }
    }

    #[async_trait]
    impl FrameSource for DarkSource {
        async fn next_frame(&mut self) -> Result<Frame, ScanError> {
            if self.fail_at == Some(self.served) {
                return Err(ScanError::SourceUnavailable("camera revoked".to_string()));
            }
            self.served += 1;
            Ok(Frame::new(vec![0; 32 * 32 * 4], 32, 32))
        }
    }

    /// Classifier whose every call fails
    struct BrokenClassifier;

    #[async_trait]
    impl Classifier for BrokenClassifier {
        async fn detect(&mut self, _frame: &Frame) -> anyhow::Result<Vec<Detection>> {
            anyhow::bail!("backend crashed")
        }
    }

    /// Observer recording how many frames it saw
    #[derive(Default)]
    struct CountingObserver {
        frames: usize,
        flagged_frames: usize,
    }

    impl ScanObserver for CountingObserver {
        fn on_frame(&mut self, report: &FrameReport) {
            self.frames += 1;
            if report.signals.flagged() {
                self.flagged_frames += 1;
            }
        }
    }

    fn fast_window(frame_count: usize) -> SessionWindow {
        SessionWindow {
            frame_count,
            inter_frame_delay: Duration::ZERO,
        }
    }

    fn cell_phone(score: f32) -> Detection {
        Detection {
            class: "cell phone".to_string(),
            score,
            bbox: (4.0, 4.0, 12.0, 12.0),
        }
    }

    fn session<'a>(classifier: &'a mut dyn Classifier, frames: usize) -> ScanSession<'a> {
        ScanSession::new(
            classifier,
            PaperHeuristic::new(HeuristicConfig::default()),
            ClassAllowList::default(),
            fast_window(frames),
            ScanGate::new(),
        )
    }

    #[tokio::test]
    async fn test_detection_on_last_frame_flags_session() {
        let mut script = vec![Vec::new(); 7];
        script.push(vec![cell_phone(0.9)]);
        let mut classifier = StubClassifier::with_script(script);
        let mut source = DarkSource::new();

        let verdict = session(&mut classifier, 8)
            .run(&mut source, SubjectIdentity::default())
            .await
            .unwrap();

        assert!(verdict.has_unauthorized_material);
        let png = verdict.evidence_png.expect("evidence present");
        assert!(!png.is_empty());
    }

    #[tokio::test]
    async fn test_clean_window_yields_clean_verdict() {
        let mut classifier = StubClassifier::new();
        let mut source = DarkSource::new();

        let verdict = session(&mut classifier, 8)
            .run(&mut source, SubjectIdentity::default())
            .await
            .unwrap();

        assert!(!verdict.has_unauthorized_material);
        assert!(verdict.evidence_png.is_none());
    }

    #[tokio::test]
    async fn test_scan_rejected_before_model_ready() {
        let mut classifier = StubClassifier::not_ready();
        let mut source = DarkSource::new();

        let result = session(&mut classifier, 8)
            .run(&mut source, SubjectIdentity::default())
            .await;
        assert!(matches!(result, Err(ScanError::ModelNotReady)));
        // Nothing was sampled
        assert_eq!(source.served, 0);
    }

    #[tokio::test]
    async fn test_source_loss_mid_window_aborts() {
        let mut classifier = StubClassifier::new();
        let mut source = DarkSource::failing_at(3);

        let result = session(&mut classifier, 8)
            .run(&mut source, SubjectIdentity::default())
            .await;
        assert!(matches!(result, Err(ScanError::SourceUnavailable(_))));
    }

    #[tokio::test]
    async fn test_inference_failure_aborts_instead_of_skipping() {
        let mut classifier = BrokenClassifier;
        let mut source = DarkSource::new();

        let result = session(&mut classifier, 8)
            .run(&mut source, SubjectIdentity::default())
            .await;
        assert!(matches!(
            result,
            Err(ScanError::InferenceFailure { frame_index: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_second_scan_fails_fast_while_gate_held() {
        let gate = ScanGate::new();
        let _held = gate.acquire().unwrap();

        let mut classifier = StubClassifier::new();
        let mut source = DarkSource::new();
        let session = ScanSession::new(
            &mut classifier,
            PaperHeuristic::new(HeuristicConfig::default()),
            ClassAllowList::default(),
            fast_window(2),
            gate.clone(),
        );

        let result = session.run(&mut source, SubjectIdentity::default()).await;
        assert!(matches!(result, Err(ScanError::ScanInProgress)));
    }

    #[tokio::test]
    async fn test_gate_released_after_scan_completes() {
        let gate = ScanGate::new();

        let mut classifier = StubClassifier::new();
        let mut source = DarkSource::new();
        let session = ScanSession::new(
            &mut classifier,
            PaperHeuristic::new(HeuristicConfig::default()),
            ClassAllowList::default(),
            fast_window(1),
            gate.clone(),
        );
        session
            .run(&mut source, SubjectIdentity::default())
            .await
            .unwrap();

        // Completed scans free the gate for the next one
        assert!(gate.acquire().is_ok());
    }

    #[tokio::test]
    async fn test_abandoned_scan_releases_gate_and_emits_nothing() {
        let gate = ScanGate::new();
        let mut classifier = StubClassifier::new();
        let mut source = DarkSource::new();

        {
            let session = ScanSession::new(
                &mut classifier,
                PaperHeuristic::new(HeuristicConfig::default()),
                ClassAllowList::default(),
                SessionWindow {
                    frame_count: 100,
                    inter_frame_delay: Duration::from_secs(3600),
                },
                gate.clone(),
            );
            let mut scan = Box::pin(session.run(&mut source, SubjectIdentity::default()));
            // Poll once so the scan claims the gate and its first frame
            tokio::select! {
                biased;
                _ = &mut scan => panic!("scan should still be pacing"),
                _ = tokio::task::yield_now() => {}
            }
            assert!(matches!(gate.acquire(), Err(ScanError::ScanInProgress)));
            // Dropping the future here abandons the scan
        }

        assert!(gate.acquire().is_ok());
        assert!(source.served <= 1);
    }

    #[tokio::test]
    async fn test_observer_sees_every_frame_without_touching_verdict() {
        let mut script = vec![vec![cell_phone(0.9)]];
        script.extend(std::iter::repeat_with(Vec::new).take(3));
        let mut classifier = StubClassifier::with_script(script);
        let mut source = DarkSource::new();
        let mut observer = CountingObserver::default();

        let verdict = session(&mut classifier, 4)
            .with_observer(&mut observer)
            .run(&mut source, SubjectIdentity::default())
            .await
            .unwrap();

        assert_eq!(observer.frames, 4);
        assert_eq!(observer.flagged_frames, 1);
        assert!(verdict.has_unauthorized_material);
    }

    #[tokio::test]
    async fn test_full_window_scanned_despite_early_positive() {
        let mut script = vec![vec![cell_phone(0.9)]];
        script.extend(std::iter::repeat_with(Vec::new).take(7));
        let mut classifier = StubClassifier::with_script(script);
        let mut source = DarkSource::new();

        let verdict = session(&mut classifier, 8)
            .run(&mut source, SubjectIdentity::default())
            .await
            .unwrap();

        // First frame already flagged, yet all 8 frames were pulled
        assert_eq!(source.served, 8);
        assert!(verdict.has_unauthorized_material);
    }
}
