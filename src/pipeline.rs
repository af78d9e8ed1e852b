//! Frame loop: capture -> inference -> decode -> suppress -> dispatch -> render.
//!
//! Single-threaded and frame-sequential. Each frame runs to completion before the next
//! one is pulled; `SignalState` is the only value carried between frames.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::config::DetectionSettings;
use crate::detect::{
    ClassLabelTable, DetectionDecoder, DetectionSet, InferenceBackend, RawOutputTensor,
    SuppressionEngine,
};
use crate::ingest::CameraSource;
use crate::render::{annotate, Annotation, FrameStats, Renderer};
use crate::signal::{DispatchOutcome, SignalDispatcher, SignalState};

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Result of processing one frame's tensors.
#[derive(Clone, Debug)]
pub struct FrameReport {
    pub candidates: usize,
    pub survivors: DetectionSet,
    pub annotations: Vec<Annotation>,
    pub outcome: DispatchOutcome,
    pub decode_failed: bool,
}

/// Decode, suppress and dispatch for one frame at a time.
pub struct FramePipeline {
    decoder: DetectionDecoder,
    suppression: SuppressionEngine,
    dispatcher: SignalDispatcher,
    state: SignalState,
    labels: ClassLabelTable,
    annotate_all: bool,
    frames: u64,
    decode_failures: u64,
}

impl FramePipeline {
    pub fn new(
        settings: DetectionSettings,
        labels: ClassLabelTable,
        dispatcher: SignalDispatcher,
    ) -> Self {
        Self {
            decoder: DetectionDecoder::new(settings.confidence_threshold),
            suppression: SuppressionEngine::new(
                settings.confidence_threshold,
                settings.overlap_threshold,
            ),
            dispatcher,
            state: SignalState::new(),
            labels,
            annotate_all: false,
            frames: 0,
            decode_failures: 0,
        }
    }

    /// Reject tensors whose score segment does not match the label table.
    pub fn with_strict_class_count(mut self) -> Self {
        self.decoder = self.decoder.with_class_count(self.labels.len());
        self
    }

    /// Annotate every surviving class instead of only the person class.
    pub fn with_all_annotations(mut self) -> Self {
        self.annotate_all = true;
        self
    }

    /// Process one frame. A malformed tensor set is logged and treated as an empty
    /// detection set; it never aborts the loop.
    pub fn process(
        &mut self,
        tensors: &[RawOutputTensor],
        frame_width: u32,
        frame_height: u32,
    ) -> FrameReport {
        self.frames += 1;

        let (candidates, decode_failed) =
            match self.decoder.decode(tensors, frame_width, frame_height) {
                Ok(candidates) => (candidates, false),
                Err(err) => {
                    self.decode_failures += 1;
                    log::warn!("frame {}: skipping detections: {}", self.frames, err);
                    (Vec::new(), true)
                }
            };

        let survivors = self.suppression.suppress(&candidates);
        let outcome = self.dispatcher.dispatch(&survivors, &mut self.state);

        let only_class = if self.annotate_all {
            None
        } else {
            Some(self.dispatcher.person_class_id())
        };
        let annotations = annotate(&survivors, &self.labels, only_class);

        FrameReport {
            candidates: candidates.len(),
            survivors,
            annotations,
            outcome,
            decode_failed,
        }
    }

    pub fn signal_state(&self) -> SignalState {
        self.state
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            frames: self.frames,
            messages_emitted: self.dispatcher.messages_emitted(),
            write_failures: self.dispatcher.write_failures(),
            decode_failures: self.decode_failures,
        }
    }
}

/// Counters reported when the loop exits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub messages_emitted: u64,
    pub write_failures: u64,
    pub decode_failures: u64,
}

/// Drives a `FramePipeline` from a camera and an inference backend.
pub struct FrameLoop<'a> {
    pub source: &'a mut CameraSource,
    pub backend: &'a mut dyn InferenceBackend,
    pub renderer: &'a mut dyn Renderer,
    pub shutdown: &'a AtomicBool,
    pub max_frames: Option<u64>,
}

impl FrameLoop<'_> {
    /// Run until end of stream, a capture failure, shutdown, or the frame limit. The
    /// summary is returned in every case; only a failed backend warm-up is an error.
    pub fn run(self, pipeline: &mut FramePipeline) -> Result<RunSummary> {
        let FrameLoop {
            source,
            backend,
            renderer,
            shutdown,
            max_frames,
        } = self;

        backend.warm_up()?;
        let mut last_health_log = Instant::now();
        let mut processed = 0u64;
        let mut last_inference_ms = 0.0;

        loop {
            if shutdown.load(Ordering::SeqCst) {
                log::info!("shutdown requested, stopping frame loop");
                break;
            }
            if max_frames.is_some_and(|limit| processed >= limit) {
                log::info!("frame limit reached ({})", processed);
                break;
            }

            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    log::info!("done processing: end of stream");
                    break;
                }
                Err(err) => {
                    log::error!("frame capture failed, stopping: {:#}", err);
                    break;
                }
            };

            let started = Instant::now();
            let tensors = match backend.infer(&frame) {
                Ok(tensors) => tensors,
                Err(err) => {
                    log::warn!(
                        "frame {}: inference on {} failed: {:#}",
                        frame.index,
                        backend.name(),
                        err
                    );
                    Vec::new()
                }
            };
            let inference_ms = started.elapsed().as_secs_f64() * 1000.0;
            last_inference_ms = inference_ms;

            let report = pipeline.process(&tensors, frame.width, frame.height);
            renderer.render(&frame, &report.annotations, FrameStats { inference_ms });
            processed += 1;

            if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
                let summary = pipeline.summary();
                log::info!(
                    "camera health={} frames={} messages={} write_failures={} inference={:.2} ms",
                    source.is_healthy(),
                    summary.frames,
                    summary.messages_emitted,
                    summary.write_failures,
                    last_inference_ms
                );
                last_health_log = Instant::now();
            }
        }

        Ok(pipeline.summary())
    }
}
