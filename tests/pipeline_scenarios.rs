//! End-to-end scenarios for the detection core and the frame loop.
//!
//! Frames come from the synthetic camera, tensors from the scripted backend, and bus
//! writes land on the simulated transport.

use std::sync::atomic::AtomicBool;

use ndarray::{array, Array2};

use person_sentry::render::FrameStats;
use person_sentry::{
    suppress, Annotation, BoxRect, BusTransport, CameraConfig, CameraSource, ClassLabelTable,
    Detection, DetectionSettings, DispatchOutcome, Frame, FrameLoop, FramePipeline,
    RawOutputTensor, Renderer, ScriptedBackend, SentryError, SignalDispatcher, SimulatedBus,
    PERSON_DETECTED,
};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;

fn labels() -> ClassLabelTable {
    ClassLabelTable::new(vec![
        "person".into(),
        "bicycle".into(),
        "car".into(),
        "motorcycle".into(),
    ])
}

/// One anchor row: normalized box, objectness, then four class scores.
fn anchor(cx: f32, cy: f32, w: f32, h: f32, class_id: usize, score: f32) -> [f32; 9] {
    let mut row = [cx, cy, w, h, 1.0, 0.0, 0.0, 0.0, 0.0];
    row[5 + class_id] = score;
    row
}

fn tensor(rows: &[[f32; 9]]) -> RawOutputTensor {
    let flat: Vec<f32> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((rows.len(), 9), flat).expect("tensor shape")
}

fn person_frame() -> Vec<RawOutputTensor> {
    vec![tensor(&[
        anchor(0.5, 0.5, 0.2, 0.4, 0, 0.92),
        anchor(0.51, 0.5, 0.2, 0.4, 0, 0.85),
    ])]
}

fn empty_frame() -> Vec<RawOutputTensor> {
    vec![tensor(&[anchor(0.1, 0.1, 0.05, 0.05, 2, 0.3)])]
}

fn pipeline(bus: &SimulatedBus) -> FramePipeline {
    let dispatcher = SignalDispatcher::new(Box::new(bus.clone()), 0);
    FramePipeline::new(DetectionSettings::default(), labels(), dispatcher)
}

#[derive(Default)]
struct CollectingRenderer {
    frames: Vec<(u64, Vec<Annotation>)>,
}

impl Renderer for CollectingRenderer {
    fn render(&mut self, frame: &Frame, annotations: &[Annotation], _stats: FrameStats) {
        self.frames.push((frame.index, annotations.to_vec()));
    }
}

struct DeadBus;

impl BusTransport for DeadBus {
    fn name(&self) -> &'static str {
        "dead"
    }

    fn write(&mut self, _payload: &[u8]) -> Result<usize, SentryError> {
        Err(SentryError::TransportWriteFailure(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "target not responding",
        )))
    }
}

#[test]
fn suppression_scenario_keeps_highest_and_disjoint_boxes() {
    let candidates = vec![
        Detection::new(0, 0.9, BoxRect::new(0.0, 0.0, 10.0, 10.0)),
        Detection::new(0, 0.8, BoxRect::new(1.0, 1.0, 10.0, 10.0)),
        Detection::new(3, 0.95, BoxRect::new(50.0, 50.0, 5.0, 5.0)),
    ];

    let survivors = suppress(&candidates, 0.5, 0.5);

    assert_eq!(survivors.len(), 2);
    assert!(survivors.contains(&candidates[0]));
    assert!(survivors.contains(&candidates[2]));
    assert!(!survivors.contains(&candidates[1]));
}

#[test]
fn five_frame_scenario_emits_two_messages() {
    let bus = SimulatedBus::new();
    let mut pipeline = pipeline(&bus);

    let frames = [
        person_frame(),
        person_frame(),
        person_frame(),
        empty_frame(),
        person_frame(),
    ];
    let outcomes: Vec<DispatchOutcome> = frames
        .iter()
        .map(|tensors| pipeline.process(tensors, WIDTH, HEIGHT).outcome)
        .collect();

    assert_eq!(
        outcomes,
        vec![
            DispatchOutcome::Emitted,
            DispatchOutcome::Held,
            DispatchOutcome::Held,
            DispatchOutcome::Cleared,
            DispatchOutcome::Emitted,
        ]
    );
    assert_eq!(bus.sent(), vec![PERSON_DETECTED.to_vec(), PERSON_DETECTED.to_vec()]);
}

#[test]
fn long_person_run_emits_exactly_once() {
    let bus = SimulatedBus::new();
    let mut pipeline = pipeline(&bus);

    for _ in 0..50 {
        pipeline.process(&person_frame(), WIDTH, HEIGHT);
    }

    assert_eq!(bus.sent_count(), 1);
    assert!(pipeline.signal_state().is_active());
}

#[test]
fn overlapping_person_boxes_collapse_to_one_survivor() {
    let bus = SimulatedBus::new();
    let mut pipeline = pipeline(&bus);

    let report = pipeline.process(&person_frame(), WIDTH, HEIGHT);

    assert_eq!(report.candidates, 2);
    assert_eq!(report.survivors.len(), 1);
    assert_eq!(report.survivors[0].confidence, 0.92);
    assert_eq!(report.annotations[0].text, "person:0.92");
}

#[test]
fn zero_candidates_produce_no_survivors_and_no_dispatch() {
    let bus = SimulatedBus::new();
    let mut pipeline = pipeline(&bus);

    let report = pipeline.process(&[], WIDTH, HEIGHT);

    assert_eq!(report.candidates, 0);
    assert!(report.survivors.is_empty());
    assert_eq!(report.outcome, DispatchOutcome::Idle);
    assert_eq!(bus.sent_count(), 0);
}

#[test]
fn bus_failure_does_not_stop_detection() {
    let dispatcher = SignalDispatcher::new(Box::new(DeadBus), 0);
    let mut pipeline = FramePipeline::new(DetectionSettings::default(), labels(), dispatcher);

    let first = pipeline.process(&person_frame(), WIDTH, HEIGHT);
    assert_eq!(first.outcome, DispatchOutcome::WriteFailed);
    assert_eq!(first.survivors.len(), 1);

    let second = pipeline.process(&person_frame(), WIDTH, HEIGHT);
    assert_eq!(second.outcome, DispatchOutcome::Held);
    assert_eq!(second.survivors.len(), 1);

    let summary = pipeline.summary();
    assert_eq!(summary.frames, 2);
    assert_eq!(summary.write_failures, 1);
    assert_eq!(summary.messages_emitted, 0);
}

#[test]
fn cross_class_overlap_suppresses_lower_confidence() {
    let bus = SimulatedBus::new();
    let mut pipeline = pipeline(&bus);

    // A confident car over the same region hides the person box.
    let tensors = vec![tensor(&[
        anchor(0.5, 0.5, 0.2, 0.4, 0, 0.7),
        anchor(0.5, 0.5, 0.2, 0.4, 2, 0.95),
    ])];
    let report = pipeline.process(&tensors, WIDTH, HEIGHT);

    assert_eq!(report.survivors.len(), 1);
    assert_eq!(report.survivors[0].class_id, 2);
    assert_eq!(report.outcome, DispatchOutcome::Idle);
}

#[test]
fn non_finite_anchor_neither_signals_nor_suppresses() {
    let bus = SimulatedBus::new();
    let mut pipeline = pipeline(&bus);

    let tensors = vec![tensor(&[
        anchor(f32::NAN, 0.5, 0.2, 0.4, 0, 0.99),
        anchor(0.5, 0.5, 0.2, 0.4, 2, 0.8),
    ])];
    let report = pipeline.process(&tensors, WIDTH, HEIGHT);

    assert_eq!(report.candidates, 1);
    assert_eq!(report.survivors.len(), 1);
    assert_eq!(report.survivors[0].class_id, 2);
    assert_eq!(report.outcome, DispatchOutcome::Idle);
    assert_eq!(bus.sent_count(), 0);
}

#[test]
fn frame_loop_runs_until_end_of_stream() {
    let bus = SimulatedBus::new();
    let mut pipeline = pipeline(&bus);

    let mut source = CameraSource::new(CameraConfig {
        device: "stub://scenario".to_string(),
        target_fps: 10,
        width: 64,
        height: 48,
        frame_limit: Some(6),
    })
    .expect("stub camera");
    source.connect().expect("connect");

    let mut backend = ScriptedBackend::from_script(vec![
        person_frame(),
        person_frame(),
        empty_frame(),
        vec![array![[0.5f32, 0.5, 0.1, 0.1]]],
        person_frame(),
    ]);
    let mut renderer = CollectingRenderer::default();
    let shutdown = AtomicBool::new(false);

    let summary = FrameLoop {
        source: &mut source,
        backend: &mut backend,
        renderer: &mut renderer,
        shutdown: &shutdown,
        max_frames: None,
    }
    .run(&mut pipeline)
    .expect("frame loop");

    assert_eq!(summary.frames, 6);
    assert_eq!(summary.messages_emitted, 2);
    assert_eq!(summary.decode_failures, 1);
    assert_eq!(bus.sent_count(), 2);
    assert_eq!(backend.frames_seen(), 6);

    let indices: Vec<u64> = renderer.frames.iter().map(|(i, _)| *i).collect();
    assert_eq!(indices, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(renderer.frames[0].1.len(), 1);
    assert!(renderer.frames[2].1.is_empty());
}

#[test]
fn frame_loop_honours_shutdown_and_frame_limit() {
    let bus = SimulatedBus::new();

    let mut source = CameraSource::new(CameraConfig {
        device: "stub://endless".to_string(),
        width: 16,
        height: 16,
        ..CameraConfig::default()
    })
    .expect("stub camera");
    source.connect().expect("connect");
    let mut backend = ScriptedBackend::new();
    let mut renderer = CollectingRenderer::default();

    let limited = FrameLoop {
        source: &mut source,
        backend: &mut backend,
        renderer: &mut renderer,
        shutdown: &AtomicBool::new(false),
        max_frames: Some(3),
    }
    .run(&mut pipeline(&bus))
    .expect("limited loop");
    assert_eq!(limited.frames, 3);

    let stopped = FrameLoop {
        source: &mut source,
        backend: &mut backend,
        renderer: &mut renderer,
        shutdown: &AtomicBool::new(true),
        max_frames: None,
    }
    .run(&mut pipeline(&bus))
    .expect("stopped loop");
    assert_eq!(stopped.frames, 0);
}

#[test]
fn capture_failure_ends_loop_with_summary() {
    let bus = SimulatedBus::new();
    let mut pipeline = pipeline(&bus);
    let mut backend = ScriptedBackend::from_script(vec![person_frame()]);
    let mut renderer = CollectingRenderer::default();
    let shutdown = AtomicBool::new(false);

    let mut healthy = CameraSource::new(CameraConfig {
        device: "stub://healthy".to_string(),
        width: 16,
        height: 16,
        ..CameraConfig::default()
    })
    .expect("stub camera");
    healthy.connect().expect("connect");
    FrameLoop {
        source: &mut healthy,
        backend: &mut backend,
        renderer: &mut renderer,
        shutdown: &shutdown,
        max_frames: Some(2),
    }
    .run(&mut pipeline)
    .expect("healthy loop");

    // Never connected, so the first capture fails.
    let mut broken = CameraSource::new(CameraConfig {
        device: "stub://broken".to_string(),
        width: 16,
        height: 16,
        ..CameraConfig::default()
    })
    .expect("stub camera");
    let summary = FrameLoop {
        source: &mut broken,
        backend: &mut backend,
        renderer: &mut renderer,
        shutdown: &shutdown,
        max_frames: None,
    }
    .run(&mut pipeline)
    .expect("capture failure is not an error");

    assert_eq!(summary.frames, 2);
    assert_eq!(summary.messages_emitted, 1);
    assert_eq!(renderer.frames.len(), 2);
}
