//! Person Sentry
//!
//! Detects people in a live video stream and signals an external microcontroller over
//! a bus when a person appears.
//!
//! # Pipeline
//!
//! Each frame runs, in order and to completion:
//!
//! 1. **Inference** (`detect::InferenceBackend`): opaque forward pass producing raw
//!    per-anchor output tensors.
//! 2. **Decode** (`detect::DetectionDecoder`): anchors to pixel-space candidates,
//!    keeping only those strictly above the confidence threshold.
//! 3. **Suppress** (`detect::SuppressionEngine`): class-agnostic greedy NMS.
//! 4. **Dispatch** (`signal::SignalDispatcher`): one bus message per rising edge of
//!    "person present", never one per box or per frame.
//! 5. **Render** (`render::Renderer`): label boxes for display.
//!
//! # Module Structure
//!
//! - `geometry`: boxes and overlap ratio
//! - `detect`: tensors, detections, labels, decoder, suppression, inference backends
//! - `signal`: signal state machine and dispatcher
//! - `transport`: bus transport capability (I2C, simulated)
//! - `ingest`, `frame`: frame acquisition
//! - `pipeline`: frame loop orchestration
//! - `config`: layered configuration

pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod ingest;
pub mod pipeline;
pub mod render;
pub mod signal;
pub mod transport;

pub use config::{BusSettings, DetectionSettings, SentryConfig, TransportKind};
pub use detect::{
    decode, suppress, ClassLabelTable, Detection, DetectionDecoder, DetectionSet,
    InferenceBackend, RawOutputTensor, ScriptedBackend, SuppressionEngine,
};
#[cfg(feature = "backend-tract")]
pub use detect::TractBackend;
pub use error::SentryError;
pub use frame::Frame;
pub use geometry::BoxRect;
pub use ingest::{CameraConfig, CameraSource};
pub use pipeline::{FrameLoop, FramePipeline, FrameReport, RunSummary};
pub use render::{annotate, Annotation, LogRenderer, Renderer};
pub use signal::{
    dispatch, DispatchOutcome, SignalDispatcher, SignalState, SignalTransition, PERSON_DETECTED,
};
pub use transport::{open_transport, BusTransport, SimulatedBus};
