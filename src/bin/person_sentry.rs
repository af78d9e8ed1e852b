//! person_sentry - person detection daemon
//!
//! This daemon:
//! 1. Loads configuration and the class label table (fatal on failure)
//! 2. Opens the bus transport (I2C or simulated)
//! 3. Opens the camera and the inference backend
//! 4. Runs the frame loop until end of stream or Ctrl-C

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use person_sentry::{
    open_transport, CameraSource, ClassLabelTable, FrameLoop, FramePipeline, InferenceBackend,
    LogRenderer, SentryConfig, SignalDispatcher, TransportKind,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Detect people on camera and signal a microcontroller")]
struct Args {
    /// JSON or TOML configuration file.
    #[arg(long, env = "PERSON_SENTRY_CONFIG")]
    config: Option<PathBuf>,

    /// Log bus messages instead of writing to the I2C adapter.
    #[arg(long)]
    simulate_bus: bool,

    /// Stop after this many frames.
    #[arg(long, env = "PERSON_SENTRY_MAX_FRAMES")]
    max_frames: Option<u64>,

    /// Annotate every detected class, not only people.
    #[arg(long)]
    annotate_all: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = SentryConfig::load_from(args.config.as_deref())?;
    if args.simulate_bus {
        cfg.bus.transport = TransportKind::Simulated;
    }
    log::info!(
        "person_sentry {} starting: source={} bus={:?}:{} addr=0x{:02x}",
        env!("CARGO_PKG_VERSION"),
        cfg.source.device,
        cfg.bus.transport,
        cfg.bus.device,
        cfg.bus.address
    );

    let labels = ClassLabelTable::load(&cfg.labels_path)?;
    let transport = open_transport(&cfg.bus)?;
    let dispatcher = SignalDispatcher::new(transport, cfg.detection.person_class_id);
    let mut pipeline = FramePipeline::new(cfg.detection, labels, dispatcher);
    if args.annotate_all {
        pipeline = pipeline.with_all_annotations();
    }

    let mut source = CameraSource::new(cfg.source.camera_config(None))?;
    source.connect()?;
    let mut backend = open_backend(&cfg)?;
    log::info!("inference backend: {}", backend.name());

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })?;

    let mut renderer = LogRenderer;
    let summary = FrameLoop {
        source: &mut source,
        backend: backend.as_mut(),
        renderer: &mut renderer,
        shutdown: &shutdown,
        max_frames: args.max_frames,
    }
    .run(&mut pipeline)?;

    log::info!(
        "person_sentry stopped: frames={} messages={} write_failures={} decode_failures={}",
        summary.frames,
        summary.messages_emitted,
        summary.write_failures,
        summary.decode_failures
    );
    Ok(())
}

#[cfg(feature = "backend-tract")]
fn open_backend(cfg: &SentryConfig) -> Result<Box<dyn InferenceBackend>> {
    if cfg.source.device.starts_with("stub://") {
        return Ok(Box::new(person_sentry::ScriptedBackend::new()));
    }
    let backend = person_sentry::TractBackend::new(
        &cfg.model.path,
        cfg.model.input_width,
        cfg.model.input_height,
    )?;
    Ok(Box::new(backend))
}

#[cfg(not(feature = "backend-tract"))]
fn open_backend(cfg: &SentryConfig) -> Result<Box<dyn InferenceBackend>> {
    log::warn!(
        "built without backend-tract; model {} is not loaded and frames yield no detections",
        cfg.model.path.display()
    );
    Ok(Box::new(person_sentry::ScriptedBackend::new()))
}
