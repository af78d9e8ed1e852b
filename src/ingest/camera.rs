//! Camera frame source.
//!
//! `CameraSource` opens a local V4L2 device node (feature `ingest-v4l2`) or, for
//! `stub://` paths, a synthetic generator used by tests and dry runs. Frames are handed
//! to the frame loop and dropped after one iteration.

use anyhow::{anyhow, Result};
#[cfg(feature = "ingest-v4l2")]
use anyhow::Context;
#[cfg(feature = "ingest-v4l2")]
use ouroboros::self_referencing;
#[cfg(feature = "ingest-v4l2")]
use std::time::{Duration, Instant};

use crate::frame::Frame;

/// Configuration for a camera source.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// Device path (e.g., "/dev/video0") or "stub://<name>".
    pub device: String,
    /// Target frame rate (frames per second).
    pub target_fps: u32,
    /// Preferred frame width.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
    /// Synthetic sources end the stream after this many frames.
    pub frame_limit: Option<u64>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            target_fps: 10,
            width: 640,
            height: 480,
            frame_limit: None,
        }
    }
}

/// Statistics for a camera source.
#[derive(Clone, Debug)]
pub struct CameraStats {
    pub frames_captured: u64,
    pub device: String,
}

pub struct CameraSource {
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticCamera),
    #[cfg(feature = "ingest-v4l2")]
    Device(DeviceCamera),
}

impl CameraSource {
    pub fn new(config: CameraConfig) -> Result<Self> {
        if config.device.starts_with("stub://") {
            return Ok(Self {
                backend: CameraBackend::Synthetic(SyntheticCamera::new(config)),
            });
        }
        #[cfg(feature = "ingest-v4l2")]
        {
            Ok(Self {
                backend: CameraBackend::Device(DeviceCamera::new(config)),
            })
        }
        #[cfg(not(feature = "ingest-v4l2"))]
        {
            Err(anyhow!(
                "camera {} requires the ingest-v4l2 feature",
                config.device
            ))
        }
    }

    /// Open the device. Failing here is fatal for the daemon.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.connect(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(source) => source.connect(),
        }
    }

    /// Capture the next frame. `Ok(None)` marks the end of the stream.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(source) => source.next_frame().map(Some),
        }
    }

    pub fn is_healthy(&self) -> bool {
        match &self.backend {
            CameraBackend::Synthetic(_) => true,
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(source) => source.is_healthy(),
        }
    }

    pub fn stats(&self) -> CameraStats {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(source) => source.stats(),
        }
    }
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://)
// ----------------------------------------------------------------------------

struct SyntheticCamera {
    config: CameraConfig,
    frame_count: u64,
    connected: bool,
}

impl SyntheticCamera {
    fn new(config: CameraConfig) -> Self {
        Self {
            config,
            frame_count: 0,
            connected: false,
        }
    }

    fn connect(&mut self) -> Result<()> {
        self.connected = true;
        log::info!("CameraSource: connected to {} (synthetic)", self.config.device);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if !self.connected {
            return Err(anyhow!("camera {} not connected", self.config.device));
        }
        if self
            .config
            .frame_limit
            .is_some_and(|limit| self.frame_count >= limit)
        {
            return Ok(None);
        }
        self.frame_count += 1;

        let len = (self.config.width as usize) * (self.config.height as usize) * 3;
        let shade = (self.frame_count % 256) as u8;
        let frame = Frame::new(
            vec![shade; len],
            self.config.width,
            self.config.height,
            self.frame_count,
        )?;
        Ok(Some(frame))
    }

    fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frame_count,
            device: self.config.device.clone(),
        }
    }
}

// ----------------------------------------------------------------------------
// V4L2 device source
// ----------------------------------------------------------------------------

/// Minimum time without a frame before a device counts as stalled.
#[cfg(feature = "ingest-v4l2")]
const MIN_STALL_WINDOW: Duration = Duration::from_secs(2);

/// Memory-mapped capture buffers requested from the driver.
#[cfg(feature = "ingest-v4l2")]
const CAPTURE_BUFFERS: u32 = 4;

#[cfg(feature = "ingest-v4l2")]
#[self_referencing]
struct MappedCapture {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

#[cfg(feature = "ingest-v4l2")]
struct DeviceCamera {
    config: CameraConfig,
    capture: Option<MappedCapture>,
    /// Frame size the driver agreed to, which may differ from the request.
    size: (u32, u32),
    captured: u64,
    last_capture: Option<Instant>,
    capture_failed: bool,
}

#[cfg(feature = "ingest-v4l2")]
impl DeviceCamera {
    fn new(config: CameraConfig) -> Self {
        Self {
            size: (config.width, config.height),
            config,
            capture: None,
            captured: 0,
            last_capture: None,
            capture_failed: false,
        }
    }

    fn connect(&mut self) -> Result<()> {
        use v4l::buffer::Type;

        let path = &self.config.device;
        let mut device =
            v4l::Device::with_path(path).with_context(|| format!("open camera {}", path))?;
        self.size = negotiate_rgb24(&mut device, &self.config)?;

        let capture = MappedCaptureTryBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, CAPTURE_BUFFERS)
                    .with_context(|| format!("map capture buffers for {}", path))
            },
        }
        .try_build()
        .inspect_err(|_| self.capture_failed = true)?;
        self.capture = Some(capture);
        self.capture_failed = false;

        log::info!(
            "CameraSource: streaming {} at {}x{} RGB24",
            path,
            self.size.0,
            self.size.1
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        use v4l::io::traits::CaptureStream;

        let Some(capture) = self.capture.as_mut() else {
            return Err(anyhow!("camera {} not connected", self.config.device));
        };
        let (buf, meta) = match capture.with_stream_mut(|stream| stream.next()) {
            Ok(dequeued) => dequeued,
            Err(err) => {
                self.capture_failed = true;
                return Err(anyhow::Error::new(err)
                    .context(format!("dequeue frame from {}", self.config.device)));
            }
        };

        let used = (meta.bytesused as usize).min(buf.len());
        let pixels = buf[..used].to_vec();
        self.captured += 1;
        self.last_capture = Some(Instant::now());
        Frame::new(pixels, self.size.0, self.size.1, self.captured)
    }

    /// Healthy until a capture fails or no frame arrives within the stall window.
    fn is_healthy(&self) -> bool {
        !self.capture_failed
            && self
                .last_capture
                .map_or(true, |at| at.elapsed() <= self.stall_window())
    }

    fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.captured,
            device: self.config.device.clone(),
        }
    }

    /// Six frame intervals at the target rate, never shorter than `MIN_STALL_WINDOW`.
    fn stall_window(&self) -> Duration {
        match self.config.target_fps {
            0 => MIN_STALL_WINDOW,
            fps => (Duration::from_secs(6) / fps).max(MIN_STALL_WINDOW),
        }
    }
}

/// Ask for packed RGB24 at the configured size and frame rate. Returns the size the
/// driver settled on. A driver that substitutes another pixel format is rejected.
#[cfg(feature = "ingest-v4l2")]
fn negotiate_rgb24(device: &mut v4l::Device, config: &CameraConfig) -> Result<(u32, u32)> {
    use v4l::video::Capture;

    const RGB24: [u8; 4] = *b"RGB3";

    let mut wanted = device
        .format()
        .with_context(|| format!("query format of {}", config.device))?;
    wanted.width = config.width;
    wanted.height = config.height;
    wanted.fourcc = v4l::FourCC::new(&RGB24);

    let granted = device
        .set_format(&wanted)
        .with_context(|| format!("set RGB24 format on {}", config.device))?;
    if granted.fourcc.repr != RGB24 {
        return Err(anyhow!(
            "camera {} offered {} instead of RGB3",
            config.device,
            String::from_utf8_lossy(&granted.fourcc.repr)
        ));
    }

    if config.target_fps > 0 {
        let rate = v4l::video::capture::Parameters::with_fps(config.target_fps);
        if let Err(err) = device.set_params(&rate) {
            log::warn!(
                "CameraSource: {} kept its default frame rate ({})",
                config.device,
                err
            );
        }
    }

    Ok((granted.width, granted.height))
}
