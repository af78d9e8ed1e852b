//! Frame acquisition.
//!
//! Sources produce `Frame` values for the frame loop:
//! - V4L2 camera devices (feature: ingest-v4l2)
//! - Synthetic `stub://` source (testing, dry runs)

pub mod camera;

pub use camera::{CameraConfig, CameraSource, CameraStats};
