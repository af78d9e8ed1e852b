use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::SentryError;
use crate::ingest::CameraConfig;

const DEFAULT_LABELS_PATH: &str = "coco.names";
const DEFAULT_MODEL_PATH: &str = "mobilenet_ssd.onnx";
const DEFAULT_INPUT_WIDTH: u32 = 300;
const DEFAULT_INPUT_HEIGHT: u32 = 300;
const DEFAULT_SOURCE_DEVICE: &str = "/dev/video0";
const DEFAULT_SOURCE_FPS: u32 = 10;
const DEFAULT_SOURCE_WIDTH: u32 = 640;
const DEFAULT_SOURCE_HEIGHT: u32 = 480;
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
const DEFAULT_OVERLAP_THRESHOLD: f32 = 0.4;
const DEFAULT_PERSON_CLASS_ID: usize = 0;
const DEFAULT_BUS_DEVICE: &str = "/dev/i2c-1";
const DEFAULT_BUS_ADDRESS: u16 = 0x08;

#[derive(Debug, Deserialize, Default)]
struct SentryConfigFile {
    labels_path: Option<PathBuf>,
    model: Option<ModelConfigFile>,
    source: Option<SourceConfigFile>,
    detection: Option<DetectionConfigFile>,
    bus: Option<BusConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    path: Option<PathBuf>,
    input_width: Option<u32>,
    input_height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    device: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    confidence_threshold: Option<f32>,
    overlap_threshold: Option<f32>,
    person_class_id: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct BusConfigFile {
    transport: Option<TransportKind>,
    device: Option<String>,
    address: Option<u16>,
}

/// Which bus implementation to open at startup.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    I2c,
    Simulated,
}

impl FromStr for TransportKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "i2c" => Ok(TransportKind::I2c),
            "simulated" | "sim" => Ok(TransportKind::Simulated),
            other => Err(anyhow!("unknown bus transport '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SentryConfig {
    pub labels_path: PathBuf,
    pub model: ModelSettings,
    pub source: SourceSettings,
    pub detection: DetectionSettings,
    pub bus: BusSettings,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub path: PathBuf,
    pub input_width: u32,
    pub input_height: u32,
}

#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub device: String,
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct DetectionSettings {
    pub confidence_threshold: f32,
    pub overlap_threshold: f32,
    pub person_class_id: usize,
}

#[derive(Debug, Clone)]
pub struct BusSettings {
    pub transport: TransportKind,
    pub device: String,
    pub address: u16,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            overlap_threshold: DEFAULT_OVERLAP_THRESHOLD,
            person_class_id: DEFAULT_PERSON_CLASS_ID,
        }
    }
}

impl Default for BusSettings {
    fn default() -> Self {
        Self {
            transport: TransportKind::I2c,
            device: DEFAULT_BUS_DEVICE.to_string(),
            address: DEFAULT_BUS_ADDRESS,
        }
    }
}

impl SourceSettings {
    pub fn camera_config(&self, frame_limit: Option<u64>) -> CameraConfig {
        CameraConfig {
            device: self.device.clone(),
            target_fps: self.target_fps,
            width: self.width,
            height: self.height,
            frame_limit,
        }
    }
}

impl SentryConfig {
    /// Load from `PERSON_SENTRY_CONFIG` (if set), then apply environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("PERSON_SENTRY_CONFIG").ok().map(PathBuf::from);
        Self::load_from(config_path.as_deref())
    }

    /// Load from an explicit file (JSON, or TOML by extension), then apply environment
    /// overrides and validate.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: SentryConfigFile) -> Self {
        let model = file.model.unwrap_or_default();
        let source = file.source.unwrap_or_default();
        let detection = file.detection.unwrap_or_default();
        let bus = file.bus.unwrap_or_default();
        Self {
            labels_path: file
                .labels_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LABELS_PATH)),
            model: ModelSettings {
                path: model
                    .path
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
                input_width: model.input_width.unwrap_or(DEFAULT_INPUT_WIDTH),
                input_height: model.input_height.unwrap_or(DEFAULT_INPUT_HEIGHT),
            },
            source: SourceSettings {
                device: source
                    .device
                    .unwrap_or_else(|| DEFAULT_SOURCE_DEVICE.to_string()),
                target_fps: source.target_fps.unwrap_or(DEFAULT_SOURCE_FPS),
                width: source.width.unwrap_or(DEFAULT_SOURCE_WIDTH),
                height: source.height.unwrap_or(DEFAULT_SOURCE_HEIGHT),
            },
            detection: DetectionSettings {
                confidence_threshold: detection
                    .confidence_threshold
                    .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
                overlap_threshold: detection
                    .overlap_threshold
                    .unwrap_or(DEFAULT_OVERLAP_THRESHOLD),
                person_class_id: detection
                    .person_class_id
                    .unwrap_or(DEFAULT_PERSON_CLASS_ID),
            },
            bus: BusSettings {
                transport: bus.transport.unwrap_or(TransportKind::I2c),
                device: bus
                    .device
                    .unwrap_or_else(|| DEFAULT_BUS_DEVICE.to_string()),
                address: bus.address.unwrap_or(DEFAULT_BUS_ADDRESS),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(path) = non_empty_env("PERSON_SENTRY_LABELS") {
            self.labels_path = PathBuf::from(path);
        }
        if let Some(path) = non_empty_env("PERSON_SENTRY_MODEL") {
            self.model.path = PathBuf::from(path);
        }
        if let Some(device) = non_empty_env("PERSON_SENTRY_SOURCE") {
            self.source.device = device;
        }
        if let Some(transport) = non_empty_env("PERSON_SENTRY_BUS") {
            self.bus.transport = transport.parse()?;
        }
        if let Some(device) = non_empty_env("PERSON_SENTRY_BUS_DEVICE") {
            self.bus.device = device;
        }
        if let Some(address) = non_empty_env("PERSON_SENTRY_BUS_ADDRESS") {
            self.bus.address = parse_address(&address).ok_or_else(|| {
                anyhow!("PERSON_SENTRY_BUS_ADDRESS must be a decimal or 0x-prefixed hex address")
            })?;
        }
        if let Some(value) = non_empty_env("PERSON_SENTRY_CONF_THRESHOLD") {
            self.detection.confidence_threshold = value
                .parse()
                .map_err(|_| anyhow!("PERSON_SENTRY_CONF_THRESHOLD must be a number"))?;
        }
        if let Some(value) = non_empty_env("PERSON_SENTRY_NMS_THRESHOLD") {
            self.detection.overlap_threshold = value
                .parse()
                .map_err(|_| anyhow!("PERSON_SENTRY_NMS_THRESHOLD must be a number"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let missing = |msg: String| -> anyhow::Error { SentryError::ConfigurationMissing(msg).into() };

        if self.labels_path.as_os_str().is_empty() {
            return Err(missing("labels_path is empty".into()));
        }
        for (name, value) in [
            ("confidence_threshold", self.detection.confidence_threshold),
            ("overlap_threshold", self.detection.overlap_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(missing(format!("{} must be within [0, 1], got {}", name, value)));
            }
        }
        if self.model.input_width == 0 || self.model.input_height == 0 {
            return Err(missing("model input size must be non-zero".into()));
        }
        if self.source.width == 0 || self.source.height == 0 {
            return Err(missing("source frame size must be non-zero".into()));
        }
        if self.bus.device.trim().is_empty() {
            return Err(missing("bus device is empty".into()));
        }
        if !(0x03..=0x77).contains(&self.bus.address) {
            return Err(missing(format!(
                "bus address 0x{:02x} is outside the 7-bit range 0x03..=0x77",
                self.bus.address
            )));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<SentryConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path.extension().is_some_and(|ext| ext == "toml");
    let cfg = if is_toml {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_address(value: &str) -> Option<u16> {
    let value = value.trim();
    match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u16::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}
