//! Bus transport to the external microcontroller.
//!
//! One capability, two implementations, chosen at startup from configuration:
//! - `I2cBus`: Linux I2C adapter (`/dev/i2c-N`) bound to a target address
//! - `SimulatedBus`: logs and records payloads, for hosts without a bus

#[cfg(target_os = "linux")]
mod i2c;
mod simulated;

use anyhow::Result;
#[cfg(not(target_os = "linux"))]
use anyhow::anyhow;

use crate::config::{BusSettings, TransportKind};
use crate::error::SentryError;

#[cfg(target_os = "linux")]
pub use i2c::I2cBus;
pub use simulated::SimulatedBus;

/// Byte transport to the signal receiver.
///
/// Implementations are opened and bound to their target before being handed to the
/// dispatcher; dropping a transport closes it.
pub trait BusTransport: Send {
    /// Transport identifier.
    fn name(&self) -> &'static str;

    /// Write one payload. A short write is a failure.
    fn write(&mut self, payload: &[u8]) -> Result<usize, SentryError>;
}

/// Open the transport named by the configuration.
pub fn open_transport(settings: &BusSettings) -> Result<Box<dyn BusTransport>> {
    match settings.transport {
        TransportKind::Simulated => Ok(Box::new(SimulatedBus::new())),
        TransportKind::I2c => open_i2c(settings),
    }
}

#[cfg(target_os = "linux")]
fn open_i2c(settings: &BusSettings) -> Result<Box<dyn BusTransport>> {
    let mut bus = I2cBus::open(&settings.device)?;
    bus.configure_target(settings.address)?;
    Ok(Box::new(bus))
}

#[cfg(not(target_os = "linux"))]
fn open_i2c(settings: &BusSettings) -> Result<Box<dyn BusTransport>> {
    Err(anyhow!(
        "I2C transport for {} is only available on Linux; use the simulated bus",
        settings.device
    ))
}
