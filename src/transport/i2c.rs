//! Linux `/dev/i2c-*` character device transport.

use std::ffi::CString;

use anyhow::{anyhow, Result};

use super::BusTransport;
use crate::error::SentryError;

/// `I2C_SLAVE` request from `linux/i2c-dev.h`.
const I2C_SLAVE: libc::c_ulong = 0x0703;

/// Open handle on an I2C adapter, bound to one target address.
///
/// The file descriptor is closed on drop.
pub struct I2cBus {
    fd: libc::c_int,
    device: String,
}

impl I2cBus {
    /// Open the adapter device read/write.
    pub fn open(device: &str) -> Result<Self> {
        let path = CString::new(device)
            .map_err(|_| anyhow!("bus device path {:?} contains a NUL byte", device))?;
        // SAFETY: `path` is a valid NUL-terminated string for the duration of the call.
        let fd = unsafe { libc::open(path.as_ptr(), libc::O_RDWR) };
        if fd < 0 {
            let err = std::io::Error::last_os_error();
            return Err(anyhow!("failed to open the I2C bus {}: {}", device, err));
        }
        Ok(Self {
            fd,
            device: device.to_string(),
        })
    }

    /// Bind subsequent writes to a 7-bit target address.
    pub fn configure_target(&mut self, address: u16) -> Result<()> {
        // SAFETY: `self.fd` is an open descriptor owned by this value.
        let rc = unsafe { libc::ioctl(self.fd, I2C_SLAVE as _, libc::c_ulong::from(address)) };
        if rc < 0 {
            let err = std::io::Error::last_os_error();
            return Err(anyhow!(
                "failed to acquire bus access to 0x{:02x} on {}: {}",
                address,
                self.device,
                err
            ));
        }
        log::info!("I2C bus {} bound to target 0x{:02x}", self.device, address);
        Ok(())
    }
}

impl BusTransport for I2cBus {
    fn name(&self) -> &'static str {
        "i2c"
    }

    fn write(&mut self, payload: &[u8]) -> Result<usize, SentryError> {
        // SAFETY: the pointer and length describe `payload`, which outlives the call.
        let rc = unsafe {
            libc::write(
                self.fd,
                payload.as_ptr() as *const libc::c_void,
                payload.len(),
            )
        };
        if rc < 0 {
            return Err(SentryError::TransportWriteFailure(
                std::io::Error::last_os_error(),
            ));
        }
        let written = rc as usize;
        if written != payload.len() {
            return Err(SentryError::ShortWrite {
                written,
                expected: payload.len(),
            });
        }
        Ok(written)
    }
}

impl Drop for I2cBus {
    fn drop(&mut self) {
        // SAFETY: the descriptor is owned by this value and closed exactly once.
        unsafe {
            libc::close(self.fd);
        }
    }
}
