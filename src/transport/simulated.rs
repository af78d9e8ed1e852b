use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use super::BusTransport;
use crate::error::SentryError;

/// Payloads kept for inspection; older ones are only counted.
pub const SENT_HISTORY: usize = 16;

#[derive(Default)]
struct SentLog {
    recent: VecDeque<Vec<u8>>,
    total: u64,
}

/// Bus stand-in for hosts without an I2C adapter.
///
/// Every write is logged. The last `SENT_HISTORY` payloads are kept along with a running
/// count. Clones share the same record, so a caller can keep a handle after boxing the
/// transport into a dispatcher.
#[derive(Clone, Default)]
pub struct SimulatedBus {
    record: Arc<Mutex<SentLog>>,
}

impl SimulatedBus {
    pub fn new() -> Self {
        log::info!("bus simulation: initializing interface");
        Self::default()
    }

    /// Most recent payloads, oldest first.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.lock().recent.iter().cloned().collect()
    }

    /// Total payloads written since the bus was created.
    pub fn sent_count(&self) -> u64 {
        self.lock().total
    }

    fn lock(&self) -> MutexGuard<'_, SentLog> {
        match self.record.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl BusTransport for SimulatedBus {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn write(&mut self, payload: &[u8]) -> Result<usize, SentryError> {
        log::info!(
            "bus simulation: sending message {}",
            String::from_utf8_lossy(payload)
        );
        let mut record = self.lock();
        if record.recent.len() == SENT_HISTORY {
            record.recent.pop_front();
        }
        record.recent.push_back(payload.to_vec());
        record.total += 1;
        Ok(payload.len())
    }
}
