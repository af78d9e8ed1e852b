//! Edge-triggered person signal.
//!
//! The dispatcher emits one bus message when a person first appears after a frame
//! without one. Frames where a person stays in view emit nothing; a frame with no person
//! re-arms the signal silently.

use crate::detect::Detection;
use crate::transport::BusTransport;

/// Payload written on every rising edge.
pub const PERSON_DETECTED: &[u8] = b"PERSON_DETECTED";

/// Process-wide signal flag. Starts inactive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SignalState {
    active: bool,
}

/// Change of the signal flag for one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignalTransition {
    /// Inactive -> Active.
    Rising,
    /// Active -> Active.
    Held,
    /// Active -> Inactive.
    Falling,
    /// Inactive -> Inactive.
    Idle,
}

impl SignalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Advance the state machine with this frame's presence.
    pub fn observe(&mut self, person_present: bool) -> SignalTransition {
        let transition = match (self.active, person_present) {
            (false, true) => SignalTransition::Rising,
            (true, true) => SignalTransition::Held,
            (true, false) => SignalTransition::Falling,
            (false, false) => SignalTransition::Idle,
        };
        self.active = person_present;
        transition
    }
}

/// What the dispatcher did for one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Rising edge; the message was written.
    Emitted,
    /// Rising edge; the write failed and was logged. No retry follows.
    WriteFailed,
    /// Person still present; nothing written.
    Held,
    /// Person gone; flag cleared, nothing written.
    Cleared,
    /// No person before or now.
    Idle,
}

impl DispatchOutcome {
    pub fn is_rising_edge(&self) -> bool {
        matches!(self, DispatchOutcome::Emitted | DispatchOutcome::WriteFailed)
    }
}

/// True when any survivor carries the person class.
pub fn person_present(survivors: &[Detection], person_class_id: usize) -> bool {
    survivors.iter().any(|d| d.class_id == person_class_id)
}

/// Run one frame of the signal state machine, writing `PERSON_DETECTED` on a rising edge.
///
/// A failed write is logged and swallowed; the state still moves to active, so the
/// next frames do not resend.
pub fn dispatch(
    survivors: &[Detection],
    person_class_id: usize,
    state: &mut SignalState,
    transport: &mut dyn BusTransport,
) -> DispatchOutcome {
    match state.observe(person_present(survivors, person_class_id)) {
        SignalTransition::Rising => match transport.write(PERSON_DETECTED) {
            Ok(_) => {
                log::info!("person detected; signalled over {}", transport.name());
                DispatchOutcome::Emitted
            }
            Err(err) => {
                log::error!("failed to write to the {} bus: {}", transport.name(), err);
                DispatchOutcome::WriteFailed
            }
        },
        SignalTransition::Held => DispatchOutcome::Held,
        SignalTransition::Falling => {
            log::debug!("person left view; signal re-armed");
            DispatchOutcome::Cleared
        }
        SignalTransition::Idle => DispatchOutcome::Idle,
    }
}

/// Owns the transport and the person class id; the caller owns the `SignalState`.
pub struct SignalDispatcher {
    transport: Box<dyn BusTransport>,
    person_class_id: usize,
    emitted: u64,
    write_failures: u64,
}

impl SignalDispatcher {
    pub fn new(transport: Box<dyn BusTransport>, person_class_id: usize) -> Self {
        Self {
            transport,
            person_class_id,
            emitted: 0,
            write_failures: 0,
        }
    }

    pub fn person_class_id(&self) -> usize {
        self.person_class_id
    }

    pub fn dispatch(&mut self, survivors: &[Detection], state: &mut SignalState) -> DispatchOutcome {
        let outcome = dispatch(
            survivors,
            self.person_class_id,
            state,
            self.transport.as_mut(),
        );
        match outcome {
            DispatchOutcome::Emitted => self.emitted += 1,
            DispatchOutcome::WriteFailed => self.write_failures += 1,
            _ => {}
        }
        outcome
    }

    pub fn messages_emitted(&self) -> u64 {
        self.emitted
    }

    pub fn write_failures(&self) -> u64 {
        self.write_failures
    }
}
