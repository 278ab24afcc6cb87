//! Outbound application events.
//!
//! The [`EcuService`](super::service::EcuService) emits these through the
//! [`EventSink`](super::ports::EventSink) port. The stock adapter prints
//! them on the diagnostic serial line; tests record them.

use crate::fsm::StateId;

/// Structured events emitted by the control core.
#[derive(Debug, Clone)]
pub enum EcuEvent {
    /// One diagnostic line's worth of state (SERIAL_OUT).
    Telemetry(TelemetryData),

    /// The mode machine changed regimes.
    StateChanged { from: StateId, to: StateId },

    /// One or more safety faults were raised.
    FaultRaised(u8),

    /// All safety faults have been cleared.
    FaultsCleared,

    /// The service has started (carries the initial state).
    Started(StateId),
}

/// A point-in-time snapshot for the diagnostic serial line.
#[derive(Debug, Clone)]
pub struct TelemetryData {
    pub state: StateId,
    pub rpm: f32,
    pub map_kpa: f32,
    /// Volumetric efficiency used for the current cycle (fraction).
    pub ve_fraction: f32,
    /// Spark discharge angle planned for the current cycle (degrees).
    pub spark_discharge_deg: f32,
    /// Injection pulse width planned for the current cycle (µs).
    pub fuel_pulse_us: u32,
    pub fault_flags: u8,
    /// Events skipped since boot because their angle was past due.
    pub skipped_events: u32,
}
