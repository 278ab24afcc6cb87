//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured control events to the
//! logger (UART console in production). Telemetry uses the canonical
//! diagnostic line format so bench tooling can parse one shape.

use log::{debug, info, warn};

use crate::app::events::EcuEvent;
use crate::app::ports::EventSink;
use crate::diagnostics::format_diag_line;

/// Adapter that logs every [`EcuEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &EcuEvent) {
        match event {
            EcuEvent::Telemetry(t) => {
                info!("DIAG | {}", format_diag_line(t));
            }
            EcuEvent::StateChanged { from, to } => {
                // Regime hops happen several times per revolution.
                debug!("STATE | {:?} -> {:?}", from, to);
            }
            EcuEvent::FaultRaised(flags) => {
                warn!("FAULT | raised, flags=0b{:04b}", flags);
            }
            EcuEvent::FaultsCleared => {
                info!("FAULT | all cleared");
            }
            EcuEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
        }
    }
}
