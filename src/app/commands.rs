//! Inbound commands to the control service.
//!
//! Actions requested by the outside world (bench serial console, a
//! future tuning link) that the [`EcuService`](super::service::EcuService)
//! interprets between revolutions.

use crate::config::EcuConfig;
use crate::fsm::StateId;

/// Commands that external adapters can send into the control core.
#[derive(Debug, Clone)]
pub enum EcuCommand {
    /// Force the FSM into a specific state (bench / testing only).
    ForceState(StateId),

    /// Hot-reload configuration. Rejected unless it validates.
    UpdateConfig(EcuConfig),

    /// Emit one diagnostic line on the next pass regardless of the
    /// revolution counter.
    RequestDiagLine,
}
