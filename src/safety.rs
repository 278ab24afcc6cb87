//! Safety supervisor.
//!
//! Runs **every main-loop pass before the FSM** and accumulates a fault
//! bitmask in `EcuContext.fault_flags`. The CALIBRATION decision consults
//! the mask: any active fault keeps the machine out of CRANKING/RUNNING,
//! which in turn means no fuel or spark timers are armed.
//!
//! ## Fault lifecycle
//!
//! 1. A condition trips (killswitch opens, crank hits the rev limit).
//! 2. The supervisor sets the corresponding bit.
//! 3. CALIBRATION routes away from the arming states; outputs go quiet.
//!    Timer pairs already in flight finish their current pulse — a coil
//!    mid-dwell still discharges, an open injector still closes.
//! 4. The supervisor re-evaluates each pass and clears the bit when the
//!    condition resolves. Overspeed clears with hysteresis: set at the
//!    upper limit, cleared only below the lower limit.

use crate::config::EcuConfig;
use crate::error::SafetyFault;
use log::{error, info};

/// Safety supervisor.
pub struct SafetySupervisor {
    engage_rpm: f32,
    upper_rev_limit_rpm: f32,
    lower_rev_limit_rpm: f32,
    /// Latched fault bitmask.
    faults: u8,
}

impl SafetySupervisor {
    pub fn new(config: &EcuConfig) -> Self {
        Self {
            engage_rpm: config.engage_rpm,
            upper_rev_limit_rpm: config.upper_rev_limit_rpm,
            lower_rev_limit_rpm: config.lower_rev_limit_rpm,
            faults: 0,
        }
    }

    /// Adopt new thresholds after a validated config update.
    pub fn reconfigure(&mut self, config: &EcuConfig) {
        self.engage_rpm = config.engage_rpm;
        self.upper_rev_limit_rpm = config.upper_rev_limit_rpm;
        self.lower_rev_limit_rpm = config.lower_rev_limit_rpm;
    }

    /// Evaluate all safety conditions for this pass.
    /// Returns the updated fault bitmask.
    pub fn evaluate(&mut self, killswitch_closed: bool, rpm: f32) -> u8 {
        // ── Killswitch ────────────────────────────────────────────
        self.eval_fault(SafetyFault::KillswitchOpen, !killswitch_closed);

        // ── Rev limit (hysteretic) ────────────────────────────────
        if rpm >= self.upper_rev_limit_rpm {
            self.eval_fault(SafetyFault::Overspeed, true);
        } else if self.has_fault(SafetyFault::Overspeed) && rpm < self.lower_rev_limit_rpm {
            self.eval_fault(SafetyFault::Overspeed, false);
        }

        self.faults
    }

    /// True while the rev limiter holds the engine.
    pub fn rev_limited(&self) -> bool {
        self.has_fault(SafetyFault::Overspeed)
    }

    /// True below the engagement threshold — too slow to schedule events.
    pub fn below_engagement(&self, rpm: f32) -> bool {
        rpm < self.engage_rpm
    }

    /// Current fault bitmask.
    pub fn faults(&self) -> u8 {
        self.faults
    }

    /// True if **any** fault is active.
    pub fn has_faults(&self) -> bool {
        self.faults != 0
    }

    /// Check if a specific fault is active.
    pub fn has_fault(&self, fault: SafetyFault) -> bool {
        self.faults & fault.mask() != 0
    }

    // ── Internal ──────────────────────────────────────────────────

    /// Set or clear a fault bit based on a boolean condition.
    fn eval_fault(&mut self, fault: SafetyFault, condition: bool) {
        if condition {
            if self.faults & fault.mask() == 0 {
                error!("SAFETY FAULT SET: {fault}");
            }
            self.faults |= fault.mask();
        } else {
            if self.faults & fault.mask() != 0 {
                info!("SAFETY FAULT CLEARED: {fault}");
            }
            self.faults &= !fault.mask();
        }
    }
}
