//! Angular event scheduler.
//!
//! Translates "make this happen at engine angle θ" into a one-shot timer
//! delay, using the current angle and filtered angular speed. The caller
//! refreshes θ_now immediately before each arming computation so ISR
//! preemption between planning and arming costs accuracy, not correctness.
//!
//! ## Skip policy
//!
//! A target whose computed delay is below the minimum arm floor — which
//! includes every negative, already-passed delta — is **skipped for the
//! cycle**, never fired late. The outcome is observable: the pin simply
//! does not toggle that revolution, and the skip is counted. Missing one
//! cycle is safer than a late spark.

/// Top dead centre in crank degrees (the tach frame puts TDC at 360°).
pub const TDC_DEG: f32 = 360.0;

/// Result of an arming computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmOutcome {
    /// Timer should be armed `delay_us` from the θ_now sample.
    Armed { delay_us: u32 },
    /// Target angle is past due or inside the timer latch floor.
    Skipped,
}

impl ArmOutcome {
    pub fn is_armed(&self) -> bool {
        matches!(self, Self::Armed { .. })
    }
}

/// Stateless arming calculator; the floor comes from configuration
/// (`min_timer_arm_us`, the single tunable covering timer ISR latency).
#[derive(Debug, Clone, Copy)]
pub struct EventScheduler {
    min_arm_us: u32,
}

impl EventScheduler {
    pub fn new(min_arm_us: u32) -> Self {
        Self { min_arm_us }
    }

    pub fn set_min_arm_us(&mut self, min_arm_us: u32) {
        self.min_arm_us = min_arm_us;
    }

    /// Delay from now until the crank reaches `target_deg`.
    ///
    /// `now_deg` must be a fresh [`current_angle`] sample and `omega` the
    /// current filtered speed in deg/µs. Targets are same-revolution:
    /// deltas are not wrapped forward, so a negative delta means the
    /// angle already passed and the event is skipped.
    ///
    /// [`current_angle`]: crate::kinematics::KinematicState::current_angle
    pub fn delay_to_angle(&self, target_deg: f32, now_deg: f32, omega: f32) -> ArmOutcome {
        if omega <= 0.0 {
            return ArmOutcome::Skipped;
        }
        let delay_us = (target_deg - now_deg) / omega;
        if delay_us < self.min_arm_us as f32 {
            ArmOutcome::Skipped
        } else {
            ArmOutcome::Armed {
                delay_us: delay_us as u32,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Per-cycle angle computations
// ---------------------------------------------------------------------------

/// Angle at which fueling must begin so the pulse ends at
/// `fuel_end_angle_deg`. Unwrapped on purpose: a pulse longer than the
/// remaining rotation yields a target behind θ_now, which the skip
/// policy then rejects for this cycle.
pub fn fuel_start_angle_deg(fuel_end_angle_deg: f32, pulse_us: f32, omega: f32) -> f32 {
    fuel_end_angle_deg - pulse_us * omega
}

/// Spark discharge angle for a given advance: `TDC − SA`.
pub fn spark_discharge_angle_deg(advance_deg: f32) -> f32 {
    TDC_DEG - advance_deg
}

/// Coil charge must lead the discharge by the dwell interval.
pub fn spark_charge_angle_deg(discharge_deg: f32, dwell_us: u32, omega: f32) -> f32 {
    discharge_deg - dwell_us as f32 * omega
}
