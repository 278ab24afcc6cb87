//! Shared mutable context threaded through every FSM handler.
//!
//! `EcuContext` is the single struct state handlers read from and write
//! to: the latest sensor snapshot, the kinematic view captured for this
//! pass, the cycle commands the handlers produce, configuration, and the
//! supervisor's fault mask. The main loop owns it; handlers never touch
//! hardware — they only write [`CycleCommands`], which the service
//! translates into timer armings.

use crate::config::EcuConfig;

// ---------------------------------------------------------------------------
// Sensor snapshot (written by the sensor hub; read-only to handlers)
// ---------------------------------------------------------------------------

/// A point-in-time snapshot of every analog channel, in physical units.
#[derive(Debug, Clone, Copy)]
pub struct SensorSnapshot {
    /// Manifold absolute pressure (kPa).
    pub map_kpa: f32,
    /// Raw MAP ADC count (0 – 4095), kept for diagnostics.
    pub map_raw: u16,
    /// Throttle opening fraction in [0, 1].
    pub tps_frac: f32,
    /// Intake air temperature (Kelvin).
    pub iat_k: f32,
    /// Engine (cylinder head) temperature (Kelvin).
    pub ect_k: f32,
    /// Measured air-fuel ratio from the wideband controller (kg/kg).
    pub o2_afr: f32,
}

impl Default for SensorSnapshot {
    /// Standard-day values, so the fueling model has sane inputs before
    /// the first READ_SENSORS pass completes.
    fn default() -> Self {
        Self {
            map_kpa: 101.3,
            map_raw: 0,
            tps_frac: 0.0,
            iat_k: 293.15,
            ect_k: 293.15,
            o2_afr: 14.7,
        }
    }
}

// ---------------------------------------------------------------------------
// Kinematic view (copied from the ISR-owned record each pass)
// ---------------------------------------------------------------------------

/// Main-loop copy of the crankshaft state for this pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct KinematicView {
    /// Filtered engine speed (RPM).
    pub rpm: f32,
    /// Filtered angular speed (deg/µs).
    pub omega_deg_per_us: f32,
    /// 4-stroke parity: inject fuel only on `true` revolutions.
    pub fuel_cycle: bool,
    /// A diagnostic line is due this revolution.
    pub diag_due: bool,
}

// ---------------------------------------------------------------------------
// Cycle commands (written by state handlers; consumed by the service)
// ---------------------------------------------------------------------------

/// Fuel arming request for this cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuelCommand {
    /// Angle at which the injector must open.
    pub start_angle_deg: f32,
    /// Injector open time (µs).
    pub duration_us: u32,
}

/// Spark arming request for this cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SparkCommand {
    /// Angle at which the coil starts charging.
    pub charge_angle_deg: f32,
    /// Angle at which the coil discharges (the spark).
    pub discharge_angle_deg: f32,
}

/// What the current pass asked the hardware to do.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleCommands {
    pub fuel: Option<FuelCommand>,
    pub spark: Option<SparkCommand>,
    /// Emit one diagnostic serial line after this pass.
    pub emit_diag: bool,
}

impl CycleCommands {
    /// No pending requests — the quiet default.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

// ---------------------------------------------------------------------------
// EcuContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
pub struct EcuContext {
    // -- Timing --
    /// Passes since the current state was entered.
    pub ticks_in_state: u64,
    /// Monotonic total pass count.
    pub total_ticks: u64,

    // -- Inputs --
    /// Latest sensor readings, cached by READ_SENSORS.
    pub sensors: SensorSnapshot,
    /// Crankshaft view captured at the top of this pass.
    pub kin: KinematicView,

    // -- Outputs --
    /// Arming requests produced by the regime handlers.
    pub commands: CycleCommands,
    /// Volumetric efficiency used for the current cycle (diagnostics).
    pub ve_fraction: f32,

    // -- Configuration & safety --
    pub config: EcuConfig,
    /// Accumulated safety fault bitmask (see `SafetyFault::mask()`).
    pub fault_flags: u8,
}

impl EcuContext {
    pub fn new(config: EcuConfig) -> Self {
        Self {
            ticks_in_state: 0,
            total_ticks: 0,
            sensors: SensorSnapshot::default(),
            kin: KinematicView::default(),
            commands: CycleCommands::default(),
            ve_fraction: 0.0,
            config,
            fault_flags: 0,
        }
    }

    /// Returns `true` if **any** safety fault is active.
    pub fn has_faults(&self) -> bool {
        self.fault_flags != 0
    }

    /// Check whether a specific fault flag is set.
    pub fn has_fault(&self, fault: crate::error::SafetyFault) -> bool {
        self.fault_flags & fault.mask() != 0
    }
}
