//! Concrete state handler functions and table builder.
//!
//! Each regime is three plain `fn` pointers — no closures, no dynamic
//! dispatch, no heap. The classic embedded C FSM pattern in safe Rust.
//!
//! ```text
//!          (tach edge, forced)          killswitch/engage gate
//!  READ_SENSORS ───────▶ CALIBRATION ────────▶ READ_SENSORS
//!       ▲                     │ rpm partition
//!       │          ┌──────────┼──────────────┐
//!       │          ▼          ▼              ▼
//!       │      CRANKING    RUNNING      REV_LIMITER
//!       │          │ arm fuel+spark │        │
//!       │          └────────┬───────┘        │
//!       │            [diag due?]             │
//!       │          no │        │ yes         │
//!       └─────────────┘   SERIAL_OUT ◀───────┘
//!       └────────────────────┘
//! ```
//!
//! Handlers only compute and write [`CycleCommands`]; arming the actual
//! timers (with a freshly sampled θ_now) is the service's job.

use super::context::{EcuContext, FuelCommand, SparkCommand};
use super::{StateDescriptor, StateId};
use crate::error::SafetyFault;
use crate::{fueling, scheduler, tuning};
use log::{info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table. Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0 — ReadSensors
        StateDescriptor {
            id: StateId::ReadSensors,
            name: "ReadSensors",
            on_enter: Some(read_sensors_enter),
            on_exit: None,
            on_update: read_sensors_update,
        },
        // Index 1 — Calibration
        StateDescriptor {
            id: StateId::Calibration,
            name: "Calibration",
            on_enter: None,
            on_exit: None,
            on_update: calibration_update,
        },
        // Index 2 — Cranking
        StateDescriptor {
            id: StateId::Cranking,
            name: "Cranking",
            on_enter: None,
            on_exit: None,
            on_update: cranking_update,
        },
        // Index 3 — Running
        StateDescriptor {
            id: StateId::Running,
            name: "Running",
            on_enter: None,
            on_exit: None,
            on_update: running_update,
        },
        // Index 4 — RevLimiter
        StateDescriptor {
            id: StateId::RevLimiter,
            name: "RevLimiter",
            on_enter: Some(rev_limiter_enter),
            on_exit: Some(rev_limiter_exit),
            on_update: rev_limiter_update,
        },
        // Index 5 — SerialOut
        StateDescriptor {
            id: StateId::SerialOut,
            name: "SerialOut",
            on_enter: None,
            on_exit: None,
            on_update: serial_out_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  READ_SENSORS — quiet default; the tach edge forces us out
// ═══════════════════════════════════════════════════════════════════════════

fn read_sensors_enter(ctx: &mut EcuContext) {
    ctx.commands.clear();
}

fn read_sensors_update(_ctx: &mut EcuContext) -> Option<StateId> {
    // Nothing to decide here: the service refreshes the sensor cache on
    // every pass, and only the tach edge (via force_transition) moves us.
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  CALIBRATION — regime decision for the fresh revolution
// ═══════════════════════════════════════════════════════════════════════════

fn calibration_update(ctx: &mut EcuContext) -> Option<StateId> {
    // Killswitch gate comes first: an open switch silences everything.
    if ctx.has_fault(SafetyFault::KillswitchOpen) {
        return Some(StateId::ReadSensors);
    }

    // Rev-limit hysteresis: the supervisor holds the Overspeed bit until
    // rpm drops below the lower limit, so routing on the bit alone gives
    // the stay-in-limiter behaviour.
    if ctx.has_fault(SafetyFault::Overspeed) {
        return Some(StateId::RevLimiter);
    }

    let rpm = ctx.kin.rpm;
    let cfg = &ctx.config;
    Some(if rpm < cfg.engage_rpm {
        StateId::ReadSensors
    } else if rpm < cfg.cranking_rpm {
        StateId::Cranking
    } else if rpm < cfg.upper_rev_limit_rpm {
        StateId::Running
    } else {
        StateId::RevLimiter
    })
}

// ═══════════════════════════════════════════════════════════════════════════
//  CRANKING — fixed rich fueling and conservative advance
// ═══════════════════════════════════════════════════════════════════════════

fn cranking_update(ctx: &mut EcuContext) -> Option<StateId> {
    plan_cycle(ctx, true);
    Some(after_arming(ctx))
}

// ═══════════════════════════════════════════════════════════════════════════
//  RUNNING — table-driven fueling and advance
// ═══════════════════════════════════════════════════════════════════════════

fn running_update(ctx: &mut EcuContext) -> Option<StateId> {
    plan_cycle(ctx, false);
    Some(after_arming(ctx))
}

// ═══════════════════════════════════════════════════════════════════════════
//  REV_LIMITER — no fuel, no spark, wait for the hysteresis to release
// ═══════════════════════════════════════════════════════════════════════════

fn rev_limiter_enter(ctx: &mut EcuContext) {
    ctx.commands.clear();
    warn!("REV LIMIT: {:.0} RPM, fuel and spark suppressed", ctx.kin.rpm);
}

fn rev_limiter_exit(ctx: &mut EcuContext) {
    info!("REV LIMIT released at {:.0} RPM", ctx.kin.rpm);
}

fn rev_limiter_update(ctx: &mut EcuContext) -> Option<StateId> {
    // Overspeed is still visible on the diagnostic line.
    Some(after_arming(ctx))
}

// ═══════════════════════════════════════════════════════════════════════════
//  SERIAL_OUT — one diagnostic line, then back to idle reading
// ═══════════════════════════════════════════════════════════════════════════

fn serial_out_update(ctx: &mut EcuContext) -> Option<StateId> {
    ctx.commands.emit_diag = true;
    Some(StateId::ReadSensors)
}

// ═══════════════════════════════════════════════════════════════════════════
//  Shared cycle planning
// ═══════════════════════════════════════════════════════════════════════════

/// Where an arming regime goes once its commands are written.
fn after_arming(ctx: &EcuContext) -> StateId {
    if ctx.kin.diag_due {
        StateId::SerialOut
    } else {
        StateId::ReadSensors
    }
}

/// Compute this revolution's fuel and spark targets: fuel first on
/// injection revolutions, then the discharge angle, then the charge
/// angle backed off by the dwell sweep.
fn plan_cycle(ctx: &mut EcuContext, cranking: bool) {
    let omega = ctx.kin.omega_deg_per_us;
    if omega <= 0.0 {
        ctx.commands.clear();
        return;
    }

    let rpm = ctx.kin.rpm;
    let map_kpa = ctx.sensors.map_kpa;
    let cfg = ctx.config.clone();

    ctx.ve_fraction = if cranking {
        cfg.crank_vol_eff
    } else {
        tuning::ve_fraction(rpm, map_kpa)
    };

    // 1. Fuel — one pulse every two crankshaft revolutions.
    ctx.commands.fuel = if ctx.kin.fuel_cycle {
        let air_volume_m3 = ctx.ve_fraction * cfg.displacement_m3;
        let pulse_us =
            fueling::pulse_width_us(&cfg, air_volume_m3, map_kpa, ctx.sensors.iat_k);
        let start_angle_deg =
            scheduler::fuel_start_angle_deg(cfg.fuel_end_angle_deg, pulse_us, omega);
        Some(FuelCommand {
            start_angle_deg,
            duration_us: pulse_us as u32,
        })
    } else {
        None
    };

    // 2–3. Spark — every revolution.
    let advance_deg = if cranking {
        cfg.crank_spark_advance_deg
    } else {
        tuning::spark_advance_deg(rpm, map_kpa)
    };
    let discharge_angle_deg = scheduler::spark_discharge_angle_deg(advance_deg);
    let charge_angle_deg =
        scheduler::spark_charge_angle_deg(discharge_angle_deg, cfg.dwell_us, omega);
    ctx.commands.spark = Some(SparkCommand {
        charge_angle_deg,
        discharge_angle_deg,
    });
}
