//! Crankshaft kinematic estimator.
//!
//! One tach pulse per revolution (single-toothed crank, no cam sensor).
//! The tach edge ISR is the **sole writer** of this record; the main loop
//! reads point-in-time snapshots. Every shared field is an individual
//! 32-bit atomic — `f32` speed travels as its bit pattern, timestamps as
//! wrapping microsecond counters — so no torn read is possible on the
//! 32-bit target.
//!
//! Without a cam signal the firmware cannot tell intake revolutions from
//! power revolutions. The 4-stroke parity bit [`fuel_cycle`] therefore
//! starts arbitrarily at `false` on boot and alternates on every edge;
//! which half of the cycle it lands on is unknowable. This is an inherent
//! limitation of the sensor set, not a tuning defect.
//!
//! [`fuel_cycle`]: KinematicSnapshot::fuel_cycle

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use crate::events::{push_event, Event};

/// Degrees swept per tach pulse — full revolution on a single-tooth crank.
pub const DEGREES_PER_PULSE: f32 = 360.0;

/// EMA weight on the freshest inter-pulse sample. Heavy enough to track
/// acceleration within a few revolutions, light enough to smooth
/// one-tooth jitter.
const SPEED_EMA_ALPHA: f32 = 0.7;

/// Crankshaft speed conversions. `deg/µs` is the native unit everywhere
/// in the scheduler; RPM only appears at regime thresholds and telemetry.
pub fn rpm_from_deg_per_us(omega: f32) -> f32 {
    omega * (60.0e6 / 360.0)
}

pub fn deg_per_us_from_rpm(rpm: f32) -> f32 {
    rpm * (360.0 / 60.0e6)
}

/// Wrap an angle into `[0, 360)`.
pub fn wrap_angle(deg: f32) -> f32 {
    let w = deg.rem_euclid(360.0);
    // rem_euclid can return exactly 360.0 when deg is a tiny negative.
    if w >= 360.0 {
        0.0
    } else {
        w
    }
}

// ---------------------------------------------------------------------------
// Shared kinematic record
// ---------------------------------------------------------------------------

/// Kinematic state updated only inside the tach edge ISR.
///
/// Timestamps are 32-bit microsecond counters that wrap every ~71
/// minutes; all deltas use wrapping subtraction, so a wrap mid-run costs
/// nothing. Speed stays zero until two edges have been observed.
pub struct KinematicState {
    calib_angle_time_us: AtomicU32,
    last_calib_angle_time_us: AtomicU32,
    /// Filtered angular speed, deg/µs, stored as f32 bits.
    angular_speed_bits: AtomicU32,
    /// 4-stroke parity: fuel is injected only on `true` revolutions.
    fuel_cycle: AtomicBool,
    /// Edges observed so far, saturating at 2 — below that there is no
    /// valid inter-pulse delta to filter.
    edges_seen: AtomicU8,
    /// Revolutions since the last diagnostic line, modulo the period.
    rev_counter: AtomicU8,
    /// Diagnostic period in revolutions (config mirror, set at init).
    diag_period: AtomicU8,
}

/// Point-in-time copy of the kinematic record for main-loop consumption.
#[derive(Debug, Clone, Copy)]
pub struct KinematicSnapshot {
    pub calib_angle_time_us: u32,
    pub last_calib_angle_time_us: u32,
    pub angular_speed_deg_per_us: f32,
    pub rpm: f32,
    pub fuel_cycle: bool,
    /// True when the revolution counter has wrapped and a diagnostic
    /// line is due this cycle.
    pub diag_due: bool,
}

impl KinematicState {
    pub const fn new() -> Self {
        Self {
            calib_angle_time_us: AtomicU32::new(0),
            last_calib_angle_time_us: AtomicU32::new(0),
            angular_speed_bits: AtomicU32::new(0),
            fuel_cycle: AtomicBool::new(false),
            edges_seen: AtomicU8::new(0),
            rev_counter: AtomicU8::new(0),
            diag_period: AtomicU8::new(10),
        }
    }

    /// Mirror the configured diagnostic period. Main loop, init time only.
    pub fn set_diag_period(&self, revs: u8) {
        self.diag_period.store(revs.max(1), Ordering::Relaxed);
    }

    /// Record a tach edge at `now_us`. ISR context; the single writer.
    ///
    /// No debouncing — the input conditioning hardware is assumed clean.
    pub fn on_tach_edge(&self, now_us: u64) {
        let now = now_us as u32;
        let prev = self.calib_angle_time_us.load(Ordering::Relaxed);
        self.last_calib_angle_time_us.store(prev, Ordering::Relaxed);
        self.calib_angle_time_us.store(now, Ordering::Release);

        let edges = self.edges_seen.load(Ordering::Relaxed);
        if edges >= 1 {
            let dt_us = now.wrapping_sub(prev);
            if dt_us > 0 {
                let instantaneous = DEGREES_PER_PULSE / dt_us as f32;
                let previous = f32::from_bits(self.angular_speed_bits.load(Ordering::Relaxed));
                let filtered =
                    SPEED_EMA_ALPHA * instantaneous + (1.0 - SPEED_EMA_ALPHA) * previous;
                self.angular_speed_bits
                    .store(filtered.to_bits(), Ordering::Release);
            }
        }
        if edges < 2 {
            self.edges_seen.store(edges + 1, Ordering::Relaxed);
        }

        let parity = !self.fuel_cycle.load(Ordering::Relaxed);
        self.fuel_cycle.store(parity, Ordering::Release);

        let period = self.diag_period.load(Ordering::Relaxed).max(1);
        let count = self.rev_counter.load(Ordering::Relaxed);
        self.rev_counter
            .store((count + 1) % period, Ordering::Release);
    }

    /// Filtered angular speed in deg/µs. Zero until the engine turns.
    pub fn angular_speed(&self) -> f32 {
        f32::from_bits(self.angular_speed_bits.load(Ordering::Acquire))
    }

    /// Engine angle at wall time `now_us`, wrapped into `[0, 360)`.
    /// `calib_angle_deg` is the tach sensor's mechanical offset from TDC.
    pub fn current_angle(&self, now_us: u64, calib_angle_deg: f32) -> f32 {
        let calib_time = self.calib_angle_time_us.load(Ordering::Acquire);
        let omega = self.angular_speed();
        let elapsed_us = (now_us as u32).wrapping_sub(calib_time) as f32;
        wrap_angle(elapsed_us * omega + calib_angle_deg)
    }

    /// Point-in-time copy for the main loop.
    pub fn snapshot(&self) -> KinematicSnapshot {
        let omega = self.angular_speed();
        KinematicSnapshot {
            calib_angle_time_us: self.calib_angle_time_us.load(Ordering::Acquire),
            last_calib_angle_time_us: self.last_calib_angle_time_us.load(Ordering::Relaxed),
            angular_speed_deg_per_us: omega,
            rpm: rpm_from_deg_per_us(omega),
            fuel_cycle: self.fuel_cycle.load(Ordering::Acquire),
            diag_due: self.rev_counter.load(Ordering::Acquire) == 0,
        }
    }
}

impl Default for KinematicState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// ISR glue
// ---------------------------------------------------------------------------

/// The crankshaft record shared between the tach ISR and the main loop.
pub static CRANK: KinematicState = KinematicState::new();

/// Tach falling-edge ISR body. Updates [`CRANK`] and notifies the main
/// loop, which treats the resulting CALIBRATION entry as the
/// authoritative synchronisation point for the revolution.
///
/// ISR-safe: atomics and a lock-free queue push only; no formatting, no
/// serial output.
pub fn tach_isr_handler(now_us: u64) {
    CRANK.on_tach_edge(now_us);
    push_event(Event::TachEdge);
}
