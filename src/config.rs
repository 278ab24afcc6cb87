//! ECU configuration parameters
//!
//! All tunable parameters for the GX35 engine controller. Values can be
//! overridden at runtime through [`EcuCommand::UpdateConfig`]
//! (crate::app::commands::EcuCommand) after passing [`EcuConfig::validate`].

use serde::{Deserialize, Serialize};

/// Core engine-control configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcuConfig {
    // --- Regime thresholds (RPM) ---
    /// Below this speed the controller never arms fuel or spark.
    pub engage_rpm: f32,
    /// Cranking/running boundary.
    pub cranking_rpm: f32,
    /// Rev limiter trips at or above this speed.
    pub upper_rev_limit_rpm: f32,
    /// Rev limiter releases below this speed (hysteresis).
    pub lower_rev_limit_rpm: f32,

    // --- Crank geometry ---
    /// Mechanical offset of the tach sensor from TDC, degrees in the
    /// direction of rotation. Board-install calibration.
    pub calib_angle_deg: f32,

    // --- Ignition ---
    /// Coil charge (dwell) time in microseconds.
    pub dwell_us: u32,
    /// Fixed spark advance used while cranking (degrees before TDC).
    pub crank_spark_advance_deg: f32,

    // --- Fueling ---
    /// Engine angle at which the injection pulse must end (intake stroke).
    pub fuel_end_angle_deg: f32,
    /// Fixed volumetric efficiency used while cranking (fraction).
    pub crank_vol_eff: f32,
    /// Cylinder displacement in cubic metres.
    pub displacement_m3: f32,
    /// Target air-fuel mass ratio.
    pub air_fuel_ratio: f32,
    /// Injector mass flow rate in grams per second.
    pub injector_flow_g_per_s: f32,

    // --- Timers ---
    /// Minimum arming delay the one-shot timers can honour. Any computed
    /// delay below this (including past-due, negative deltas) skips the
    /// event for the cycle.
    pub min_timer_arm_us: u32,

    // --- Diagnostics ---
    /// Emit one serial diagnostic line every N crankshaft revolutions.
    pub diag_every_n_revs: u8,
}

impl Default for EcuConfig {
    fn default() -> Self {
        Self {
            // Regimes
            engage_rpm: 100.0,
            cranking_rpm: 500.0,
            upper_rev_limit_rpm: 6000.0,
            lower_rev_limit_rpm: 5800.0,

            // Crank geometry: sensor at TDC unless the install says otherwise
            calib_angle_deg: 0.0,

            // Ignition
            dwell_us: 3000,
            crank_spark_advance_deg: 10.0,

            // Fueling — Honda GX35 cylinder
            fuel_end_angle_deg: 120.0,
            crank_vol_eff: 0.30,
            displacement_m3: 35.8e-6,
            air_fuel_ratio: 14.7,
            injector_flow_g_per_s: 0.6,

            // Timers
            min_timer_arm_us: 128,

            // Diagnostics
            diag_every_n_revs: 10,
        }
    }
}

impl EcuConfig {
    /// Range-check a configuration before accepting it.
    ///
    /// Invalid values are rejected, not clamped — a corrupted tuning link
    /// must not be able to disable the rev limiter by smuggling in
    /// `f32::MAX` thresholds.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !(self.engage_rpm > 0.0 && self.engage_rpm < self.cranking_rpm) {
            return Err("engage_rpm must be positive and below cranking_rpm");
        }
        if !(self.cranking_rpm < self.upper_rev_limit_rpm) {
            return Err("cranking_rpm must be below upper_rev_limit_rpm");
        }
        if !(self.lower_rev_limit_rpm < self.upper_rev_limit_rpm) {
            return Err("rev-limit hysteresis band is inverted");
        }
        if !(self.upper_rev_limit_rpm <= 12_000.0) {
            return Err("upper_rev_limit_rpm exceeds mechanical limit");
        }
        if !(0.0..360.0).contains(&self.calib_angle_deg) {
            return Err("calib_angle_deg outside [0, 360)");
        }
        if self.dwell_us == 0 || self.dwell_us > 20_000 {
            return Err("dwell_us outside (0, 20ms]");
        }
        if !(0.0..90.0).contains(&self.crank_spark_advance_deg) {
            return Err("crank_spark_advance_deg outside [0, 90)");
        }
        if !(0.0..360.0).contains(&self.fuel_end_angle_deg) {
            return Err("fuel_end_angle_deg outside [0, 360)");
        }
        if !(self.crank_vol_eff > 0.0 && self.crank_vol_eff <= 1.0) {
            return Err("crank_vol_eff outside (0, 1]");
        }
        if !(self.displacement_m3 > 0.0) {
            return Err("displacement_m3 must be positive");
        }
        if !(self.air_fuel_ratio > 0.0) {
            return Err("air_fuel_ratio must be positive");
        }
        if !(self.injector_flow_g_per_s > 0.0) {
            return Err("injector_flow_g_per_s must be positive");
        }
        if self.diag_every_n_revs == 0 {
            return Err("diag_every_n_revs must be at least 1");
        }
        Ok(())
    }
}
