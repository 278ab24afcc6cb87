//! Wideband O₂ (lambda) sensor, linearised controller output.
//!
//! Reported in telemetry only — closed-loop trim is out of scope for this
//! controller generation.

use super::V_PER_BIT;

/// Linear controller transfer: AFR = V * slope + offset (kg/kg).
const AFR_PER_VOLT: f32 = 3.008;
const AFR_OFFSET: f32 = 7.35;

/// Convert a raw 12-bit ADC count to air-fuel ratio by mass.
pub fn air_fuel_ratio(count: u16) -> f32 {
    let volts = count as f32 * V_PER_BIT;
    volts * AFR_PER_VOLT + AFR_OFFSET
}
