//! Manifold absolute pressure sensor (GM 1-bar style, 5 V ratiometric).
//!
//! The transfer function is linear between the rail clamps. Readings on
//! either rail indicate an unplugged or shorted sensor; those saturate to
//! the documented endpoints rather than failing — a coughing engine beats
//! a dead one.

use super::V_PER_BIT;

/// Below this voltage the sensor is treated as reading full vacuum.
const V_LOW_RAIL: f32 = 0.5;
/// Above this voltage the sensor is treated as reading atmospheric.
const V_HIGH_RAIL: f32 = 4.9;
/// Saturated outputs at the rails.
const KPA_AT_LOW_RAIL: f32 = 20.0;
const KPA_AT_HIGH_RAIL: f32 = 103.0;
/// Linear region: kPa = V * slope + offset.
const KPA_PER_VOLT: f32 = 18.86;
const KPA_OFFSET: f32 = 10.57;

/// Convert a raw 12-bit ADC count to manifold pressure in kPa.
pub fn manifold_pressure_kpa(count: u16) -> f32 {
    let volts = count as f32 * V_PER_BIT;
    if volts < V_LOW_RAIL {
        KPA_AT_LOW_RAIL
    } else if volts > V_HIGH_RAIL {
        KPA_AT_HIGH_RAIL
    } else {
        volts * KPA_PER_VOLT + KPA_OFFSET
    }
}
