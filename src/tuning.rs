//! Firmware-constant tuning maps for the GX35.
//!
//! Two maps share one schema: strictly increasing RPM and MAP axes with a
//! row-major grid (one row per MAP breakpoint). Exported from the bench
//! tuning sheet; edit there, not here.
//!
//! Volumetric efficiency is stored as **percent** (0..100) — the unit the
//! tuning tools emit — and normalised to a fraction exactly once, in
//! [`ve_fraction`]. Consumers never see percent.

use crate::table::Table2d;

/// Engine-speed breakpoints (RPM).
pub const RPM_AXIS: [f32; 8] = [
    500.0, 1000.0, 1500.0, 2000.0, 3000.0, 4000.0, 5000.0, 6500.0,
];

/// Manifold-pressure breakpoints (kPa).
pub const MAP_AXIS: [f32; 7] = [20.0, 30.0, 40.0, 50.0, 60.0, 80.0, 100.0];

/// Volumetric efficiency, percent of displacement. Rows follow `MAP_AXIS`.
pub const VE_PERCENT: [f32; 56] = [
    // 20 kPa
    28.0, 30.0, 32.0, 33.0, 34.0, 33.0, 31.0, 28.0, //
    // 30 kPa
    34.0, 37.0, 40.0, 42.0, 44.0, 43.0, 41.0, 37.0, //
    // 40 kPa
    40.0, 44.0, 48.0, 51.0, 53.0, 52.0, 50.0, 45.0, //
    // 50 kPa
    46.0, 51.0, 55.0, 58.0, 60.0, 59.0, 57.0, 51.0, //
    // 60 kPa
    52.0, 57.0, 61.0, 63.0, 65.0, 64.0, 62.0, 56.0, //
    // 80 kPa
    60.0, 66.0, 71.0, 74.0, 76.0, 75.0, 72.0, 65.0, //
    // 100 kPa
    66.0, 72.0, 78.0, 81.0, 83.0, 82.0, 79.0, 71.0,
];

/// Spark advance, degrees before TDC. Rows follow `MAP_AXIS`.
pub const SPARK_ADVANCE_DEG: [f32; 56] = [
    // 20 kPa
    12.0, 16.0, 20.0, 24.0, 30.0, 32.0, 33.0, 33.0, //
    // 30 kPa
    11.0, 15.0, 19.0, 23.0, 29.0, 31.0, 32.0, 32.0, //
    // 40 kPa
    10.0, 14.0, 18.0, 22.0, 28.0, 30.0, 31.0, 31.0, //
    // 50 kPa
    9.0, 13.0, 17.0, 21.0, 26.0, 29.0, 30.0, 30.0, //
    // 60 kPa
    8.0, 12.0, 16.0, 20.0, 25.0, 28.0, 29.0, 29.0, //
    // 80 kPa
    7.0, 10.0, 14.0, 18.0, 22.0, 25.0, 27.0, 27.0, //
    // 100 kPa
    6.0, 9.0, 12.0, 16.0, 20.0, 23.0, 25.0, 25.0,
];

/// The VE map as a queryable table (percent units).
pub fn ve_table() -> Table2d<'static> {
    Table2d::new(&RPM_AXIS, &MAP_AXIS, &VE_PERCENT)
}

/// The spark-advance map as a queryable table (degrees before TDC).
pub fn spark_table() -> Table2d<'static> {
    Table2d::new(&RPM_AXIS, &MAP_AXIS, &SPARK_ADVANCE_DEG)
}

/// Volumetric efficiency at the operating point, as a fraction in (0, 1].
pub fn ve_fraction(rpm: f32, map_kpa: f32) -> f32 {
    ve_table().lookup(rpm, map_kpa) / 100.0
}

/// Spark advance at the operating point, degrees before TDC.
pub fn spark_advance_deg(rpm: f32, map_kpa: f32) -> f32 {
    spark_table().lookup(rpm, map_kpa)
}
