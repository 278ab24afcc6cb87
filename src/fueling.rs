//! Open-loop fueling model.
//!
//! Ideal-gas air-mass estimate from cylinder air volume, manifold
//! pressure and intake air temperature, divided down to an injector
//! on-time. Total for all physical inputs: the sensor layer guarantees
//! `IAT > 0 K` and config validation guarantees a positive injector flow,
//! so no division here can blow up.

use crate::config::EcuConfig;
use crate::tuning;

/// Universal gas constant, J/(mol·K).
pub const GAS_CONSTANT: f32 = 8.314;
/// Mean molar mass of dry air, g/mol.
pub const MOLAR_MASS_AIR: f32 = 28.97;

/// Cylinder air volume while running: VE(rpm, MAP) scaled by displacement.
pub fn running_air_volume_m3(cfg: &EcuConfig, rpm: f32, map_kpa: f32) -> f32 {
    tuning::ve_fraction(rpm, map_kpa) * cfg.displacement_m3
}

/// Cylinder air volume while cranking: fixed rich volumetric efficiency.
pub fn cranking_air_volume_m3(cfg: &EcuConfig) -> f32 {
    cfg.crank_vol_eff * cfg.displacement_m3
}

/// Injector pulse width in microseconds for one intake event.
///
/// `n = V·p/(R·T)` moles of air, fuel mass `n·M_air/AFR` grams, divided
/// by the injector's mass flow.
pub fn pulse_width_us(cfg: &EcuConfig, air_volume_m3: f32, map_kpa: f32, iat_k: f32) -> f32 {
    let pressure_pa = map_kpa * 1_000.0;
    let moles_air = air_volume_m3 * pressure_pa / (GAS_CONSTANT * iat_k);
    let fuel_g = moles_air * MOLAR_MASS_AIR / cfg.air_fuel_ratio;
    fuel_g / cfg.injector_flow_g_per_s * 1.0e6
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> EcuConfig {
        EcuConfig::default()
    }

    #[test]
    fn cranking_pulse_matches_gas_law() {
        // 90 kPa, 298 K, 30% VE cranking charge.
        let cfg = cfg();
        let vol = cranking_air_volume_m3(&cfg);
        assert!((vol - 0.30 * 35.8e-6).abs() < 1e-12);

        let pw = pulse_width_us(&cfg, vol, 90.0, 298.0);
        // (0.30·35.8e-6·90e3/(8.314·298))·28.97/14.7 g at 0.6 g/s.
        assert!((pw - 1281.4).abs() < 5.0, "pulse width {pw} us");
    }

    #[test]
    fn running_pulse_at_3000_rpm_60_kpa() {
        let cfg = cfg();
        let vol = running_air_volume_m3(&cfg, 3000.0, 60.0);
        // VE grid point: 65%.
        assert!((vol - 0.65 * 35.8e-6).abs() < 1e-11);

        let pw = pulse_width_us(&cfg, vol, 60.0, 298.0);
        assert!((pw - 1851.0).abs() < 5.0, "pulse width {pw} us");
    }

    #[test]
    fn more_load_means_more_fuel() {
        let cfg = cfg();
        let vol = cranking_air_volume_m3(&cfg);
        let light = pulse_width_us(&cfg, vol, 40.0, 298.0);
        let heavy = pulse_width_us(&cfg, vol, 95.0, 298.0);
        assert!(heavy > light);
    }

    #[test]
    fn hotter_air_means_less_fuel() {
        let cfg = cfg();
        let vol = cranking_air_volume_m3(&cfg);
        let cold = pulse_width_us(&cfg, vol, 90.0, 263.0);
        let hot = pulse_width_us(&cfg, vol, 90.0, 330.0);
        assert!(cold > hot);
    }

    #[test]
    fn pulse_width_always_positive_and_finite() {
        let cfg = cfg();
        for map in [20.0, 60.0, 103.0] {
            for iat in [233.0, 298.0, 373.0] {
                for rpm in [500.0, 3000.0, 6000.0] {
                    let pw = pulse_width_us(&cfg, running_air_volume_m3(&cfg, rpm, map), map, iat);
                    assert!(pw.is_finite() && pw > 0.0, "pw {pw} at {rpm}/{map}/{iat}");
                }
            }
        }
    }
}
