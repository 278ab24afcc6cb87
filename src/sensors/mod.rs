//! Sensor subsystem — channel converters and the aggregating [`SensorHub`].
//!
//! Every channel is a pure, saturating function from a raw 12-bit ADC
//! count to a physical unit; none of them can fail. The hub owns the
//! per-channel calibrations and produces a [`SensorSnapshot`] each
//! READ_SENSORS pass that gets cached in `EcuContext.sensors`.

pub mod map;
pub mod o2;
pub mod thermistor;
pub mod tps;

use crate::app::ports::AdcPort;
use crate::fsm::context::SensorSnapshot;
use crate::pins;
use thermistor::{ThermistorCalibration, ECT_CAL, IAT_CAL};
use tps::{ThrottleCalibration, TPS_CAL};

/// ADC volts per count — MCP3304 against the 5 V analog rail.
pub const V_PER_BIT: f32 = 5.0 / 4095.0;

/// Aggregates all channel calibrations and produces a unified snapshot.
pub struct SensorHub {
    ect: ThermistorCalibration,
    iat: ThermistorCalibration,
    tps: ThrottleCalibration,
}

impl SensorHub {
    pub fn new() -> Self {
        Self {
            ect: ECT_CAL,
            iat: IAT_CAL,
            tps: TPS_CAL,
        }
    }

    /// Read every channel through the ADC port and convert to physical
    /// units. Conversion saturates at the calibration endpoints, so the
    /// snapshot is always usable by the fueling model.
    pub fn read_all(&mut self, adc: &mut impl AdcPort) -> SensorSnapshot {
        let map_raw = adc.read_adc(pins::ADC_CH_MAP);
        let tps_raw = adc.read_adc(pins::ADC_CH_TPS);
        let iat_raw = adc.read_adc(pins::ADC_CH_IAT);
        let ect_raw = adc.read_adc(pins::ADC_CH_ECT);
        let o2_raw = adc.read_adc(pins::ADC_CH_O2);

        SensorSnapshot {
            map_kpa: map::manifold_pressure_kpa(map_raw),
            map_raw,
            tps_frac: self.tps.fraction(tps_raw),
            iat_k: self.iat.kelvin_from_count(iat_raw),
            ect_k: self.ect.kelvin_from_count(ect_raw),
            o2_afr: o2::air_fuel_ratio(o2_raw),
        }
    }
}

impl Default for SensorHub {
    fn default() -> Self {
        Self::new()
    }
}
