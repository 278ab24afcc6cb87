//! Board hardware adapter — binds the ADC driver and the output
//! pipelines to the service's port traits.
//!
//! On ESP-IDF this is the production wiring. On the host it is a
//! simulation stand-in with settable channels and logged armings, used
//! by the `cargo run` bench loop.

use crate::app::ports::{AdcPort, IgnitionPort};

// ---------------------------------------------------------------------------
// ESP-IDF
// ---------------------------------------------------------------------------

#[cfg(target_os = "espidf")]
pub struct HardwareAdapter {
    adc: crate::drivers::spi_adc::Mcp3304,
}

#[cfg(target_os = "espidf")]
impl HardwareAdapter {
    pub fn new(adc: crate::drivers::spi_adc::Mcp3304) -> Self {
        Self { adc }
    }
}

#[cfg(target_os = "espidf")]
impl AdcPort for HardwareAdapter {
    fn read_adc(&mut self, channel: u8) -> u16 {
        self.adc.read_adc(channel)
    }
}

#[cfg(target_os = "espidf")]
impl IgnitionPort for HardwareAdapter {
    fn arm_spark(&mut self, delay_us: u32, dwell_us: u32) -> bool {
        crate::drivers::hw_timer::arm_spark(delay_us, dwell_us)
    }

    fn arm_fuel(&mut self, delay_us: u32, duration_us: u32) -> bool {
        crate::drivers::hw_timer::arm_fuel(delay_us, duration_us)
    }
}

// ---------------------------------------------------------------------------
// Host simulation
// ---------------------------------------------------------------------------

/// Simulated board: ADC channels are settable and armings are counted
/// and logged instead of reaching timers.
#[cfg(not(target_os = "espidf"))]
pub struct SimHardware {
    pub adc: crate::drivers::spi_adc::SimAdc,
    pub spark_arms: u32,
    pub fuel_arms: u32,
}

#[cfg(not(target_os = "espidf"))]
impl SimHardware {
    pub fn new() -> Self {
        Self {
            adc: crate::drivers::spi_adc::SimAdc::new(),
            spark_arms: 0,
            fuel_arms: 0,
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for SimHardware {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_os = "espidf"))]
impl AdcPort for SimHardware {
    fn read_adc(&mut self, channel: u8) -> u16 {
        self.adc.read_adc(channel)
    }
}

#[cfg(not(target_os = "espidf"))]
impl IgnitionPort for SimHardware {
    fn arm_spark(&mut self, delay_us: u32, dwell_us: u32) -> bool {
        self.spark_arms += 1;
        log::debug!("sim: spark armed in {delay_us}us, dwell {dwell_us}us");
        true
    }

    fn arm_fuel(&mut self, delay_us: u32, duration_us: u32) -> bool {
        self.fuel_arms += 1;
        log::debug!("sim: fuel armed in {delay_us}us, width {duration_us}us");
        true
    }
}
