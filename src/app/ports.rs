//! Port traits — the hexagonal boundary between domain logic and hardware.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ EcuService (domain)
//! ```
//!
//! Driven adapters (the SPI ADC, the one-shot timers, the output pins,
//! the serial sink) implement these traits. The service consumes them
//! via generics, so the domain core never touches a register and the
//! whole control path runs on a workstation under test.

// ───────────────────────────────────────────────────────────────
// ADC port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Raw analog acquisition. One MCP3304-class converter, eight
/// single-ended channels, 12 usable bits (the sign bit is ignored).
pub trait AdcPort {
    /// Sample `channel` (0..=7) and return the raw count (0..=4095).
    fn read_adc(&mut self, channel: u8) -> u16;
}

// ───────────────────────────────────────────────────────────────
// Timer port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// A single one-shot hardware timer. Arming granularity is ≤ 1 µs; the
/// platform's minimum usable delay is policed upstream by the scheduler
/// (`min_timer_arm_us`), not here.
pub trait OneShotTimer {
    /// Arm to fire once, `delay_us` from now. Re-arming replaces the
    /// pending shot.
    fn start_us(&mut self, delay_us: u32);

    /// Cancel any pending shot.
    fn stop(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Output pin port
// ───────────────────────────────────────────────────────────────

/// A digital output. Spark: HIGH while the coil charges. Fuel: HIGH
/// while the injector is open.
pub trait OutputPin {
    fn set_high(&mut self);
    fn set_low(&mut self);
    fn is_high(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Ignition port (driven adapter: domain → output pipelines)
// ───────────────────────────────────────────────────────────────

/// Main-loop face of the two ISR pipelines. The service computes delays;
/// the adapter routes them to the pipeline pair that owns the timers.
pub trait IgnitionPort {
    /// Begin coil charge `delay_us` from now, discharging after
    /// `dwell_us`. Returns `false` if the pipeline refused (dwell still
    /// in flight).
    fn arm_spark(&mut self, delay_us: u32, dwell_us: u32) -> bool;

    /// Open the injector `delay_us` from now for `duration_us`.
    /// Returns `false` if a pulse is still in flight.
    fn arm_fuel(&mut self, delay_us: u32, duration_us: u32) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

/// Monotonic microsecond clock. The scheduler samples it immediately
/// before every arming computation, so precision here bounds the
/// angular error of every event.
pub trait TimePort {
    fn now_us(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`EcuEvent`](super::events::EcuEvent)s
/// through this port. Adapters decide where they go — the diagnostic
/// serial line in production, a recording vector under test.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::EcuEvent);
}
