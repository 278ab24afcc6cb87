//! Diagnostic serial line formatting and runtime counters.
//!
//! SERIAL_OUT emits one ASCII line every N revolutions on the 115200-baud
//! console: regime, RPM, MAP, the VE the cycle used, the planned spark
//! discharge angle, the injection pulse width, and the fault mask.
//!
//! Formatting happens in the main loop only, into a fixed-capacity
//! buffer. ISR context never formats or prints anything — serial output
//! from an interrupt could outlast a dwell window.

use core::fmt::Write;

use crate::app::events::TelemetryData;

/// Fixed capacity for one diagnostic line.
pub type DiagLine = heapless::String<128>;

/// Render one diagnostic line. Infallible: the fields are bounded and
/// the buffer is sized for the worst case; overflow truncates.
pub fn format_diag_line(t: &TelemetryData) -> DiagLine {
    let mut line = DiagLine::new();
    let _ = write!(
        line,
        "{:?} rpm={:.0} map={:.1}kPa ve={:.2} spark={:.1}deg fuel={}us faults=0b{:04b} skip={}",
        t.state,
        t.rpm,
        t.map_kpa,
        t.ve_fraction,
        t.spark_discharge_deg,
        t.fuel_pulse_us,
        t.fault_flags,
        t.skipped_events,
    );
    line
}

/// Install a panic hook that logs the reason before the platform reset
/// path takes over. Outputs are safe regardless: the pins idle LOW and
/// the watchdog resets through `hw_init`, which re-drives them LOW
/// before interrupts are re-enabled.
pub fn install_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        let reason = if let Some(msg) = info.payload().downcast_ref::<&str>() {
            *msg
        } else if let Some(msg) = info.payload().downcast_ref::<String>() {
            msg.as_str()
        } else {
            "unknown panic"
        };
        log::error!("PANIC: {reason}");
    }));
}
