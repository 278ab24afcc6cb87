//! One-shot hardware timers and the static output pipelines.
//!
//! Four independent esp_timer one-shots drive the two pipelines in
//! [`crate::ignition`]. Callbacks run with ISR dispatch so pin edges land
//! within the arming granularity; each callback body is the pipeline's
//! own `on_*_timeout`, which only writes a pin and arms/stops a timer.
//!
//! The pipelines live in `static mut` slots because C callbacks cannot
//! capture. Discipline mirrors the rest of the ISR-shared state: the
//! slots are written exactly once in [`init_pipelines`] before any timer
//! is armed, and afterwards each slot is touched only by its own
//! pipeline's interrupt callbacks and the main-loop arm path, which the
//! pipeline's phase field keeps mutually exclusive.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use crate::app::ports::OneShotTimer;
#[cfg(target_os = "espidf")]
use crate::drivers::outputs::BoardPin;
#[cfg(target_os = "espidf")]
use crate::error::{Error, TimerError};
#[cfg(target_os = "espidf")]
use crate::events::{push_event, Event};
#[cfg(target_os = "espidf")]
use crate::ignition::{FuelPipeline, SparkPipeline};
#[cfg(target_os = "espidf")]
use crate::pins;

use crate::error::Result;

// ---------------------------------------------------------------------------
// esp_timer one-shot wrapper
// ---------------------------------------------------------------------------

#[cfg(target_os = "espidf")]
pub struct EspOneShotTimer {
    handle: esp_timer_handle_t,
}

#[cfg(target_os = "espidf")]
impl EspOneShotTimer {
    /// Create a one-shot with ISR dispatch. `name` must be NUL-terminated.
    pub fn new(name: &'static [u8], callback: esp_timer_cb_t) -> Result<Self> {
        let args = esp_timer_create_args_t {
            callback,
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_ISR,
            name: name.as_ptr() as *const _,
            skip_unhandled_events: true,
        };
        let mut handle: esp_timer_handle_t = core::ptr::null_mut();
        // SAFETY: args outlive the call; the handle is stored for the
        // firmware lifetime and never freed.
        let ret = unsafe { esp_timer_create(&args, &mut handle) };
        if ret != ESP_OK {
            log::error!("hw_timer: create failed (rc={ret})");
            return Err(Error::Timer(TimerError::CreateFailed));
        }
        Ok(Self { handle })
    }
}

#[cfg(target_os = "espidf")]
impl OneShotTimer for EspOneShotTimer {
    fn start_us(&mut self, delay_us: u32) {
        // SAFETY: handle is valid; stop-then-start gives replace
        // semantics for re-arming.
        unsafe {
            esp_timer_stop(self.handle);
            esp_timer_start_once(self.handle, delay_us as u64);
        }
    }

    fn stop(&mut self) {
        // SAFETY: stopping an idle timer returns an ignorable error code.
        unsafe {
            esp_timer_stop(self.handle);
        }
    }
}

// ---------------------------------------------------------------------------
// Static pipelines and their interrupt callbacks
// ---------------------------------------------------------------------------

#[cfg(target_os = "espidf")]
static mut SPARK: Option<SparkPipeline<EspOneShotTimer, BoardPin>> = None;
#[cfg(target_os = "espidf")]
static mut FUEL: Option<FuelPipeline<EspOneShotTimer, BoardPin>> = None;

/// SAFETY: slot written once in `init_pipelines` before any callback can
/// fire; see the module header for the access discipline.
#[cfg(target_os = "espidf")]
unsafe fn spark_mut() -> Option<&'static mut SparkPipeline<EspOneShotTimer, BoardPin>> {
    unsafe { (*core::ptr::addr_of_mut!(SPARK)).as_mut() }
}

/// SAFETY: same invariants as `spark_mut`.
#[cfg(target_os = "espidf")]
unsafe fn fuel_mut() -> Option<&'static mut FuelPipeline<EspOneShotTimer, BoardPin>> {
    unsafe { (*core::ptr::addr_of_mut!(FUEL)).as_mut() }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn spark_charge_cb(_arg: *mut core::ffi::c_void) {
    if let Some(spark) = unsafe { spark_mut() } {
        spark.on_charge_timeout();
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn spark_discharge_cb(_arg: *mut core::ffi::c_void) {
    if let Some(spark) = unsafe { spark_mut() } {
        spark.on_discharge_timeout();
        push_event(Event::SparkFired);
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn fuel_start_cb(_arg: *mut core::ffi::c_void) {
    if let Some(fuel) = unsafe { fuel_mut() } {
        fuel.on_start_timeout();
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn fuel_stop_cb(_arg: *mut core::ffi::c_void) {
    if let Some(fuel) = unsafe { fuel_mut() } {
        fuel.on_stop_timeout();
        push_event(Event::FuelPulseEnded);
    }
}

// ---------------------------------------------------------------------------
// Init and main-loop arming face
// ---------------------------------------------------------------------------

/// Create the four timers, claim the output pins (driven LOW by
/// construction) and populate the pipeline slots. Call once at boot,
/// after `hw_init::init_peripherals` and before `init_isr_service`.
#[cfg(target_os = "espidf")]
pub fn init_pipelines() -> Result<()> {
    let charge = EspOneShotTimer::new(b"spark_chg\0", Some(spark_charge_cb))?;
    let discharge = EspOneShotTimer::new(b"spark_dis\0", Some(spark_discharge_cb))?;
    let start = EspOneShotTimer::new(b"fuel_start\0", Some(fuel_start_cb))?;
    let stop = EspOneShotTimer::new(b"fuel_stop\0", Some(fuel_stop_cb))?;

    // SAFETY: single boot-time write, before any timer has been armed.
    unsafe {
        SPARK = Some(SparkPipeline::new(
            charge,
            discharge,
            BoardPin::new(pins::SPARK_GPIO),
        ));
        FUEL = Some(FuelPipeline::new(
            start,
            stop,
            BoardPin::new(pins::FUEL_GPIO),
        ));
    }
    log::info!("hw_timer: spark + fuel pipelines ready");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_pipelines() -> Result<()> {
    log::info!("hw_timer(sim): pipelines not created (host build)");
    Ok(())
}

/// Main-loop arming face, used by the hardware adapter.
#[cfg(target_os = "espidf")]
pub fn arm_spark(delay_us: u32, dwell_us: u32) -> bool {
    // SAFETY: arm only mutates the idle-phase side of the pipeline; see
    // module header.
    unsafe { spark_mut() }.is_some_and(|spark| spark.arm(delay_us, dwell_us))
}

#[cfg(target_os = "espidf")]
pub fn arm_fuel(delay_us: u32, duration_us: u32) -> bool {
    // SAFETY: as `arm_spark`.
    unsafe { fuel_mut() }.is_some_and(|fuel| fuel.arm(delay_us, duration_us))
}

#[cfg(not(target_os = "espidf"))]
pub fn arm_spark(_delay_us: u32, _dwell_us: u32) -> bool {
    false
}

#[cfg(not(target_os = "espidf"))]
pub fn arm_fuel(_delay_us: u32, _duration_us: u32) -> bool {
    false
}
