//! Crankshaft tach and killswitch input handling.
//!
//! Two GPIO interrupt sources:
//! - TACH (falling edge, one per revolution) — timestamps the edge and
//!   forwards to [`crate::kinematics::tach_isr_handler`].
//! - KILLSWITCH (any edge, level-triggered semantics) — latches the pin
//!   level into an atomic the main loop reads every pass.
//!
//! Both handlers are ISR-legal: an atomic store and a queue push, nothing
//! else.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::events::{push_event, Event};

/// Killswitch level latch. `true` = closed = run permitted.
/// Written by the killswitch ISR (and once at boot to seed the level);
/// read by the main loop.
static KILLSWITCH_CLOSED: AtomicBool = AtomicBool::new(false);

/// Seed the latch from a direct pin read (boot, before interrupts).
pub fn latch_killswitch_level(closed: bool) {
    KILLSWITCH_CLOSED.store(closed, Ordering::Release);
}

/// Killswitch edge ISR body.
pub fn killswitch_isr_handler(closed: bool) {
    KILLSWITCH_CLOSED.store(closed, Ordering::Release);
    push_event(Event::KillswitchChanged);
}

/// Latched killswitch level for the supervisor.
pub fn killswitch_closed() -> bool {
    KILLSWITCH_CLOSED.load(Ordering::Acquire)
}

// ---------------------------------------------------------------------------
// ESP-IDF GPIO ISR glue
// ---------------------------------------------------------------------------

#[cfg(target_os = "espidf")]
mod isr {
    use esp_idf_svc::sys::*;

    use crate::error::{Error, Result};
    use crate::pins;

    unsafe extern "C" fn tach_gpio_isr(_arg: *mut core::ffi::c_void) {
        // SAFETY: esp_timer_get_time is a counter read, ISR-safe.
        let now_us = unsafe { esp_timer_get_time() } as u64;
        crate::kinematics::tach_isr_handler(now_us);
    }

    unsafe extern "C" fn killswitch_gpio_isr(_arg: *mut core::ffi::c_void) {
        // SAFETY: gpio_get_level is a register read, ISR-safe.
        let closed = unsafe { gpio_get_level(pins::KILLSWITCH_GPIO) } != 0;
        super::killswitch_isr_handler(closed);
    }

    /// Hook both input ISRs. The GPIO ISR service must already be
    /// installed; pins are configured in `hw_init::init_peripherals`.
    pub fn register() -> Result<()> {
        // Seed the killswitch latch before its ISR can fire so the first
        // supervisor pass sees the true level, not the boot default.
        // SAFETY: plain register reads/writes on configured pins.
        unsafe {
            let closed = gpio_get_level(pins::KILLSWITCH_GPIO) != 0;
            super::latch_killswitch_level(closed);

            if gpio_isr_handler_add(pins::TACH_GPIO, Some(tach_gpio_isr), core::ptr::null_mut())
                != ESP_OK
            {
                return Err(Error::Init("tach ISR hook failed"));
            }
            if gpio_isr_handler_add(
                pins::KILLSWITCH_GPIO,
                Some(killswitch_gpio_isr),
                core::ptr::null_mut(),
            ) != ESP_OK
            {
                return Err(Error::Init("killswitch ISR hook failed"));
            }
        }
        Ok(())
    }
}

#[cfg(target_os = "espidf")]
pub use isr::register;

#[cfg(not(target_os = "espidf"))]
pub fn register() -> crate::error::Result<()> {
    log::info!("tach(sim): input ISRs not registered (host build)");
    Ok(())
}
