//! GX35 ECU firmware — main entry point.
//!
//! Hexagonal architecture around a per-revolution control loop:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter       LogEventSink        MonotonicClock      │
//! │  (Adc+Ignition)        (EventSink)         (TimePort)          │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              EcuService (pure logic)                   │    │
//! │  │  Mode FSM · Safety · Fueling · Scheduler               │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  ISRs: tach · killswitch · 4 one-shot timers (pipelines)       │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Bring-up order is the safety contract: outputs LOW, then timers,
//! then interrupts, then the loop.

#![deny(unused_must_use)]

use anyhow::Result;
use log::info;

use gx35_ecu::adapters::log_sink::LogEventSink;
use gx35_ecu::app::service::EcuService;
use gx35_ecu::config::EcuConfig;
use gx35_ecu::diagnostics;
use gx35_ecu::events;
use gx35_ecu::kinematics;

// ── ESP-IDF target ────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn main() -> Result<()> {
    use gx35_ecu::adapters::hardware::HardwareAdapter;
    use gx35_ecu::adapters::time::MonotonicClock;
    use gx35_ecu::drivers::{hw_init, hw_timer, spi_adc, tach};

    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    info!("GX35 ECU v{} starting", env!("CARGO_PKG_VERSION"));
    diagnostics::install_panic_handler();

    let config = EcuConfig::default();
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("default config invalid: {e}"))?;

    // Startup invariant: any init failure halts with outputs LOW —
    // init_peripherals drives them LOW before anything can interrupt.
    let adc_device = match hw_init::init_peripherals() {
        Ok(dev) => dev,
        Err(e) => halt(e),
    };
    if let Err(e) = hw_timer::init_pipelines() {
        halt(e);
    }
    if let Err(e) = hw_init::init_isr_service() {
        halt(e);
    }

    let mut hw = HardwareAdapter::new(spi_adc::Mcp3304::new(adc_device));
    let clock = MonotonicClock::new();
    let mut sink = LogEventSink::new();
    let mut service = EcuService::new(config, &kinematics::CRANK);
    service.start(&mut sink);

    loop {
        events::drain_events(|event| service.on_event(event));
        service.poll(&mut hw, &clock, tach::killswitch_closed(), &mut sink);

        // One RTOS tick of breathing room for the idle watchdog; the
        // tick rate is 1 kHz in sdkconfig, well inside the slowest
        // revolution period at engageable speeds.
        unsafe { esp_idf_svc::sys::vTaskDelay(1) };
    }
}

#[cfg(target_os = "espidf")]
fn halt(e: gx35_ecu::error::Error) -> ! {
    log::error!("bring-up failed: {e} — halting with outputs LOW");
    loop {
        unsafe { esp_idf_svc::sys::vTaskDelay(100) };
    }
}

// ── Host simulation ───────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
fn main() -> Result<()> {
    use std::cell::Cell;

    use gx35_ecu::adapters::hardware::SimHardware;
    use gx35_ecu::app::ports::TimePort;
    use gx35_ecu::pins;
    use gx35_ecu::sensors::thermistor::{ECT_CAL, IAT_CAL};
    use gx35_ecu::sensors::V_PER_BIT;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("GX35 ECU v{} — host simulation", env!("CARGO_PKG_VERSION"));
    diagnostics::install_panic_handler();

    /// Manually advanced clock so the simulated crank and the scheduler
    /// agree on "now".
    struct SimClock {
        now_us: Cell<u64>,
    }

    impl TimePort for SimClock {
        fn now_us(&self) -> u64 {
            self.now_us.get()
        }
    }

    fn map_count(kpa: f32) -> u16 {
        ((kpa - 10.57) / 18.86 / V_PER_BIT) as u16
    }

    let config = EcuConfig::default();
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("default config invalid: {e}"))?;

    let mut hw = SimHardware::new();
    hw.adc.set_channel(pins::ADC_CH_MAP, map_count(60.0));
    hw.adc.set_channel(pins::ADC_CH_TPS, 1200);
    hw.adc
        .set_channel(pins::ADC_CH_IAT, IAT_CAL.count_for_kelvin(298.0));
    hw.adc
        .set_channel(pins::ADC_CH_ECT, ECT_CAL.count_for_kelvin(340.0));
    hw.adc.set_channel(pins::ADC_CH_O2, 2000);

    let clock = SimClock {
        now_us: Cell::new(1_000),
    };
    let mut sink = LogEventSink::new();
    let mut service = EcuService::new(config, &kinematics::CRANK);
    service.start(&mut sink);

    // Spin the virtual crank: idle, crank, catch, run up to 3500 RPM.
    // The real tach ISR body drives the shared record and the queue.
    let profile: &[(f32, u32)] = &[(80.0, 4), (300.0, 6), (1200.0, 10), (3500.0, 40)];
    for &(rpm, revs) in profile {
        let period_us = (60.0e6 / rpm) as u64;
        for _ in 0..revs {
            clock.now_us.set(clock.now_us.get() + period_us);
            kinematics::tach_isr_handler(clock.now_us.get());
            events::drain_events(|event| service.on_event(event));
            // A few passes per revolution: calibration decision, regime
            // arming, idle reading.
            for _ in 0..3 {
                service.poll(&mut hw, &clock, true, &mut sink);
            }
        }
        info!(
            "sim: {:>6.0} RPM x{revs} revs | state={:?} spark_arms={} fuel_arms={} skipped={}",
            rpm,
            service.state(),
            hw.spark_arms,
            hw.fuel_arms,
            service.skipped_events()
        );
    }

    info!(
        "sim complete: {} revolutions, {} spark arms, {} fuel arms, {} skipped",
        service.revolutions(),
        hw.spark_arms,
        hw.fuel_arms,
        service.skipped_events()
    );
    Ok(())
}
