//! Ignition and injection output pipelines.
//!
//! Two independent two-phase pipelines, each owning a pair of one-shot
//! timers and an output pin:
//!
//! ```text
//!  arm ──▶ CHARGE timer ──▶ pin HIGH, arm dwell ──▶ DISCHARGE ──▶ pin LOW
//!  arm ──▶ START  timer ──▶ pin HIGH, arm width ──▶ STOP      ──▶ pin LOW
//! ```
//!
//! The `on_*_timeout` methods are the timer ISR bodies. Each stops its
//! own timer on entry to prevent retriggering, writes exactly one pin,
//! and arms at most one follow-up timer — nothing else is ISR-legal here.
//! Neither pipeline ever touches the mode state machine; only the tach
//! edge does that.
//!
//! Each pipeline is non-reentrant with respect to itself (its two timer
//! interrupts never overlap: dwell and pulse width are far shorter than a
//! revolution at any engageable speed); the two pipelines are mutually
//! asynchronous.

use crate::app::ports::{OneShotTimer, OutputPin};

// ---------------------------------------------------------------------------
// Spark
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SparkPhase {
    Idle,
    Charging,
}

/// Coil charge/discharge pipeline. Pin HIGH = coil charging.
pub struct SparkPipeline<T: OneShotTimer, P: OutputPin> {
    charge_timer: T,
    discharge_timer: T,
    pin: P,
    dwell_us: u32,
    phase: SparkPhase,
    fired: u32,
}

impl<T: OneShotTimer, P: OutputPin> SparkPipeline<T, P> {
    /// The pin is forced LOW at construction: a half-charged coil across
    /// a reboot must not hold energy.
    pub fn new(charge_timer: T, discharge_timer: T, mut pin: P) -> Self {
        pin.set_low();
        Self {
            charge_timer,
            discharge_timer,
            pin,
            dwell_us: 0,
            phase: SparkPhase::Idle,
            fired: 0,
        }
    }

    /// Main-loop side: schedule the charge to begin `delay_us` from now
    /// and hold for `dwell_us`. Refused while a dwell is in flight — a
    /// spark cycle must never preempt its own dwell.
    pub fn arm(&mut self, delay_us: u32, dwell_us: u32) -> bool {
        if self.phase != SparkPhase::Idle {
            return false;
        }
        self.dwell_us = dwell_us;
        self.charge_timer.start_us(delay_us);
        true
    }

    /// SPARK_CHARGE timer ISR body.
    pub fn on_charge_timeout(&mut self) {
        self.charge_timer.stop();
        self.pin.set_high();
        self.phase = SparkPhase::Charging;
        self.discharge_timer.start_us(self.dwell_us);
    }

    /// SPARK_DISCHARGE timer ISR body — the spark happens here.
    pub fn on_discharge_timeout(&mut self) {
        self.discharge_timer.stop();
        self.pin.set_low();
        self.phase = SparkPhase::Idle;
        self.fired = self.fired.wrapping_add(1);
    }

    pub fn is_charging(&self) -> bool {
        self.phase == SparkPhase::Charging
    }

    /// Sparks delivered since boot.
    pub fn fired_count(&self) -> u32 {
        self.fired
    }
}

// ---------------------------------------------------------------------------
// Fuel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FuelPhase {
    Closed,
    Open,
}

/// Injector open/close pipeline. Pin HIGH = injector open.
pub struct FuelPipeline<T: OneShotTimer, P: OutputPin> {
    start_timer: T,
    stop_timer: T,
    pin: P,
    duration_us: u32,
    phase: FuelPhase,
    pulses: u32,
}

impl<T: OneShotTimer, P: OutputPin> FuelPipeline<T, P> {
    pub fn new(start_timer: T, stop_timer: T, mut pin: P) -> Self {
        pin.set_low();
        Self {
            start_timer,
            stop_timer,
            pin,
            duration_us: 0,
            phase: FuelPhase::Closed,
            pulses: 0,
        }
    }

    /// Main-loop side: open the injector `delay_us` from now for
    /// `duration_us`. Refused while a pulse is in flight.
    pub fn arm(&mut self, delay_us: u32, duration_us: u32) -> bool {
        if self.phase != FuelPhase::Closed {
            return false;
        }
        self.duration_us = duration_us;
        self.start_timer.start_us(delay_us);
        true
    }

    /// FUEL_START timer ISR body.
    pub fn on_start_timeout(&mut self) {
        self.start_timer.stop();
        self.pin.set_high();
        self.phase = FuelPhase::Open;
        self.stop_timer.start_us(self.duration_us);
    }

    /// FUEL_STOP timer ISR body.
    pub fn on_stop_timeout(&mut self) {
        self.stop_timer.stop();
        self.pin.set_low();
        self.phase = FuelPhase::Closed;
        self.pulses = self.pulses.wrapping_add(1);
    }

    pub fn is_open(&self) -> bool {
        self.phase == FuelPhase::Open
    }

    /// Completed injection pulses since boot.
    pub fn pulse_count(&self) -> u32 {
        self.pulses
    }
}
