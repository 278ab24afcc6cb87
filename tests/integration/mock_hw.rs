//! Mock hardware for integration tests.
//!
//! Records every arming request so tests can assert on the full command
//! history without real timers, plus a manually-advanced clock and a
//! recording event sink. The bench helpers drive whole simulated
//! revolutions through the real tach-edge path.

use std::cell::Cell;

use gx35_ecu::app::events::EcuEvent;
use gx35_ecu::app::ports::{AdcPort, EventSink, IgnitionPort, TimePort};
use gx35_ecu::app::service::EcuService;
use gx35_ecu::events::Event;
use gx35_ecu::kinematics::KinematicState;
use gx35_ecu::pins;
use gx35_ecu::sensors::thermistor::{ECT_CAL, IAT_CAL};
use gx35_ecu::sensors::V_PER_BIT;

// ── Arming call record ────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmCall {
    Spark { delay_us: u32, dwell_us: u32 },
    Fuel { delay_us: u32, duration_us: u32 },
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    channels: [u16; 8],
    pub calls: Vec<ArmCall>,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        let mut hw = Self {
            channels: [0; 8],
            calls: Vec::new(),
        };
        // Bench defaults: warm day, part throttle.
        hw.set_map_kpa(60.0);
        hw.set_iat_k(298.0);
        hw.set_ect_k(340.0);
        hw
    }

    pub fn set_channel(&mut self, channel: u8, count: u16) {
        self.channels[channel as usize] = count.min(4095);
    }

    /// Set the MAP channel by physical value (inverse of the sensor
    /// transfer function, linear region).
    pub fn set_map_kpa(&mut self, kpa: f32) {
        let volts = (kpa - 10.57) / 18.86;
        self.set_channel(pins::ADC_CH_MAP, (volts / V_PER_BIT) as u16);
    }

    pub fn set_iat_k(&mut self, kelvin: f32) {
        self.set_channel(pins::ADC_CH_IAT, IAT_CAL.count_for_kelvin(kelvin));
    }

    pub fn set_ect_k(&mut self, kelvin: f32) {
        self.set_channel(pins::ADC_CH_ECT, ECT_CAL.count_for_kelvin(kelvin));
    }

    pub fn spark_arms(&self) -> Vec<ArmCall> {
        self.calls
            .iter()
            .copied()
            .filter(|c| matches!(c, ArmCall::Spark { .. }))
            .collect()
    }

    pub fn fuel_arms(&self) -> Vec<ArmCall> {
        self.calls
            .iter()
            .copied()
            .filter(|c| matches!(c, ArmCall::Fuel { .. }))
            .collect()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl AdcPort for MockHardware {
    fn read_adc(&mut self, channel: u8) -> u16 {
        self.channels[channel as usize & 0x07]
    }
}

impl IgnitionPort for MockHardware {
    fn arm_spark(&mut self, delay_us: u32, dwell_us: u32) -> bool {
        self.calls.push(ArmCall::Spark { delay_us, dwell_us });
        true
    }

    fn arm_fuel(&mut self, delay_us: u32, duration_us: u32) -> bool {
        self.calls.push(ArmCall::Fuel { delay_us, duration_us });
        true
    }
}

// ── MockClock ─────────────────────────────────────────────────

pub struct MockClock {
    now_us: Cell<u64>,
}

#[allow(dead_code)]
impl MockClock {
    pub fn new() -> Self {
        Self {
            now_us: Cell::new(1_000),
        }
    }

    pub fn now(&self) -> u64 {
        self.now_us.get()
    }

    pub fn advance_us(&self, us: u64) {
        self.now_us.set(self.now_us.get() + us);
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimePort for MockClock {
    fn now_us(&self) -> u64 {
        self.now_us.get()
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<EcuEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn telemetry_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, EcuEvent::Telemetry(_)))
            .count()
    }

    pub fn fault_raised(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, EcuEvent::FaultRaised(_)))
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &EcuEvent) {
        self.events.push(event.clone());
    }
}

// ── Bench helpers ─────────────────────────────────────────────

/// Polls per revolution: calibration decision, regime arming, idle pass.
pub const POLLS_PER_REV: u32 = 3;

/// Drive one simulated revolution at `rpm`: advance the clock by one
/// period, fire the tach edge, deliver it, and run the main-loop passes.
#[allow(clippy::too_many_arguments)]
pub fn spin_revolution(
    kin: &KinematicState,
    svc: &mut EcuService<'_>,
    hw: &mut MockHardware,
    clock: &MockClock,
    sink: &mut RecordingSink,
    rpm: f32,
    killswitch_closed: bool,
) {
    let period_us = (60.0e6 / rpm) as u64;
    clock.advance_us(period_us);
    kin.on_tach_edge(clock.now());
    svc.on_event(Event::TachEdge);
    for _ in 0..POLLS_PER_REV {
        svc.poll(hw, clock, killswitch_closed, sink);
    }
}

/// Spin at `rpm` until the EMA-filtered readout settles within 0.5%.
#[allow(dead_code)]
pub fn spin_until_settled(
    kin: &KinematicState,
    svc: &mut EcuService<'_>,
    hw: &mut MockHardware,
    clock: &MockClock,
    sink: &mut RecordingSink,
    rpm: f32,
    killswitch_closed: bool,
) {
    for _ in 0..40 {
        spin_revolution(kin, svc, hw, clock, sink, rpm, killswitch_closed);
        if (kin.snapshot().rpm - rpm).abs() / rpm < 0.005 {
            return;
        }
    }
    panic!("rpm failed to settle at {rpm}");
}
