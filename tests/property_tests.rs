//! Property and fuzz-style tests for the control core.
//!
//! Host-only: proptest is not available for espidf targets.

#![cfg(not(target_os = "espidf"))]

use gx35_ecu::app::ports::{AdcPort, IgnitionPort, TimePort};
use gx35_ecu::config::EcuConfig;
use gx35_ecu::fueling;
use gx35_ecu::kinematics::{deg_per_us_from_rpm, rpm_from_deg_per_us, KinematicState};
use gx35_ecu::scheduler::{ArmOutcome, EventScheduler};
use gx35_ecu::sensors::{map, o2, thermistor};
use gx35_ecu::tuning;
use proptest::prelude::*;

// ── Table maps ────────────────────────────────────────────────

proptest! {
    /// The tuning maps are continuous: a 1-RPM step never jumps the
    /// output by more than the steepest cell slope allows.
    #[test]
    fn ve_map_is_continuous(rpm in 400.0f32..6600.0, map_kpa in 15.0f32..105.0) {
        let a = tuning::ve_fraction(rpm, map_kpa);
        let b = tuning::ve_fraction(rpm + 1.0, map_kpa);
        prop_assert!((a - b).abs() < 0.01);
    }

    #[test]
    fn spark_map_stays_in_physical_range(rpm in -1e4f32..2e4, map_kpa in -50.0f32..500.0) {
        let sa = tuning::spark_advance_deg(rpm, map_kpa);
        prop_assert!((0.0..=45.0).contains(&sa), "advance {sa} out of range");
    }
}

// ── Sensors ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn map_output_always_within_rails(count in 0u16..=4095) {
        let kpa = map::manifold_pressure_kpa(count);
        prop_assert!((20.0..=103.0).contains(&kpa));
    }

    #[test]
    fn thermistors_never_leave_calibrated_span(count in 0u16..=4095) {
        for cal in [thermistor::ECT_CAL, thermistor::IAT_CAL] {
            let k = cal.kelvin_from_count(count);
            prop_assert!((cal.t_cold_k..=cal.t_hot_k).contains(&k));
        }
    }

    #[test]
    fn o2_output_is_finite_and_positive(count in 0u16..=4095) {
        let afr = o2::air_fuel_ratio(count);
        prop_assert!(afr.is_finite() && afr > 0.0);
    }
}

// ── Kinematics ────────────────────────────────────────────────

proptest! {
    #[test]
    fn rpm_conversions_are_inverse(rpm in 1.0f32..20_000.0) {
        let back = rpm_from_deg_per_us(deg_per_us_from_rpm(rpm));
        prop_assert!((back - rpm).abs() / rpm < 1e-4);
    }

    #[test]
    fn current_angle_always_wrapped(
        period_us in 5_000u64..2_000_000,
        probe_frac in 0.0f32..3.0,
    ) {
        let kin = KinematicState::new();
        kin.on_tach_edge(1_000);
        kin.on_tach_edge(1_000 + period_us);

        let probe = 1_000 + period_us + (period_us as f32 * probe_frac) as u64;
        let angle = kin.current_angle(probe, 30.0);
        prop_assert!((0.0..360.0).contains(&angle), "angle {angle}");
    }
}

// ── Fueling ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn pulse_width_positive_and_finite(
        rpm in 100.0f32..7000.0,
        map_kpa in 20.0f32..103.0,
        iat_k in 233.0f32..373.0,
    ) {
        let cfg = EcuConfig::default();
        let vol = fueling::running_air_volume_m3(&cfg, rpm, map_kpa);
        let pw = fueling::pulse_width_us(&cfg, vol, map_kpa, iat_k);
        prop_assert!(pw.is_finite() && pw > 0.0);
        // A 35.8 cc cylinder can never demand more than ~20 ms of this
        // injector.
        prop_assert!(pw < 20_000.0, "implausible pulse width {pw}");
    }
}

// ── Scheduler ─────────────────────────────────────────────────

proptest! {
    /// The arm floor is absolute: whatever the geometry, a delay under
    /// `min_timer_arm_us` (including every past-due case) never arms.
    #[test]
    fn scheduler_never_arms_below_floor(
        target in -360.0f32..720.0,
        now in 0.0f32..360.0,
        rpm in 50.0f32..8000.0,
    ) {
        let scheduler = EventScheduler::new(128);
        let omega = deg_per_us_from_rpm(rpm);
        match scheduler.delay_to_angle(target, now, omega) {
            ArmOutcome::Armed { delay_us } => prop_assert!(delay_us >= 128),
            ArmOutcome::Skipped => {
                let raw = (target - now) / omega;
                prop_assert!(raw < 128.0);
            }
        }
    }
}

// ── End-to-end gate ───────────────────────────────────────────

#[derive(Default)]
struct CountingHw {
    arms: u32,
}

impl AdcPort for CountingHw {
    fn read_adc(&mut self, _channel: u8) -> u16 {
        2048
    }
}

impl IgnitionPort for CountingHw {
    fn arm_spark(&mut self, _delay_us: u32, _dwell_us: u32) -> bool {
        self.arms += 1;
        true
    }

    fn arm_fuel(&mut self, _delay_us: u32, _duration_us: u32) -> bool {
        self.arms += 1;
        true
    }
}

struct FixedClock(u64);

impl TimePort for FixedClock {
    fn now_us(&self) -> u64 {
        self.0
    }
}

struct NullSink;

impl gx35_ecu::app::ports::EventSink for NullSink {
    fn emit(&mut self, _event: &gx35_ecu::app::events::EcuEvent) {}
}

proptest! {
    /// With the killswitch open, no rpm profile can coax out a single
    /// arming.
    #[test]
    fn open_killswitch_gates_everything(
        rpms in proptest::collection::vec(50.0f32..8000.0, 1..30),
    ) {
        let kin = KinematicState::new();
        let mut svc =
            gx35_ecu::app::service::EcuService::new(EcuConfig::default(), &kin);
        let mut hw = CountingHw::default();
        let mut sink = NullSink;
        svc.start(&mut sink);

        let mut now = 1_000u64;
        for rpm in rpms {
            now += (60.0e6 / rpm) as u64;
            kin.on_tach_edge(now);
            svc.on_event(gx35_ecu::events::Event::TachEdge);
            for _ in 0..3 {
                svc.poll(&mut hw, &FixedClock(now), false, &mut sink);
            }
        }
        prop_assert_eq!(hw.arms, 0);
    }

    /// Below the engagement speed nothing is ever armed either.
    #[test]
    fn below_engagement_gates_everything(rpm in 1.0f32..99.0) {
        let kin = KinematicState::new();
        let mut svc =
            gx35_ecu::app::service::EcuService::new(EcuConfig::default(), &kin);
        let mut hw = CountingHw::default();
        let mut sink = NullSink;
        svc.start(&mut sink);

        let mut now = 1_000u64;
        for _ in 0..10 {
            now += (60.0e6 / rpm) as u64;
            kin.on_tach_edge(now);
            svc.on_event(gx35_ecu::events::Event::TachEdge);
            for _ in 0..3 {
                svc.poll(&mut hw, &FixedClock(now), true, &mut sink);
            }
        }
        prop_assert_eq!(hw.arms, 0);
    }
}
