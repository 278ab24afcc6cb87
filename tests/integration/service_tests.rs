//! Service-level behaviour: lifecycle events, diagnostic cadence,
//! runtime commands.

use crate::mock_hw::*;
use gx35_ecu::app::commands::EcuCommand;
use gx35_ecu::app::events::EcuEvent;
use gx35_ecu::app::service::EcuService;
use gx35_ecu::config::EcuConfig;
use gx35_ecu::fsm::StateId;
use gx35_ecu::kinematics::KinematicState;

#[test]
fn start_emits_started_event() {
    let kin = KinematicState::new();
    let mut svc = EcuService::new(EcuConfig::default(), &kin);
    let mut sink = RecordingSink::new();
    svc.start(&mut sink);
    assert!(matches!(
        sink.events.first(),
        Some(EcuEvent::Started(StateId::ReadSensors))
    ));
}

#[test]
fn diagnostic_line_every_ten_revolutions() {
    let kin = KinematicState::new();
    let mut hw = MockHardware::new();
    let clock = MockClock::new();
    let mut sink = RecordingSink::new();
    let mut svc = EcuService::new(EcuConfig::default(), &kin);
    svc.start(&mut sink);

    for _ in 0..25 {
        spin_revolution(&kin, &mut svc, &mut hw, &clock, &mut sink, 3000.0, true);
    }

    // Revolutions 10 and 20 pass through SERIAL_OUT.
    assert_eq!(sink.telemetry_count(), 2);
}

#[test]
fn telemetry_reflects_operating_point() {
    let kin = KinematicState::new();
    let mut hw = MockHardware::new();
    let clock = MockClock::new();
    let mut sink = RecordingSink::new();
    let mut svc = EcuService::new(EcuConfig::default(), &kin);
    svc.start(&mut sink);
    hw.set_map_kpa(60.0);

    spin_until_settled(&kin, &mut svc, &mut hw, &clock, &mut sink, 3000.0, true);
    spin_revolution(&kin, &mut svc, &mut hw, &clock, &mut sink, 3000.0, true);

    let t = svc.build_telemetry();
    assert!((t.rpm - 3000.0).abs() < 20.0);
    assert!((t.map_kpa - 60.0).abs() < 0.5);
    assert!((t.ve_fraction - 0.65).abs() < 0.01);
    assert!(t.fuel_pulse_us > 0);
}

#[test]
fn fault_events_raise_and_clear() {
    let kin = KinematicState::new();
    let mut hw = MockHardware::new();
    let clock = MockClock::new();
    let mut sink = RecordingSink::new();
    let mut svc = EcuService::new(EcuConfig::default(), &kin);
    svc.start(&mut sink);

    spin_revolution(&kin, &mut svc, &mut hw, &clock, &mut sink, 3000.0, false);
    assert!(sink.fault_raised());

    spin_revolution(&kin, &mut svc, &mut hw, &clock, &mut sink, 3000.0, true);
    assert!(sink
        .events
        .iter()
        .any(|e| matches!(e, EcuEvent::FaultsCleared)));
}

#[test]
fn invalid_config_update_is_rejected() {
    let kin = KinematicState::new();
    let mut sink = RecordingSink::new();
    let mut svc = EcuService::new(EcuConfig::default(), &kin);
    svc.start(&mut sink);

    let bad = EcuConfig {
        lower_rev_limit_rpm: 7000.0, // inverted hysteresis band
        ..EcuConfig::default()
    };
    svc.handle_command(EcuCommand::UpdateConfig(bad), &mut sink);
    assert_eq!(svc.current_config().lower_rev_limit_rpm, 5800.0);
}

#[test]
fn valid_config_update_changes_dwell() {
    let kin = KinematicState::new();
    let mut hw = MockHardware::new();
    let clock = MockClock::new();
    let mut sink = RecordingSink::new();
    let mut svc = EcuService::new(EcuConfig::default(), &kin);
    svc.start(&mut sink);

    let new_cfg = EcuConfig {
        dwell_us: 4000,
        ..EcuConfig::default()
    };
    svc.handle_command(EcuCommand::UpdateConfig(new_cfg), &mut sink);
    assert_eq!(svc.current_config().dwell_us, 4000);

    spin_until_settled(&kin, &mut svc, &mut hw, &clock, &mut sink, 3000.0, true);
    match hw.spark_arms().last() {
        Some(ArmCall::Spark { dwell_us, .. }) => assert_eq!(*dwell_us, 4000),
        other => panic!("expected a spark arm, got {other:?}"),
    }
}

#[test]
fn force_state_command_moves_the_machine() {
    let kin = KinematicState::new();
    let mut sink = RecordingSink::new();
    let mut svc = EcuService::new(EcuConfig::default(), &kin);
    svc.start(&mut sink);

    svc.handle_command(EcuCommand::ForceState(StateId::RevLimiter), &mut sink);
    assert_eq!(svc.state(), StateId::RevLimiter);
    assert!(sink.events.iter().any(|e| matches!(
        e,
        EcuEvent::StateChanged {
            from: StateId::ReadSensors,
            to: StateId::RevLimiter
        }
    )));
}

#[test]
fn requested_diag_line_emits_once() {
    let kin = KinematicState::new();
    let mut hw = MockHardware::new();
    let clock = MockClock::new();
    let mut sink = RecordingSink::new();
    let mut svc = EcuService::new(EcuConfig::default(), &kin);
    svc.start(&mut sink);

    svc.handle_command(EcuCommand::RequestDiagLine, &mut sink);
    svc.poll(&mut hw, &clock, true, &mut sink);
    svc.poll(&mut hw, &clock, true, &mut sink);
    assert_eq!(sink.telemetry_count(), 1);
}
