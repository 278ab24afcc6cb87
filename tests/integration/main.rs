//! Integration test binary: EcuService → FSM → timer arming through
//! mock hardware.

mod mock_hw;
mod scenario_tests;
mod service_tests;
