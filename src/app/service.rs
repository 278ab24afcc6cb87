//! Control service — the hexagonal core.
//!
//! [`EcuService`] owns the mode FSM, safety supervisor, sensor hub and
//! arming scheduler. All I/O flows through port traits injected at call
//! sites, so the whole revolution pipeline is testable with mocks.
//!
//! ```text
//!      AdcPort ──▶ ┌─────────────────────────────┐ ──▶ EventSink
//!     TimePort ──▶ │          EcuService         │
//!  IgnitionPort ◀──│  FSM · Safety · Scheduler   │
//!                  └─────────────────────────────┘
//! ```
//!
//! Per revolution: the tach ISR updates the kinematic record and queues
//! [`Event::TachEdge`]; the main loop hands that to [`on_event`], which
//! forces CALIBRATION; the next [`poll`] runs the regime decision and
//! arms the timers with a θ_now sampled immediately before each arming.
//!
//! [`on_event`]: EcuService::on_event
//! [`poll`]: EcuService::poll

use log::{info, warn};

use crate::config::EcuConfig;
use crate::events::Event;
use crate::fsm::context::EcuContext;
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::kinematics::KinematicState;
use crate::safety::SafetySupervisor;
use crate::scheduler::{ArmOutcome, EventScheduler};
use crate::sensors::SensorHub;

use super::commands::EcuCommand;
use super::events::{EcuEvent, TelemetryData};
use super::ports::{AdcPort, EventSink, IgnitionPort, TimePort};

// ───────────────────────────────────────────────────────────────
// EcuService
// ───────────────────────────────────────────────────────────────

/// The control service orchestrates all domain logic. It borrows the
/// ISR-shared kinematic record; everything else it owns.
pub struct EcuService<'k> {
    fsm: Fsm,
    ctx: EcuContext,
    safety: SafetySupervisor,
    scheduler: EventScheduler,
    hub: SensorHub,
    crank: &'k KinematicState,

    // Telemetry bookkeeping
    last_spark_discharge_deg: f32,
    last_fuel_pulse_us: u32,
    skipped_events: u32,
    revolutions: u64,
    sparks_delivered: u32,
    fuel_pulses_completed: u32,
    prev_faults: u8,
    diag_requested: bool,
}

impl<'k> EcuService<'k> {
    /// Construct the service around a (usually `static`) kinematic record.
    pub fn new(config: EcuConfig, crank: &'k KinematicState) -> Self {
        crank.set_diag_period(config.diag_every_n_revs);
        let safety = SafetySupervisor::new(&config);
        let scheduler = EventScheduler::new(config.min_timer_arm_us);
        let ctx = EcuContext::new(config);
        let fsm = Fsm::new(build_state_table(), StateId::ReadSensors);

        Self {
            fsm,
            ctx,
            safety,
            scheduler,
            hub: SensorHub::new(),
            crank,
            last_spark_discharge_deg: 0.0,
            last_fuel_pulse_us: 0,
            skipped_events: 0,
            revolutions: 0,
            sparks_delivered: 0,
            fuel_pulses_completed: 0,
            prev_faults: 0,
            diag_requested: false,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Run the initial state's `on_enter`. Call once before polling.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        self.fsm.start(&mut self.ctx);
        sink.emit(&EcuEvent::Started(self.fsm.current_state()));
        info!("EcuService started in {:?}", self.fsm.current_state());
    }

    // ── ISR event intake ──────────────────────────────────────

    /// Handle one drained ISR notification.
    ///
    /// The tach edge is the authoritative synchronisation point: it
    /// unconditionally forces CALIBRATION, overriding whatever the main
    /// loop was doing.
    pub fn on_event(&mut self, event: Event) {
        match event {
            Event::TachEdge => {
                self.revolutions += 1;
                self.fsm
                    .force_transition(StateId::Calibration, &mut self.ctx);
            }
            Event::KillswitchChanged => {
                // Level is latched by the ISR; the next poll() reads it.
            }
            Event::SparkFired => self.sparks_delivered += 1,
            Event::FuelPulseEnded => self.fuel_pulses_completed += 1,
        }
    }

    // ── Per-pass orchestration ────────────────────────────────

    /// Run one main-loop pass: sensors → safety → FSM → timer arming.
    ///
    /// `hw` satisfies both [`AdcPort`] and [`IgnitionPort`]; a single
    /// parameter avoids a double mutable borrow while keeping the port
    /// boundary explicit. `killswitch_closed` is the level latched by
    /// the killswitch ISR.
    pub fn poll(
        &mut self,
        hw: &mut (impl AdcPort + IgnitionPort),
        time: &impl TimePort,
        killswitch_closed: bool,
        sink: &mut impl EventSink,
    ) {
        let prev_state = self.fsm.current_state();

        // 1. Refresh the sensor cache (READ_SENSORS work, done every
        //    pass so CALIBRATION always decides on fresh data).
        self.ctx.sensors = self.hub.read_all(hw);

        // 2. Capture the crankshaft view for this pass.
        let ks = self.crank.snapshot();
        self.ctx.kin.rpm = ks.rpm;
        self.ctx.kin.omega_deg_per_us = ks.angular_speed_deg_per_us;
        self.ctx.kin.fuel_cycle = ks.fuel_cycle;
        self.ctx.kin.diag_due = ks.diag_due;

        // 3. Safety evaluation.
        let faults = self.safety.evaluate(killswitch_closed, ks.rpm);
        self.ctx.fault_flags = faults;
        if faults != self.prev_faults {
            if faults != 0 {
                warn!("safety faults active: 0b{:04b}", faults);
                sink.emit(&EcuEvent::FaultRaised(faults));
            } else {
                sink.emit(&EcuEvent::FaultsCleared);
            }
            self.prev_faults = faults;
        }

        // 4. Mode machine pass (pure regime logic, writes commands).
        self.fsm.tick(&mut self.ctx);

        // 5. Translate commands into timer armings, fuel first, with a
        //    fresh θ_now sampled per arming.
        let commands = self.ctx.commands;
        self.ctx.commands.clear();
        let omega = self.ctx.kin.omega_deg_per_us;

        if let Some(fuel) = commands.fuel {
            let now_deg = self
                .crank
                .current_angle(time.now_us(), self.ctx.config.calib_angle_deg);
            match self
                .scheduler
                .delay_to_angle(fuel.start_angle_deg, now_deg, omega)
            {
                ArmOutcome::Armed { delay_us } => {
                    if hw.arm_fuel(delay_us, fuel.duration_us) {
                        self.last_fuel_pulse_us = fuel.duration_us;
                    } else {
                        self.skipped_events += 1;
                    }
                }
                ArmOutcome::Skipped => self.skipped_events += 1,
            }
        }

        if let Some(spark) = commands.spark {
            self.last_spark_discharge_deg = spark.discharge_angle_deg;
            let now_deg = self
                .crank
                .current_angle(time.now_us(), self.ctx.config.calib_angle_deg);
            match self
                .scheduler
                .delay_to_angle(spark.charge_angle_deg, now_deg, omega)
            {
                ArmOutcome::Armed { delay_us } => {
                    if !hw.arm_spark(delay_us, self.ctx.config.dwell_us) {
                        self.skipped_events += 1;
                    }
                }
                ArmOutcome::Skipped => self.skipped_events += 1,
            }
        }

        // 6. Diagnostic line.
        if commands.emit_diag || self.diag_requested {
            self.diag_requested = false;
            sink.emit(&EcuEvent::Telemetry(self.build_telemetry()));
        }

        // 7. Regime change notification.
        let new_state = self.fsm.current_state();
        if new_state != prev_state {
            sink.emit(&EcuEvent::StateChanged {
                from: prev_state,
                to: new_state,
            });
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command (bench console, tuning link).
    pub fn handle_command(&mut self, cmd: EcuCommand, sink: &mut impl EventSink) {
        match cmd {
            EcuCommand::ForceState(target) => {
                let prev = self.fsm.current_state();
                self.fsm.force_transition(target, &mut self.ctx);
                sink.emit(&EcuEvent::StateChanged {
                    from: prev,
                    to: target,
                });
            }
            EcuCommand::UpdateConfig(new_config) => match new_config.validate() {
                Ok(()) => {
                    self.safety.reconfigure(&new_config);
                    self.scheduler.set_min_arm_us(new_config.min_timer_arm_us);
                    self.crank.set_diag_period(new_config.diag_every_n_revs);
                    self.ctx.config = new_config;
                    info!("configuration updated at runtime");
                }
                Err(why) => warn!("config update rejected: {why}"),
            },
            EcuCommand::RequestDiagLine => self.diag_requested = true,
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Build a diagnostic snapshot from the current context.
    pub fn build_telemetry(&self) -> TelemetryData {
        TelemetryData {
            state: self.fsm.current_state(),
            rpm: self.ctx.kin.rpm,
            map_kpa: self.ctx.sensors.map_kpa,
            ve_fraction: self.ctx.ve_fraction,
            spark_discharge_deg: self.last_spark_discharge_deg,
            fuel_pulse_us: self.last_fuel_pulse_us,
            fault_flags: self.ctx.fault_flags,
            skipped_events: self.skipped_events,
        }
    }

    /// Current FSM state.
    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    /// Current active fault bitmask (0 = no faults).
    pub fn fault_flags(&self) -> u8 {
        self.ctx.fault_flags
    }

    /// Crankshaft revolutions observed since startup.
    pub fn revolutions(&self) -> u64 {
        self.revolutions
    }

    /// Events skipped because their angle was past due at arming time.
    pub fn skipped_events(&self) -> u32 {
        self.skipped_events
    }

    /// Sparks delivered (discharge ISR completions).
    pub fn sparks_delivered(&self) -> u32 {
        self.sparks_delivered
    }

    /// Injection pulses completed (stop ISR completions).
    pub fn fuel_pulses_completed(&self) -> u32 {
        self.fuel_pulses_completed
    }

    /// Clone of the live configuration.
    pub fn current_config(&self) -> EcuConfig {
        self.ctx.config.clone()
    }
}
