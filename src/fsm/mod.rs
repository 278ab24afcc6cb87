//! Function-pointer finite state machine engine.
//!
//! Classic embedded FSM pattern:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  StateTable                                                │
//! │  ┌─────────────┬───────────┬──────────┬──────────────────┐ │
//! │  │ StateId     │ on_enter  │ on_exit  │ on_update        │ │
//! │  ├─────────────┼───────────┼──────────┼──────────────────┤ │
//! │  │ ReadSensors │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option  │ │
//! │  │ Calibration │ …         │ …        │ …                │ │
//! │  │ Cranking    │ …         │ …        │ …                │ │
//! │  │ Running     │ …         │ …        │ …                │ │
//! │  │ RevLimiter  │ …         │ …        │ …                │ │
//! │  │ SerialOut   │ …         │ …        │ …                │ │
//! │  └─────────────┴───────────┴──────────┴──────────────────┘ │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each pass the engine calls `on_update` for the **current** state; a
//! `Some(next)` return runs `on_exit` → `on_enter` and moves the pointer.
//! The tach edge preempts this flow through [`Fsm::force_transition`]:
//! every calibration pulse unconditionally lands the machine in
//! `Calibration`, whatever the main loop was doing. That entry is the
//! authoritative synchronisation point for the revolution.

pub mod context;
pub mod states;

use context::EcuContext;
use log::{debug, info};

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Enumeration of all operating regimes.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    ReadSensors = 0,
    Calibration = 1,
    Cranking = 2,
    Running = 3,
    RevLimiter = 4,
    SerialOut = 5,
}

impl StateId {
    /// Total number of states — used to size the table array.
    pub const COUNT: usize = 6;

    /// Convert a `u8` index back to `StateId`. Panics on out-of-range in
    /// debug builds; returns `ReadSensors` in release (the quiet state).
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::ReadSensors,
            1 => Self::Calibration,
            2 => Self::Cranking,
            3 => Self::Running,
            4 => Self::RevLimiter,
            5 => Self::SerialOut,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::ReadSensors
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
/// These run exactly once on each state transition.
pub type StateActionFn = fn(&mut EcuContext);

/// Signature for the per-pass update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut EcuContext) -> Option<StateId>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.
/// Stored in a fixed-size array — no heap, no `dyn`.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine.
///
/// Owns the state table and walks it with a mutable [`EcuContext`]
/// threaded through every handler call.
pub struct Fsm {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    /// Index of the currently active state.
    current: usize,
    /// Monotonically increasing pass counter (wraps at u64::MAX).
    tick_count: u64,
    /// Pass at which the current state was entered.
    state_entry_tick: u64,
}

impl Fsm {
    /// Construct a new FSM with the given state table, starting in `initial`.
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        Self {
            table,
            current: initial as usize,
            tick_count: 0,
            state_entry_tick: 0,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut EcuContext) {
        info!("FSM starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance the FSM by one pass.
    ///
    /// 1. Call `on_update` for the current state.
    /// 2. If it returns `Some(next)`, execute the transition:
    ///    `on_exit(current)` → update pointer → `on_enter(next)`.
    pub fn tick(&mut self, ctx: &mut EcuContext) {
        self.tick_count += 1;
        ctx.ticks_in_state = self.tick_count - self.state_entry_tick;
        ctx.total_ticks = self.tick_count;

        let next = (self.table[self.current].on_update)(ctx);

        if let Some(next_id) = next {
            self.transition(next_id, ctx);
        }
    }

    /// Force an immediate transition. The tach edge handler path uses
    /// this to land in `Calibration` regardless of the current state.
    pub fn force_transition(&mut self, next: StateId, ctx: &mut EcuContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    /// The current state's identity.
    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    /// How many passes the FSM has been in the current state.
    pub fn ticks_in_current_state(&self) -> u64 {
        self.tick_count - self.state_entry_tick
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: StateId, ctx: &mut EcuContext) {
        let next_idx = next_id as usize;

        // Debug level only: this fires several times per revolution.
        debug!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        // Exit current state
        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        // Update pointer and timing
        self.current = next_idx;
        self.state_entry_tick = self.tick_count;
        ctx.ticks_in_state = 0;

        // Enter new state
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
