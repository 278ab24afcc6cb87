//! Interrupt-to-main-loop event notifications.
//!
//! Events are produced by:
//! - the tach edge ISR (one per crankshaft revolution)
//! - the killswitch edge ISR
//! - the spark/fuel timer ISRs (pulse-complete notifications)
//!
//! The main loop drains them one at a time each iteration. The tach edge
//! is the important one: it forces the mode machine into CALIBRATION,
//! the authoritative synchronisation point for the revolution.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Tach ISR    │────▶│              │     │              │
//! │ Kill ISR    │────▶│  Event Queue │────▶│  Main Loop   │
//! │ Timer ISRs  │────▶│  (lock-free) │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```

use core::sync::atomic::{AtomicU8, Ordering};

/// Maximum number of pending events.
/// Power of 2 for efficient ring buffer modulo.
const EVENT_QUEUE_CAP: usize = 32;

/// System event types, ordered by rough priority.
/// Lower discriminant = higher priority when multiple events are pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Event {
    // ── Safety-critical ───────────────────────────────────
    /// Killswitch level changed (new level is in the supervisor latch).
    KillswitchChanged = 0,

    // ── Crankshaft sync ───────────────────────────────────
    /// Tach calibration edge: kinematics updated, CALIBRATION is forced.
    TachEdge = 1,

    // ── Output pipelines ──────────────────────────────────
    /// Spark discharge completed (coil fired).
    SparkFired = 10,
    /// Injection pulse completed (injector closed).
    FuelPulseEnded = 11,
}

// ── Lock-free SPSC ring buffer ────────────────────────────────
//
// ISRs write (produce), main loop reads (consume).
// Uses atomic head/tail indices. The buffer lives in a static so ISR
// handlers can reach it without captures.

static EVENT_HEAD: AtomicU8 = AtomicU8::new(0);
static EVENT_TAIL: AtomicU8 = AtomicU8::new(0);
// SAFETY: each slot is written by the single producer side (ISR context)
// strictly before the head index is released, and read by the single
// consumer (main loop) strictly after acquiring it. The atomics enforce
// the SPSC discipline; no slot is ever accessed concurrently.
static mut EVENT_BUFFER: [u8; EVENT_QUEUE_CAP] = [0; EVENT_QUEUE_CAP];

/// Push an event into the queue.
/// Safe to call from ISR context (lock-free).
/// Returns `false` if the queue is full (event dropped).
pub fn push_event(event: Event) -> bool {
    let head = EVENT_HEAD.load(Ordering::Relaxed);
    let tail = EVENT_TAIL.load(Ordering::Acquire);
    let next_head = (head + 1) % EVENT_QUEUE_CAP as u8;

    if next_head == tail {
        return false; // Queue full — drop event.
    }

    // SAFETY: single producer; the slot at `head` is not visible to the
    // consumer until the Release store below.
    unsafe {
        EVENT_BUFFER[head as usize] = event as u8;
    }

    EVENT_HEAD.store(next_head, Ordering::Release);
    true
}

/// Pop the next event from the queue.
/// Called from the main loop (single consumer).
/// Returns `None` if the queue is empty.
pub fn pop_event() -> Option<Event> {
    let tail = EVENT_TAIL.load(Ordering::Relaxed);
    let head = EVENT_HEAD.load(Ordering::Acquire);

    if tail == head {
        return None; // Empty.
    }

    // SAFETY: single consumer; the producer released this slot when it
    // advanced the head past it.
    let raw = unsafe { EVENT_BUFFER[tail as usize] };
    EVENT_TAIL.store((tail + 1) % EVENT_QUEUE_CAP as u8, Ordering::Release);

    event_from_u8(raw)
}

/// Drain all pending events into a callback, FIFO order.
pub fn drain_events(mut handler: impl FnMut(Event)) {
    while let Some(event) = pop_event() {
        handler(event);
    }
}

/// Check if the event queue is empty.
pub fn queue_is_empty() -> bool {
    let tail = EVENT_TAIL.load(Ordering::Relaxed);
    let head = EVENT_HEAD.load(Ordering::Acquire);
    tail == head
}

/// Number of pending events.
pub fn queue_len() -> usize {
    let head = EVENT_HEAD.load(Ordering::Relaxed) as usize;
    let tail = EVENT_TAIL.load(Ordering::Relaxed) as usize;
    (head + EVENT_QUEUE_CAP - tail) % EVENT_QUEUE_CAP
}

// ── Internal ──────────────────────────────────────────────────

fn event_from_u8(raw: u8) -> Option<Event> {
    match raw {
        0 => Some(Event::KillswitchChanged),
        1 => Some(Event::TachEdge),
        10 => Some(Event::SparkFired),
        11 => Some(Event::FuelPulseEnded),
        _ => None,
    }
}
