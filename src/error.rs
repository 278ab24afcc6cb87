#![allow(dead_code)] // Driver-facing variants are only constructed on the espidf target

//! Unified error types for the ECU firmware.
//!
//! The runtime control path has no recoverable-error domain — sensor and
//! table lookups saturate, past-due events are skipped — so `Result` only
//! appears at the init and configuration boundary. All variants are `Copy`
//! so they can move through the supervisor and FSM without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A sensor channel could not be read.
    Sensor(SensorError),
    /// A hardware timer could not be armed or created.
    Timer(TimerError),
    /// A safety interlock condition.
    Safety(SafetyFault),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be applied.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Timer(e) => write!(f, "timer: {e}"),
            Self::Safety(e) => write!(f, "safety: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// SPI transaction with the ADC failed.
    AdcReadFailed,
    /// Requested channel outside the MCP3304's 0..=7 range.
    ChannelOutOfRange,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdcReadFailed => write!(f, "ADC read failed"),
            Self::ChannelOutOfRange => write!(f, "ADC channel out of range"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Timer errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// Timer handle creation failed at init.
    CreateFailed,
    /// One-shot arm rejected by the platform.
    ArmFailed,
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateFailed => write!(f, "timer create failed"),
            Self::ArmFailed => write!(f, "timer arm failed"),
        }
    }
}

impl From<TimerError> for Error {
    fn from(e: TimerError) -> Self {
        Self::Timer(e)
    }
}

// ---------------------------------------------------------------------------
// Safety faults
// ---------------------------------------------------------------------------

/// Safety faults gate the CRANKING/RUNNING regimes and suppress all timer
/// arming. They are accumulated in a bitfield by the safety supervisor so
/// simultaneous faults can be tracked and individually cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SafetyFault {
    /// Killswitch input reads open — operator demands silence.
    KillswitchOpen = 0b0000_0001,
    /// Crankshaft speed reached the upper rev limit; clears below the
    /// lower limit (hysteresis).
    Overspeed = 0b0000_0010,
}

impl SafetyFault {
    /// Return the bitmask for this fault.
    pub const fn mask(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for SafetyFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KillswitchOpen => write!(f, "killswitch open"),
            Self::Overspeed => write!(f, "overspeed"),
        }
    }
}

impl From<SafetyFault> for Error {
    fn from(e: SafetyFault) -> Self {
        Self::Safety(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
