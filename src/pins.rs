//! GPIO / ADC channel assignments for the ECU main board.
//!
//! Single source of truth — every driver references this module rather
//! than hard-coding pin numbers. Change a pin here and it propagates
//! everywhere.

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// Ignition coil driver gate (active HIGH while the coil charges).
pub const SPARK_GPIO: i32 = 4;
/// Injector driver gate (active HIGH while the injector is open).
pub const FUEL_GPIO: i32 = 5;

// ---------------------------------------------------------------------------
// Digital inputs
// ---------------------------------------------------------------------------

/// Crankshaft tach pickup, one falling edge per revolution.
pub const TACH_GPIO: i32 = 6;
/// Operator killswitch. HIGH = run permitted, LOW = silence everything.
pub const KILLSWITCH_GPIO: i32 = 7;

// ---------------------------------------------------------------------------
// SPI bus to the MCP3304 ADC
// ---------------------------------------------------------------------------

pub const SPI_SCLK_GPIO: i32 = 12;
pub const SPI_MOSI_GPIO: i32 = 11;
pub const SPI_MISO_GPIO: i32 = 13;
pub const ADC_CS_GPIO: i32 = 10;

/// SPI clock for the MCP3304 (datasheet ceiling at 5 V is 2.1 MHz).
pub const ADC_SPI_HZ: u32 = 2_000_000;

// ---------------------------------------------------------------------------
// ADC channel map (MCP3304 single-ended)
// ---------------------------------------------------------------------------

/// Manifold absolute pressure sensor.
pub const ADC_CH_MAP: u8 = 0;
/// Throttle position potentiometer.
pub const ADC_CH_TPS: u8 = 1;
/// Intake air temperature thermistor.
pub const ADC_CH_IAT: u8 = 2;
/// Engine (cylinder head) temperature thermistor.
pub const ADC_CH_ECT: u8 = 3;
/// Wideband O₂ controller analog output.
pub const ADC_CH_O2: u8 = 4;

// ---------------------------------------------------------------------------
// Serial diagnostics
// ---------------------------------------------------------------------------

/// Diagnostic console baud rate.
pub const DIAG_BAUD: u32 = 115_200;
