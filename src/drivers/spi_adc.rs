//! MCP3304 13-bit SPI ADC driver, single-ended mode.
//!
//! The chip takes two command bytes:
//!
//! ```text
//!     X,X,X,X,(Start),(Single),(Ch2),(Ch1)     then     (Ch0),X,X,X,X,X,X,X
//! ```
//!
//! and answers with `X,X,X,(sign),D11..D8` then `D7..D0`. Single-ended
//! sampling can never go negative, so the sign bit is ignored and the
//! usable result is 12 bits. Bus: 2 MHz, SPI mode 0, MSB first.
//!
//! The frame building and parsing are pure functions so the protocol is
//! testable on the host; only the bus transaction is ESP-IDF-specific.

use crate::app::ports::AdcPort;

/// Command bytes for a single-ended conversion on `channel` (0..=7).
/// Third byte clocks out the low half of the result.
pub fn command_bytes(channel: u8) -> [u8; 3] {
    let ch = channel & 0x07;
    [0b0000_1100 | (ch >> 1), ch << 7, 0x00]
}

/// Extract the 12-bit count from the two response bytes that arrive
/// while the second and third command bytes shift out.
pub fn parse_response(byte_ms: u8, byte_ls: u8) -> u16 {
    (((byte_ms & 0x0F) as u16) << 8) | byte_ls as u16
}

// ---------------------------------------------------------------------------
// ESP-IDF bus transaction
// ---------------------------------------------------------------------------

/// MCP3304 on the board SPI bus.
#[cfg(target_os = "espidf")]
pub struct Mcp3304 {
    device: esp_idf_svc::sys::spi_device_handle_t,
}

#[cfg(target_os = "espidf")]
impl Mcp3304 {
    /// Attach to the bus initialised by `hw_init::init_peripherals`.
    pub fn new(device: esp_idf_svc::sys::spi_device_handle_t) -> Self {
        Self { device }
    }

    fn transfer(&mut self, channel: u8) -> u16 {
        use esp_idf_svc::sys::*;

        let tx = command_bytes(channel);
        let mut rx = [0u8; 3];
        let mut txn: spi_transaction_t = unsafe { core::mem::zeroed() };
        txn.length = 24; // bits
        txn.__bindgen_anon_1.tx_buffer = tx.as_ptr() as *const core::ffi::c_void;
        txn.__bindgen_anon_2.rx_buffer = rx.as_mut_ptr() as *mut core::ffi::c_void;

        // SAFETY: the device handle is valid for the firmware lifetime
        // and this is the only code path issuing transactions on it.
        let ret = unsafe { spi_device_transmit(self.device, &mut txn) };
        if ret != ESP_OK {
            log::error!("spi_adc: transmit failed (rc={ret}), returning 0");
            return 0;
        }
        parse_response(rx[1], rx[2])
    }
}

#[cfg(target_os = "espidf")]
impl AdcPort for Mcp3304 {
    fn read_adc(&mut self, channel: u8) -> u16 {
        self.transfer(channel)
    }
}

// ---------------------------------------------------------------------------
// Host simulation
// ---------------------------------------------------------------------------

/// In-memory ADC for host builds: channels are plain settable counts.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
pub struct SimAdc {
    channels: [u16; 8],
}

#[cfg(not(target_os = "espidf"))]
impl SimAdc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_channel(&mut self, channel: u8, count: u16) {
        self.channels[channel as usize & 0x07] = count.min(4095);
    }
}

#[cfg(not(target_os = "espidf"))]
impl AdcPort for SimAdc {
    fn read_adc(&mut self, channel: u8) -> u16 {
        self.channels[channel as usize & 0x07]
    }
}
