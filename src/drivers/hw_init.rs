//! Peripheral bring-up.
//!
//! Order is a safety invariant, not a style choice:
//!
//! 1. Claim SPARK and FUEL as outputs and drive them LOW.
//! 2. Configure the inputs and the SPI bus.
//! 3. Only then (`init_isr_service`) install the GPIO ISR service and
//!    hook the tach/killswitch handlers.
//!
//! A coil left HIGH across a botched boot cooks itself; an injector left
//! HIGH floods the cylinder. Any failure here is fatal — `main` halts
//! with the outputs already LOW.

use crate::error::Result;

#[cfg(target_os = "espidf")]
mod esp {
    use esp_idf_svc::sys::*;

    use crate::error::{Error, Result};
    use crate::pins;

    fn configure_output(gpio: i32) -> Result<()> {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << gpio,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_ENABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        // SAFETY: plain peripheral configuration calls at boot.
        unsafe {
            if gpio_config(&cfg) != ESP_OK {
                return Err(Error::Init("output gpio_config failed"));
            }
            gpio_set_level(gpio, 0);
        }
        Ok(())
    }

    fn configure_input(gpio: i32, intr: gpio_int_type_t) -> Result<()> {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << gpio,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: intr,
        };
        // SAFETY: as above.
        unsafe {
            if gpio_config(&cfg) != ESP_OK {
                return Err(Error::Init("input gpio_config failed"));
            }
        }
        Ok(())
    }

    /// Claim pins and the ADC bus. Returns the MCP3304 device handle.
    pub fn init_peripherals() -> Result<spi_device_handle_t> {
        // Outputs LOW before anything can interrupt.
        configure_output(pins::SPARK_GPIO)?;
        configure_output(pins::FUEL_GPIO)?;

        configure_input(pins::TACH_GPIO, gpio_int_type_t_GPIO_INTR_NEGEDGE)?;
        configure_input(pins::KILLSWITCH_GPIO, gpio_int_type_t_GPIO_INTR_ANYEDGE)?;

        // SPI bus for the MCP3304: 2 MHz, mode 0, MSB first.
        let bus_cfg = spi_bus_config_t {
            __bindgen_anon_1: spi_bus_config_t__bindgen_ty_1 {
                mosi_io_num: pins::SPI_MOSI_GPIO,
            },
            __bindgen_anon_2: spi_bus_config_t__bindgen_ty_2 {
                miso_io_num: pins::SPI_MISO_GPIO,
            },
            sclk_io_num: pins::SPI_SCLK_GPIO,
            __bindgen_anon_3: spi_bus_config_t__bindgen_ty_3 { quadwp_io_num: -1 },
            __bindgen_anon_4: spi_bus_config_t__bindgen_ty_4 { quadhd_io_num: -1 },
            ..unsafe { core::mem::zeroed() }
        };
        let dev_cfg = spi_device_interface_config_t {
            clock_speed_hz: pins::ADC_SPI_HZ as i32,
            mode: 0,
            spics_io_num: pins::ADC_CS_GPIO,
            queue_size: 1,
            ..unsafe { core::mem::zeroed() }
        };

        let mut device: spi_device_handle_t = core::ptr::null_mut();
        // SAFETY: configuration structs outlive the calls; the device
        // handle lives for the firmware lifetime.
        unsafe {
            if spi_bus_initialize(
                spi_host_device_t_SPI2_HOST,
                &bus_cfg,
                spi_common_dma_t_SPI_DMA_CH_AUTO,
            ) != ESP_OK
            {
                return Err(Error::Init("spi_bus_initialize failed"));
            }
            if spi_bus_add_device(spi_host_device_t_SPI2_HOST, &dev_cfg, &mut device) != ESP_OK {
                return Err(Error::Init("spi_bus_add_device failed"));
            }
        }

        log::info!("hw_init: outputs LOW, inputs configured, ADC bus up");
        Ok(device)
    }

    /// Install the GPIO ISR service and hook the input handlers.
    /// Last step of bring-up; after this the engine can interrupt us.
    pub fn init_isr_service() -> Result<()> {
        // SAFETY: one-time service install at boot.
        unsafe {
            if gpio_install_isr_service(ESP_INTR_FLAG_IRAM as i32) != ESP_OK {
                return Err(Error::Init("gpio_install_isr_service failed"));
            }
        }
        crate::drivers::tach::register()
    }
}

#[cfg(target_os = "espidf")]
pub use esp::{init_isr_service, init_peripherals};

#[cfg(not(target_os = "espidf"))]
pub fn init_isr_service() -> Result<()> {
    log::info!("hw_init(sim): ISR service not installed (host build)");
    Ok(())
}
