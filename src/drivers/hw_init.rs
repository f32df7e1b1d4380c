//! One-shot hardware peripheral initialization.
//!
//! Configures GPIO directions, the two I2C buses for the ranging sensors,
//! and the LEDC tone channel for the speaker, using raw ESP-IDF sys calls.
//! Called once from `main()` before the control loop starts.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    I2cInitFailed(i32),
    LedcInitFailed,
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::I2cInitFailed(rc) => write!(f, "I2C init failed (rc={})", rc),
            Self::LedcInitFailed => write!(f, "LEDC tone channel config failed"),
        }
    }
}

#[cfg(target_os = "espidf")]
use log::info;

use crate::pins;

/// I2C port carrying the inner ranging sensor.
pub const I2C_PORT_INNER: i32 = 0;
/// I2C port carrying the outer ranging sensor.
pub const I2C_PORT_OUTER: i32 = 1;

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the control loop; single-threaded.
    unsafe {
        init_gpio_inputs()?;
        init_gpio_outputs()?;
        init_i2c()?;
        init_ledc();
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── GPIO Inputs ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_inputs() -> Result<(), HwInitError> {
    // Door contact is a reed switch to ground: pull-up, LOW = closed.
    let door_cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::DOOR_CONTACT_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&door_cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }

    // PIR drives its output actively; no pull needed.
    let pir_cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::PIR_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&pir_cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }

    info!("hw_init: GPIO inputs configured (door, PIR)");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: gpio_get_level is a read-only register access on an
    // already-configured input pin; safe to call from main context.
    (unsafe { gpio_get_level(pin) }) != 0
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(_pin: i32) -> bool {
    true
}

// ── GPIO Outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    let output_pins = [
        pins::LED_GREEN_GPIO,
        pins::LED_YELLOW_GPIO,
        pins::LED_RED_GPIO,
        pins::TOF_INNER_XSHUT_GPIO,
        pins::TOF_OUTER_XSHUT_GPIO,
    ];

    for &pin in &output_pins {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
        unsafe { gpio_set_level(pin, 0) };
    }

    info!("hw_init: GPIO outputs configured");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes to an already-configured output pin;
    // pin was validated during init_gpio_outputs(). Main-loop only.
    unsafe {
        gpio_set_level(pin, if high { 1 } else { 0 });
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}

// ── I2C (one bus per ranging sensor) ──────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_i2c() -> Result<(), HwInitError> {
    let buses = [
        (I2C_PORT_INNER, pins::TOF_INNER_SDA_GPIO, pins::TOF_INNER_SCL_GPIO),
        (I2C_PORT_OUTER, pins::TOF_OUTER_SDA_GPIO, pins::TOF_OUTER_SCL_GPIO),
    ];

    for &(port, sda, scl) in &buses {
        let mut cfg = i2c_config_t {
            mode: i2c_mode_t_I2C_MODE_MASTER,
            sda_io_num: sda,
            scl_io_num: scl,
            sda_pullup_en: true,
            scl_pullup_en: true,
            ..Default::default()
        };
        cfg.__bindgen_anon_1.master.clk_speed = pins::TOF_I2C_FREQ_HZ;

        let ret = unsafe { i2c_param_config(port, &cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::I2cInitFailed(ret));
        }
        let ret = unsafe { i2c_driver_install(port, i2c_mode_t_I2C_MODE_MASTER, 0, 0, 0) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::I2cInitFailed(ret));
        }
    }

    info!("hw_init: I2C buses configured (inner=port0, outer=port1)");
    Ok(())
}

/// Write `data` to an 8-bit register on the given bus.
#[cfg(target_os = "espidf")]
pub fn i2c_write_reg(port: i32, addr: u8, reg: u8, data: u8) -> bool {
    let buf = [reg, data];
    // SAFETY: the I2C driver for `port` was installed in init_i2c();
    // transactions from the single main task are race-free.
    let ret = unsafe {
        i2c_master_write_to_device(port, addr, buf.as_ptr(), buf.len(), 100)
    };
    ret == ESP_OK as i32
}

#[cfg(not(target_os = "espidf"))]
pub fn i2c_write_reg(_port: i32, _addr: u8, _reg: u8, _data: u8) -> bool {
    true
}

/// Read `out.len()` bytes starting at an 8-bit register.
#[cfg(target_os = "espidf")]
pub fn i2c_read_reg(port: i32, addr: u8, reg: u8, out: &mut [u8]) -> bool {
    // SAFETY: see i2c_write_reg; out is a valid caller-owned buffer.
    let ret = unsafe {
        i2c_master_write_read_device(
            port,
            addr,
            &reg,
            1,
            out.as_mut_ptr(),
            out.len(),
            100,
        )
    };
    ret == ESP_OK as i32
}

#[cfg(not(target_os = "espidf"))]
pub fn i2c_read_reg(_port: i32, _addr: u8, _reg: u8, _out: &mut [u8]) -> bool {
    false
}

// ── LEDC tone channel (speaker) ───────────────────────────────

pub const LEDC_CH_SPEAKER: u32 = 0;

#[cfg(target_os = "espidf")]
unsafe fn init_ledc() {
    // Timer 0: speaker tone, frequency re-programmed per note (8-bit duty).
    // SAFETY: Called from single main-task context via init_peripherals().
    let timer0 = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: ledc_timer_t_LEDC_TIMER_0,
        duty_resolution: ledc_timer_bit_t_LEDC_TIMER_8_BIT,
        freq_hz: 1000,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    unsafe {
        ledc_timer_config(&timer0);
    }

    unsafe {
        ledc_channel_config(&ledc_channel_config_t {
            speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
            channel: ledc_channel_t_LEDC_CHANNEL_0,
            timer_sel: ledc_timer_t_LEDC_TIMER_0,
            gpio_num: pins::SPEAKER_GPIO,
            duty: 0,
            hpoint: 0,
            ..Default::default()
        });
    }

    info!("hw_init: LEDC configured (speaker=CH0)");
}

/// Start a square-wave tone at `freq_hz` on the speaker channel.
#[cfg(target_os = "espidf")]
pub fn tone_start(freq_hz: u32) {
    // SAFETY: timer/channel were configured in init_ledc(); main-loop only.
    unsafe {
        ledc_set_freq(
            ledc_mode_t_LEDC_LOW_SPEED_MODE,
            ledc_timer_t_LEDC_TIMER_0,
            freq_hz,
        );
        ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, LEDC_CH_SPEAKER, 128);
        ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, LEDC_CH_SPEAKER);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn tone_start(_freq_hz: u32) {}

/// Silence the speaker channel.
#[cfg(target_os = "espidf")]
pub fn tone_stop() {
    // SAFETY: see tone_start.
    unsafe {
        ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, LEDC_CH_SPEAKER, 0);
        ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, LEDC_CH_SPEAKER);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn tone_stop() {}
