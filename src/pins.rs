//! GPIO / peripheral pin assignments for the DoorSense main board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Time-of-flight ranging sensors (VL53L0X, one per doorway side)
// ---------------------------------------------------------------------------
//
// Each sensor lives on its own I2C bus so both can keep the default 0x29
// address; XSHUT lets a sensor be shut down and woken without re-init.

/// Inner sensor (toward the monitored interior) — XSHUT, active HIGH.
pub const TOF_INNER_XSHUT_GPIO: i32 = 1;
/// Inner sensor I2C data.
pub const TOF_INNER_SDA_GPIO: i32 = 2;
/// Inner sensor I2C clock.
pub const TOF_INNER_SCL_GPIO: i32 = 3;

/// Outer sensor (toward the exterior) — XSHUT, active HIGH.
pub const TOF_OUTER_XSHUT_GPIO: i32 = 4;
/// Outer sensor I2C data.
pub const TOF_OUTER_SDA_GPIO: i32 = 5;
/// Outer sensor I2C clock.
pub const TOF_OUTER_SCL_GPIO: i32 = 6;

/// I2C bus clock rate for both ToF buses (VL53L0X maximum is 400 kHz).
pub const TOF_I2C_FREQ_HZ: u32 = 400_000;

// ---------------------------------------------------------------------------
// Presence inputs — digital
// ---------------------------------------------------------------------------

/// Reed-switch door contact, active LOW with internal pull-up
/// (magnet present = door closed = contact closed = level LOW).
pub const DOOR_CONTACT_GPIO: i32 = 7;

/// HC-SR501 PIR motion sensor — HIGH while motion is detected.
pub const PIR_GPIO: i32 = 8;

// ---------------------------------------------------------------------------
// Status LEDs (discrete, active HIGH)
// ---------------------------------------------------------------------------

pub const LED_GREEN_GPIO: i32 = 11;
pub const LED_YELLOW_GPIO: i32 = 12;
pub const LED_RED_GPIO: i32 = 13;

// ---------------------------------------------------------------------------
// Piezo speaker (LEDC square-wave tone)
// ---------------------------------------------------------------------------

pub const SPEAKER_GPIO: i32 = 14;

// ---------------------------------------------------------------------------
// UART debug
// ---------------------------------------------------------------------------

pub const UART_TX_GPIO: i32 = 17;
pub const UART_RX_GPIO: i32 = 18;
