//! Application-wide constants and compile-time configuration.
//!
//! All hardware pin assignments, timing parameters, and protocol
//! constants live here so they can be tuned in one place.

// Sampling

/// Period of the sample scheduler (ms). The timer is re-armed after each
/// firing, so the effective period drifts by the firing duration.
pub const SAMPLE_PERIOD_MS: u64 = 1000;

// ATT / GATT

/// ATT MTU every link starts with until an exchange completes.
pub const ATT_MTU_DEFAULT: u16 = 23;

/// Largest ATT MTU the SoftDevice is configured to accept.
pub const ATT_MTU_MAX: u16 = 247;

/// Bytes of every notification PDU not available to the value
/// (1 opcode + 2 attribute handle).
pub const ATT_NOTIFY_OVERHEAD: u16 = 3;

/// Largest value a notification can carry at `ATT_MTU_MAX`.
pub const MAX_PAYLOAD_LEN: usize = (ATT_MTU_MAX - ATT_NOTIFY_OVERHEAD) as usize;

/// Decimal places used for channel values in the notification payload.
pub const VALUE_PRECISION: usize = 1;

// Advertising

/// GAP device name (also sent as complete local name in the scan response).
pub const DEVICE_NAME: &str = "Spectral-BLE";

/// Advertising interval (in 0.625 ms units). 160 = 100 ms.
pub const BLE_ADV_INTERVAL: u32 = 160;

/// Spectral service UUID `5b1e0001-7c3a-4f6e-9d2b-2a1f0c3e8d41`, little-endian
/// as it appears in advertising data.
pub const SPECTRAL_SERVICE_UUID_LE: [u8; 16] = [
    0x41, 0x8d, 0x3e, 0x0c, 0x1f, 0x2a, 0x2b, 0x9d, 0x6e, 0x4f, 0x3a, 0x7c, 0x01, 0x00, 0x1e, 0x5b,
];

/// BLE connection interval range requested after connecting (in 1.25 ms units).
/// 24 = 30 ms, 40 = 50 ms. One notification per second needs nothing faster.
pub const BLE_CONN_INTERVAL_MIN: u16 = 24;
pub const BLE_CONN_INTERVAL_MAX: u16 = 40;

/// BLE slave latency (number of connection events the peripheral can skip).
pub const BLE_SLAVE_LATENCY: u16 = 0;

/// BLE supervision timeout (in 10 ms units). 400 = 4 s.
pub const BLE_SUP_TIMEOUT: u16 = 400;

/// How often a live link is checked for a completed ATT MTU exchange (ms).
pub const MTU_POLL_MS: u64 = 100;

/// Back-off before retrying advertising the stack refused to start (ms).
pub const ADV_RETRY_MS: u64 = 1000;

/// Depth of the SoftDevice → application link-event queue.
pub const LINK_EVENT_QUEUE_DEPTH: usize = 8;

// AS7265x sensor

/// 7-bit I²C address of the AS72651 master device.
pub const SENSOR_I2C_ADDR: u8 = 0x49;

/// Sensor gain setting: 0 = 1x, 1 = 3.7x, 2 = 16x, 3 = 64x.
pub const SENSOR_GAIN: u8 = 3;

/// Integration time in 2.8 ms cycles. 49 cycles ≈ 140 ms per bank.
pub const SENSOR_INTEGRATION_CYCLES: u8 = 49;

/// Maximum number of status-register polls per virtual register access.
pub const SENSOR_POLL_ATTEMPTS: u32 = 40;

/// Delay between two status-register polls (µs).
pub const SENSOR_POLL_DELAY_US: u32 = 5_000;

// GPIO pin assignments (nRF52840-DK defaults)
//
// These are logical names; actual `embassy_nrf::peripherals::*` types are
// selected in `main.rs`.  Adjust for your custom PCB.
//
//   I²C SDA        → P0.26
//   I²C SCL        → P0.27
//   Status LED     → P0.13 (LED1, active-low)

/// Half-period of the fatal-error LED blink (ms).
pub const ERROR_BLINK_MS: u64 = 100;
