//! spectral-ble - BLE peripheral publishing AS7265x spectral readings.
//!
//! Every module except `ble::softdevice` is pure logic that builds and
//! tests on the host (no radio, no sensor required).
//!
//! Usage: `cargo test --lib`
//!
//! Note: The embedded binary (`src/main.rs`) needs the `embedded` feature
//! and an nRF52840 with SoftDevice S140 flashed:
//! `cargo run --release --features embedded`

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod ble;
pub mod config;
pub mod error;
pub mod notify;
pub mod scheduler;
pub mod sensor;

pub use ble::session::{LinkSession, LinkState};
pub use ble::{LinkEvent, LinkHandle, LinkStack};
pub use error::{Error, LinkError, SensorError};
pub use notify::PublishOutcome;
pub use scheduler::SampleScheduler;
pub use sensor::{SensorSource, SpectralSample};

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════
