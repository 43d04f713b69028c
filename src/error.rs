//! Unified error types for spectral-ble.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` for efficient on-target logging.

/// Top-level error type, surfaced only during bring-up.
///
/// Either variant is fatal: the firmware blinks its status LED instead of
/// sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The BLE stack rejected an operation.
    Link(LinkError),
    /// The spectral sensor could not be reached or configured.
    Sensor(SensorError),
}

/// Errors reported by the link-layer stack boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// Advertising could not be started.
    AdvertisingFailed,
    /// The GATT server could not be registered with the stack.
    ServiceRegistration,
    /// No TX buffer available for the notification.
    NoResources,
    /// The link referenced by the operation no longer exists.
    Disconnected,
    /// Payload larger than the characteristic can hold.
    PayloadTooLarge,
    /// Raw error code from the SoftDevice.
    Raw(u32),
}

/// Errors reported by the AS7265x driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// I²C transaction failed.
    Bus,
    /// Status bit did not settle within `SENSOR_POLL_ATTEMPTS`.
    Timeout,
    /// Device type register holds an unexpected value.
    UnknownDevice(u8),
    /// The visible and/or UV slave devices did not answer.
    MissingSlaves,
}

// Convenience conversions

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Error::Link(e)
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Error::Sensor(e)
    }
}

#[cfg(feature = "embedded")]
impl From<nrf_softdevice::ble::gatt_server::NotifyValueError> for LinkError {
    fn from(e: nrf_softdevice::ble::gatt_server::NotifyValueError) -> Self {
        use nrf_softdevice::ble::gatt_server::NotifyValueError;
        use nrf_softdevice::RawError;

        match e {
            NotifyValueError::Disconnected => LinkError::Disconnected,
            NotifyValueError::Raw(RawError::Resources) => LinkError::NoResources,
            NotifyValueError::Raw(raw) => LinkError::Raw(raw as u32),
        }
    }
}
