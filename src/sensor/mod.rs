//! Spectral sensor subsystem.
//!
//! The rest of the firmware only sees the [`SensorSource`] trait: a readiness
//! check and a calibrated read returning one [`SpectralSample`]. The AS7265x
//! triad driver in [`as7265x`] is the production implementation.

pub mod as7265x;

use crate::error::SensorError;

/// Number of spectral channels in every sample.
pub const CHANNEL_COUNT: usize = 18;

/// Channel identifiers, in wavelength order (410 nm for A up to 940 nm for L).
///
/// A-F come from the AS72653 (UV), G/H/I/J/K/L from the AS72652 (visible)
/// and R-W from the AS72651 (NIR).
pub const CHANNEL_TAGS: [char; CHANNEL_COUNT] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'R', 'I', 'S', 'J', 'T', 'U', 'V', 'W', 'K', 'L',
];

/// One set of calibrated readings, one value per channel in wavelength order.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpectralSample {
    values: [f32; CHANNEL_COUNT],
}

impl SpectralSample {
    pub const fn new(values: [f32; CHANNEL_COUNT]) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f32; CHANNEL_COUNT] {
        &self.values
    }

    /// Iterate `(tag, value)` pairs in channel order.
    pub fn channels(&self) -> impl Iterator<Item = (char, f32)> + '_ {
        CHANNEL_TAGS.iter().copied().zip(self.values.iter().copied())
    }
}

/// A source of spectral samples.
///
/// Both operations must complete in bounded time: the scheduler calls them
/// from the single application loop.
pub trait SensorSource {
    /// Whether a fresh measurement is waiting to be read.
    fn is_ready(&mut self) -> bool;

    /// Read the calibrated value of every channel.
    fn read_calibrated(&mut self) -> Result<SpectralSample, SensorError>;
}
