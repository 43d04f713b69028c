//! Sample scheduler - the firing logic of the periodic sampling timer.
//!
//! The timer itself belongs to the runtime: the application loop waits for
//! [`SampleScheduler::period`] after each firing, so a slow firing delays the
//! next one but never causes two back to back.

use core::time::Duration;

use crate::ble::session::LinkSession;
use crate::ble::LinkStack;
use crate::config::SAMPLE_PERIOD_MS;
use crate::notify::{self, PublishOutcome};
use crate::sensor::SensorSource;

/// Owns the sensor and forwards one sample per firing to the pipeline.
pub struct SampleScheduler<S> {
    source: S,
    fired: u32,
}

impl<S: SensorSource> SampleScheduler<S> {
    /// Wrap an already initialised sensor.
    pub fn new(source: S) -> Self {
        Self { source, fired: 0 }
    }

    /// Delay between the end of one firing and the next.
    pub const fn period(&self) -> Duration {
        Duration::from_millis(SAMPLE_PERIOD_MS)
    }

    /// Number of firings so far.
    pub fn fired(&self) -> u32 {
        self.fired
    }

    #[cfg(test)]
    pub(crate) fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Run one firing. Returns `None` when no sample was taken (sensor not
    /// ready or read failed).
    pub fn fire<L: LinkStack>(
        &mut self,
        session: &LinkSession,
        stack: &mut L,
    ) -> Option<PublishOutcome> {
        self.fired = self.fired.wrapping_add(1);

        if !self.source.is_ready() {
            return None;
        }
        let sample = match self.source.read_calibrated() {
            Ok(sample) => sample,
            Err(e) => {
                warn!("sensor read failed: {}", e);
                return None;
            }
        };

        let v = sample.values();
        debug!("sample {}: {} {} {} ...", self.fired, v[0], v[1], v[2]);

        Some(notify::publish(session, &sample, stack))
    }
}
