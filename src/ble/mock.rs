//! Recording [`LinkStack`] used by the unit tests.

use super::{LinkHandle, LinkStack};
use crate::error::LinkError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    StartAdvertising,
    StopAdvertising,
    Notify(LinkHandle, Vec<u8>),
}

#[derive(Default)]
pub struct RecordingStack {
    pub calls: Vec<Call>,
    pub current: Option<LinkHandle>,
    pub fail_advertising: bool,
    pub fail_notify: Option<LinkError>,
}

impl RecordingStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    pub fn notifications(&self) -> Vec<(LinkHandle, &[u8])> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Notify(h, bytes) => Some((*h, bytes.as_slice())),
                _ => None,
            })
            .collect()
    }
}

impl LinkStack for RecordingStack {
    fn start_advertising(&mut self) -> Result<(), LinkError> {
        self.calls.push(Call::StartAdvertising);
        if self.fail_advertising {
            Err(LinkError::AdvertisingFailed)
        } else {
            Ok(())
        }
    }

    fn stop_advertising(&mut self) -> Result<(), LinkError> {
        self.calls.push(Call::StopAdvertising);
        Ok(())
    }

    fn notify(&mut self, handle: LinkHandle, payload: &[u8]) -> Result<(), LinkError> {
        self.calls.push(Call::Notify(handle, payload.to_vec()));
        match self.fail_notify {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn current_handle(&self) -> Option<LinkHandle> {
        self.current
    }
}
