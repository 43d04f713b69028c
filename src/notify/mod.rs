//! Notification pipeline - turns a sample into a notification on the
//! subscribed link, or drops it.
//!
//! Dropping is the normal case while nobody is subscribed. A notify failure
//! is logged and the sample is lost; the next scheduled sample supersedes it.

pub mod payload;


use crate::ble::session::LinkSession;
use crate::ble::LinkStack;
use crate::error::LinkError;
use crate::sensor::{SpectralSample, CHANNEL_COUNT};
use payload::{format_payload, payload_limit};

/// What happened to one sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PublishOutcome {
    /// Handed to the stack.
    Sent { len: usize, channels: usize },
    /// Linked, but the client has not enabled notifications.
    NotSubscribed,
    /// No link, or the stack already dropped it.
    NoLink,
    /// Not even one channel fits the link's transfer unit.
    NothingFits,
    /// The stack refused the notification.
    Failed(LinkError),
}

/// Publish `sample` on the session's link if a client is subscribed.
pub fn publish<L: LinkStack>(
    session: &LinkSession,
    sample: &SpectralSample,
    stack: &mut L,
) -> PublishOutcome {
    let Some(handle) = session.handle() else {
        return PublishOutcome::NoLink;
    };
    let Some(handle) = session.notify_target() else {
        debug!("link {}: no subscriber, sample discarded", handle);
        return PublishOutcome::NotSubscribed;
    };
    // Termination reached the stack before its event reached us.
    if stack.current_handle() != Some(handle) {
        debug!("link {} no longer known to the stack", handle);
        return PublishOutcome::NoLink;
    }

    let payload = format_payload(sample, payload_limit(session.transfer_unit()));
    if payload.is_empty() {
        warn!(
            "link {}: no channel fits transfer unit {}, sample dropped",
            handle,
            session.transfer_unit()
        );
        return PublishOutcome::NothingFits;
    }
    if !payload.is_full() {
        warn!(
            "payload reduced to {}/{} channels at {} decimals (transfer unit {})",
            payload.channels(),
            CHANNEL_COUNT,
            payload.precision(),
            session.transfer_unit()
        );
    }

    info!(
        "notify link {}: {} bytes, raw {}",
        handle,
        payload.len(),
        sample.values()
    );
    match stack.notify(handle, payload.as_bytes()) {
        Ok(()) => PublishOutcome::Sent {
            len: payload.len(),
            channels: payload.channels(),
        },
        Err(e) => {
            warn!("notify on link {} failed: {}, sample dropped", handle, e);
            PublishOutcome::Failed(e)
        }
    }
}
