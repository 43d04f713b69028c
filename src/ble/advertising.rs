//! Advertising controller.
//!
//! Both operations are idempotent: they only reach the stack when the
//! session is in the state they leave.

use super::session::{LinkSession, LinkState};
use super::LinkStack;

/// Make the peripheral discoverable. No-op unless the session is `Idle`.
///
/// Returns `true` if advertising was started by this call. When the stack
/// refuses, the session stays `Idle` and only another stack-ready event
/// starts it again.
pub fn start<L: LinkStack>(session: &mut LinkSession, stack: &mut L) -> bool {
    if session.state() != LinkState::Idle {
        return false;
    }
    match stack.start_advertising() {
        Ok(()) => {
            session.enter_advertising();
            info!("advertising started");
            true
        }
        Err(e) => {
            error!("advertising start failed: {}, device not discoverable", e);
            false
        }
    }
}

/// Stop advertising. No-op unless the session is `Advertising`.
pub fn stop<L: LinkStack>(session: &mut LinkSession, stack: &mut L) -> bool {
    if session.state() != LinkState::Advertising {
        return false;
    }
    if let Err(e) = stack.stop_advertising() {
        warn!("advertising stop failed: {}", e);
    }
    session.leave_advertising();
    info!("advertising stopped");
    true
}
