//! Event dispatcher - routes link-layer events to the session and carries
//! out the effects the session returns.
//!
//! Events are handled one at a time in arrival order; nothing is buffered
//! or reordered here.

use super::advertising;
use super::session::{Effect, LinkSession};
use super::{LinkEvent, LinkStack};

/// Route one event. Stack-ready, connect, MTU, subscription and disconnect
/// events all go through [`LinkSession::apply`]; a requested
/// [`Effect::StartAdvertising`] is handed to the advertising controller.
pub fn dispatch<L: LinkStack>(event: LinkEvent, session: &mut LinkSession, stack: &mut L) {
    let effects = session.apply(event);
    for effect in effects.iter() {
        match effect {
            Effect::StartAdvertising => {
                advertising::start(session, stack);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::mock::{Call, RecordingStack};
    use crate::ble::session::LinkState;

    const H: u16 = 0x0040;

    fn ready() -> LinkEvent {
        LinkEvent::StackState { operational: true }
    }

    #[test]
    fn stack_ready_starts_advertising_exactly_once() {
        let mut session = LinkSession::new();
        let mut stack = RecordingStack::new();

        dispatch(ready(), &mut session, &mut stack);
        dispatch(ready(), &mut session, &mut stack);
        dispatch(ready(), &mut session, &mut stack);

        assert_eq!(session.state(), LinkState::Advertising);
        assert_eq!(stack.count(&Call::StartAdvertising), 1);
    }

    #[test]
    fn stack_down_does_not_advertise() {
        let mut session = LinkSession::new();
        let mut stack = RecordingStack::new();
        dispatch(
            LinkEvent::StackState { operational: false },
            &mut session,
            &mut stack,
        );
        assert_eq!(session.state(), LinkState::Idle);
        assert!(stack.calls.is_empty());
    }

    #[test]
    fn connect_and_mtu_are_forwarded() {
        let mut session = LinkSession::new();
        let mut stack = RecordingStack::new();

        dispatch(ready(), &mut session, &mut stack);
        dispatch(LinkEvent::Connected { handle: H }, &mut session, &mut stack);
        assert_eq!(session.state(), LinkState::Connected);
        assert_eq!(session.handle(), Some(H));
        assert!(!session.notifications_enabled());

        dispatch(
            LinkEvent::MtuExchanged { handle: H, mtu: 50 },
            &mut session,
            &mut stack,
        );
        assert_eq!(session.state(), LinkState::MtuNegotiated);
        assert_eq!(session.transfer_unit(), 50);
    }

    #[test]
    fn disconnect_readvertises() {
        let mut session = LinkSession::new();
        let mut stack = RecordingStack::new();

        dispatch(ready(), &mut session, &mut stack);
        dispatch(LinkEvent::Connected { handle: H }, &mut session, &mut stack);
        dispatch(
            LinkEvent::MtuExchanged { handle: H, mtu: 100 },
            &mut session,
            &mut stack,
        );
        stack.calls.clear();

        dispatch(LinkEvent::Disconnected { handle: H }, &mut session, &mut stack);

        assert_eq!(stack.calls, vec![Call::StartAdvertising]);
        assert_eq!(session.state(), LinkState::Advertising);
        assert_eq!(session.handle(), None);
        assert!(!session.notifications_enabled());
    }

    #[test]
    fn failed_readvertise_leaves_session_idle() {
        let mut session = LinkSession::new();
        let mut stack = RecordingStack::new();

        dispatch(ready(), &mut session, &mut stack);
        dispatch(LinkEvent::Connected { handle: H }, &mut session, &mut stack);
        stack.fail_advertising = true;
        dispatch(LinkEvent::Disconnected { handle: H }, &mut session, &mut stack);

        assert_eq!(session.state(), LinkState::Idle);
        assert_eq!(session.handle(), None);

        stack.fail_advertising = false;
        dispatch(ready(), &mut session, &mut stack);
        assert_eq!(session.state(), LinkState::Advertising);
    }

    #[test]
    fn subscription_burst_matches_its_last_write() {
        let mut burst = LinkSession::new();
        let mut latest = LinkSession::new();
        let mut stack = RecordingStack::new();

        for session in [&mut burst, &mut latest] {
            dispatch(ready(), session, &mut stack);
            dispatch(LinkEvent::Connected { handle: H }, session, &mut stack);
        }
        for enabled in [true, false, true] {
            let event = LinkEvent::SubscriptionChanged { handle: H, enabled };
            dispatch(event, &mut burst, &mut stack);
        }
        let event = LinkEvent::SubscriptionChanged {
            handle: H,
            enabled: true,
        };
        dispatch(event, &mut latest, &mut stack);

        assert_eq!(burst, latest);
        assert!(burst.notifications_enabled());
    }
}
