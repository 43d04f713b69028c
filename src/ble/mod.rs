//! Bluetooth Low Energy subsystem.
//!
//! This module drives a single link in **Peripheral** role:
//!
//! 1. **Session** - the link state machine (`Idle → Advertising →
//!    Connected → MtuNegotiated → Idle`), written as a pure transition
//!    function so it can be tested without a radio.
//! 2. **Advertising** - idempotent start/stop of discoverability.
//! 3. **Dispatcher** - routes stack events to the session and carries out
//!    the side effects the session asks for.
//! 4. **SoftDevice** (embedded only) - the GATT server, the peripheral
//!    task and the [`LinkStack`] implementation over nrf-softdevice.
//!
//! Communication between the SoftDevice task and the application loop is
//! done via an Embassy channel of [`LinkEvent`]s.

pub mod advertising;
pub mod dispatcher;
pub mod session;
#[cfg(feature = "embedded")]
pub mod softdevice;

#[cfg(test)]
pub(crate) mod mock;

use crate::error::LinkError;

/// Opaque connection identifier assigned by the stack.
pub type LinkHandle = u16;

/// Events delivered by the link-layer stack, in arrival order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkEvent {
    /// The host stack changed operational state.
    StackState { operational: bool },
    /// A central connected.
    Connected { handle: LinkHandle },
    /// The ATT MTU exchange completed.
    MtuExchanged { handle: LinkHandle, mtu: u16 },
    /// The client wrote the notification CCCD.
    SubscriptionChanged { handle: LinkHandle, enabled: bool },
    /// The link was terminated.
    Disconnected { handle: LinkHandle },
}

/// The operations this firmware needs from the link-layer stack.
pub trait LinkStack {
    /// Make the peripheral discoverable and connectable.
    fn start_advertising(&mut self) -> Result<(), LinkError>;

    /// Stop advertising.
    fn stop_advertising(&mut self) -> Result<(), LinkError>;

    /// Push `payload` to the client on `handle` as an unacknowledged
    /// notification.
    fn notify(&mut self, handle: LinkHandle, payload: &[u8]) -> Result<(), LinkError>;

    /// Handle of the link the stack currently considers up.
    fn current_handle(&self) -> Option<LinkHandle>;
}
