//! Link session - the connection state tracker.
//!
//! ```text
//!            stack ready            connected(h)          mtu(h, n)
//!   Idle ──────────────▶ Advertising ─────────▶ Connected ─────────▶ MtuNegotiated
//!    ▲      (advertising                             │                     │
//!    │       controller)                             │ disconnected(h)     │
//!    └───────────────────────────────────────────────┴─────────────────────┘
//!                 (emits StartAdvertising, so the device is discoverable again)
//! ```
//!
//! The handle, transfer unit and subscription flag only exist inside the
//! linked phase, so "handle present iff Connected/MtuNegotiated" and
//! "no handle ⇒ notifications off" hold by construction.
//!
//! [`LinkSession::transition`] is pure: it returns the next session and the
//! side effects to perform, and never touches the stack.

use heapless::Vec;

use super::{LinkEvent, LinkHandle};
use crate::config::{ATT_MTU_DEFAULT, ATT_MTU_MAX};

/// Top-level link state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    /// No link, not advertising.
    Idle,
    /// Discoverable, waiting for a central.
    Advertising,
    /// Link up, transfer unit still at the ATT default.
    Connected,
    /// Link up, transfer unit updated by an MTU exchange.
    MtuNegotiated,
}

/// Side effect requested by a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Effect {
    /// Make the peripheral discoverable again.
    StartAdvertising,
}

/// Ordered list of side effects produced by one transition.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Effects(Vec<Effect, 2>);

impl Effects {
    pub const fn none() -> Self {
        Self(Vec::new())
    }

    fn one(effect: Effect) -> Self {
        let mut effects = Vec::new();
        let _ = effects.push(effect);
        Self(effects)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, effect: Effect) -> bool {
        self.0.contains(&effect)
    }

    pub fn iter(&self) -> impl Iterator<Item = Effect> + '_ {
        self.0.iter().copied()
    }
}

/// Result of [`LinkSession::transition`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub next: LinkSession,
    pub effects: Effects,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ActiveLink {
    handle: LinkHandle,
    transfer_unit: u16,
    notifications_enabled: bool,
    negotiated: bool,
}

impl ActiveLink {
    const fn new(handle: LinkHandle) -> Self {
        Self {
            handle,
            transfer_unit: ATT_MTU_DEFAULT,
            // Subscription has to be renewed on every connection.
            notifications_enabled: false,
            negotiated: false,
        }
    }

    /// Undersized exchanges keep the current value; oversized ones are
    /// clamped to what the stack was configured for.
    fn negotiate(&mut self, mtu: u16) {
        self.negotiated = true;
        if mtu >= ATT_MTU_DEFAULT {
            self.transfer_unit = mtu.min(ATT_MTU_MAX);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Advertising,
    Linked(ActiveLink),
}

/// State of the single radio link. Created once at startup in `Idle`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinkSession {
    phase: Phase,
}

impl Default for LinkSession {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkSession {
    pub const fn new() -> Self {
        Self { phase: Phase::Idle }
    }

    pub fn state(&self) -> LinkState {
        match self.phase {
            Phase::Idle => LinkState::Idle,
            Phase::Advertising => LinkState::Advertising,
            Phase::Linked(link) if link.negotiated => LinkState::MtuNegotiated,
            Phase::Linked(_) => LinkState::Connected,
        }
    }

    pub fn handle(&self) -> Option<LinkHandle> {
        match self.phase {
            Phase::Linked(link) => Some(link.handle),
            _ => None,
        }
    }

    /// Negotiated ATT MTU, or the ATT default while no exchange happened.
    pub fn transfer_unit(&self) -> u16 {
        match self.phase {
            Phase::Linked(link) => link.transfer_unit,
            _ => ATT_MTU_DEFAULT,
        }
    }

    pub fn notifications_enabled(&self) -> bool {
        matches!(self.phase, Phase::Linked(link) if link.notifications_enabled)
    }

    /// Handle to notify on, if a client is linked and subscribed.
    pub fn notify_target(&self) -> Option<LinkHandle> {
        match self.phase {
            Phase::Linked(link) if link.notifications_enabled => Some(link.handle),
            _ => None,
        }
    }

    /// Compute the effect of `event` without mutating anything.
    pub fn transition(self, event: LinkEvent) -> Transition {
        let unchanged = Transition {
            next: self,
            effects: Effects::none(),
        };
        let linked = |link| Transition {
            next: LinkSession {
                phase: Phase::Linked(link),
            },
            effects: Effects::none(),
        };

        match (self.phase, event) {
            (Phase::Idle, LinkEvent::StackState { operational: true }) => Transition {
                next: self,
                effects: Effects::one(Effect::StartAdvertising),
            },
            (_, LinkEvent::StackState { .. }) => unchanged,

            (Phase::Idle | Phase::Advertising, LinkEvent::Connected { handle }) => {
                linked(ActiveLink::new(handle))
            }
            (Phase::Linked(link), LinkEvent::Connected { handle }) => {
                warn!(
                    "link {} already up, ignoring connection {}",
                    link.handle, handle
                );
                unchanged
            }

            (Phase::Linked(mut link), LinkEvent::MtuExchanged { handle, mtu })
                if link.handle == handle =>
            {
                link.negotiate(mtu);
                linked(link)
            }
            (Phase::Linked(mut link), LinkEvent::SubscriptionChanged { handle, enabled })
                if link.handle == handle =>
            {
                link.notifications_enabled = enabled;
                linked(link)
            }
            (_, LinkEvent::MtuExchanged { handle, .. })
            | (_, LinkEvent::SubscriptionChanged { handle, .. }) => {
                warn!("event for inactive link {} ignored", handle);
                unchanged
            }

            (Phase::Linked(link), LinkEvent::Disconnected { handle }) if link.handle != handle => {
                warn!(
                    "disconnect of stale link {} ignored (active {})",
                    handle, link.handle
                );
                unchanged
            }
            (_, LinkEvent::Disconnected { .. }) => Transition {
                next: LinkSession::new(),
                effects: Effects::one(Effect::StartAdvertising),
            },
        }
    }

    /// Apply `event` in place and return the effects to carry out.
    pub fn apply(&mut self, event: LinkEvent) -> Effects {
        let before = self.state();
        let Transition { next, effects } = self.transition(event);
        *self = next;

        match event {
            LinkEvent::Connected { handle } if self.handle() == Some(handle) => {
                info!("link {} established", handle)
            }
            LinkEvent::MtuExchanged { handle, mtu } if self.handle() == Some(handle) => {
                info!(
                    "link {}: MTU exchange {} -> transfer unit {}",
                    handle,
                    mtu,
                    self.transfer_unit()
                )
            }
            LinkEvent::SubscriptionChanged { handle, enabled } if self.handle() == Some(handle) => {
                info!("link {}: notifications enabled={}", handle, enabled)
            }
            LinkEvent::Disconnected { handle } if self.handle().is_none() => {
                info!("link {} terminated", handle)
            }
            _ => {}
        }
        if before != self.state() {
            debug!("session {} -> {}", before, self.state());
        }

        effects
    }

    /// `Idle → Advertising`, once the stack accepted the request.
    /// Returns `false` in any other state.
    pub(crate) fn enter_advertising(&mut self) -> bool {
        if self.phase == Phase::Idle {
            self.phase = Phase::Advertising;
            true
        } else {
            false
        }
    }

    /// `Advertising → Idle`. Returns `false` in any other state.
    pub(crate) fn leave_advertising(&mut self) -> bool {
        if self.phase == Phase::Advertising {
            self.phase = Phase::Idle;
            true
        } else {
            false
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests
// ═══════════════════════════════════════════════════════════════════════════
