//! Session events and their observers.

use tokio::sync::mpsc;

use crate::address::Address;

/// A state change emitted by [`PaymentSession`](super::PaymentSession).
///
/// Presentation concerns (toasts, celebration, support contact) subscribe to
/// these instead of being coupled to the transitions themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The countdown advanced by one second.
    Tick {
        /// Seconds left before expiry.
        remaining_seconds: u32,
    },
    /// A confirmation poll was started.
    PollStarted {
        /// Reference being checked.
        reference: Address,
    },
    /// The payment was confirmed on-chain. Emitted at most once.
    PaymentCompleted {
        /// Confirmed reference.
        reference: Address,
    },
    /// The confirmation check answered that nothing has been paid yet.
    PaymentNotReceived {
        /// Reference that was checked.
        reference: Address,
    },
    /// The confirmation check could not be reached.
    PollFailed {
        /// Reference that was checked.
        reference: Address,
        /// Failure reported by the confirmation check.
        message: String,
    },
    /// The countdown ran out before any payment was confirmed. Emitted at
    /// most once.
    PaymentExpired {
        /// Reference to quote when contacting support.
        reference: Address,
    },
}

impl SessionEvent {
    /// Returns `true` for the events that end a session.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::PaymentCompleted { .. } | Self::PaymentExpired { .. }
        )
    }
}

/// Receives [`SessionEvent`]s synchronously, in emission order.
///
/// Observers run on whichever task drives the session and must not block.
pub trait SessionObserver: Send + Sync {
    /// Called once per emitted event.
    fn on_event(&self, event: &SessionEvent);
}

impl<F> SessionObserver for F
where
    F: Fn(&SessionEvent) + Send + Sync,
{
    fn on_event(&self, event: &SessionEvent) {
        self(event);
    }
}

/// Forwards events to a channel. Events sent after the receiver is dropped
/// are discarded.
impl SessionObserver for mpsc::UnboundedSender<SessionEvent> {
    fn on_event(&self, event: &SessionEvent) {
        let _ = self.send(event.clone());
    }
}
