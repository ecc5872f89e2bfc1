//! The payment session state machine.
//!
//! ```text
//!            poll reports paid
//!   pending ─────────────────────▶ completed
//!      │
//!      │ countdown reaches zero
//!      ▼
//!   expired
//! ```
//!
//! [`PaymentSession`] is a plain, synchronous state machine: it is advanced
//! by [`tick`](PaymentSession::tick) once per second and by the
//! [`begin_poll`](PaymentSession::begin_poll) /
//! [`finish_poll`](PaymentSession::finish_poll) pair around each
//! user-triggered confirmation check. [`SessionHandle`] drives one session
//! on a tokio task with a real timer.
//!
//! Completion takes precedence over expiry, within limits. If the countdown
//! reaches zero while a poll is in flight, that poll has until the next tick
//! to confirm the payment. A poll that has not answered by then is abandoned
//! and the session expires, so a session never outlives its budget by more
//! than one second.

mod driver;
mod event;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

pub use driver::SessionHandle;
pub use event::{SessionEvent, SessionObserver};

use crate::address::Address;
use crate::sdk::PollError;

/// Seconds a payer has to complete a payment.
pub const COUNTDOWN_SECONDS: u32 = 300;

/// Lifecycle state of a payment session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Waiting for payment; the countdown is running.
    Pending,
    /// Payment confirmed.
    Completed,
    /// The countdown ran out.
    Expired,
}

impl PaymentStatus {
    /// Returns `true` for states no transition leaves.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Expired => "expired",
        })
    }
}

/// How close a pending session is to expiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    /// More than three minutes left.
    Relaxed,
    /// More than one minute left.
    Warning,
    /// One minute or less.
    Critical,
}

impl Urgency {
    /// Classifies a remaining countdown.
    #[must_use]
    pub const fn for_remaining(remaining_seconds: u32) -> Self {
        if remaining_seconds > 180 {
            Self::Relaxed
        } else if remaining_seconds > 60 {
            Self::Warning
        } else {
            Self::Critical
        }
    }
}

/// Formats seconds as `MM:SS`.
#[must_use]
pub fn format_remaining(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// A point-in-time view of a session, as published to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Reference being paid.
    pub reference: Address,
    /// Current state.
    pub status: PaymentStatus,
    /// Seconds left on the countdown.
    pub remaining_seconds: u32,
    /// The countdown budget the session started with.
    pub budget_seconds: u32,
    /// Whether a confirmation poll is outstanding. The trigger should be
    /// disabled while this is set.
    pub polling: bool,
}

impl SessionSnapshot {
    /// The remaining countdown as `MM:SS`.
    #[must_use]
    pub fn remaining_display(&self) -> String {
        format_remaining(self.remaining_seconds)
    }

    /// Urgency of the remaining countdown.
    #[must_use]
    pub const fn urgency(&self) -> Urgency {
        Urgency::for_remaining(self.remaining_seconds)
    }

    /// Share of the budget still remaining, in `0.0..=1.0`.
    #[must_use]
    pub fn fraction_remaining(&self) -> f64 {
        if self.budget_seconds == 0 {
            return 0.0;
        }
        f64::from(self.remaining_seconds) / f64::from(self.budget_seconds)
    }

    /// Whether a new confirmation poll may be triggered.
    #[must_use]
    pub const fn can_poll(&self) -> bool {
        !self.status.is_terminal() && !self.polling
    }
}

/// Proof that a confirmation poll was started, redeemed by
/// [`PaymentSession::finish_poll`].
#[allow(missing_copy_implementations)] // redeemed exactly once
#[derive(Debug, PartialEq, Eq)]
#[must_use = "an unfinished poll blocks further polls"]
pub struct PollTicket {
    id: u64,
}

/// One payment attempt's lifecycle.
pub struct PaymentSession {
    reference: Address,
    status: PaymentStatus,
    budget_seconds: u32,
    remaining_seconds: u32,
    in_flight: Option<u64>,
    next_ticket: u64,
    expiry_deferred: bool,
    observers: Vec<Arc<dyn SessionObserver>>,
}

impl fmt::Debug for PaymentSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentSession")
            .field("reference", &self.reference)
            .field("status", &self.status)
            .field("remaining_seconds", &self.remaining_seconds)
            .field("in_flight", &self.in_flight)
            .field("expiry_deferred", &self.expiry_deferred)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl PaymentSession {
    /// Starts a pending session with the standard five-minute countdown.
    #[must_use]
    pub fn new(reference: Address) -> Self {
        Self::with_budget(reference, COUNTDOWN_SECONDS)
    }

    /// Starts a pending session with a custom countdown. A zero budget
    /// expires on the first tick.
    #[must_use]
    pub fn with_budget(reference: Address, budget_seconds: u32) -> Self {
        Self {
            reference,
            status: PaymentStatus::Pending,
            budget_seconds,
            remaining_seconds: budget_seconds,
            in_flight: None,
            next_ticket: 0,
            expiry_deferred: false,
            observers: Vec::new(),
        }
    }

    /// Registers an observer for all subsequent events.
    #[must_use]
    pub fn with_observer<O>(mut self, observer: O) -> Self
    where
        O: SessionObserver + 'static,
    {
        self.observe(observer);
        self
    }

    /// Registers an observer for all subsequent events.
    pub fn observe<O>(&mut self, observer: O)
    where
        O: SessionObserver + 'static,
    {
        self.observers.push(Arc::new(observer));
    }

    /// Reference being paid.
    #[must_use]
    pub const fn reference(&self) -> Address {
        self.reference
    }

    /// Current state.
    #[must_use]
    pub const fn status(&self) -> PaymentStatus {
        self.status
    }

    /// Seconds left on the countdown.
    #[must_use]
    pub const fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    /// Whether a confirmation poll is outstanding.
    #[must_use]
    pub const fn is_polling(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Current view for the presentation layer.
    #[must_use]
    pub const fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            reference: self.reference,
            status: self.status,
            remaining_seconds: self.remaining_seconds,
            budget_seconds: self.budget_seconds,
            polling: self.in_flight.is_some(),
        }
    }

    /// Advances the countdown by one second.
    ///
    /// Reaching zero expires the session, unless a poll is in flight, in
    /// which case that poll gets one more tick to answer. The tick after
    /// that expires the session and abandons the poll, so its late result is
    /// ignored. Returns `false` if the session was already terminal.
    pub fn tick(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        if self.expiry_deferred {
            self.in_flight = None;
            self.expire();
            return true;
        }
        if self.remaining_seconds > 0 {
            self.remaining_seconds -= 1;
            self.emit(&SessionEvent::Tick {
                remaining_seconds: self.remaining_seconds,
            });
        }
        if self.remaining_seconds == 0 {
            if self.in_flight.is_some() {
                self.expiry_deferred = true;
            } else {
                self.expire();
            }
        }
        true
    }

    /// Starts a confirmation poll.
    ///
    /// Returns `None` if the session is terminal or a poll is already in
    /// flight; the caller must not query the confirmation check in that case.
    pub fn begin_poll(&mut self) -> Option<PollTicket> {
        if self.status.is_terminal() || self.in_flight.is_some() {
            return None;
        }
        let id = self.next_ticket;
        self.next_ticket += 1;
        self.in_flight = Some(id);
        self.emit(&SessionEvent::PollStarted {
            reference: self.reference,
        });
        Some(PollTicket { id })
    }

    /// Applies the outcome of the poll started with `ticket`.
    ///
    /// `Ok(true)` completes the session. `Ok(false)` and `Err(_)` leave it
    /// pending and re-enable polling, unless the countdown ran out in the
    /// meantime, in which case the session expires now.
    pub fn finish_poll(
        &mut self,
        ticket: PollTicket,
        outcome: Result<bool, PollError>,
    ) -> PaymentStatus {
        if self.in_flight != Some(ticket.id) {
            return self.status;
        }
        self.in_flight = None;
        let reference = self.reference;
        match outcome {
            Ok(true) => {
                self.status = PaymentStatus::Completed;
                self.expiry_deferred = false;
                self.emit(&SessionEvent::PaymentCompleted { reference });
            }
            Ok(false) => self.emit(&SessionEvent::PaymentNotReceived { reference }),
            Err(err) => self.emit(&SessionEvent::PollFailed {
                reference,
                message: err.to_string(),
            }),
        }
        if self.expiry_deferred {
            self.expire();
        }
        self.status
    }

    fn expire(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        self.status = PaymentStatus::Expired;
        self.expiry_deferred = false;
        self.emit(&SessionEvent::PaymentExpired {
            reference: self.reference,
        });
    }

    fn emit(&self, event: &SessionEvent) {
        #[cfg(feature = "telemetry")]
        tracing::trace!(reference = %self.reference, ?event, "Session event");
        for observer in &self.observers {
            observer.on_event(event);
        }
    }
}
