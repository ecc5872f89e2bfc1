//! Drives a [`PaymentSession`] on a tokio task.
//!
//! The task is the session's only owner. It multiplexes three inputs:
//! a one-second countdown, poll triggers from the view, and the outcome of
//! the single in-flight confirmation check. Views read state through a
//! [`watch`] channel and never touch the session directly.

use std::time::Duration;

use futures_util::future::OptionFuture;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use super::{PaymentSession, SessionSnapshot};
use crate::sdk::{BoxFuture, PaymentConfirmer, PollError};

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Owner-side handle to a running payment session.
///
/// Dropping the handle disposes the session.
#[derive(Debug)]
pub struct SessionHandle {
    triggers: mpsc::Sender<()>,
    snapshot: watch::Receiver<SessionSnapshot>,
    cancel: CancellationToken,
    task: Option<JoinHandle<SessionSnapshot>>,
}

impl SessionHandle {
    /// Spawns the driver for `session` on the current runtime.
    ///
    /// The countdown starts one second from now. Polls go to `confirmer`.
    #[must_use]
    pub fn spawn<C>(session: PaymentSession, confirmer: C) -> Self
    where
        C: PaymentConfirmer + 'static,
    {
        let (triggers, trigger_rx) = mpsc::channel(1);
        let (snapshot_tx, snapshot) = watch::channel(session.snapshot());
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(
            session,
            confirmer,
            trigger_rx,
            snapshot_tx,
            cancel.clone(),
        ));
        Self {
            triggers,
            snapshot,
            cancel,
            task: Some(task),
        }
    }

    /// Asks for a confirmation poll.
    ///
    /// Returns `false` without doing anything if the session is terminal,
    /// disposed, already polling, or already has a trigger queued.
    pub fn check_payment(&self) -> bool {
        if self.cancel.is_cancelled() || !self.snapshot.borrow().can_poll() {
            return false;
        }
        self.triggers.try_send(()).is_ok()
    }

    /// Latest published state.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        *self.snapshot.borrow()
    }

    /// A receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    /// Stops the countdown and abandons any in-flight poll. Idempotent.
    pub fn dispose(&self) {
        self.cancel.cancel();
    }

    /// Whether the driver has stopped or been told to stop.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Waits for the session to reach a terminal state or be disposed, and
    /// returns its final state.
    pub async fn finished(mut self) -> SessionSnapshot {
        if let Some(task) = self.task.take() {
            if let Ok(last) = task.await {
                return last;
            }
        }
        *self.snapshot.borrow()
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run<C>(
    mut session: PaymentSession,
    confirmer: C,
    mut triggers: mpsc::Receiver<()>,
    snapshot: watch::Sender<SessionSnapshot>,
    cancel: CancellationToken,
) -> SessionSnapshot
where
    C: PaymentConfirmer,
{
    let mut ticker = time::interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
    let mut in_flight: OptionFuture<BoxFuture<'_, Result<bool, PollError>>> = None.into();
    let mut ticket = None;
    let mut triggers_open = true;

    #[cfg(feature = "telemetry")]
    tracing::debug!(reference = %session.reference(), "Session started");

    while !session.status().is_terminal() {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            Some(outcome) = &mut in_flight, if ticket.is_some() => {
                if let Some(ticket) = ticket.take() {
                    session.finish_poll(ticket, outcome);
                }
                in_flight = None.into();
            }
            _ = ticker.tick() => {
                session.tick();
            }
            trigger = triggers.recv(), if triggers_open => match trigger {
                Some(()) => {
                    if let Some(started) = session.begin_poll() {
                        in_flight = Some(confirmer.confirm_payment(session.reference())).into();
                        ticket = Some(started);
                    }
                }
                None => triggers_open = false,
            },
        }
        snapshot.send_replace(session.snapshot());
    }

    cancel.cancel();
    let last = session.snapshot();
    snapshot.send_replace(last);
    #[cfg(feature = "telemetry")]
    tracing::debug!(reference = %last.reference, status = %last.status, "Session stopped");
    last
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::session::{PaymentStatus, SessionEvent};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    fn reference() -> Address {
        "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM".parse().unwrap()
    }

    #[derive(Default)]
    struct GatedConfirmer {
        calls: AtomicUsize,
        gate: Notify,
        paid: bool,
    }

    impl PaymentConfirmer for GatedConfirmer {
        fn confirm_payment(&self, _reference: Address) -> BoxFuture<'_, Result<bool, PollError>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                self.gate.notified().await;
                Ok(self.paid)
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_expires_without_payment() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = PaymentSession::new(reference()).with_observer(tx);
        let confirmer = Arc::new(GatedConfirmer::default());
        let handle = SessionHandle::spawn(session, Arc::clone(&confirmer));

        let last = handle.finished().await;
        assert_eq!(last.status, PaymentStatus::Expired);
        assert_eq!(last.remaining_seconds, 0);
        assert_eq!(confirmer.calls.load(Ordering::SeqCst), 0);

        let mut expired = 0;
        while let Some(event) = rx.recv().await {
            if matches!(event, SessionEvent::PaymentExpired { .. }) {
                expired += 1;
            }
        }
        assert_eq!(expired, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_trigger_while_polling_is_ignored() {
        let confirmer = Arc::new(GatedConfirmer {
            paid: true,
            ..GatedConfirmer::default()
        });
        let handle = SessionHandle::spawn(PaymentSession::new(reference()), Arc::clone(&confirmer));
        let mut updates = handle.subscribe();

        assert!(handle.check_payment());
        updates.wait_for(|s| s.polling).await.unwrap();
        assert!(!handle.check_payment());

        // bypass the handle's guard and hit the driver directly
        handle.triggers.try_send(()).unwrap();
        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(confirmer.calls.load(Ordering::SeqCst), 1);

        confirmer.gate.notify_one();
        let last = handle.finished().await;
        assert_eq!(last.status, PaymentStatus::Completed);
        assert_eq!(confirmer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_wins_when_countdown_hits_zero_mid_poll() {
        let confirmer = Arc::new(GatedConfirmer {
            paid: true,
            ..GatedConfirmer::default()
        });
        let handle = SessionHandle::spawn(
            PaymentSession::with_budget(reference(), 3),
            Arc::clone(&confirmer),
        );
        let mut updates = handle.subscribe();
        assert!(handle.check_payment());
        updates
            .wait_for(|s| s.polling && s.remaining_seconds == 0)
            .await
            .unwrap();
        assert_eq!(handle.snapshot().status, PaymentStatus::Pending);

        confirmer.gate.notify_one();
        assert_eq!(handle.finished().await.status, PaymentStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_poll_cannot_hold_off_expiry() {
        let confirmer = Arc::new(GatedConfirmer {
            paid: true,
            ..GatedConfirmer::default()
        });
        let started = Instant::now();
        let handle = SessionHandle::spawn(
            PaymentSession::with_budget(reference(), 3),
            Arc::clone(&confirmer),
        );
        assert!(handle.check_payment());

        let last = handle.finished().await;
        assert_eq!(last.status, PaymentStatus::Expired);
        assert!(!last.polling);
        assert!(started.elapsed() <= Duration::from_secs(4));
        assert_eq!(confirmer.calls.load(Ordering::SeqCst), 1);
        // the abandoned confirmation future went down with the task
        assert_eq!(Arc::strong_count(&confirmer), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_stops_countdown() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = PaymentSession::new(reference()).with_observer(tx);
        let handle = SessionHandle::spawn(session, GatedConfirmer::default());

        time::sleep(Duration::from_millis(2500)).await;
        handle.dispose();
        handle.dispose();
        assert!(handle.is_disposed());
        assert!(!handle.check_payment());

        let last = handle.finished().await;
        assert_eq!(last.status, PaymentStatus::Pending);
        assert_eq!(last.remaining_seconds, 298);

        let mut ticks = 0;
        while let Some(event) = rx.recv().await {
            assert!(matches!(event, SessionEvent::Tick { .. }));
            ticks += 1;
        }
        assert_eq!(ticks, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_releases_session() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = PaymentSession::new(reference()).with_observer(tx);
        drop(SessionHandle::spawn(session, GatedConfirmer::default()));
        while rx.recv().await.is_some() {}
    }
}
