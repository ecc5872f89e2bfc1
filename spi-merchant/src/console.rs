//! Terminal presentation for the checkout binary.

use std::fmt::Write as _;

use spi::link::QR_SIZE_PX;
use spi::sdk::QrRenderer;
use spi::session::{SessionSnapshot, Urgency};
use spi::{Amount, CartSnapshot, LineItem, SessionEvent};

/// The storefront's fixed demo cart.
#[must_use]
pub fn demo_cart() -> CartSnapshot {
    CartSnapshot::new(vec![
        LineItem::new("Premium Wireless Headphones", Amount::from_cents(29_999), 1),
        LineItem::new("Smart Watch Pro", Amount::from_cents(44_999), 1),
        LineItem::new("USB-C Cable (3-Pack)", Amount::from_cents(2_999), 2),
    ])
}

/// Renders the cart as a receipt.
#[must_use]
pub fn render_cart(cart: &CartSnapshot) -> String {
    let mut out = String::new();
    for item in cart.items() {
        let _ = writeln!(
            out,
            "  {:<30} {:>3} x {:>8}  {:>9}",
            item.name,
            item.quantity,
            item.unit_price.to_currency().to_string(),
            item.line_total().to_currency().to_string()
        );
    }
    let total = cart.total().to_currency().to_string();
    let _ = write!(out, "  {:<45} {total:>9}", "Total");
    out
}

/// Prints the payment deep link in place of a scannable code.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalQr;

impl QrRenderer for TerminalQr {
    type Widget = String;

    fn render_payment_qr_code(&self, deep_link: &str, size_px: u32) -> String {
        format!("[Solana Pay QR {size_px}x{size_px}px]\n{deep_link}")
    }
}

/// Renders the deep link at the standard QR size.
#[must_use]
pub fn render_qr<R: QrRenderer>(renderer: &R, deep_link: &str) -> R::Widget {
    renderer.render_payment_qr_code(deep_link, QR_SIZE_PX)
}

const BAR_CELLS: u32 = 20;

/// The countdown line for a pending session, with a bar showing the share of
/// the budget left.
///
/// Only reported on whole minutes, at thirty seconds and during the final ten.
#[must_use]
pub fn countdown_line(snapshot: &SessionSnapshot) -> Option<String> {
    let s = snapshot.remaining_seconds;
    if snapshot.status.is_terminal() || s == 0 || !(s % 60 == 0 || s == 30 || s <= 10) {
        return None;
    }
    let marker = match snapshot.urgency() {
        Urgency::Relaxed => "   ",
        Urgency::Warning => " ! ",
        Urgency::Critical => "!!!",
    };
    Some(format!(
        "{marker} [{}] {} left to pay",
        progress_bar(snapshot.fraction_remaining()),
        snapshot.remaining_display()
    ))
}

fn progress_bar(fraction: f64) -> String {
    let filled = fraction * f64::from(BAR_CELLS);
    (0..BAR_CELLS)
        .map(|cell| if f64::from(cell) + 0.5 < filled { '#' } else { '-' })
        .collect()
}

/// The message to show the payer for a session event, if any.
///
/// Ticks yield nothing; the countdown comes from [`countdown_line`].
#[must_use]
pub fn describe_event(event: &SessionEvent, support_email: &str) -> Option<String> {
    let message = match event {
        SessionEvent::Tick { .. } => return None,
        SessionEvent::PollStarted { .. } => "Checking payment status...".to_owned(),
        SessionEvent::PaymentCompleted { reference } => {
            format!("*** Payment confirmed! Thank you. *** (reference {reference})")
        }
        SessionEvent::PaymentNotReceived { .. } => {
            "Payment not received yet. Press Enter to check again.".to_owned()
        }
        SessionEvent::PollFailed { message, .. } => {
            format!("Could not check payment status ({message}). Press Enter to retry.")
        }
        SessionEvent::PaymentExpired { reference } => format!(
            "Payment session expired. If you already paid, contact {support_email} \
             with your reference ID: {reference}"
        ),
    };
    Some(message)
}
