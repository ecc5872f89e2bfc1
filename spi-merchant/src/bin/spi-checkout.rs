#![allow(clippy::print_stdout)]

//! Terminal checkout.
//!
//! Checks out the demo cart with a chosen loyalty discount, prints the
//! Solana Pay link for the payer's wallet and follows the payment session
//! until it completes, expires or the user leaves.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p spi-merchant --bin spi-checkout -- --discount 25
//! ```
//!
//! Press Enter to check whether the payment has arrived. Configuration is
//! read the same way as the merchant server (`CONFIG`, default
//! `config.toml`).

use clap::Parser;
use tokio::sync::mpsc;
use url::Url;

use spi::link::{self, solana_pay_link};
use spi::session::COUNTDOWN_SECONDS;
use spi::{Address, Discount, PaymentSession, SessionEvent, SessionHandle, intent, token};
use spi_merchant::console::{
    TerminalQr, countdown_line, demo_cart, describe_event, render_cart, render_qr,
};
use spi_merchant::{ServerConfig, init_tracing, shutdown_signal};

#[derive(Parser)]
#[command(
    name = "spi-checkout",
    about = "Check out the demo cart and follow its payment session",
    version
)]
struct Cli {
    /// Share of the total settled in loyalty tokens: 0, 25, 50, 75 or 100.
    #[arg(long, default_value = "0")]
    discount: Discount,

    /// Public base URL of the merchant server (overrides `public_url`).
    #[arg(long, env = "SPI_PUBLIC_URL")]
    public_url: Option<Url>,

    /// Settlement SDK service URL (overrides `sdk.url`).
    #[arg(long, env = "SPI_SDK_URL")]
    sdk_url: Option<Url>,

    /// Seconds the payer has to pay.
    #[arg(long, default_value_t = COUNTDOWN_SECONDS)]
    budget: u32,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Checkout failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let _ = rustls::crypto::ring::default_provider().install_default();

    let mut config = ServerConfig::load()?;
    if let Some(url) = cli.public_url {
        config.public_url = url;
    }
    if let Some(url) = cli.sdk_url {
        config.sdk.url = url;
    }

    let cart = demo_cart();
    let reference = Address::generate();
    let token = token::encode(&cart, cli.discount, &reference);
    let display = intent::resolve_client_side(&token.decode()?);
    let request_url = link::transaction_request_url(&config.public_url, &token)?;

    println!("{}", render_cart(&cart));
    println!();
    println!("Amount due:   {}", display.amount);
    if display.uses_loyalty() {
        println!(
            "Loyalty:      {}% of the total settles in loyalty tokens",
            display.discount_percent
        );
    }
    println!("Reference:    {}", display.reference);
    println!();
    println!("{}", render_qr(&TerminalQr, &solana_pay_link(&request_url)));
    println!();
    println!("Press Enter to check payment status, Ctrl-C to leave.");

    let support_email = config.support_email.clone();
    let session = PaymentSession::with_budget(reference, cli.budget).with_observer(
        move |event: &SessionEvent| {
            if let Some(message) = describe_event(event, &support_email) {
                println!("{message}");
            }
        },
    );
    let handle = SessionHandle::spawn(session, config.sdk.client(&config.merchant)?);
    let mut updates = handle.subscribe();
    let mut presses = spawn_enter_listener();
    let mut stdin_open = true;
    let mut last_reported = None;
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => {
                handle.dispose();
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = *updates.borrow_and_update();
                if snapshot.status.is_terminal() {
                    break;
                }
                if last_reported != Some(snapshot.remaining_seconds) {
                    last_reported = Some(snapshot.remaining_seconds);
                    if let Some(line) = countdown_line(&snapshot) {
                        println!("{line}");
                    }
                }
            }
            press = presses.recv(), if stdin_open => match press {
                Some(()) => {
                    if !handle.check_payment() {
                        println!("A payment check is already running.");
                    }
                }
                None => stdin_open = false,
            },
        }
    }

    let last = handle.finished().await;
    tracing::info!(
        reference = %last.reference,
        status = %last.status,
        remaining = %last.remaining_display(),
        "Checkout session ended"
    );
    Ok(())
}

/// Forwards each line read from stdin as one key press. Reading happens on a
/// dedicated thread so a pending read never holds up runtime shutdown.
fn spawn_enter_listener() -> mpsc::Receiver<()> {
    let (tx, rx) = mpsc::channel(1);
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            if line.is_err() || tx.blocking_send(()).is_err() {
                break;
            }
        }
    });
    rx
}
