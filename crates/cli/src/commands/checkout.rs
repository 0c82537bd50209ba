//! Checkout commands.
//!
//! `checkout` stops at the gateway redirect and prints the payment page URL.
//! After paying, `checkout-return` picks the pending order up from the
//! session file and completes it.

use clap::Args;
use geomancy_core::ShippingAddress;
use geomancy_storefront::checkout::{Navigator, NoticeLevel, Notifier};
use geomancy_storefront::{Checkout, CheckoutRequest, RelayClient, RestOrderStore};
use url::Url;

use super::Context;

#[derive(Args)]
pub struct CheckoutArgs {
    /// Customer email address
    #[arg(short, long)]
    pub email: String,

    /// Recipient name
    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub line1: String,

    #[arg(long)]
    pub line2: Option<String>,

    #[arg(long)]
    pub city: String,

    #[arg(long)]
    pub region: Option<String>,

    #[arg(long)]
    pub postal_code: Option<String>,

    #[arg(long)]
    pub country: String,

    #[arg(long)]
    pub phone: Option<String>,
}

impl From<CheckoutArgs> for CheckoutRequest {
    fn from(args: CheckoutArgs) -> Self {
        Self {
            email: args.email,
            shipping_address: ShippingAddress {
                name: args.name,
                line1: args.line1,
                line2: args.line2,
                city: args.city,
                region: args.region,
                postal_code: args.postal_code,
                country: args.country,
                phone: args.phone,
            },
        }
    }
}

/// Prints where the browser would go.
struct Terminal;

impl Navigator for Terminal {
    #[allow(clippy::print_stdout)]
    fn navigate(&self, url: &str) {
        println!("-> {url}");
    }
}

impl Notifier for Terminal {
    #[allow(clippy::print_stdout, clippy::print_stderr)]
    fn notify(&self, level: NoticeLevel, message: &str) {
        match level {
            NoticeLevel::Error => eprintln!("error: {message}"),
            NoticeLevel::Info | NoticeLevel::Success => println!("{message}"),
        }
    }
}

type TerminalCheckout = Checkout<RestOrderStore, RelayClient, Terminal, Terminal>;

fn checkout(ctx: &Context) -> Result<TerminalCheckout, Box<dyn std::error::Error>> {
    Ok(Checkout::new(
        ctx.orders(),
        RelayClient::new(&ctx.config.relay_url)?,
        Terminal,
        Terminal,
        ctx.session.clone(),
        ctx.config.currency,
    ))
}

/// Save the order and print the payment page.
///
/// # Errors
///
/// Returns the checkout error after it has been reported.
#[allow(clippy::print_stdout)]
pub async fn begin(ctx: &Context, args: CheckoutArgs) -> Result<(), Box<dyn std::error::Error>> {
    let cart = ctx.cart();
    let mut checkout = checkout(ctx)?;
    let started = checkout.begin(&cart, args.into()).await?;

    println!("Order {} is awaiting payment", started.order_id);
    println!("Open the link above to pay, then run:");
    println!("  geomancy checkout-return --reference {}", started.reference);
    Ok(())
}

/// Verify the payment and complete the pending order.
///
/// # Errors
///
/// Returns error for an unparsable URL or a failed completion.
#[allow(clippy::print_stdout)]
pub async fn finish(
    ctx: &Context,
    reference: Option<&str>,
    url: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut cart = ctx.cart();
    let mut checkout = checkout(ctx)?;

    let completed = match url {
        Some(url) => checkout.resume_from_url(&mut cart, &Url::parse(url)?).await?,
        None => checkout.resume(&mut cart, reference).await?,
    };

    match completed {
        Some(done) => println!("Order {} paid ({})", done.order_id, done.reference),
        None => println!("No payment reference given, nothing to do"),
    }
    Ok(())
}
