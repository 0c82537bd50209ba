//! Geomancy Shop CLI - the storefront in a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Browse and fill the cart
//! geomancy products list --category crystals
//! geomancy cart add p1
//! geomancy cart show
//!
//! # Pay (opens the gateway page), then finish with the reference it returns
//! geomancy checkout -e ama@example.com --name "Ama Mensah" --line1 "1 Ring Road" --city Accra --country GH
//! geomancy checkout-return --reference T123456
//!
//! # Manage orders
//! geomancy orders history -e ama@example.com
//! geomancy orders set-status o1 shipped
//! geomancy orders watch
//! ```
//!
//! Configuration comes from the environment (see `StorefrontConfig`).
//! Cart and session state live in `STOREFRONT_DATA_DIR`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "geomancy")]
#[command(author, version, about = "Geomancy Shop storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and edit the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Browse the catalog
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Save the cart as an order and start payment
    Checkout(commands::checkout::CheckoutArgs),
    /// Finish a checkout after the gateway redirect
    CheckoutReturn {
        /// Transaction reference from the redirect
        #[arg(short, long, conflicts_with = "url")]
        reference: Option<String>,

        /// Full redirect URL (the `reference` query parameter is used)
        #[arg(short, long)]
        url: Option<String>,
    },
    /// Browse and manage orders
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Cycle the featured category tags
    Tags {
        /// Number of tags to show before exiting
        #[arg(short, long, default_value_t = 5)]
        count: usize,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart lines and totals
    Show,
    /// Add one unit of a product
    Add { product_id: String },
    /// Remove one unit of a product
    Decrease { product_id: String },
    /// Remove a product's line
    Remove { product_id: String },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List products
    List {
        /// Only products in this category (case-insensitive)
        #[arg(short, long)]
        category: Option<String>,
        /// Only products at or below this price, in major units (e.g. 50.00)
        #[arg(long)]
        max_price: Option<String>,
    },
}

#[derive(Subcommand)]
enum OrdersAction {
    /// List all orders, newest first
    List {
        /// Only this customer's orders
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Show one customer's order history with totals
    History {
        #[arg(short, long)]
        email: String,
    },
    /// Set the fulfillment status of an order
    SetStatus {
        order_id: String,

        /// `order_placed`, `processing`, `shipped` or `delivered`
        status: String,
    },
    /// Print the order list whenever it changes (Ctrl+C to stop)
    Watch,
}

/// Initialize Sentry when `SENTRY_DSN` is set.
fn init_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok().filter(|d| !d.is_empty())?;
    Some(sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    )))
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "geomancy=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let _sentry_guard = init_sentry();
    init_tracing();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Commands::Tags { count } = cli.command {
        commands::tags::cycle(count).await;
        return Ok(());
    }

    let ctx = commands::Context::from_env()?;
    match cli.command {
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&ctx),
            CartAction::Add { product_id } => commands::cart::add(&ctx, &product_id).await?,
            CartAction::Decrease { product_id } => commands::cart::decrease(&ctx, &product_id),
            CartAction::Remove { product_id } => commands::cart::remove(&ctx, &product_id),
            CartAction::Clear => commands::cart::clear(&ctx),
        },
        Commands::Products { action } => match action {
            ProductsAction::List {
                category,
                max_price,
            } => {
                commands::products::list(&ctx, category.as_deref(), max_price.as_deref()).await?;
            }
        },
        Commands::Checkout(args) => commands::checkout::begin(&ctx, args).await?,
        Commands::CheckoutReturn { reference, url } => {
            commands::checkout::finish(&ctx, reference.as_deref(), url.as_deref()).await?;
        }
        Commands::Orders { action } => match action {
            OrdersAction::List { email } => commands::orders::list(&ctx, email.as_deref()).await?,
            OrdersAction::History { email } => commands::orders::history(&ctx, &email).await?,
            OrdersAction::SetStatus { order_id, status } => {
                commands::orders::set_status(&ctx, &order_id, &status).await?;
            }
            OrdersAction::Watch => commands::orders::watch(&ctx).await?,
        },
        Commands::Tags { .. } => {}
    }
    Ok(())
}
