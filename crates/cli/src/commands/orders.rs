//! Order commands.

use std::sync::Arc;

use chrono::Utc;
use geomancy_core::{Email, FulfillmentStatus, Order, OrderId, OrderPatch};
use geomancy_storefront::OrderStore;
use geomancy_storefront::feed::{BaasCollection, CollectionFeed, Handler};
use geomancy_storefront::orders::OrderHistory;

use super::Context;

#[allow(clippy::print_stdout)]
fn print_orders(ctx: &Context, orders: &[Order]) {
    if orders.is_empty() {
        println!("No orders found");
        return;
    }
    for order in orders {
        println!(
            "{:<24} {}  {:<28} {:>12}  {:<14} {}",
            order.id,
            order.created_at.format("%Y-%m-%d %H:%M"),
            order.customer_email,
            order.total_amount.display(ctx.config.currency),
            order.status,
            order.fulfillment_status.map_or("-", FulfillmentStatus::label)
        );
    }
}

/// List orders, newest first.
///
/// # Errors
///
/// Returns error for a bad email or if the store cannot be read.
pub async fn list(ctx: &Context, email: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let store = ctx.orders();
    let orders = match email {
        Some(email) => store.list_for_customer(&Email::parse(email)?).await?,
        None => store.list().await?,
    };
    print_orders(ctx, &orders);
    Ok(())
}

/// One customer's orders with a spending total.
///
/// # Errors
///
/// Returns error for a bad email or if the store cannot be read.
#[allow(clippy::print_stdout)]
pub async fn history(ctx: &Context, email: &str) -> Result<(), Box<dyn std::error::Error>> {
    let email = Email::parse(email)?;
    let history = OrderHistory::new(ctx.orders().list_for_customer(&email).await?);
    print_orders(ctx, history.orders());
    if !history.is_empty() {
        println!(
            "{} order(s), {} in total",
            history.len(),
            history.total_amount().display(ctx.config.currency)
        );
    }
    Ok(())
}

/// Set an order's fulfillment status.
///
/// # Errors
///
/// Returns error for an unknown status or a failed update.
#[allow(clippy::print_stdout)]
pub async fn set_status(
    ctx: &Context,
    order_id: &str,
    status: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let status: FulfillmentStatus = status.parse()?;
    let order = ctx
        .orders()
        .update(&OrderId::new(order_id), OrderPatch::fulfillment(status, Utc::now()))
        .await?;
    println!("Order {} is now: {}", order.id, status.label());
    Ok(())
}

/// Reprint the order list on every change until Ctrl+C.
///
/// # Errors
///
/// Returns error if the Ctrl+C handler cannot be installed.
pub async fn watch(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let feed: CollectionFeed<Order> = CollectionFeed::new();
    let currency = ctx.config.currency;
    let handler: Handler<Order> =
        Arc::new(move |orders: &[Order]| print_snapshot(orders, currency));
    let subscription = feed.subscribe(handler);

    let source = BaasCollection::new(ctx.baas.clone(), "orders", "select=*&order=createdAt.desc");
    let handle = feed.start(source, ctx.config.feed_poll_interval);

    tokio::signal::ctrl_c().await?;
    subscription.unsubscribe();
    handle.cancel();
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_snapshot(orders: &[Order], currency: geomancy_core::CurrencyCode) {
    println!("--- {} order(s) ---", orders.len());
    for order in orders {
        println!(
            "{:<24} {:<28} {:>12}  {}",
            order.id,
            order.customer_email,
            order.total_amount.display(currency),
            order.status
        );
    }
}
