//! Cart commands.

use geomancy_core::ProductId;
use geomancy_storefront::cart::CartChange;

use super::Context;

#[allow(clippy::print_stdout)]
pub fn show(ctx: &Context) {
    let cart = ctx.cart();
    if cart.is_empty() {
        println!("Your cart is empty");
        return;
    }

    let currency = ctx.config.currency;
    for line in cart.lines() {
        println!(
            "{:<20} {:>4} x {:>12} = {:>12}",
            line.product_id,
            line.quantity,
            line.unit_price.display(currency),
            line.line_total().display(currency)
        );
    }
    let summary = cart.summary(currency);
    println!(
        "{} item(s), total {}",
        summary.total_quantity, summary.formatted_total
    );
}

/// Add one unit, priced from the catalog.
///
/// # Errors
///
/// Returns error if the product cannot be looked up.
pub async fn add(ctx: &Context, product_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let id = ProductId::new(product_id);
    let product = ctx.catalog().get(&id).await?;
    let mut cart = ctx.cart();
    report(cart.add(id, product.price), &product.name);
    Ok(())
}

pub fn decrease(ctx: &Context, product_id: &str) {
    let mut cart = ctx.cart();
    report(cart.decrease(&ProductId::new(product_id)), product_id);
}

pub fn remove(ctx: &Context, product_id: &str) {
    let mut cart = ctx.cart();
    report(cart.remove(&ProductId::new(product_id)), product_id);
}

#[allow(clippy::print_stdout)]
pub fn clear(ctx: &Context) {
    ctx.cart().clear();
    println!("Cart cleared");
}

#[allow(clippy::print_stdout)]
fn report(change: CartChange, name: &str) {
    match change {
        CartChange::Added => println!("Added {name} to cart"),
        CartChange::Increased => println!("Added another {name}"),
        CartChange::Decreased => println!("Removed one {name}"),
        CartChange::Removed => println!("Removed {name} from cart"),
        CartChange::Unchanged => println!("{name} is not in the cart"),
    }
}
