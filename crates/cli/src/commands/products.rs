//! Catalog commands.

use geomancy_core::{CurrencyCode, MinorUnits, MoneyError};

use super::Context;

/// Print the catalog, optionally narrowed to one category and a price cap.
///
/// `max_price` is written in major units, e.g. `50.00`.
///
/// # Errors
///
/// Returns error if the price cap is not a valid amount or the catalog
/// cannot be read.
#[allow(clippy::print_stdout)]
pub async fn list(
    ctx: &Context,
    category: Option<&str>,
    max_price: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let cap = price_cap(max_price, ctx.config.currency)?;
    let catalog = ctx.catalog();
    let mut products = match category {
        Some(category) => catalog.by_category(category).await?,
        None => catalog.list().await?.to_vec(),
    };
    if let Some(cap) = cap {
        products.retain(|product| product.price <= cap);
    }

    if products.is_empty() {
        println!("No products found");
        return Ok(());
    }
    for product in &products {
        println!(
            "{:<12} {:<32} {:>12}  {}",
            product.id,
            product.name,
            product.price.display(ctx.config.currency),
            product.category.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn price_cap(
    input: Option<&str>,
    currency: CurrencyCode,
) -> Result<Option<MinorUnits>, MoneyError> {
    input
        .map(|value| MinorUnits::from_major_str(value, currency))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_cap_is_read_in_major_units() {
        assert_eq!(
            price_cap(Some("50.00"), CurrencyCode::GHS),
            Ok(Some(MinorUnits::new(5000)))
        );
        assert_eq!(price_cap(None, CurrencyCode::GHS), Ok(None));
    }

    #[test]
    fn test_price_cap_rejects_bad_input() {
        assert!(matches!(
            price_cap(Some("cheap"), CurrencyCode::GHS),
            Err(MoneyError::Invalid(_))
        ));
        assert_eq!(
            price_cap(Some("-1"), CurrencyCode::GHS),
            Err(MoneyError::Negative)
        );
    }
}
