//! Cart line items and derived totals.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::money::MinorUnits;

/// One product in the cart.
///
/// `quantity` is a `NonZeroU32`, so a zero-quantity line cannot be built or
/// deserialized from local storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    pub product_id: ProductId,
    pub unit_price: MinorUnits,
    pub quantity: NonZeroU32,
}

impl CartLineItem {
    /// A new line with quantity 1.
    #[must_use]
    pub const fn new(product_id: ProductId, unit_price: MinorUnits) -> Self {
        Self {
            product_id,
            unit_price,
            quantity: NonZeroU32::MIN,
        }
    }

    /// `unit_price × quantity`, saturating at `u64::MAX`.
    #[must_use]
    pub fn line_total(&self) -> MinorUnits {
        self.unit_price.saturating_mul(self.quantity.get())
    }
}

/// Totals derived from the current cart lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub total_quantity: u64,
    pub total_amount: MinorUnits,
}

impl CartTotals {
    /// Derive totals from a slice of lines.
    #[must_use]
    pub fn from_lines(lines: &[CartLineItem]) -> Self {
        lines.iter().fold(Self::default(), |acc, line| Self {
            total_quantity: acc
                .total_quantity
                .saturating_add(u64::from(line.quantity.get())),
            total_amount: acc.total_amount.saturating_add(line.line_total()),
        })
    }
}
