//! The shopping cart aggregate.
//!
//! The cart exists only on the device. Every mutation writes the full line
//! collection to local storage under [`CART_STORAGE_KEY`]; a failed write is
//! logged and the in-memory state stays authoritative.

use std::num::NonZeroU32;
use std::sync::Arc;

use geomancy_core::{CartLineItem, CartTotals, CurrencyCode, MinorUnits, ProductId};
use tracing::{debug, warn};

use crate::storage::KeyValueStore;

/// Local storage key holding the serialized cart lines.
pub const CART_STORAGE_KEY: &str = "cart";

/// What a cart mutation did, for user feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartChange {
    /// A new line was appended with quantity 1.
    Added,
    /// An existing line's quantity went up by one.
    Increased,
    /// An existing line's quantity went down by one.
    Decreased,
    /// The line was removed.
    Removed,
    /// The product was not in the cart.
    Unchanged,
}

/// Totals formatted for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSummary {
    pub line_count: usize,
    pub total_quantity: u64,
    pub total_amount: MinorUnits,
    pub formatted_total: String,
}

/// Line items plus the storage they are persisted to.
pub struct Cart {
    lines: Vec<CartLineItem>,
    storage: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for Cart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cart")
            .field("lines", &self.lines)
            .finish_non_exhaustive()
    }
}

impl Cart {
    /// An empty cart backed by `storage`. Nothing is read or written.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            lines: Vec::new(),
            storage,
        }
    }

    /// Restore the cart persisted in `storage`.
    ///
    /// Missing or unreadable data yields an empty cart.
    #[must_use]
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let lines = match storage.get(CART_STORAGE_KEY) {
            Ok(Some(json)) => match serde_json::from_str::<Vec<CartLineItem>>(&json) {
                Ok(lines) => dedupe(lines),
                Err(e) => {
                    warn!(error = %e, "Discarding malformed persisted cart");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read persisted cart");
                Vec::new()
            }
        };

        debug!(lines = lines.len(), "Cart loaded");
        Self { lines, storage }
    }

    /// Add one unit of a product.
    ///
    /// An existing line keeps its original unit price.
    pub fn add(&mut self, product_id: ProductId, unit_price: MinorUnits) -> CartChange {
        let change = if let Some(line) = self.line_mut(&product_id) {
            line.quantity = line.quantity.saturating_add(1);
            CartChange::Increased
        } else {
            self.lines.push(CartLineItem::new(product_id, unit_price));
            CartChange::Added
        };
        self.persist();
        change
    }

    /// Remove one unit of a product, dropping the line at zero.
    pub fn decrease(&mut self, product_id: &ProductId) -> CartChange {
        let Some(index) = self.lines.iter().position(|l| &l.product_id == product_id) else {
            return CartChange::Unchanged;
        };

        let change = match self
            .lines
            .get_mut(index)
            .and_then(|line| NonZeroU32::new(line.quantity.get() - 1).map(|q| (line, q)))
        {
            Some((line, quantity)) => {
                line.quantity = quantity;
                CartChange::Decreased
            }
            None => {
                self.lines.remove(index);
                CartChange::Removed
            }
        };
        self.persist();
        change
    }

    /// Remove a product's line regardless of quantity.
    pub fn remove(&mut self, product_id: &ProductId) -> CartChange {
        let before = self.lines.len();
        self.lines.retain(|l| &l.product_id != product_id);
        if self.lines.len() == before {
            return CartChange::Unchanged;
        }
        self.persist();
        CartChange::Removed
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.persist();
    }

    /// Derived quantity and amount totals.
    #[must_use]
    pub fn compute_totals(&self) -> CartTotals {
        CartTotals::from_lines(&self.lines)
    }

    /// Totals with the amount formatted in `currency`.
    #[must_use]
    pub fn summary(&self, currency: CurrencyCode) -> CartSummary {
        let totals = self.compute_totals();
        CartSummary {
            line_count: self.lines.len(),
            total_quantity: totals.total_quantity,
            total_amount: totals.total_amount,
            formatted_total: totals.total_amount.display(currency),
        }
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLineItem] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Copy of the current lines, detached from later mutations.
    #[must_use]
    pub fn snapshot(&self) -> Vec<CartLineItem> {
        self.lines.clone()
    }

    fn line_mut(&mut self, product_id: &ProductId) -> Option<&mut CartLineItem> {
        self.lines.iter_mut().find(|l| &l.product_id == product_id)
    }

    fn persist(&self) {
        let result = serde_json::to_string(&self.lines)
            .map_err(crate::storage::StorageError::from)
            .and_then(|json| self.storage.set(CART_STORAGE_KEY, &json));

        if let Err(e) = result {
            warn!(error = %e, "Failed to persist cart");
        }
    }
}

/// Merge duplicate product lines written by older clients.
fn dedupe(lines: Vec<CartLineItem>) -> Vec<CartLineItem> {
    let mut merged: Vec<CartLineItem> = Vec::with_capacity(lines.len());
    for line in lines {
        if let Some(existing) = merged.iter_mut().find(|l| l.product_id == line.product_id) {
            existing.quantity = existing.quantity.saturating_add(line.quantity.get());
        } else {
            merged.push(line);
        }
    }
    merged
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, StorageError};

    /// Storage whose writes always fail.
    struct BrokenStorage;

    impl KeyValueStore for BrokenStorage {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Ok(None)
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Poisoned)
        }
        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Poisoned)
        }
    }

    fn p(id: &str) -> ProductId {
        ProductId::new(id)
    }

    fn cart() -> (Cart, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        (Cart::new(storage.clone()), storage)
    }

    #[test]
    fn test_add_twice_increments_quantity() {
        let (mut cart, _) = cart();
        assert_eq!(cart.add(p("p1"), MinorUnits::new(500)), CartChange::Added);
        assert_eq!(cart.add(p("p1"), MinorUnits::new(500)), CartChange::Increased);

        let totals = cart.compute_totals();
        assert_eq!(totals.total_amount, MinorUnits::new(1000));
        assert_eq!(totals.total_quantity, 2);
        assert_eq!(cart.lines().len(), 1);
    }

    #[test]
    fn test_decrease_at_one_removes_line() {
        let (mut cart, _) = cart();
        cart.add(p("p1"), MinorUnits::new(500));
        cart.add(p("p1"), MinorUnits::new(500));
        cart.add(p("p2"), MinorUnits::new(250));

        assert_eq!(cart.decrease(&p("p1")), CartChange::Decreased);
        assert_eq!(cart.decrease(&p("p1")), CartChange::Removed);
        assert_eq!(cart.decrease(&p("missing")), CartChange::Unchanged);

        assert_eq!(cart.lines().len(), 1);
        assert!(cart.lines().iter().all(|l| l.quantity.get() >= 1));
        assert_eq!(cart.compute_totals().total_amount, MinorUnits::new(250));
    }

    #[test]
    fn test_remove_drops_whole_line() {
        let (mut cart, _) = cart();
        for _ in 0..3 {
            cart.add(p("p1"), MinorUnits::new(500));
        }
        assert_eq!(cart.remove(&p("p1")), CartChange::Removed);
        assert_eq!(cart.remove(&p("p1")), CartChange::Unchanged);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_clear_zeroes_totals() {
        let (mut cart, _) = cart();
        cart.add(p("p1"), MinorUnits::new(500));
        cart.clear();

        assert!(cart.is_empty());
        assert_eq!(cart.compute_totals(), CartTotals::default());
    }

    #[test]
    fn test_totals_match_lines_over_mixed_sequence() {
        let (mut cart, _) = cart();
        let ops: [(&str, bool); 9] = [
            ("a", true),
            ("b", true),
            ("a", true),
            ("c", true),
            ("a", false),
            ("b", false),
            ("c", true),
            ("d", false),
            ("a", false),
        ];
        for (id, add) in ops {
            if add {
                cart.add(p(id), MinorUnits::new(125));
            } else {
                cart.decrease(&p(id));
            }
            let expected_qty: u64 = cart.lines().iter().map(|l| u64::from(l.quantity.get())).sum();
            let totals = cart.compute_totals();
            assert_eq!(totals.total_quantity, expected_qty);
            assert_eq!(totals.total_amount, MinorUnits::new(125 * expected_qty));
        }
    }

    #[test]
    fn test_every_mutation_is_persisted() {
        let (mut cart, storage) = cart();
        cart.add(p("p1"), MinorUnits::new(500));
        cart.add(p("p1"), MinorUnits::new(500));

        let restored = Cart::load(storage.clone());
        assert_eq!(restored.lines(), cart.lines());

        cart.clear();
        assert_eq!(storage.get(CART_STORAGE_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_load_tolerates_bad_data() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(CART_STORAGE_KEY, "{oops").unwrap();
        assert!(Cart::load(storage.clone()).is_empty());

        storage
            .set(
                CART_STORAGE_KEY,
                r#"[{"productId":"p1","unitPrice":500,"quantity":1},{"productId":"p1","unitPrice":500,"quantity":2}]"#,
            )
            .unwrap();
        let cart = Cart::load(storage);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.compute_totals().total_quantity, 3);
    }

    #[test]
    fn test_storage_failure_does_not_fail_mutation() {
        let mut cart = Cart::new(Arc::new(BrokenStorage));
        cart.add(p("p1"), MinorUnits::new(500));
        assert_eq!(cart.compute_totals().total_amount, MinorUnits::new(500));
    }

    #[test]
    fn test_summary_formats_total() {
        let (mut cart, _) = cart();
        cart.add(p("p1"), MinorUnits::new(500));
        cart.add(p("p1"), MinorUnits::new(500));

        let summary = cart.summary(CurrencyCode::GHS);
        assert_eq!(summary.formatted_total, "GH₵10.00");
        assert_eq!(summary.line_count, 1);
    }
}
