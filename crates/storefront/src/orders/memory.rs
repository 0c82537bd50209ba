//! In-process [`OrderStore`] for tests and offline runs.

use std::sync::Mutex;

use geomancy_core::{Email, Order, OrderDraft, OrderId, OrderPatch};

use super::{OrderStore, OrderStoreError};

/// Orders held in memory. Ids are assigned sequentially: `o1`, `o2`, ...
#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    orders: Mutex<Vec<Order>>,
}

impl MemoryOrderStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing orders.
    #[must_use]
    pub fn with_orders(orders: Vec<Order>) -> Self {
        Self {
            orders: Mutex::new(orders),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Order>>, OrderStoreError> {
        self.orders
            .lock()
            .map_err(|_| OrderStoreError::Storage("order store lock poisoned".to_string()))
    }
}

fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    orders
}

impl OrderStore for MemoryOrderStore {
    async fn create(&self, draft: OrderDraft) -> Result<OrderId, OrderStoreError> {
        if draft.line_items.is_empty() {
            return Err(OrderStoreError::Storage(
                "lineItems must not be empty".to_string(),
            ));
        }

        let mut orders = self.lock()?;
        let id = OrderId::new(format!("o{}", orders.len() + 1));
        orders.push(draft.into_order(id.clone()));
        Ok(id)
    }

    async fn update(&self, id: &OrderId, patch: OrderPatch) -> Result<Order, OrderStoreError> {
        let mut orders = self.lock()?;
        let order = orders
            .iter_mut()
            .find(|o| &o.id == id)
            .ok_or_else(|| OrderStoreError::NotFound(id.clone()))?;
        order
            .apply(&patch)
            .map_err(|e| OrderStoreError::Storage(e.to_string()))?;
        Ok(order.clone())
    }

    async fn get(&self, id: &OrderId) -> Result<Order, OrderStoreError> {
        self.lock()?
            .iter()
            .find(|o| &o.id == id)
            .cloned()
            .ok_or_else(|| OrderStoreError::NotFound(id.clone()))
    }

    async fn list(&self) -> Result<Vec<Order>, OrderStoreError> {
        Ok(newest_first(self.lock()?.clone()))
    }

    async fn list_for_customer(&self, email: &Email) -> Result<Vec<Order>, OrderStoreError> {
        let mine = self
            .lock()?
            .iter()
            .filter(|o| &o.customer_email == email)
            .cloned()
            .collect();
        Ok(newest_first(mine))
    }
}
