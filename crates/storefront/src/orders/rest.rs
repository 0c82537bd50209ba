//! [`OrderStore`] backed by the BaaS `orders` table.

use geomancy_core::{
    Email, Order, OrderDraft, OrderId, OrderPatch, OrderStatus, StatusTransitionError,
};
use tracing::{info, instrument};

use super::{OrderStore, OrderStoreError};
use crate::baas::{BaasClient, eq_filter};

const TABLE: &str = "orders";
const NEWEST_FIRST: &str = "order=createdAt.desc";

/// Orders stored through the BaaS REST interface.
#[derive(Debug, Clone)]
pub struct RestOrderStore {
    baas: BaasClient,
}

impl RestOrderStore {
    #[must_use]
    pub const fn new(baas: BaasClient) -> Self {
        Self { baas }
    }
}

impl OrderStore for RestOrderStore {
    #[instrument(
        skip(self, draft),
        fields(customer = %draft.customer_email, amount = %draft.total_amount)
    )]
    async fn create(&self, draft: OrderDraft) -> Result<OrderId, OrderStoreError> {
        let rows: Vec<Order> = self.baas.insert(TABLE, &draft).await?;
        let order = rows.into_iter().next().ok_or_else(|| {
            OrderStoreError::Storage("insert returned no representation".to_string())
        })?;

        info!(order_id = %order.id, "Order created");
        Ok(order.id)
    }

    #[instrument(skip(self, patch), fields(order_id = %id))]
    async fn update(&self, id: &OrderId, patch: OrderPatch) -> Result<Order, OrderStoreError> {
        // A status change only matches rows that are still pending or already there.
        let filter = match patch.status {
            Some(to) => format!(
                "{}&status=in.({},{to})",
                eq_filter("id", id.as_str()),
                OrderStatus::PendingPayment
            ),
            None => eq_filter("id", id.as_str()),
        };
        let rows: Vec<Order> = self.baas.update(TABLE, &filter, &patch).await?;

        if let Some(order) = rows.into_iter().next() {
            info!(status = %order.status, "Order updated");
            return Ok(order);
        }

        match patch.status {
            Some(to) => {
                let current = self.get(id).await?;
                Err(OrderStoreError::Storage(
                    StatusTransitionError {
                        from: current.status,
                        to,
                    }
                    .to_string(),
                ))
            }
            None => Err(OrderStoreError::NotFound(id.clone())),
        }
    }

    #[instrument(skip(self), fields(order_id = %id))]
    async fn get(&self, id: &OrderId) -> Result<Order, OrderStoreError> {
        let query = format!("select=*&{}", eq_filter("id", id.as_str()));
        let rows: Vec<Order> = self.baas.select(TABLE, &query).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| OrderStoreError::NotFound(id.clone()))
    }

    async fn list(&self) -> Result<Vec<Order>, OrderStoreError> {
        let query = format!("select=*&{NEWEST_FIRST}");
        Ok(self.baas.select(TABLE, &query).await?)
    }

    #[instrument(skip(self))]
    async fn list_for_customer(&self, email: &Email) -> Result<Vec<Order>, OrderStoreError> {
        let query = format!(
            "select=*&{}&{NEWEST_FIRST}",
            eq_filter("customerEmail", email.as_str())
        );
        Ok(self.baas.select(TABLE, &query).await?)
    }
}
