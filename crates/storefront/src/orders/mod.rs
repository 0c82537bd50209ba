//! Order persistence.
//!
//! Orders are created once per checkout attempt in `PendingPayment` and only
//! change through [`OrderPatch`]es afterwards. There is no locking: two
//! writers patching the same order race, and the last write wins.

mod history;
mod memory;
mod rest;

pub use history::OrderHistory;
pub use memory::MemoryOrderStore;
pub use rest::RestOrderStore;

use std::future::Future;

use geomancy_core::{Email, Order, OrderDraft, OrderId, OrderPatch};
use thiserror::Error;

use crate::baas::BaasError;

/// Errors returned by an [`OrderStore`].
#[derive(Debug, Error)]
pub enum OrderStoreError {
    /// The store refused the write (constraint violation, permissions).
    #[error("order write rejected: {0}")]
    Storage(String),

    /// No order has this id.
    #[error("order not found: {0}")]
    NotFound(OrderId),

    /// The store could not be reached or answered garbage.
    #[error("order store unavailable: {0}")]
    Http(#[source] BaasError),
}

impl From<BaasError> for OrderStoreError {
    fn from(err: BaasError) -> Self {
        match err {
            BaasError::Api { status, message } => Self::Storage(format!("{status}: {message}")),
            other => Self::Http(other),
        }
    }
}

/// Create, read and patch order records.
pub trait OrderStore: Send + Sync {
    /// Persist a new order and return the id the store assigned.
    fn create(
        &self,
        draft: OrderDraft,
    ) -> impl Future<Output = Result<OrderId, OrderStoreError>> + Send;

    /// Apply a partial update, returning the updated order.
    ///
    /// Fails with [`OrderStoreError::NotFound`] if no order matches `id`.
    fn update(
        &self,
        id: &OrderId,
        patch: OrderPatch,
    ) -> impl Future<Output = Result<Order, OrderStoreError>> + Send;

    /// Fetch one order.
    fn get(&self, id: &OrderId) -> impl Future<Output = Result<Order, OrderStoreError>> + Send;

    /// All orders, newest first.
    fn list(&self) -> impl Future<Output = Result<Vec<Order>, OrderStoreError>> + Send;

    /// One customer's orders, newest first.
    fn list_for_customer(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<Vec<Order>, OrderStoreError>> + Send;
}

impl<T: OrderStore> OrderStore for std::sync::Arc<T> {
    fn create(
        &self,
        draft: OrderDraft,
    ) -> impl Future<Output = Result<OrderId, OrderStoreError>> + Send {
        (**self).create(draft)
    }

    fn update(
        &self,
        id: &OrderId,
        patch: OrderPatch,
    ) -> impl Future<Output = Result<Order, OrderStoreError>> + Send {
        (**self).update(id, patch)
    }

    fn get(&self, id: &OrderId) -> impl Future<Output = Result<Order, OrderStoreError>> + Send {
        (**self).get(id)
    }

    fn list(&self) -> impl Future<Output = Result<Vec<Order>, OrderStoreError>> + Send {
        (**self).list()
    }

    fn list_for_customer(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<Vec<Order>, OrderStoreError>> + Send {
        (**self).list_for_customer(email)
    }
}
