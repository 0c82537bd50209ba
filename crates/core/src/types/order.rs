//! Order records and the patches applied to them.
//!
//! Field names follow the camelCase columns of the BaaS `orders` table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::cart::{CartLineItem, CartTotals};
use super::email::Email;
use super::id::{OrderId, TransactionReference};
use super::money::MinorUnits;
use super::status::{FulfillmentStatus, OrderStatus};

/// A status patch that would move an order out of a final status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("order is already {from} and cannot become {to}")]
pub struct StatusTransitionError {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

/// Where the order ships to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub name: String,
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl std::fmt::Display for ShippingAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.name, self.line1)?;
        if let Some(line2) = &self.line2 {
            write!(f, ", {line2}")?;
        }
        write!(f, ", {}", self.city)?;
        if let Some(region) = &self.region {
            write!(f, ", {region}")?;
        }
        write!(f, ", {}", self.country)
    }
}

/// An order ready to be created; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    pub customer_email: Email,
    pub shipping_address: ShippingAddress,
    pub line_items: Vec<CartLineItem>,
    pub total_amount: MinorUnits,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderDraft {
    /// Snapshot cart lines into a pending order.
    ///
    /// The lines are copied; later cart mutations do not affect the draft.
    #[must_use]
    pub fn from_cart(
        customer_email: Email,
        shipping_address: ShippingAddress,
        lines: &[CartLineItem],
        now: DateTime<Utc>,
    ) -> Self {
        let totals = CartTotals::from_lines(lines);
        Self {
            customer_email,
            shipping_address,
            line_items: lines.to_vec(),
            total_amount: totals.total_amount,
            status: OrderStatus::PendingPayment,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach the id assigned by the store.
    #[must_use]
    pub fn into_order(self, id: OrderId) -> Order {
        Order {
            id,
            customer_email: self.customer_email,
            shipping_address: self.shipping_address,
            line_items: self.line_items,
            total_amount: self.total_amount,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
            payment_reference: None,
            fulfillment_status: None,
        }
    }
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub customer_email: Email,
    pub shipping_address: ShippingAddress,
    pub line_items: Vec<CartLineItem>,
    pub total_amount: MinorUnits,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub payment_reference: Option<TransactionReference>,
    #[serde(default)]
    pub fulfillment_status: Option<FulfillmentStatus>,
}

impl Order {
    /// Apply a partial update in place.
    ///
    /// # Errors
    ///
    /// Returns an error, leaving the order untouched, if the patch would
    /// change the status of an order that is already `Completed` or `Failed`.
    pub fn apply(&mut self, patch: &OrderPatch) -> Result<(), StatusTransitionError> {
        if let Some(to) = patch.status {
            if !self.status.can_become(to) {
                return Err(StatusTransitionError {
                    from: self.status,
                    to,
                });
            }
            self.status = to;
        }
        if let Some(reference) = &patch.payment_reference {
            self.payment_reference = Some(reference.clone());
        }
        if let Some(fulfillment) = patch.fulfillment_status {
            self.fulfillment_status = Some(fulfillment);
        }
        self.updated_at = patch.updated_at;
        Ok(())
    }

    /// Sum of order totals, saturating.
    #[must_use]
    pub fn total_order_amount(orders: &[Self]) -> MinorUnits {
        orders.iter().map(|o| o.total_amount).sum()
    }
}

/// A partial update to an order. Absent fields are left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_reference: Option<TransactionReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fulfillment_status: Option<FulfillmentStatus>,
}

impl OrderPatch {
    /// Payment verified for `reference`.
    #[must_use]
    pub const fn completed(reference: TransactionReference, now: DateTime<Utc>) -> Self {
        Self {
            status: Some(OrderStatus::Completed),
            updated_at: now,
            payment_reference: Some(reference),
            fulfillment_status: None,
        }
    }

    /// Payment could not be started.
    #[must_use]
    pub const fn failed(now: DateTime<Utc>) -> Self {
        Self {
            status: Some(OrderStatus::Failed),
            updated_at: now,
            payment_reference: None,
            fulfillment_status: None,
        }
    }

    /// Administrator moved the order along the fulfilment pipeline.
    #[must_use]
    pub const fn fulfillment(status: FulfillmentStatus, now: DateTime<Utc>) -> Self {
        Self {
            status: None,
            updated_at: now,
            payment_reference: None,
            fulfillment_status: Some(status),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::num::NonZeroU32;

    use super::*;
    use crate::types::id::ProductId;

    fn line(id: &str, price: u64, qty: u32) -> CartLineItem {
        CartLineItem {
            product_id: ProductId::new(id),
            unit_price: MinorUnits::new(price),
            quantity: NonZeroU32::new(qty).unwrap(),
        }
    }

    fn draft() -> OrderDraft {
        OrderDraft::from_cart(
            Email::parse("a@b.com").unwrap(),
            ShippingAddress::default(),
            &[line("p1", 500, 2), line("p2", 250, 1)],
            DateTime::<Utc>::UNIX_EPOCH,
        )
    }

    #[test]
    fn test_draft_snapshots_cart_total() {
        let draft = draft();
        assert_eq!(draft.total_amount, MinorUnits::new(1250));
        assert_eq!(draft.status, OrderStatus::PendingPayment);
        assert_eq!(draft.line_items.len(), 2);
    }

    #[test]
    fn test_completed_patch_sets_status_and_reference() {
        let mut order = draft().into_order(OrderId::new("o1"));
        let later = DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::minutes(5);
        order
            .apply(&OrderPatch::completed(
                TransactionReference::new("ref_123"),
                later,
            ))
            .unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(
            order.payment_reference,
            Some(TransactionReference::new("ref_123"))
        );
        assert_eq!(order.updated_at, later);
        assert_eq!(order.created_at, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_fulfillment_patch_leaves_payment_status() {
        let mut order = draft().into_order(OrderId::new("o1"));
        order
            .apply(&OrderPatch::fulfillment(
                FulfillmentStatus::Shipped,
                DateTime::<Utc>::UNIX_EPOCH,
            ))
            .unwrap();
        assert_eq!(order.status, OrderStatus::PendingPayment);
        assert_eq!(order.fulfillment_status, Some(FulfillmentStatus::Shipped));
    }

    #[test]
    fn test_final_status_cannot_be_patched() {
        let mut order = draft().into_order(OrderId::new("o1"));
        let later = DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::minutes(5);
        order
            .apply(&OrderPatch::completed(
                TransactionReference::new("ref_123"),
                later,
            ))
            .unwrap();

        let err = order
            .apply(&OrderPatch::failed(later + chrono::Duration::minutes(1)))
            .unwrap_err();
        assert_eq!(
            err,
            StatusTransitionError {
                from: OrderStatus::Completed,
                to: OrderStatus::Failed,
            }
        );
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(order.updated_at, later);

        // Same status again and fulfilment moves are still accepted.
        order
            .apply(&OrderPatch::completed(
                TransactionReference::new("ref_123"),
                later,
            ))
            .unwrap();
        order
            .apply(&OrderPatch::fulfillment(FulfillmentStatus::Shipped, later))
            .unwrap();
        assert_eq!(order.fulfillment_status, Some(FulfillmentStatus::Shipped));
    }

    #[test]
    fn test_patch_omits_absent_fields() {
        let patch = OrderPatch::failed(DateTime::<Utc>::UNIX_EPOCH);
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json["status"], "Failed");
        assert!(json.get("paymentReference").is_none());
        assert!(json.get("fulfillmentStatus").is_none());
    }

    #[test]
    fn test_total_order_amount() {
        let a = draft().into_order(OrderId::new("o1"));
        let b = draft().into_order(OrderId::new("o2"));
        assert_eq!(Order::total_order_amount(&[a, b]), MinorUnits::new(2500));
        assert_eq!(Order::total_order_amount(&[]), MinorUnits::ZERO);
    }
}
