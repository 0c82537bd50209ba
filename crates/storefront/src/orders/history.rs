//! Order history views.

use geomancy_core::{Email, MinorUnits, Order, OrderStatus};

/// A set of orders kept newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderHistory {
    orders: Vec<Order>,
}

impl OrderHistory {
    /// Sort `orders` newest first.
    #[must_use]
    pub fn new(mut orders: Vec<Order>) -> Self {
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Self { orders }
    }

    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Only the orders placed by `email`.
    #[must_use]
    pub fn for_customer(&self, email: &Email) -> Self {
        Self {
            orders: self
                .orders
                .iter()
                .filter(|o| &o.customer_email == email)
                .cloned()
                .collect(),
        }
    }

    /// Only the orders in `status`.
    #[must_use]
    pub fn with_status(&self, status: OrderStatus) -> Self {
        Self {
            orders: self
                .orders
                .iter()
                .filter(|o| o.status == status)
                .cloned()
                .collect(),
        }
    }

    /// Sum of all order totals.
    #[must_use]
    pub fn total_amount(&self) -> MinorUnits {
        Order::total_order_amount(&self.orders)
    }
}

impl From<Vec<Order>> for OrderHistory {
    fn from(orders: Vec<Order>) -> Self {
        Self::new(orders)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{DateTime, Utc};
    use geomancy_core::{CartLineItem, OrderDraft, OrderId, ProductId, ShippingAddress};

    use super::*;

    fn order(id: &str, email: &str, price: u64, minutes: i64) -> Order {
        OrderDraft::from_cart(
            Email::parse(email).unwrap(),
            ShippingAddress::default(),
            &[CartLineItem::new(ProductId::new("p1"), MinorUnits::new(price))],
            DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::minutes(minutes),
        )
        .into_order(OrderId::new(id))
    }

    #[test]
    fn test_history_sorted_and_totalled() {
        let history = OrderHistory::new(vec![
            order("o1", "a@b.com", 500, 1),
            order("o2", "c@d.com", 700, 3),
            order("o3", "a@b.com", 300, 2),
        ]);

        let ids: Vec<&str> = history.orders().iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, ["o2", "o3", "o1"]);
        assert_eq!(history.total_amount(), MinorUnits::new(1500));

        let mine = history.for_customer(&Email::parse("a@b.com").unwrap());
        assert_eq!(mine.len(), 2);
        assert_eq!(mine.total_amount(), MinorUnits::new(800));
    }

    #[test]
    fn test_status_filter() {
        let mut paid = order("o1", "a@b.com", 500, 1);
        paid.status = OrderStatus::Completed;
        let history = OrderHistory::new(vec![paid, order("o2", "a@b.com", 500, 2)]);

        assert_eq!(history.with_status(OrderStatus::Completed).len(), 1);
        assert!(history.with_status(OrderStatus::Failed).is_empty());
    }
}
