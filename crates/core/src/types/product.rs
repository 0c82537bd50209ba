//! Catalog product record.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::money::MinorUnits;

/// A product as stored in the BaaS `products` table.
///
/// Read-only from the storefront's point of view. `price` is in minor units,
/// so the table must store pesewas (`5000` for GH₵50.00), not cedis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: MinorUnits,
    #[serde(rename = "imageURL", default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Product {
    /// Whether the product belongs to `category` (case-insensitive).
    #[must_use]
    pub fn in_category(&self, category: &str) -> bool {
        self.category
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case(category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_products_row() {
        let json = r#"{
            "id": "p1",
            "name": "Geomancy Primer",
            "price": 4500,
            "imageURL": "https://cdn.example.com/p1.png",
            "category": "Books",
            "brand": "Geomancy",
            "description": "An introduction"
        }"#;
        let product: Product = serde_json::from_str(json).expect("valid product row");
        assert_eq!(product.price, MinorUnits::new(4500));
        assert_eq!(
            product.image_url.as_deref(),
            Some("https://cdn.example.com/p1.png")
        );
        assert!(product.in_category("books"));
        assert!(!product.in_category("Courses"));
    }

    #[test]
    fn test_optional_columns_default() {
        let json = r#"{"id": "p2", "name": "Coaching", "price": 10000}"#;
        let product: Product = serde_json::from_str(json).expect("valid product row");
        assert!(product.category.is_none());
        assert!(!product.in_category("Coaching"));
    }
}
