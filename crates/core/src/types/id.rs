//! Newtype IDs for type-safe entity references.
//!
//! Identifiers in Geomancy Shop are opaque strings assigned by someone else:
//! the BaaS assigns order and product ids, the payment gateway assigns
//! transaction references. Use the `define_id!` macro to create wrappers that
//! prevent accidentally passing an order id where a reference is expected.

/// Macro to define a type-safe, string-backed ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use geomancy_core::define_id;
/// define_id!(InvoiceId);
/// define_id!(ShipmentId);
///
/// let invoice = InvoiceId::new("inv_1");
/// let shipment = ShipmentId::new("inv_1");
///
/// // These are different types, so this won't compile:
/// // let _: InvoiceId = shipment;
/// assert_eq!(invoice.as_str(), shipment.as_str());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the owned string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(ProductId);
define_id!(OrderId);
define_id!(TransactionReference);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_serializes_as_plain_string() {
        let id = OrderId::new("o1");
        assert_eq!(serde_json::to_string(&id).ok().as_deref(), Some("\"o1\""));
    }

    #[test]
    fn test_id_display_and_conversions() {
        let reference = TransactionReference::from("ref_123");
        assert_eq!(reference.to_string(), "ref_123");
        assert_eq!(reference.as_str(), "ref_123");
        assert_eq!(reference.into_inner(), "ref_123".to_owned());
    }
}
