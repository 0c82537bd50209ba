//! Core types for Geomancy Shop.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod email;
pub mod id;
pub mod money;
pub mod order;
pub mod product;
pub mod relay;
pub mod status;

pub use cart::{CartLineItem, CartTotals};
pub use email::{Email, EmailError};
pub use id::*;
pub use money::{CurrencyCode, MinorUnits, MoneyError};
pub use order::{Order, OrderDraft, OrderPatch, ShippingAddress, StatusTransitionError};
pub use product::Product;
pub use relay::{
    InitializeTransactionRequest, InitializeTransactionResponse, RelayErrorBody, RelayLineItem,
    VerifyTransactionResponse,
};
pub use status::*;
