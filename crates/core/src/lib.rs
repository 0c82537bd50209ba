//! Geomancy Shop Core - Shared domain types.
//!
//! This crate provides the types shared by every Geomancy Shop component:
//! - `relay` - Payment relay server in front of the hosted payment gateway
//! - `storefront` - Cart, order store and checkout orchestration
//! - `cli` - Command-line driver for the storefront and order administration
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. Every monetary amount is expressed in minor currency
//! units ([`MinorUnits`]); conversion to a display string happens only at
//! the edges.
//!
//! # Modules
//!
//! - [`types`] - IDs, emails, money, statuses, orders, cart lines, products
//!   and the relay wire types

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
