//! Inventory domain module.
//!
//! Stock is tracked as a mutable quantity counter per (item, store, unit)
//! combination. This crate contains the counter entity, its checked
//! adjustment rules, and the store trait the rest of the system reaches
//! stock through.

pub mod stock;

pub use stock::{ItemId, StockStore, StockUnit, StockUnitId, StoreId, UnitId};
