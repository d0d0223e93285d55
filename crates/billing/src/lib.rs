//! Billing domain module: purchase-side documents.
//!
//! A sales invoice can be generated directly from a supplier bill's items.
//! When that happens a shadow "receiving bill" is created mirroring the
//! qualifying lines, so stock provenance stays traceable to the purchase.

pub mod bill;

pub use bill::{Bill, BillId, BillItem, BillItemId, BillStore};
