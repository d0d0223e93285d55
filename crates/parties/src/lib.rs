//! Parties domain module.
//!
//! Only the customer surface the invoice lifecycle reads: the ledger account
//! payments are credited to and the bonus (discount) percentage applied to
//! gross invoice totals.

pub mod customer;

pub use customer::{Customer, CustomerId, CustomerStore};
