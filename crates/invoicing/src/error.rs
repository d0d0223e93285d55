//! Invoice lifecycle error taxonomy.

use thiserror::Error;

use mizan_core::DomainError;

/// Failures surfaced by the invoice lifecycle operations.
///
/// Lines with non-positive quantity or sell price are not errors: they are
/// silently skipped during accumulation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvoiceError {
    /// No customer id was supplied on create/update.
    #[error("no customer selected")]
    MissingCustomer,

    /// Delivery-only creation was requested with no item lines.
    #[error("no items in the invoice")]
    EmptyItemSet,

    /// A referenced record does not exist (or is already cancelled).
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// Invoices generated from an external supplier bill cannot be edited.
    #[error("cannot edit an invoice generated from a supplier bill")]
    BillDerivedImmutable,

    /// Gateway or invariant failure.
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl InvoiceError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }
}
