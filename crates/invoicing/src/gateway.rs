//! Persistence gateway traits.
//!
//! The lifecycle service composes these instead of reaching into an ORM:
//! relationship traversal becomes explicit query methods (`items_of`,
//! `fulfillments_of`), soft deletion is a store concern, and the whole of a
//! mutating operation runs inside [`Gateway::atomically`].

use chrono::{DateTime, Utc};

use mizan_billing::BillStore;
use mizan_core::DomainResult;
use mizan_inventory::{StockStore, StoreId};
use mizan_parties::{CustomerId, CustomerStore};

use crate::error::InvoiceError;
use crate::invoice::{Invoice, InvoiceId, InvoiceItem, InvoiceItemId};
use crate::payment::{Cheque, Payment};

/// Query shape pushed down to the invoice store by `list`.
///
/// Only top-level invoices (no parent) match. The payed/delivered predicates
/// are applied by the service after materialization, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub store_id: Option<StoreId>,
    pub customer_id: Option<CustomerId>,
}

/// Persistence gateway for invoices and their items.
pub trait InvoiceStore {
    fn create_invoice(&self, invoice: Invoice) -> DomainResult<()>;

    /// Find a live invoice. Cancelled (soft-deleted) invoices are `None`.
    fn find_invoice(&self, id: InvoiceId) -> DomainResult<Option<Invoice>>;

    fn update_invoice(&self, invoice: &Invoice) -> DomainResult<()>;

    /// Mark an invoice cancelled. Its items remain queryable.
    fn soft_delete_invoice(&self, id: InvoiceId) -> DomainResult<()>;

    /// Top-level invoices matching `query`, newest first.
    fn list_invoices(&self, query: &InvoiceQuery) -> DomainResult<Vec<Invoice>>;

    fn create_invoice_item(&self, item: InvoiceItem) -> DomainResult<()>;

    fn find_invoice_item(&self, id: InvoiceItemId) -> DomainResult<Option<InvoiceItem>>;

    /// All items of an invoice, including items of a cancelled invoice.
    fn items_of(&self, invoice_id: InvoiceId) -> DomainResult<Vec<InvoiceItem>>;

    /// Remove all items of an invoice (full-replace update semantics).
    fn clear_items(&self, invoice_id: InvoiceId) -> DomainResult<()>;

    /// Delivery items fulfilling a given sales item (`fulfills` back-links).
    fn fulfillments_of(&self, item_id: InvoiceItemId) -> DomainResult<Vec<InvoiceItem>>;
}

/// Persistence gateway for payments.
pub trait PaymentStore {
    fn create_payment(&self, payment: Payment) -> DomainResult<()>;
    fn payments_of(&self, invoice_id: InvoiceId) -> DomainResult<Vec<Payment>>;
}

/// Persistence gateway for cheques.
pub trait ChequeStore {
    fn create_cheque(&self, cheque: Cheque) -> DomainResult<()>;
    fn cheques_of(&self, invoice_id: InvoiceId) -> DomainResult<Vec<Cheque>>;
}

/// Accounting collaborator: posts a balanced ledger entry for the invoice's
/// net total against the customer's account. Opaque to the lifecycle.
pub trait LedgerPoster {
    fn post_invoice_entry(&self, invoice: &Invoice, net_total: i64) -> DomainResult<()>;
}

/// The full persistence surface the lifecycle service runs against.
///
/// `atomically` is the per-request transaction boundary: when the closure
/// fails, no partial write may survive.
pub trait Gateway:
    InvoiceStore + PaymentStore + ChequeStore + LedgerPoster + BillStore + StockStore + CustomerStore
{
    fn atomically<T>(
        &self,
        f: impl FnOnce(&Self) -> Result<T, InvoiceError>,
    ) -> Result<T, InvoiceError>
    where
        Self: Sized;
}
