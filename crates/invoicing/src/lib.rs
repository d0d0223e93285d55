//! Invoicing domain module.
//!
//! This crate contains the invoice lifecycle: creating, listing, updating,
//! and cancelling sales invoices, their delivery invoices, and the records
//! derived from them (payments, cheques, mirrored bill items, ledger
//! postings, stock rollback). All persistence goes through the [`Gateway`]
//! trait; this crate performs no IO of its own.

pub mod error;
pub mod gateway;
pub mod invoice;
pub mod payload;
pub mod payment;
pub mod service;

pub use error::InvoiceError;
pub use gateway::{ChequeStore, Gateway, InvoiceQuery, InvoiceStore, LedgerPoster, PaymentStore};
pub use invoice::{Invoice, InvoiceId, InvoiceItem, InvoiceItemId, Provenance};
pub use payload::{
    AuthScope, BillDerivedInvoicePayload, BillLine, ChequeInput, DeliveryInvoicePayload,
    DeliveryLine, InvoicePayload, ListFilter, PaymentInput, SalesInvoicePayload, SalesLine,
};
pub use payment::{Cheque, ChequeId, Payment, PaymentId};
pub use service::{CancellationOutcome, InvoiceLifecycleService, InvoiceOrigin};
