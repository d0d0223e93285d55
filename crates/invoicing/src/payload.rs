//! Operation inputs.
//!
//! The three invoice shapes arrive as distinct tagged payloads, resolved by
//! the caller before reaching the lifecycle service. The payloads replace the
//! loosely-typed request bag of the surrounding web layer: parallel arrays
//! become line structs, the session user becomes an explicit [`AuthScope`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use mizan_accounting::{AccountId, SafeId};
use mizan_billing::{BillId, BillItemId};
use mizan_core::UserId;
use mizan_inventory::{StockUnitId, StoreId};
use mizan_parties::CustomerId;

use crate::invoice::{Invoice, InvoiceId, InvoiceItemId};

/// The current user's permitted store and customer sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthScope {
    pub user_id: UserId,
    pub store_ids: Vec<StoreId>,
    pub customer_ids: Vec<CustomerId>,
}

impl AuthScope {
    /// Whether a listed invoice falls inside this scope.
    pub fn covers(&self, invoice: &Invoice) -> bool {
        invoice
            .store_id
            .is_some_and(|s| self.store_ids.contains(&s))
            && invoice
                .customer_id
                .is_some_and(|c| self.customer_ids.contains(&c))
    }
}

/// One line of a sales invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesLine {
    pub stock_unit_id: StockUnitId,
    pub quantity: i64,
    pub price_purchase: i64,
    pub price_sell: i64,
    /// Quantity delivered immediately, when the caller records a (possibly
    /// partial) delivery together with the sale.
    pub receive: Option<i64>,
}

/// One line of a bill-derived sales invoice. Delivery is implied in full, so
/// there is no `receive`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillLine {
    pub stock_unit_id: StockUnitId,
    pub bill_item_id: BillItemId,
    pub quantity: i64,
    pub price_purchase: i64,
    pub price_sell: i64,
}

/// One line of a delivery-only creation: how much of an existing sales
/// invoice item is being delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryLine {
    pub sales_item_id: InvoiceItemId,
    pub quantity: i64,
}

/// One payment instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInput {
    pub safe_id: SafeId,
    pub amount: i64,
}

/// Cheque details, when a cheque payment method is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChequeInput {
    pub amount: i64,
    pub bank: String,
    pub number: String,
    pub due_date: NaiveDate,
    pub account_id: AccountId,
}

/// Payload for creating or updating a sales invoice.
///
/// `customer_id` is optional on purpose: its absence is an error condition
/// signaled to the caller (`MissingCustomer`), not a malformed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesInvoicePayload {
    pub customer_id: Option<CustomerId>,
    pub store_id: Option<StoreId>,
    pub lines: Vec<SalesLine>,
    pub payments: Vec<PaymentInput>,
    pub cheque: Option<ChequeInput>,
}

/// Payload for generating a sales invoice from a supplier bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillDerivedInvoicePayload {
    pub customer_id: Option<CustomerId>,
    pub store_id: Option<StoreId>,
    pub bill_id: BillId,
    pub lines: Vec<BillLine>,
    pub payments: Vec<PaymentInput>,
    pub cheque: Option<ChequeInput>,
}

/// Payload for recording delivery against an existing sales invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryInvoicePayload {
    pub parent_invoice_id: InvoiceId,
    pub lines: Vec<DeliveryLine>,
}

/// Tagged creation payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoicePayload {
    Sales(SalesInvoicePayload),
    BillDerived(BillDerivedInvoicePayload),
    Delivery(DeliveryInvoicePayload),
}

/// Listing filters. All fields optional; dates default to today.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFilter {
    pub store_id: Option<StoreId>,
    pub customer_id: Option<CustomerId>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub is_payed: Option<bool>,
    pub is_delivered: Option<bool>,
    pub limit: Option<usize>,
}
