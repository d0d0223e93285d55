use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use mizan_accounting::{AccountId, SafeId};
use mizan_core::{Entity, RecordId};

use crate::invoice::InvoiceId;

/// Payment identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(pub RecordId);

impl PaymentId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PaymentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Cheque identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChequeId(pub RecordId);

impl ChequeId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ChequeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// A payment against an invoice, moving value from a safe to the customer's
/// receivable account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub invoice_id: InvoiceId,
    pub amount: i64,
    pub details: String,
    /// Source safe the payment is drawn from.
    pub safe_id: SafeId,
    /// Destination: the customer's ledger account.
    pub account_id: AccountId,
}

impl Entity for Payment {
    type Id = PaymentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A cheque attached to an invoice when a cheque payment method is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cheque {
    pub id: ChequeId,
    pub invoice_id: InvoiceId,
    pub amount: i64,
    pub bank: String,
    pub number: String,
    pub due_date: NaiveDate,
    pub account_id: AccountId,
}

impl Entity for Cheque {
    type Id = ChequeId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
