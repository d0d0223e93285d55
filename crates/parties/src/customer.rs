use serde::{Deserialize, Serialize};

use mizan_accounting::AccountId;
use mizan_core::{DomainResult, Entity, RecordId};

/// Customer identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub RecordId);

impl CustomerId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Customer, reduced to the fields the invoice lifecycle reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    /// The customer's receivable ledger account. Payments move value into it.
    pub account_id: AccountId,
    /// Discount percentage applied to the gross invoice total.
    pub bonus: i64,
}

impl Customer {
    /// Net total after applying the bonus percentage to a gross total.
    pub fn net_of_bonus(&self, gross: i64) -> i64 {
        gross - gross * self.bonus / 100
    }
}

impl Entity for Customer {
    type Id = CustomerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Persistence gateway for customers.
pub trait CustomerStore {
    fn find_customer(&self, id: CustomerId) -> DomainResult<Option<Customer>>;
}
