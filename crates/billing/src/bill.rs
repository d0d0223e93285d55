use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mizan_core::{DomainResult, Entity, RecordId};
use mizan_inventory::{ItemId, UnitId};

/// Bill identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BillId(pub RecordId);

impl BillId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for BillId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Bill item identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BillItemId(pub RecordId);

impl BillItemId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for BillItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Purchase-side document, reduced to what the invoice lifecycle touches.
///
/// A bill with `source_bill_id` set is a shadow "receiving bill" mirroring
/// another bill's lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bill {
    pub id: BillId,
    pub source_bill_id: Option<BillId>,
    pub created_at: DateTime<Utc>,
}

impl Bill {
    /// Create a shadow receiving bill referencing `source`.
    pub fn shadow_of(source: BillId, now: DateTime<Utc>) -> Self {
        Self {
            id: BillId::new(RecordId::new()),
            source_bill_id: Some(source),
            created_at: now,
        }
    }
}

impl Entity for Bill {
    type Id = BillId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// One line of a bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillItem {
    pub id: BillItemId,
    pub bill_id: BillId,
    /// Set on mirrored lines of a shadow receiving bill.
    pub source_item_id: Option<BillItemId>,
    pub item_id: ItemId,
    pub unit_id: UnitId,
    pub quantity: i64,
    pub price: i64,
    pub expense: i64,
}

impl BillItem {
    /// Mirror `source` into a shadow receiving bill with the sold quantity.
    ///
    /// Item, unit, and price carry over; expenses are not mirrored.
    pub fn mirrored(source: &BillItem, shadow_bill_id: BillId, quantity: i64) -> Self {
        Self {
            id: BillItemId::new(RecordId::new()),
            bill_id: shadow_bill_id,
            source_item_id: Some(source.id),
            item_id: source.item_id,
            unit_id: source.unit_id,
            quantity,
            price: source.price,
            expense: 0,
        }
    }
}

impl Entity for BillItem {
    type Id = BillItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Persistence gateway for bills.
pub trait BillStore {
    fn find_bill(&self, id: BillId) -> DomainResult<Option<Bill>>;
    fn create_bill(&self, bill: Bill) -> DomainResult<()>;
    fn find_bill_item(&self, id: BillItemId) -> DomainResult<Option<BillItem>>;
    fn create_bill_item(&self, item: BillItem) -> DomainResult<()>;
    fn bill_items_of(&self, bill_id: BillId) -> DomainResult<Vec<BillItem>>;
}
