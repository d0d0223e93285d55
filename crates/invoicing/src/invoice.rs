use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mizan_billing::{BillId, BillItemId};
use mizan_core::{Entity, RecordId};
use mizan_inventory::{ItemId, StockUnitId, StoreId, UnitId};
use mizan_parties::CustomerId;

/// Invoice identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(pub RecordId);

impl InvoiceId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Invoice item identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceItemId(pub RecordId);

impl InvoiceItemId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for InvoiceItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// An invoice document.
///
/// Three shapes share this struct:
/// - **sales invoice**: top-level, `parent_id == None`;
/// - **delivery invoice**: `parent_id` set, records physical transfer of
///   already-sold items and carries no independent amounts;
/// - **bill-derived invoice**: a sales invoice with `bill_id` set, generated
///   from a supplier bill's lines.
///
/// Amounts are in the smallest currency unit. `remain == amount - payed`
/// after every create and update; `remain` goes negative on overpayment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub parent_id: Option<InvoiceId>,
    pub bill_id: Option<BillId>,
    pub customer_id: Option<CustomerId>,
    pub store_id: Option<StoreId>,
    pub amount: i64,
    pub payed: i64,
    pub remain: i64,
    pub created_at: DateTime<Utc>,
    /// Soft-delete marker. Cancelled invoices disappear from lookups but
    /// their items stay traversable for stock rollback.
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Invoice {
    /// An empty delivery-invoice shell under `parent`, ready to receive
    /// item-transfer records.
    pub fn delivery_shell(parent: InvoiceId, now: DateTime<Utc>) -> Self {
        Self {
            id: InvoiceId::new(RecordId::new()),
            parent_id: Some(parent),
            bill_id: None,
            customer_id: None,
            store_id: None,
            amount: 0,
            payed: 0,
            remain: 0,
            created_at: now,
            cancelled_at: None,
        }
    }

    pub fn is_delivery(&self) -> bool {
        self.parent_id.is_some()
    }

    pub fn is_payed(&self) -> bool {
        self.remain <= 0
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled_at.is_some()
    }
}

impl Entity for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Where an invoice item's goods come from.
///
/// Exactly one provenance per item, by construction: a direct stock unit,
/// or a bill item when the invoice derives from a purchase bill.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    StockUnit(StockUnitId),
    BillItem(BillItemId),
}

/// One line of an invoice.
///
/// `fulfills` links a delivery-invoice item back to the sales-invoice item it
/// fulfills; it is `None` on sales lines. Delivery lines carry no prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: InvoiceItemId,
    pub invoice_id: InvoiceId,
    pub item_id: ItemId,
    pub unit_id: UnitId,
    pub quantity: i64,
    pub price_purchase: i64,
    pub price_sell: i64,
    pub provenance: Provenance,
    pub fulfills: Option<InvoiceItemId>,
}

impl InvoiceItem {
    pub fn stock_unit_id(&self) -> Option<StockUnitId> {
        match self.provenance {
            Provenance::StockUnit(id) => Some(id),
            Provenance::BillItem(_) => None,
        }
    }
}

impl Entity for InvoiceItem {
    type Id = InvoiceItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_shell_points_at_its_parent() {
        let parent = InvoiceId::new(RecordId::new());
        let shell = Invoice::delivery_shell(parent, Utc::now());
        assert_eq!(shell.parent_id, Some(parent));
        assert!(shell.is_delivery());
        assert_eq!(shell.amount, 0);
        assert_eq!(shell.remain, 0);
        assert!(!shell.is_cancelled());
    }

    #[test]
    fn payed_follows_remain() {
        let mut invoice = Invoice::delivery_shell(InvoiceId::new(RecordId::new()), Utc::now());
        invoice.parent_id = None;
        invoice.amount = 100;
        invoice.payed = 40;
        invoice.remain = 60;
        assert!(!invoice.is_payed());

        invoice.payed = 100;
        invoice.remain = 0;
        assert!(invoice.is_payed());

        // Overpayment still counts as payed.
        invoice.payed = 120;
        invoice.remain = -20;
        assert!(invoice.is_payed());
    }

    #[test]
    fn provenance_is_exclusive() {
        let stock = StockUnitId::new(RecordId::new());
        let item = InvoiceItem {
            id: InvoiceItemId::new(RecordId::new()),
            invoice_id: InvoiceId::new(RecordId::new()),
            item_id: ItemId::new(RecordId::new()),
            unit_id: UnitId::new(RecordId::new()),
            quantity: 1,
            price_purchase: 0,
            price_sell: 10,
            provenance: Provenance::StockUnit(stock),
            fulfills: None,
        };
        assert_eq!(item.stock_unit_id(), Some(stock));

        let item = InvoiceItem {
            provenance: Provenance::BillItem(BillItemId::new(RecordId::new())),
            ..item
        };
        assert_eq!(item.stock_unit_id(), None);
    }
}
