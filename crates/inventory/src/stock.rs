use serde::{Deserialize, Serialize};

use mizan_core::{DomainError, DomainResult, Entity, RecordId};

/// Catalog item identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub RecordId);

/// Measurement unit identifier (piece, box, carton, ...).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub RecordId);

/// Store (warehouse) identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreId(pub RecordId);

/// Stock-unit identifier: one quantity counter row.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StockUnitId(pub RecordId);

macro_rules! impl_record_newtype {
    ($t:ty) => {
        impl $t {
            pub fn new(id: RecordId) -> Self {
                Self(id)
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

impl_record_newtype!(ItemId);
impl_record_newtype!(UnitId);
impl_record_newtype!(StoreId);
impl_record_newtype!(StockUnitId);

/// Quantity counter for one (item, store, unit) combination.
///
/// Invoice creation decrements this counter elsewhere in the application;
/// invoice cancellation increments it back through [`StockUnit::adjusted`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockUnit {
    pub id: StockUnitId,
    pub item_id: ItemId,
    pub store_id: StoreId,
    pub unit_id: UnitId,
    pub quantity: i64,
}

impl StockUnit {
    /// Return a copy with `delta` applied to the quantity.
    ///
    /// Overflow and a negative resulting quantity are invariant violations.
    pub fn adjusted(&self, delta: i64) -> DomainResult<StockUnit> {
        let quantity = self
            .quantity
            .checked_add(delta)
            .ok_or_else(|| DomainError::invariant("stock quantity overflow"))?;
        if quantity < 0 {
            return Err(DomainError::invariant("stock cannot go negative"));
        }
        Ok(StockUnit {
            quantity,
            ..self.clone()
        })
    }
}

impl Entity for StockUnit {
    type Id = StockUnitId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Persistence gateway for stock counters.
///
/// `adjust_quantity` is the read-modify-write used by invoice cancellation;
/// a persistent implementation must serialize it per stock-unit row.
pub trait StockStore {
    fn find_stock_unit(&self, id: StockUnitId) -> DomainResult<Option<StockUnit>>;

    /// Apply `delta` to a stock unit's quantity. Missing rows are an error.
    fn adjust_quantity(&self, id: StockUnitId, delta: i64) -> DomainResult<()>;
}
