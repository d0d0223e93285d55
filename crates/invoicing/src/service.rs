//! The invoice lifecycle service.
//!
//! Orchestrates the five operations (list, create, read, update, delete)
//! against a [`Gateway`]. Decision logic lives here; storage and the ledger
//! posting are reached only through the gateway traits, so the service works
//! with any backend and stays directly testable with the in-memory one.

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use mizan_billing::{Bill, BillId, BillItem, BillItemId};
use mizan_core::{DomainError, RecordId};
use mizan_inventory::{StockUnitId, StoreId};
use mizan_parties::CustomerId;

use crate::error::InvoiceError;
use crate::gateway::{Gateway, InvoiceQuery};
use crate::invoice::{Invoice, InvoiceId, InvoiceItem, InvoiceItemId, Provenance};
use crate::payload::{
    AuthScope, BillDerivedInvoicePayload, ChequeInput, DeliveryInvoicePayload, InvoicePayload,
    ListFilter, PaymentInput, SalesInvoicePayload,
};
use crate::payment::{Cheque, ChequeId, Payment, PaymentId};

const DEFAULT_LIST_LIMIT: usize = 50;

/// What kind of invoice a cancellation removed. Callers route their
/// follow-up (redirects, messages) on this.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceOrigin {
    Sales,
    Delivery,
    Bill,
}

/// Structured outcome of `delete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationOutcome {
    pub cancelled_invoice_id: InvoiceId,
    pub parent_invoice_id: Option<InvoiceId>,
    pub origin: InvoiceOrigin,
}

/// Normalized document input shared by sales and bill-derived creation.
struct DocumentInput<'a> {
    customer_id: Option<CustomerId>,
    store_id: Option<StoreId>,
    bill_id: Option<BillId>,
    lines: Vec<DocLine>,
    payments: &'a [PaymentInput],
    cheque: Option<&'a ChequeInput>,
}

struct DocLine {
    stock_unit_id: StockUnitId,
    bill_item_id: Option<BillItemId>,
    quantity: i64,
    price_purchase: i64,
    price_sell: i64,
    receive: Option<i64>,
}

impl DocLine {
    /// A line counts toward the invoice only with positive quantity and sell
    /// price; everything else is skipped, not rejected.
    fn qualifies(&self) -> bool {
        self.quantity > 0 && self.price_sell > 0
    }
}

impl<'a> DocumentInput<'a> {
    fn from_sales(payload: &'a SalesInvoicePayload) -> Self {
        Self {
            customer_id: payload.customer_id,
            store_id: payload.store_id,
            bill_id: None,
            lines: payload
                .lines
                .iter()
                .map(|l| DocLine {
                    stock_unit_id: l.stock_unit_id,
                    bill_item_id: None,
                    quantity: l.quantity,
                    price_purchase: l.price_purchase,
                    price_sell: l.price_sell,
                    receive: l.receive,
                })
                .collect(),
            payments: &payload.payments,
            cheque: payload.cheque.as_ref(),
        }
    }

    fn from_bill_derived(payload: &'a BillDerivedInvoicePayload) -> Self {
        Self {
            customer_id: payload.customer_id,
            store_id: payload.store_id,
            bill_id: Some(payload.bill_id),
            lines: payload
                .lines
                .iter()
                .map(|l| DocLine {
                    stock_unit_id: l.stock_unit_id,
                    bill_item_id: Some(l.bill_item_id),
                    quantity: l.quantity,
                    price_purchase: l.price_purchase,
                    price_sell: l.price_sell,
                    receive: None,
                })
                .collect(),
            payments: &payload.payments,
            cheque: payload.cheque.as_ref(),
        }
    }
}

/// Invoice lifecycle over a persistence gateway `G`.
pub struct InvoiceLifecycleService<G> {
    gateway: G,
}

impl<G> InvoiceLifecycleService<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }
}

impl<G: Gateway> InvoiceLifecycleService<G> {
    /// List top-level invoices visible to `scope`, newest first.
    ///
    /// Dates default to today. The payed/delivered predicates run over the
    /// materialized result set, after the store query.
    pub fn list(&self, filter: &ListFilter, scope: &AuthScope) -> Result<Vec<Invoice>, InvoiceError> {
        let now = Utc::now();
        let from = filter.from_date.unwrap_or_else(|| start_of_day(now));
        let to = end_of_day(filter.to_date.unwrap_or(now));

        let query = InvoiceQuery {
            from,
            to,
            store_id: filter.store_id,
            customer_id: filter.customer_id,
        };

        let mut invoices = self.gateway.list_invoices(&query)?;
        invoices.retain(|inv| scope.covers(inv));

        if let Some(want) = filter.is_payed {
            invoices.retain(|inv| inv.is_payed() == want);
        }

        if let Some(want) = filter.is_delivered {
            let mut kept = Vec::with_capacity(invoices.len());
            for invoice in invoices {
                if self.is_delivered(&invoice)? == want {
                    kept.push(invoice);
                }
            }
            invoices = kept;
        }

        invoices.truncate(filter.limit.unwrap_or(DEFAULT_LIST_LIMIT));
        Ok(invoices)
    }

    /// Create an invoice from a tagged payload.
    pub fn create(&self, payload: &InvoicePayload) -> Result<Invoice, InvoiceError> {
        let invoice = match payload {
            InvoicePayload::Sales(p) => self
                .gateway
                .atomically(|g| Self::set_invoice(g, None, DocumentInput::from_sales(p))),
            InvoicePayload::BillDerived(p) => self
                .gateway
                .atomically(|g| Self::set_invoice(g, None, DocumentInput::from_bill_derived(p))),
            InvoicePayload::Delivery(p) => self
                .gateway
                .atomically(|g| Self::create_delivery(g, p)),
        }?;
        info!(invoice_id = %invoice.id, "invoice created");
        Ok(invoice)
    }

    /// Fetch a live invoice.
    pub fn read(&self, id: InvoiceId) -> Result<Invoice, InvoiceError> {
        self.gateway
            .find_invoice(id)?
            .ok_or(InvoiceError::not_found("invoice"))
    }

    /// Rebuild an invoice from a fresh payload (full item-set replace).
    ///
    /// Bill-derived invoices are immutable.
    pub fn update(
        &self,
        id: InvoiceId,
        payload: &SalesInvoicePayload,
    ) -> Result<Invoice, InvoiceError> {
        let invoice = self.gateway.atomically(|g| {
            let invoice = g
                .find_invoice(id)?
                .ok_or(InvoiceError::not_found("invoice"))?;
            if invoice.bill_id.is_some() {
                return Err(InvoiceError::BillDerivedImmutable);
            }
            Self::set_invoice(g, Some(invoice), DocumentInput::from_sales(payload))
        })?;
        info!(invoice_id = %invoice.id, "invoice updated");
        Ok(invoice)
    }

    /// Cancel an invoice and roll its delivered quantities back into stock.
    ///
    /// Cancelling twice is `NotFound`: the rollback is applied exactly once.
    pub fn delete(&self, id: InvoiceId) -> Result<CancellationOutcome, InvoiceError> {
        let outcome = self.gateway.atomically(|g| {
            let invoice = g
                .find_invoice(id)?
                .ok_or(InvoiceError::not_found("invoice"))?;
            let from_bill = invoice.bill_id.is_some();

            g.soft_delete_invoice(invoice.id)?;

            // Per stock unit, every quantity recorded against this invoice's
            // items by linked delivery items.
            let mut restocks: HashMap<StockUnitId, i64> = HashMap::new();
            for item in g.items_of(invoice.id)? {
                if let Provenance::StockUnit(stock_unit_id) = item.provenance {
                    let delivered: i64 = g
                        .fulfillments_of(item.id)?
                        .iter()
                        .map(|linked| linked.quantity)
                        .sum();
                    *restocks.entry(stock_unit_id).or_insert(0) += delivered;
                }
            }

            // Cancelling a delivery invoice: re-read the parent so its live
            // state reflects the removal.
            let parent = match invoice.parent_id {
                Some(parent_id) => g.find_invoice(parent_id)?,
                None => None,
            };

            for (stock_unit_id, quantity) in restocks {
                if quantity != 0 {
                    g.adjust_quantity(stock_unit_id, quantity)?;
                }
            }

            let origin = if invoice.parent_id.is_some() {
                InvoiceOrigin::Delivery
            } else if from_bill {
                InvoiceOrigin::Bill
            } else {
                InvoiceOrigin::Sales
            };

            Ok(CancellationOutcome {
                cancelled_invoice_id: invoice.id,
                parent_invoice_id: parent.map(|p| p.id).or(invoice.parent_id),
                origin,
            })
        })?;
        info!(invoice_id = %outcome.cancelled_invoice_id, origin = ?outcome.origin, "invoice cancelled");
        Ok(outcome)
    }

    /// Whether every item of the invoice is fully covered by linked delivery
    /// quantities. Invoices without items count as not delivered.
    fn is_delivered(&self, invoice: &Invoice) -> Result<bool, InvoiceError> {
        let items = self.gateway.items_of(invoice.id)?;
        if items.is_empty() {
            return Ok(false);
        }
        for item in items {
            let delivered: i64 = self
                .gateway
                .fulfillments_of(item.id)?
                .iter()
                .map(|linked| linked.quantity)
                .sum();
            if delivered < item.quantity {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Record delivery against an existing sales invoice: a delivery-invoice
    /// shell plus one transfer item per positive-quantity line.
    fn create_delivery(g: &G, payload: &DeliveryInvoicePayload) -> Result<Invoice, InvoiceError> {
        if payload.lines.is_empty() {
            return Err(InvoiceError::EmptyItemSet);
        }

        let parent = g
            .find_invoice(payload.parent_invoice_id)?
            .ok_or(InvoiceError::not_found("invoice"))?;

        let now = Utc::now();
        let shell = Invoice::delivery_shell(parent.id, now);
        g.create_invoice(shell.clone())?;

        for line in &payload.lines {
            if line.quantity <= 0 {
                continue;
            }
            let sales_item = g
                .find_invoice_item(line.sales_item_id)?
                .ok_or(InvoiceError::not_found("invoice item"))?;
            let stock_unit_id = sales_item.stock_unit_id().ok_or_else(|| {
                DomainError::invariant("sales item has no stock-unit provenance")
            })?;
            let stock_unit = g
                .find_stock_unit(stock_unit_id)?
                .ok_or(InvoiceError::not_found("stock unit"))?;

            g.create_invoice_item(InvoiceItem {
                id: InvoiceItemId::new(RecordId::new()),
                invoice_id: shell.id,
                item_id: stock_unit.item_id,
                unit_id: stock_unit.unit_id,
                quantity: line.quantity,
                price_purchase: 0,
                price_sell: 0,
                provenance: Provenance::StockUnit(stock_unit.id),
                fulfills: Some(sales_item.id),
            })?;
        }

        Ok(shell)
    }

    /// Build or rebuild a sales invoice and all of its dependent records.
    ///
    /// This is the multi-entity consistency core: shadow receiving bill,
    /// item set, speculative receiving invoice, ledger posting, payments,
    /// cheque, and the amount/payed/remain triple.
    fn set_invoice(
        g: &G,
        existing: Option<Invoice>,
        doc: DocumentInput<'_>,
    ) -> Result<Invoice, InvoiceError> {
        let customer_id = doc.customer_id.ok_or(InvoiceError::MissingCustomer)?;
        let now = Utc::now();

        let bill = match doc.bill_id {
            Some(bill_id) => Some(
                g.find_bill(bill_id)?
                    .ok_or(InvoiceError::not_found("bill"))?,
            ),
            None => None,
        };

        // Shadow receiving bill, mirrored under the original.
        let shadow_bill = match &bill {
            Some(bill) => {
                let shadow = Bill::shadow_of(bill.id, now);
                g.create_bill(shadow.clone())?;
                Some(shadow)
            }
            None => None,
        };

        let mut invoice = match existing {
            Some(mut invoice) => {
                // Full-replace semantics: the old item set never survives
                // into the new computation.
                g.clear_items(invoice.id)?;
                invoice.customer_id = Some(customer_id);
                invoice.store_id = doc.store_id;
                g.update_invoice(&invoice)?;
                invoice
            }
            None => {
                let invoice = Invoice {
                    id: InvoiceId::new(RecordId::new()),
                    parent_id: None,
                    bill_id: doc.bill_id,
                    customer_id: Some(customer_id),
                    store_id: doc.store_id,
                    amount: 0,
                    payed: 0,
                    remain: 0,
                    created_at: now,
                    cancelled_at: None,
                };
                g.create_invoice(invoice.clone())?;
                invoice
            }
        };

        let payed: i64 = doc.payments.iter().map(|p| p.amount).sum();

        // Speculative receiving invoice; pruned below when it stays empty.
        let receiving = Invoice::delivery_shell(invoice.id, now);
        g.create_invoice(receiving.clone())?;

        let mut total1: i64 = 0;
        let mut total2: i64 = 0;
        for line in &doc.lines {
            if !line.qualifies() {
                continue;
            }

            let stock_unit = g
                .find_stock_unit(line.stock_unit_id)?
                .ok_or(InvoiceError::not_found("stock unit"))?;

            // Bonus is re-read and the net total recomputed on every line;
            // the persisted value is the last iteration's.
            let customer = g
                .find_customer(customer_id)?
                .ok_or(InvoiceError::not_found("customer"))?;
            let line_total = line
                .quantity
                .checked_mul(line.price_sell)
                .ok_or_else(|| DomainError::invariant("invoice line total overflow"))?;
            total1 = total1
                .checked_add(line_total)
                .ok_or_else(|| DomainError::invariant("invoice total overflow"))?;
            total2 = customer.net_of_bonus(total1);

            let mirrored = match line.bill_item_id {
                Some(bill_item_id) => {
                    let source = g
                        .find_bill_item(bill_item_id)?
                        .ok_or(InvoiceError::not_found("bill item"))?;
                    let shadow = shadow_bill.as_ref().ok_or_else(|| {
                        DomainError::invariant("bill line outside a bill-derived invoice")
                    })?;
                    let mirror = BillItem::mirrored(&source, shadow.id, line.quantity);
                    g.create_bill_item(mirror.clone())?;
                    Some(mirror)
                }
                None => None,
            };

            let provenance = match &mirrored {
                Some(mirror) => Provenance::BillItem(mirror.id),
                None => Provenance::StockUnit(stock_unit.id),
            };
            let sales_item = InvoiceItem {
                id: InvoiceItemId::new(RecordId::new()),
                invoice_id: invoice.id,
                item_id: stock_unit.item_id,
                unit_id: stock_unit.unit_id,
                quantity: line.quantity,
                price_purchase: line.price_purchase,
                price_sell: line.price_sell,
                provenance,
                fulfills: None,
            };
            g.create_invoice_item(sales_item.clone())?;

            match &mirrored {
                // Bill-derived lines transfer in full.
                Some(mirror) => {
                    g.create_invoice_item(InvoiceItem {
                        id: InvoiceItemId::new(RecordId::new()),
                        invoice_id: receiving.id,
                        item_id: mirror.item_id,
                        unit_id: mirror.unit_id,
                        quantity: line.quantity,
                        price_purchase: 0,
                        price_sell: 0,
                        provenance: Provenance::BillItem(mirror.id),
                        fulfills: Some(sales_item.id),
                    })?;
                }
                // Direct lines transfer only what was explicitly received.
                None => {
                    if let Some(receive) = line.receive.filter(|q| *q > 0) {
                        g.create_invoice_item(InvoiceItem {
                            id: InvoiceItemId::new(RecordId::new()),
                            invoice_id: receiving.id,
                            item_id: stock_unit.item_id,
                            unit_id: stock_unit.unit_id,
                            quantity: receive,
                            price_purchase: 0,
                            price_sell: 0,
                            provenance: Provenance::StockUnit(stock_unit.id),
                            fulfills: Some(sales_item.id),
                        })?;
                    }
                }
            }
        }

        let remain = total2 - payed;

        // Ledger posting happens before the final amount persist.
        g.post_invoice_entry(&invoice, total2)?;

        if g.items_of(receiving.id)?.is_empty() {
            debug!(invoice_id = %receiving.id, "pruning empty receiving invoice");
            g.soft_delete_invoice(receiving.id)?;
        }

        if !doc.payments.is_empty() {
            let customer = g
                .find_customer(customer_id)?
                .ok_or(InvoiceError::not_found("customer"))?;
            for payment in doc.payments {
                if payment.amount != 0 {
                    // Existing behavior: the net invoice total is recorded
                    // per payment line, not the line's own amount.
                    g.create_payment(Payment {
                        id: PaymentId::new(RecordId::new()),
                        invoice_id: invoice.id,
                        amount: total2,
                        details: format!("payment for sales invoice {}", invoice.id),
                        safe_id: payment.safe_id,
                        account_id: customer.account_id,
                    })?;
                }
            }
        }

        if let Some(cheque) = doc.cheque {
            g.create_cheque(Cheque {
                id: ChequeId::new(RecordId::new()),
                invoice_id: invoice.id,
                amount: cheque.amount,
                bank: cheque.bank.clone(),
                number: cheque.number.clone(),
                due_date: cheque.due_date,
                account_id: cheque.account_id,
            })?;
        }

        if invoice.amount != total2 || invoice.payed != payed || invoice.remain != remain {
            invoice.amount = total2;
            invoice.payed = payed;
            invoice.remain = remain;
            g.update_invoice(&invoice)?;
        }

        Ok(invoice)
    }
}

fn start_of_day(at: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(
        &at.date_naive()
            .and_hms_opt(0, 0, 0)
            .unwrap_or_else(|| at.naive_utc()),
    )
}

fn end_of_day(at: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(
        &at.date_naive()
            .and_hms_micro_opt(23, 59, 59, 999_999)
            .unwrap_or_else(|| at.naive_utc()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn day_bounds_bracket_the_given_instant() {
        let at = Utc.with_ymd_and_hms(2024, 5, 17, 13, 45, 12).unwrap();
        let from = start_of_day(at);
        let to = end_of_day(at);

        assert_eq!(from.date_naive(), at.date_naive());
        assert_eq!((from.hour(), from.minute(), from.second()), (0, 0, 0));
        assert_eq!(to.date_naive(), at.date_naive());
        assert_eq!((to.hour(), to.minute(), to.second()), (23, 59, 59));
        assert!(from <= at && at <= to);
    }

    #[test]
    fn only_positive_quantity_and_sell_qualify() {
        let line = |quantity: i64, price_sell: i64| DocLine {
            stock_unit_id: StockUnitId::new(RecordId::new()),
            bill_item_id: None,
            quantity,
            price_purchase: 0,
            price_sell,
            receive: None,
        };

        assert!(line(1, 1).qualifies());
        assert!(!line(0, 10).qualifies());
        assert!(!line(-2, 10).qualifies());
        assert!(!line(3, 0).qualifies());
        assert!(!line(3, -1).qualifies());
    }
}
