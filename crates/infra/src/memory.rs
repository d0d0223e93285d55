//! In-memory persistence gateway.
//!
//! A single `Mutex<State>` holds every entity family. `atomically` clones the
//! state up front and restores it when the closure fails, which gives the
//! all-or-nothing semantics the lifecycle requires without a real database.
//! Not meant for concurrent use beyond the per-request model.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use tracing::debug;

use mizan_accounting::{AccountId, JournalEntry, JournalLine};
use mizan_billing::{Bill, BillId, BillItem, BillItemId, BillStore};
use mizan_core::{DomainError, DomainResult, RecordId};
use mizan_inventory::{StockStore, StockUnit, StockUnitId};
use mizan_invoicing::{
    Cheque, ChequeStore, Gateway, Invoice, InvoiceError, InvoiceId, InvoiceItem, InvoiceItemId,
    InvoiceQuery, InvoiceStore, LedgerPoster, Payment, PaymentStore,
};
use mizan_parties::{Customer, CustomerId, CustomerStore};

#[derive(Debug, Clone, Default)]
struct State {
    invoices: HashMap<InvoiceId, Invoice>,
    invoice_items: Vec<InvoiceItem>,
    bills: HashMap<BillId, Bill>,
    bill_items: Vec<BillItem>,
    payments: Vec<Payment>,
    cheques: Vec<Cheque>,
    stock_units: HashMap<StockUnitId, StockUnit>,
    customers: HashMap<CustomerId, Customer>,
    journal: Vec<JournalEntry>,
}

/// In-memory implementation of the full gateway surface.
pub struct InMemoryGateway {
    state: Mutex<State>,
    /// Credit side of invoice postings (a sales revenue account).
    sales_account: AccountId,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            sales_account: AccountId::new(RecordId::new()),
        }
    }

    pub fn sales_account(&self) -> AccountId {
        self.sales_account
    }

    // ---- seeding -----------------------------------------------------------

    pub fn insert_customer(&self, customer: Customer) {
        self.state
            .lock()
            .unwrap()
            .customers
            .insert(customer.id, customer);
    }

    pub fn insert_stock_unit(&self, unit: StockUnit) {
        self.state.lock().unwrap().stock_units.insert(unit.id, unit);
    }

    pub fn insert_bill(&self, bill: Bill) {
        self.state.lock().unwrap().bills.insert(bill.id, bill);
    }

    pub fn insert_bill_item(&self, item: BillItem) {
        self.state.lock().unwrap().bill_items.push(item);
    }

    // ---- inspection --------------------------------------------------------

    /// Every invoice row, cancelled ones included.
    pub fn invoice_count(&self) -> usize {
        self.state.lock().unwrap().invoices.len()
    }

    /// Live delivery invoices under a sales invoice.
    pub fn children_of(&self, id: InvoiceId) -> Vec<Invoice> {
        let state = self.state.lock().unwrap();
        state
            .invoices
            .values()
            .filter(|inv| inv.parent_id == Some(id) && !inv.is_cancelled())
            .cloned()
            .collect()
    }

    /// Shadow receiving bills mirroring `source`.
    pub fn shadows_of(&self, source: BillId) -> Vec<Bill> {
        let state = self.state.lock().unwrap();
        state
            .bills
            .values()
            .filter(|b| b.source_bill_id == Some(source))
            .cloned()
            .collect()
    }

    pub fn journal_entries(&self) -> Vec<JournalEntry> {
        self.state.lock().unwrap().journal.clone()
    }

    pub fn stock_quantity(&self, id: StockUnitId) -> Option<i64> {
        self.state
            .lock()
            .unwrap()
            .stock_units
            .get(&id)
            .map(|u| u.quantity)
    }
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl InvoiceStore for InMemoryGateway {
    fn create_invoice(&self, invoice: Invoice) -> DomainResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.invoices.contains_key(&invoice.id) {
            return Err(DomainError::conflict("duplicate invoice id"));
        }
        state.invoices.insert(invoice.id, invoice);
        Ok(())
    }

    fn find_invoice(&self, id: InvoiceId) -> DomainResult<Option<Invoice>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .invoices
            .get(&id)
            .filter(|inv| !inv.is_cancelled())
            .cloned())
    }

    fn update_invoice(&self, invoice: &Invoice) -> DomainResult<()> {
        let mut state = self.state.lock().unwrap();
        match state.invoices.get_mut(&invoice.id) {
            Some(slot) => {
                *slot = invoice.clone();
                Ok(())
            }
            None => Err(DomainError::not_found()),
        }
    }

    fn soft_delete_invoice(&self, id: InvoiceId) -> DomainResult<()> {
        let mut state = self.state.lock().unwrap();
        match state.invoices.get_mut(&id) {
            Some(invoice) => {
                invoice.cancelled_at = Some(Utc::now());
                Ok(())
            }
            None => Err(DomainError::not_found()),
        }
    }

    fn list_invoices(&self, query: &InvoiceQuery) -> DomainResult<Vec<Invoice>> {
        let state = self.state.lock().unwrap();
        let mut invoices: Vec<Invoice> = state
            .invoices
            .values()
            .filter(|inv| {
                inv.parent_id.is_none()
                    && !inv.is_cancelled()
                    && inv.created_at >= query.from
                    && inv.created_at <= query.to
                    && query.store_id.is_none_or(|s| inv.store_id == Some(s))
                    && query.customer_id.is_none_or(|c| inv.customer_id == Some(c))
            })
            .cloned()
            .collect();
        invoices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invoices)
    }

    fn create_invoice_item(&self, item: InvoiceItem) -> DomainResult<()> {
        self.state.lock().unwrap().invoice_items.push(item);
        Ok(())
    }

    fn find_invoice_item(&self, id: InvoiceItemId) -> DomainResult<Option<InvoiceItem>> {
        let state = self.state.lock().unwrap();
        Ok(state.invoice_items.iter().find(|i| i.id == id).cloned())
    }

    fn items_of(&self, invoice_id: InvoiceId) -> DomainResult<Vec<InvoiceItem>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .invoice_items
            .iter()
            .filter(|i| i.invoice_id == invoice_id)
            .cloned()
            .collect())
    }

    fn clear_items(&self, invoice_id: InvoiceId) -> DomainResult<()> {
        let mut state = self.state.lock().unwrap();
        state.invoice_items.retain(|i| i.invoice_id != invoice_id);
        Ok(())
    }

    fn fulfillments_of(&self, item_id: InvoiceItemId) -> DomainResult<Vec<InvoiceItem>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .invoice_items
            .iter()
            .filter(|i| i.fulfills == Some(item_id))
            .cloned()
            .collect())
    }
}

impl PaymentStore for InMemoryGateway {
    fn create_payment(&self, payment: Payment) -> DomainResult<()> {
        self.state.lock().unwrap().payments.push(payment);
        Ok(())
    }

    fn payments_of(&self, invoice_id: InvoiceId) -> DomainResult<Vec<Payment>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .payments
            .iter()
            .filter(|p| p.invoice_id == invoice_id)
            .cloned()
            .collect())
    }
}

impl ChequeStore for InMemoryGateway {
    fn create_cheque(&self, cheque: Cheque) -> DomainResult<()> {
        self.state.lock().unwrap().cheques.push(cheque);
        Ok(())
    }

    fn cheques_of(&self, invoice_id: InvoiceId) -> DomainResult<Vec<Cheque>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .cheques
            .iter()
            .filter(|c| c.invoice_id == invoice_id)
            .cloned()
            .collect())
    }
}

impl BillStore for InMemoryGateway {
    fn find_bill(&self, id: BillId) -> DomainResult<Option<Bill>> {
        Ok(self.state.lock().unwrap().bills.get(&id).cloned())
    }

    fn create_bill(&self, bill: Bill) -> DomainResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.bills.contains_key(&bill.id) {
            return Err(DomainError::conflict("duplicate bill id"));
        }
        state.bills.insert(bill.id, bill);
        Ok(())
    }

    fn find_bill_item(&self, id: BillItemId) -> DomainResult<Option<BillItem>> {
        let state = self.state.lock().unwrap();
        Ok(state.bill_items.iter().find(|i| i.id == id).cloned())
    }

    fn create_bill_item(&self, item: BillItem) -> DomainResult<()> {
        self.state.lock().unwrap().bill_items.push(item);
        Ok(())
    }

    fn bill_items_of(&self, bill_id: BillId) -> DomainResult<Vec<BillItem>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .bill_items
            .iter()
            .filter(|i| i.bill_id == bill_id)
            .cloned()
            .collect())
    }
}

impl StockStore for InMemoryGateway {
    fn find_stock_unit(&self, id: StockUnitId) -> DomainResult<Option<StockUnit>> {
        Ok(self.state.lock().unwrap().stock_units.get(&id).cloned())
    }

    fn adjust_quantity(&self, id: StockUnitId, delta: i64) -> DomainResult<()> {
        let mut state = self.state.lock().unwrap();
        let unit = state
            .stock_units
            .get(&id)
            .ok_or_else(DomainError::not_found)?;
        let adjusted = unit.adjusted(delta)?;
        debug!(stock_unit = %id, delta, quantity = adjusted.quantity, "stock adjusted");
        state.stock_units.insert(id, adjusted);
        Ok(())
    }
}

impl CustomerStore for InMemoryGateway {
    fn find_customer(&self, id: CustomerId) -> DomainResult<Option<Customer>> {
        Ok(self.state.lock().unwrap().customers.get(&id).cloned())
    }
}

impl LedgerPoster for InMemoryGateway {
    /// Post a debit-receivable / credit-sales entry for the invoice's net
    /// total. Zero and negative totals post nothing.
    fn post_invoice_entry(&self, invoice: &Invoice, net_total: i64) -> DomainResult<()> {
        if net_total <= 0 {
            return Ok(());
        }
        let customer_id = invoice.customer_id.ok_or_else(DomainError::not_found)?;
        let mut state = self.state.lock().unwrap();
        let customer = state
            .customers
            .get(&customer_id)
            .ok_or_else(DomainError::not_found)?;

        let entry = JournalEntry::new(
            invoice.id.0,
            vec![
                JournalLine {
                    account_id: customer.account_id,
                    amount: net_total,
                    is_debit: true,
                },
                JournalLine {
                    account_id: self.sales_account,
                    amount: net_total,
                    is_debit: false,
                },
            ],
            Some(format!("sales invoice {}", invoice.id)),
            Utc::now(),
        )?;
        state.journal.push(entry);
        Ok(())
    }
}

impl Gateway for InMemoryGateway {
    fn atomically<T>(
        &self,
        f: impl FnOnce(&Self) -> Result<T, InvoiceError>,
    ) -> Result<T, InvoiceError> {
        let snapshot = self.state.lock().unwrap().clone();
        let result = f(self);
        if result.is_err() {
            *self.state.lock().unwrap() = snapshot;
        }
        result
    }
}
