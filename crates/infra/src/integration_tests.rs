//! Integration tests for the full invoice lifecycle.
//!
//! Scenarios: Payload → InvoiceLifecycleService → InMemoryGateway
//!
//! Verifies:
//! - Totals, bonus application, and the remain invariant
//! - Shadow receiving bills and mirrored items on bill-derived creation
//! - Delivery shells, pruning, and stock rollback on cancellation
//! - Transactional rollback (no partial writes on failure)

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use proptest::prelude::*;

    use mizan_accounting::AccountId;
    use mizan_billing::{Bill, BillId, BillItem, BillItemId, BillStore};
    use mizan_core::{RecordId, UserId};
    use mizan_inventory::{ItemId, StockUnit, StockUnitId, StoreId, UnitId};
    use mizan_invoicing::{
        AuthScope, BillDerivedInvoicePayload, BillLine, ChequeInput, ChequeStore,
        DeliveryInvoicePayload, DeliveryLine, InvoiceError, InvoiceLifecycleService,
        InvoiceOrigin, InvoicePayload, InvoiceStore, ListFilter, PaymentInput, PaymentStore,
        Provenance, SalesInvoicePayload, SalesLine,
    };
    use mizan_parties::{Customer, CustomerId};

    use crate::memory::InMemoryGateway;

    struct Setup {
        service: InvoiceLifecycleService<InMemoryGateway>,
        customer: Customer,
        store_id: StoreId,
        stock: StockUnit,
    }

    fn setup(bonus: i64, stock_quantity: i64) -> Setup {
        mizan_observability::init();
        let gateway = InMemoryGateway::new();

        let customer = Customer {
            id: CustomerId::new(RecordId::new()),
            name: "Acme Retail".to_string(),
            account_id: AccountId::new(RecordId::new()),
            bonus,
        };
        gateway.insert_customer(customer.clone());

        let store_id = StoreId::new(RecordId::new());
        let stock = StockUnit {
            id: StockUnitId::new(RecordId::new()),
            item_id: ItemId::new(RecordId::new()),
            store_id,
            unit_id: UnitId::new(RecordId::new()),
            quantity: stock_quantity,
        };
        gateway.insert_stock_unit(stock.clone());

        Setup {
            service: InvoiceLifecycleService::new(gateway),
            customer,
            store_id,
            stock,
        }
    }

    fn line(s: &Setup, quantity: i64, price_sell: i64, receive: Option<i64>) -> SalesLine {
        SalesLine {
            stock_unit_id: s.stock.id,
            quantity,
            price_purchase: 0,
            price_sell,
            receive,
        }
    }

    fn sales_payload(
        s: &Setup,
        lines: Vec<SalesLine>,
        payments: Vec<PaymentInput>,
    ) -> SalesInvoicePayload {
        SalesInvoicePayload {
            customer_id: Some(s.customer.id),
            store_id: Some(s.store_id),
            lines,
            payments,
            cheque: None,
        }
    }

    fn payment(amount: i64) -> PaymentInput {
        PaymentInput {
            safe_id: mizan_accounting::SafeId::new(RecordId::new()),
            amount,
        }
    }

    fn scope(s: &Setup) -> AuthScope {
        AuthScope {
            user_id: UserId::new(),
            store_ids: vec![s.store_id],
            customer_ids: vec![s.customer.id],
        }
    }

    #[test]
    fn create_applies_bonus_and_tracks_remain() {
        let s = setup(10, 100);
        let payload = sales_payload(
            &s,
            vec![line(&s, 2, 100, None), line(&s, 1, 50, None)],
            vec![payment(100), payment(50)],
        );

        let invoice = s.service.create(&InvoicePayload::Sales(payload)).unwrap();
        assert_eq!(invoice.amount, 225); // 250 gross, 10% bonus
        assert_eq!(invoice.payed, 150);
        assert_eq!(invoice.remain, 75);
        assert_eq!(invoice.remain, invoice.amount - invoice.payed);

        // The net total is recorded per payment line (existing behavior),
        // not the entered amount.
        let payments = s.service.gateway().payments_of(invoice.id).unwrap();
        assert_eq!(payments.len(), 2);
        assert!(payments.iter().all(|p| p.amount == 225));
        assert!(
            payments
                .iter()
                .all(|p| p.account_id == s.customer.account_id)
        );
    }

    #[test]
    fn create_posts_a_balanced_ledger_entry() {
        let s = setup(10, 100);
        let payload = sales_payload(&s, vec![line(&s, 2, 100, None), line(&s, 1, 50, None)], vec![]);

        let invoice = s.service.create(&InvoicePayload::Sales(payload)).unwrap();

        let journal = s.service.gateway().journal_entries();
        assert_eq!(journal.len(), 1);
        let entry = &journal[0];
        assert_eq!(entry.reference, invoice.id.0);
        assert_eq!(entry.total(), 225);
        assert!(
            entry
                .lines
                .iter()
                .any(|l| l.is_debit && l.account_id == s.customer.account_id)
        );
    }

    #[test]
    fn missing_customer_is_reported_and_nothing_is_written() {
        let s = setup(0, 100);
        let mut payload = sales_payload(&s, vec![line(&s, 1, 100, None)], vec![payment(50)]);
        payload.customer_id = None;

        let err = s
            .service
            .create(&InvoicePayload::Sales(payload))
            .unwrap_err();
        assert_eq!(err, InvoiceError::MissingCustomer);
        assert_eq!(s.service.gateway().invoice_count(), 0);
        assert!(s.service.gateway().journal_entries().is_empty());
    }

    #[test]
    fn non_qualifying_lines_are_skipped_not_rejected() {
        let s = setup(0, 100);
        let payload = sales_payload(
            &s,
            vec![
                line(&s, 0, 100, None),
                line(&s, -3, 100, None),
                line(&s, 2, 0, None),
                line(&s, 2, 30, None),
            ],
            vec![],
        );

        let invoice = s.service.create(&InvoicePayload::Sales(payload)).unwrap();
        assert_eq!(invoice.amount, 60);

        let items = s.service.gateway().items_of(invoice.id).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 2);
    }

    #[test]
    fn empty_receiving_invoice_is_pruned() {
        let s = setup(0, 100);
        let payload = sales_payload(&s, vec![line(&s, 2, 30, None)], vec![]);

        let invoice = s.service.create(&InvoicePayload::Sales(payload)).unwrap();
        assert!(s.service.gateway().children_of(invoice.id).is_empty());
    }

    #[test]
    fn receive_quantity_creates_partial_delivery() {
        let s = setup(0, 100);
        let payload = sales_payload(&s, vec![line(&s, 5, 30, Some(2))], vec![]);

        let invoice = s.service.create(&InvoicePayload::Sales(payload)).unwrap();
        let children = s.service.gateway().children_of(invoice.id);
        assert_eq!(children.len(), 1);

        let sales_items = s.service.gateway().items_of(invoice.id).unwrap();
        let delivery_items = s.service.gateway().items_of(children[0].id).unwrap();
        assert_eq!(delivery_items.len(), 1);
        assert_eq!(delivery_items[0].quantity, 2);
        assert_eq!(delivery_items[0].fulfills, Some(sales_items[0].id));
        assert_eq!(
            delivery_items[0].provenance,
            Provenance::StockUnit(s.stock.id)
        );
    }

    #[test]
    fn cheque_is_attached_when_supplied() {
        let s = setup(0, 100);
        let mut payload = sales_payload(&s, vec![line(&s, 1, 500, None)], vec![]);
        payload.cheque = Some(ChequeInput {
            amount: 500,
            bank: "First National".to_string(),
            number: "100234".to_string(),
            due_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            account_id: AccountId::new(RecordId::new()),
        });

        let invoice = s.service.create(&InvoicePayload::Sales(payload)).unwrap();
        let cheques = s.service.gateway().cheques_of(invoice.id).unwrap();
        assert_eq!(cheques.len(), 1);
        assert_eq!(cheques[0].amount, 500);
        assert_eq!(cheques[0].bank, "First National");
    }

    #[test]
    fn update_replaces_the_full_item_set() {
        let s = setup(0, 100);
        let created = s
            .service
            .create(&InvoicePayload::Sales(sales_payload(
                &s,
                vec![line(&s, 2, 100, None), line(&s, 1, 50, None)],
                vec![],
            )))
            .unwrap();
        assert_eq!(created.amount, 250);

        let updated = s
            .service
            .update(created.id, &sales_payload(&s, vec![line(&s, 1, 40, None)], vec![]))
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.amount, 40);
        assert_eq!(updated.remain, updated.amount - updated.payed);

        let items = s.service.gateway().items_of(created.id).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 1);
        assert_eq!(items[0].price_sell, 40);
    }

    #[test]
    fn read_returns_live_invoice_and_rejects_unknown() {
        let s = setup(0, 100);
        let created = s
            .service
            .create(&InvoicePayload::Sales(sales_payload(
                &s,
                vec![line(&s, 1, 10, None)],
                vec![],
            )))
            .unwrap();

        assert_eq!(s.service.read(created.id).unwrap().id, created.id);

        let unknown = mizan_invoicing::InvoiceId::new(RecordId::new());
        let err = s.service.read(unknown).unwrap_err();
        assert_eq!(err, InvoiceError::NotFound { entity: "invoice" });
    }

    // ---- bill-derived invoices --------------------------------------------

    struct BillSetup {
        base: Setup,
        bill: Bill,
        bill_items: Vec<BillItem>,
    }

    fn setup_with_bill(quantities_and_prices: &[(i64, i64)]) -> BillSetup {
        let base = setup(0, 100);
        let bill = Bill {
            id: BillId::new(RecordId::new()),
            source_bill_id: None,
            created_at: chrono::Utc::now(),
        };
        base.service.gateway().insert_bill(bill.clone());

        let mut bill_items = Vec::new();
        for (quantity, price) in quantities_and_prices {
            let item = BillItem {
                id: BillItemId::new(RecordId::new()),
                bill_id: bill.id,
                source_item_id: None,
                item_id: base.stock.item_id,
                unit_id: base.stock.unit_id,
                quantity: *quantity,
                price: *price,
                expense: 0,
            };
            base.service.gateway().insert_bill_item(item.clone());
            bill_items.push(item);
        }

        BillSetup {
            base,
            bill,
            bill_items,
        }
    }

    fn bill_payload(s: &BillSetup, lines: Vec<BillLine>) -> BillDerivedInvoicePayload {
        BillDerivedInvoicePayload {
            customer_id: Some(s.base.customer.id),
            store_id: Some(s.base.store_id),
            bill_id: s.bill.id,
            lines,
            payments: vec![],
            cheque: None,
        }
    }

    fn bill_line(s: &BillSetup, index: usize, quantity: i64, price_sell: i64) -> BillLine {
        BillLine {
            stock_unit_id: s.base.stock.id,
            bill_item_id: s.bill_items[index].id,
            quantity,
            price_purchase: 0,
            price_sell,
        }
    }

    #[test]
    fn bill_derived_creation_mirrors_lines_into_a_shadow_bill() {
        let s = setup_with_bill(&[(10, 60), (7, 25)]);
        let payload = bill_payload(&s, vec![bill_line(&s, 0, 2, 100), bill_line(&s, 1, 1, 50)]);

        let invoice = s
            .base
            .service
            .create(&InvoicePayload::BillDerived(payload))
            .unwrap();
        assert_eq!(invoice.bill_id, Some(s.bill.id));
        assert_eq!(invoice.amount, 250);

        // Exactly one shadow receiving bill, mirroring each qualifying line.
        let shadows = s.base.service.gateway().shadows_of(s.bill.id);
        assert_eq!(shadows.len(), 1);
        let mirrored = s
            .base
            .service
            .gateway()
            .bill_items_of(shadows[0].id)
            .unwrap();
        assert_eq!(mirrored.len(), 2);
        assert_eq!(mirrored[0].quantity, 2);
        assert_eq!(mirrored[0].price, 60);
        assert_eq!(mirrored[0].source_item_id, Some(s.bill_items[0].id));
        assert_eq!(mirrored[1].quantity, 1);

        // Sales items carry bill-item provenance, never a stock unit.
        let items = s.base.service.gateway().items_of(invoice.id).unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.stock_unit_id().is_none()));

        // Full transfer: a delivery item mirrors every line.
        let children = s.base.service.gateway().children_of(invoice.id);
        assert_eq!(children.len(), 1);
        let delivery_items = s.base.service.gateway().items_of(children[0].id).unwrap();
        assert_eq!(delivery_items.len(), 2);
        assert_eq!(delivery_items[0].quantity, 2);
        assert_eq!(delivery_items[0].fulfills, Some(items[0].id));
    }

    #[test]
    fn bill_derived_invoice_cannot_be_updated() {
        let s = setup_with_bill(&[(10, 60)]);
        let invoice = s
            .base
            .service
            .create(&InvoicePayload::BillDerived(bill_payload(
                &s,
                vec![bill_line(&s, 0, 2, 100)],
            )))
            .unwrap();

        let err = s
            .base
            .service
            .update(
                invoice.id,
                &sales_payload(&s.base, vec![line(&s.base, 1, 10, None)], vec![]),
            )
            .unwrap_err();
        assert_eq!(err, InvoiceError::BillDerivedImmutable);
    }

    #[test]
    fn failed_creation_leaves_no_partial_writes() {
        let s = setup_with_bill(&[(10, 60)]);
        let mut payload = bill_payload(&s, vec![bill_line(&s, 0, 2, 100)]);
        payload.lines[0].bill_item_id = BillItemId::new(RecordId::new());

        let err = s
            .base
            .service
            .create(&InvoicePayload::BillDerived(payload))
            .unwrap_err();
        assert_eq!(err, InvoiceError::NotFound { entity: "bill item" });

        // The invoice, the receiving shell, and the shadow bill all rolled back.
        assert_eq!(s.base.service.gateway().invoice_count(), 0);
        assert!(s.base.service.gateway().shadows_of(s.bill.id).is_empty());
    }

    // ---- delivery-only creation -------------------------------------------

    #[test]
    fn delivery_creation_links_back_to_sales_items() {
        let s = setup(0, 100);
        let sales = s
            .service
            .create(&InvoicePayload::Sales(sales_payload(
                &s,
                vec![line(&s, 5, 30, None)],
                vec![],
            )))
            .unwrap();
        let sales_items = s.service.gateway().items_of(sales.id).unwrap();

        let delivery = s
            .service
            .create(&InvoicePayload::Delivery(DeliveryInvoicePayload {
                parent_invoice_id: sales.id,
                lines: vec![DeliveryLine {
                    sales_item_id: sales_items[0].id,
                    quantity: 3,
                }],
            }))
            .unwrap();
        assert_eq!(delivery.parent_id, Some(sales.id));

        let delivery_items = s.service.gateway().items_of(delivery.id).unwrap();
        assert_eq!(delivery_items.len(), 1);
        assert_eq!(delivery_items[0].quantity, 3);
        assert_eq!(delivery_items[0].fulfills, Some(sales_items[0].id));
    }

    #[test]
    fn delivery_creation_without_lines_is_empty_item_set() {
        let s = setup(0, 100);
        let sales = s
            .service
            .create(&InvoicePayload::Sales(sales_payload(
                &s,
                vec![line(&s, 5, 30, None)],
                vec![],
            )))
            .unwrap();

        let err = s
            .service
            .create(&InvoicePayload::Delivery(DeliveryInvoicePayload {
                parent_invoice_id: sales.id,
                lines: vec![],
            }))
            .unwrap_err();
        assert_eq!(err, InvoiceError::EmptyItemSet);
    }

    // ---- cancellation ------------------------------------------------------

    #[test]
    fn cancelling_restores_delivered_quantities_exactly_once() {
        let s = setup(0, 100);
        let invoice = s
            .service
            .create(&InvoicePayload::Sales(sales_payload(
                &s,
                vec![line(&s, 5, 30, Some(5))],
                vec![],
            )))
            .unwrap();
        assert_eq!(s.service.gateway().stock_quantity(s.stock.id), Some(100));

        let outcome = s.service.delete(invoice.id).unwrap();
        assert_eq!(outcome.cancelled_invoice_id, invoice.id);
        assert_eq!(outcome.origin, InvoiceOrigin::Sales);
        assert_eq!(outcome.parent_invoice_id, None);
        assert_eq!(s.service.gateway().stock_quantity(s.stock.id), Some(105));

        // Idempotent only once: re-cancelling must not double-apply.
        let err = s.service.delete(invoice.id).unwrap_err();
        assert_eq!(err, InvoiceError::NotFound { entity: "invoice" });
        assert_eq!(s.service.gateway().stock_quantity(s.stock.id), Some(105));
    }

    #[test]
    fn cancelling_without_deliveries_leaves_stock_untouched() {
        let s = setup(0, 100);
        let invoice = s
            .service
            .create(&InvoicePayload::Sales(sales_payload(
                &s,
                vec![line(&s, 5, 30, None)],
                vec![],
            )))
            .unwrap();

        s.service.delete(invoice.id).unwrap();
        assert_eq!(s.service.gateway().stock_quantity(s.stock.id), Some(100));
    }

    #[test]
    fn cancelling_a_delivery_invoice_reports_its_parent() {
        let s = setup(0, 100);
        let sales = s
            .service
            .create(&InvoicePayload::Sales(sales_payload(
                &s,
                vec![line(&s, 5, 30, None)],
                vec![],
            )))
            .unwrap();
        let sales_items = s.service.gateway().items_of(sales.id).unwrap();
        let delivery = s
            .service
            .create(&InvoicePayload::Delivery(DeliveryInvoicePayload {
                parent_invoice_id: sales.id,
                lines: vec![DeliveryLine {
                    sales_item_id: sales_items[0].id,
                    quantity: 2,
                }],
            }))
            .unwrap();

        let outcome = s.service.delete(delivery.id).unwrap();
        assert_eq!(outcome.origin, InvoiceOrigin::Delivery);
        assert_eq!(outcome.parent_invoice_id, Some(sales.id));
        // Delivery items have no fulfillments of their own: no rollback here.
        assert_eq!(s.service.gateway().stock_quantity(s.stock.id), Some(100));
        // The parent is still live.
        assert!(s.service.read(sales.id).is_ok());
    }

    #[test]
    fn cancelling_a_bill_derived_invoice_reports_bill_origin() {
        let s = setup_with_bill(&[(10, 60)]);
        let invoice = s
            .base
            .service
            .create(&InvoicePayload::BillDerived(bill_payload(
                &s,
                vec![bill_line(&s, 0, 2, 100)],
            )))
            .unwrap();

        let outcome = s.base.service.delete(invoice.id).unwrap();
        assert_eq!(outcome.origin, InvoiceOrigin::Bill);
        assert_eq!(outcome.parent_invoice_id, None);
    }

    // ---- listing -----------------------------------------------------------

    #[test]
    fn list_scopes_filters_and_orders() {
        let s = setup(0, 100);
        let unpaid = s
            .service
            .create(&InvoicePayload::Sales(sales_payload(
                &s,
                vec![line(&s, 1, 100, None)],
                vec![],
            )))
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let paid = s
            .service
            .create(&InvoicePayload::Sales(sales_payload(
                &s,
                vec![line(&s, 1, 100, None)],
                vec![payment(100)],
            )))
            .unwrap();

        // Default date range is today; newest first.
        let all = s.service.list(&ListFilter::default(), &scope(&s)).unwrap();
        assert_eq!(
            all.iter().map(|i| i.id).collect::<Vec<_>>(),
            vec![paid.id, unpaid.id]
        );

        // Post-fetch payed predicate.
        let only_paid = s
            .service
            .list(
                &ListFilter {
                    is_payed: Some(true),
                    ..ListFilter::default()
                },
                &scope(&s),
            )
            .unwrap();
        assert_eq!(
            only_paid.iter().map(|i| i.id).collect::<Vec<_>>(),
            vec![paid.id]
        );

        // Outside the authorization scope nothing is visible.
        let foreign_scope = AuthScope {
            user_id: UserId::new(),
            store_ids: vec![StoreId::new(RecordId::new())],
            customer_ids: vec![s.customer.id],
        };
        assert!(
            s.service
                .list(&ListFilter::default(), &foreign_scope)
                .unwrap()
                .is_empty()
        );

        // Limit truncates after filtering.
        let limited = s
            .service
            .list(
                &ListFilter {
                    limit: Some(1),
                    ..ListFilter::default()
                },
                &scope(&s),
            )
            .unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, paid.id);
    }

    #[test]
    fn list_delivered_predicate_checks_linked_quantities() {
        let s = setup(0, 100);
        let delivered = s
            .service
            .create(&InvoicePayload::Sales(sales_payload(
                &s,
                vec![line(&s, 2, 50, Some(2))],
                vec![],
            )))
            .unwrap();
        let pending = s
            .service
            .create(&InvoicePayload::Sales(sales_payload(
                &s,
                vec![line(&s, 2, 50, Some(1))],
                vec![],
            )))
            .unwrap();

        let fully = s
            .service
            .list(
                &ListFilter {
                    is_delivered: Some(true),
                    ..ListFilter::default()
                },
                &scope(&s),
            )
            .unwrap();
        assert_eq!(fully.iter().map(|i| i.id).collect::<Vec<_>>(), vec![delivered.id]);

        let partial = s
            .service
            .list(
                &ListFilter {
                    is_delivered: Some(false),
                    ..ListFilter::default()
                },
                &scope(&s),
            )
            .unwrap();
        assert_eq!(partial.iter().map(|i| i.id).collect::<Vec<_>>(), vec![pending.id]);
    }

    #[test]
    fn delivery_invoices_are_not_listed() {
        let s = setup(0, 100);
        let sales = s
            .service
            .create(&InvoicePayload::Sales(sales_payload(
                &s,
                vec![line(&s, 2, 50, Some(1))],
                vec![],
            )))
            .unwrap();
        // The receiving shell exists but must never appear in listings.
        assert_eq!(s.service.gateway().children_of(sales.id).len(), 1);

        let listed = s.service.list(&ListFilter::default(), &scope(&s)).unwrap();
        assert_eq!(listed.iter().map(|i| i.id).collect::<Vec<_>>(), vec![sales.id]);
    }

    // ---- properties --------------------------------------------------------

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: after any create, `remain == amount - payed` and the
        /// amount equals the bonus-netted sum of qualifying lines.
        #[test]
        fn remain_invariant_holds_for_created_invoices(
            bonus in 0i64..=50,
            raw_lines in prop::collection::vec((-5i64..50, 0i64..1000), 0..8),
            amounts in prop::collection::vec(1i64..1000, 0..3),
        ) {
            let s = setup(bonus, 1_000_000);
            let payload = sales_payload(
                &s,
                raw_lines
                    .iter()
                    .map(|(quantity, sell)| line(&s, *quantity, *sell, None))
                    .collect(),
                amounts.iter().map(|a| payment(*a)).collect(),
            );

            let invoice = s.service.create(&InvoicePayload::Sales(payload)).unwrap();

            let total1: i64 = raw_lines
                .iter()
                .filter(|(quantity, sell)| *quantity > 0 && *sell > 0)
                .map(|(quantity, sell)| quantity * sell)
                .sum();
            let total2 = total1 - total1 * bonus / 100;
            let payed: i64 = amounts.iter().sum();

            prop_assert_eq!(invoice.amount, total2);
            prop_assert_eq!(invoice.payed, payed);
            prop_assert_eq!(invoice.remain, invoice.amount - invoice.payed);
        }
    }
}
