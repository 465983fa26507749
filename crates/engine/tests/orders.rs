use std::sync::{Arc, Mutex};

use engine::{
    AddItemCmd, CreateOrderCmd, DiscountKind, Engine, EngineError, ItemStatus, Money,
    OrderListFilter, OrderStatus, OrderType, PaymentCmd, PaymentMethod, PaymentStatus,
    PrintDispatcher, PrintError, PrintJob, Quantity, StockPolicy, TableStatus,
};
use migration::MigratorTrait;
use sea_orm::Database;

mod common;

use common::{CASHIER, dish, engine_with_db, ingredient, setup_books};

#[derive(Debug, Default)]
struct RecordingPrinter {
    jobs: Mutex<Vec<PrintJob>>,
}

impl PrintDispatcher for RecordingPrinter {
    fn dispatch(&self, job: &PrintJob) -> Result<(), PrintError> {
        self.jobs.lock().unwrap().push(job.clone());
        Ok(())
    }
}

#[derive(Debug)]
struct BrokenPrinter;

impl PrintDispatcher for BrokenPrinter {
    fn dispatch(&self, _job: &PrintJob) -> Result<(), PrintError> {
        Err(PrintError("out of paper".to_string()))
    }
}

async fn engine_with_printer(printer: Arc<dyn PrintDispatcher>) -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Engine::builder()
        .database(db)
        .printer(printer)
        .build()
        .await
        .unwrap()
}

#[tokio::test]
async fn totals_apply_percentage_discount_then_tax() {
    let (engine, _db) = engine_with_db(StockPolicy::Reject).await;
    let tax = engine.create_tax_setting("VAT", 1_300, 0).await.unwrap();
    engine.activate_tax_setting(tax.id).await.unwrap();
    let discount = engine
        .create_discount("Happy hour", DiscountKind::Percentage, 1_000, None)
        .await
        .unwrap();
    let item = engine
        .create_menu_item("Momo", Money::major(100))
        .await
        .unwrap();

    let order = engine
        .create_order(CreateOrderCmd::new(OrderType::Takeaway, CASHIER))
        .await
        .unwrap();
    engine
        .add_item(AddItemCmd::new(order.id, item.id, 2, CASHIER))
        .await
        .unwrap();
    let order = engine
        .apply_discount(order.id, Some(discount.id), None, CASHIER)
        .await
        .unwrap();

    assert_eq!(order.totals.subtotal, Money::major(200));
    assert_eq!(order.totals.discount_amount, Money::major(20));
    assert_eq!(order.totals.tax_amount, Money::new(2_340));
    assert_eq!(order.totals.grand_total, Money::new(20_340));
    assert!(order.totals.is_consistent());
}

#[tokio::test]
async fn manual_discount_wins_over_rule_and_can_be_removed() {
    let (engine, _db) = engine_with_db(StockPolicy::Reject).await;
    let discount = engine
        .create_discount("Staff", DiscountKind::Percentage, 5_000, None)
        .await
        .unwrap();
    let item = engine
        .create_menu_item("Tea", Money::major(50))
        .await
        .unwrap();
    let order = engine
        .create_order(CreateOrderCmd::new(OrderType::Takeaway, CASHIER))
        .await
        .unwrap();
    engine
        .add_item(AddItemCmd::new(order.id, item.id, 2, CASHIER))
        .await
        .unwrap();

    let order = engine
        .apply_discount(order.id, Some(discount.id), Some(Money::major(10)), CASHIER)
        .await
        .unwrap();
    assert_eq!(order.totals.discount_amount, Money::major(10));
    assert_eq!(order.totals.grand_total, Money::major(90));

    // A manual amount larger than the subtotal is capped at it.
    let order = engine
        .apply_discount(order.id, None, Some(Money::major(500)), CASHIER)
        .await
        .unwrap();
    assert_eq!(order.totals.grand_total, Money::ZERO);

    let order = engine.remove_discount(order.id, CASHIER).await.unwrap();
    assert_eq!(order.totals.discount_amount, Money::ZERO);
    assert_eq!(order.totals.grand_total, Money::major(100));
}

#[tokio::test]
async fn inactive_discount_is_rejected() {
    let (engine, _db) = engine_with_db(StockPolicy::Reject).await;
    let discount = engine
        .create_discount("Old", DiscountKind::Flat, 500, None)
        .await
        .unwrap();
    engine
        .set_discount_active(discount.id, false)
        .await
        .unwrap();
    let order = engine
        .create_order(CreateOrderCmd::new(OrderType::Takeaway, CASHIER))
        .await
        .unwrap();

    let err = engine
        .apply_discount(order.id, Some(discount.id), None, CASHIER)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn plain_lines_merge_until_sent_to_kitchen() {
    let printer = Arc::new(RecordingPrinter::default());
    let engine = engine_with_printer(printer.clone()).await;
    let item = engine
        .create_menu_item("Dal bhat", Money::major(300))
        .await
        .unwrap();
    let order = engine
        .create_order(CreateOrderCmd::new(OrderType::Takeaway, CASHIER))
        .await
        .unwrap();

    let first = engine
        .add_item(AddItemCmd::new(order.id, item.id, 1, CASHIER))
        .await
        .unwrap();
    let merged = engine
        .add_item(AddItemCmd::new(order.id, item.id, 2, CASHIER))
        .await
        .unwrap();
    assert_eq!(merged.id, first.id);
    assert_eq!(merged.quantity, 3);
    assert_eq!(merged.total_price, Money::major(900));

    let noted = engine
        .add_item(AddItemCmd::new(order.id, item.id, 1, CASHIER).notes("extra spicy"))
        .await
        .unwrap();
    assert_ne!(noted.id, first.id);

    let sent = engine.send_to_kitchen(order.id, CASHIER).await.unwrap();
    assert_eq!(sent, 2);
    assert_eq!(engine.send_to_kitchen(order.id, CASHIER).await.unwrap(), 0);

    let after_kot = engine
        .add_item(AddItemCmd::new(order.id, item.id, 1, CASHIER))
        .await
        .unwrap();
    assert_ne!(after_kot.id, first.id);

    let view = engine.order_view(order.id).await.unwrap();
    assert_eq!(view.items.len(), 3);
    assert_eq!(view.order.totals.subtotal, Money::major(1_500));

    let jobs = printer.jobs.lock().unwrap();
    assert_eq!(jobs.len(), 1);
    match &jobs[0] {
        PrintJob::Kot { lines, .. } => assert_eq!(lines.len(), 2),
        other => panic!("unexpected job {other:?}"),
    }
}

#[tokio::test]
async fn quantity_update_and_removal_recalculate() {
    let (engine, _db) = engine_with_db(StockPolicy::Reject).await;
    let item = engine
        .create_menu_item("Lassi", Money::major(120))
        .await
        .unwrap();
    let order = engine
        .create_order(CreateOrderCmd::new(OrderType::Takeaway, CASHIER))
        .await
        .unwrap();
    let line = engine
        .add_item(AddItemCmd::new(order.id, item.id, 1, CASHIER))
        .await
        .unwrap();

    let updated = engine
        .update_item_quantity(order.id, line.id, 4, CASHIER)
        .await
        .unwrap();
    assert_eq!(updated.totals.subtotal, Money::major(480));

    let emptied = engine
        .update_item_quantity(order.id, line.id, 0, CASHIER)
        .await
        .unwrap();
    assert_eq!(emptied.totals.grand_total, Money::ZERO);
    assert!(engine.order_view(order.id).await.unwrap().items.is_empty());

    let err = engine
        .remove_item(order.id, line.id, CASHIER)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn unavailable_item_and_bad_quantity_are_rejected() {
    let (engine, _db) = engine_with_db(StockPolicy::Reject).await;
    let item = engine
        .create_menu_item("Seasonal", Money::major(10))
        .await
        .unwrap();
    engine
        .set_menu_item_available(item.id, false)
        .await
        .unwrap();
    let order = engine
        .create_order(CreateOrderCmd::new(OrderType::Takeaway, CASHIER))
        .await
        .unwrap();

    let err = engine
        .add_item(AddItemCmd::new(order.id, item.id, 1, CASHIER))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .add_item(AddItemCmd::new(order.id, item.id, 0, CASHIER))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .add_item(AddItemCmd::new(order.id, item.id, 1, "  "))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Validation("actor is required".to_string()));
}

#[tokio::test]
async fn quantities_whose_totals_do_not_fit_are_rejected() {
    let (engine, _db) = engine_with_db(StockPolicy::Reject).await;
    let item = engine
        .create_menu_item("Thali", Money::major(100))
        .await
        .unwrap();
    let order = engine
        .create_order(CreateOrderCmd::new(OrderType::Takeaway, CASHIER))
        .await
        .unwrap();

    let err = engine
        .add_item(AddItemCmd::new(order.id, item.id, i64::MAX / 100, CASHIER))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let line = engine
        .add_item(AddItemCmd::new(order.id, item.id, 2, CASHIER))
        .await
        .unwrap();
    let err = engine
        .add_item(AddItemCmd::new(order.id, item.id, i64::MAX, CASHIER))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    let err = engine
        .update_item_quantity(order.id, line.id, i64::MAX / 100, CASHIER)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let view = engine.order_view(order.id).await.unwrap();
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].quantity, 2);
    assert_eq!(view.items[0].total_price, Money::major(200));
    assert_eq!(view.order.totals.grand_total, Money::major(200));
}

#[tokio::test]
async fn kitchen_states_advance_one_step_at_a_time() {
    let (engine, _db) = engine_with_db(StockPolicy::Reject).await;
    let item = engine
        .create_menu_item("Soup", Money::major(80))
        .await
        .unwrap();
    let order = engine
        .create_order(CreateOrderCmd::new(OrderType::Delivery, CASHIER))
        .await
        .unwrap();
    engine
        .add_item(AddItemCmd::new(order.id, item.id, 1, CASHIER))
        .await
        .unwrap();

    let err = engine
        .update_status(order.id, OrderStatus::Ready, CASHIER)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));

    for status in [
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
    ] {
        engine
            .update_status(order.id, status, CASHIER)
            .await
            .unwrap();
    }
    let view = engine.order_view(order.id).await.unwrap();
    assert_eq!(view.order.status, OrderStatus::Ready);
    assert!(view.items.iter().all(|i| i.status == ItemStatus::Ready));

    let err = engine
        .update_status(order.id, OrderStatus::Completed, CASHIER)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));
}

#[tokio::test]
async fn dine_in_holds_table_until_cancelled() {
    let (engine, _db) = engine_with_db(StockPolicy::Reject).await;
    let table = engine.create_table("T1").await.unwrap();

    let err = engine
        .create_order(CreateOrderCmd::new(OrderType::DineIn, CASHIER))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let order = engine
        .create_order(CreateOrderCmd::dine_in(table.id, CASHIER))
        .await
        .unwrap();
    let seated = engine.table(table.id).await.unwrap();
    assert_eq!(seated.status, TableStatus::Occupied);
    assert_eq!(seated.current_order_id, Some(order.id));

    let err = engine
        .create_order(CreateOrderCmd::dine_in(table.id, CASHIER))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));

    let cancelled = engine
        .cancel_order(order.id, Some("walked out"), CASHIER)
        .await
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.notes.as_deref(), Some("cancelled: walked out"));
    assert_eq!(
        engine.table(table.id).await.unwrap().status,
        TableStatus::Available
    );

    let err = engine
        .cancel_order(order.id, None, CASHIER)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));
}

#[tokio::test]
async fn cash_payment_fulfils_order_and_books_sale() {
    let (engine, _db) = engine_with_db(StockPolicy::Reject).await;
    let books = setup_books(&engine).await;
    let tax = engine.create_tax_setting("VAT", 1_300, 0).await.unwrap();
    engine.activate_tax_setting(tax.id).await.unwrap();
    let rice = ingredient(&engine, "Rice", 10, 2).await;
    let dish_id = dish(&engine, "Fried rice", 100, rice, 1).await;
    let table = engine.create_table("T2").await.unwrap();

    let order = engine
        .create_order(CreateOrderCmd::dine_in(table.id, CASHIER))
        .await
        .unwrap();
    engine
        .add_item(AddItemCmd::new(order.id, dish_id, 2, CASHIER))
        .await
        .unwrap();

    let order = engine
        .complete_payment(
            PaymentCmd::new(order.id, PaymentMethod::Cash, CASHIER).tendered(Money::major(300)),
        )
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Completed);
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert_eq!(order.paid_amount, Money::major(226));
    assert!(order.completed_at.is_some());

    let view = engine.order_view(order.id).await.unwrap();
    assert_eq!(view.payments.len(), 1);
    assert_eq!(view.payments[0].change, Money::major(74));
    assert_eq!(view.table_name.as_deref(), Some("T2"));
    assert_eq!(
        engine.table(table.id).await.unwrap().status,
        TableStatus::Available
    );

    assert_eq!(
        engine.ingredient(rice).await.unwrap().current_stock,
        Quantity::units(8)
    );

    assert_eq!(
        engine.account(books.cash).await.unwrap().current_balance,
        Money::major(226)
    );
    assert_eq!(
        engine.account(books.sales).await.unwrap().current_balance,
        Money::major(200)
    );
    assert_eq!(
        engine.account(books.tax_payable).await.unwrap().current_balance,
        Money::major(26)
    );
    assert_eq!(
        engine.account(books.cost_of_goods).await.unwrap().current_balance,
        Money::major(4)
    );
    assert!(engine.trial_balance().await.unwrap().is_balanced());

    let err = engine
        .complete_payment(PaymentCmd::new(order.id, PaymentMethod::Cash, CASHIER))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));
    let err = engine
        .cancel_order(order.id, None, CASHIER)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));
}

#[tokio::test]
async fn short_stock_rolls_back_the_whole_fulfillment() {
    let (engine, _db) = engine_with_db(StockPolicy::Reject).await;
    let books = setup_books(&engine).await;
    let flour = ingredient(&engine, "Flour", 10, 1).await;
    let dish_id = dish(&engine, "Bread", 40, flour, 15).await;
    let session = engine.open_session(CASHIER, Money::major(100)).await.unwrap();

    let order = engine
        .create_order(CreateOrderCmd::new(OrderType::Takeaway, CASHIER))
        .await
        .unwrap();
    engine
        .add_item(AddItemCmd::new(order.id, dish_id, 1, CASHIER))
        .await
        .unwrap();

    let err = engine
        .complete_payment(PaymentCmd::new(order.id, PaymentMethod::Cash, CASHIER))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientStock(_)));

    let view = engine.order_view(order.id).await.unwrap();
    assert_eq!(view.order.status, OrderStatus::Pending);
    assert_eq!(view.order.paid_amount, Money::ZERO);
    assert!(view.payments.is_empty());
    assert_eq!(
        engine.ingredient(flour).await.unwrap().current_stock,
        Quantity::units(10)
    );
    let summary = engine.session_summary(session.id).await.unwrap();
    assert_eq!(summary.session.cash_sales, Money::ZERO);
    assert_eq!(
        engine.account(books.cash).await.unwrap().current_balance,
        Money::ZERO
    );
    let (movements, _) = engine.stock_movements(Some(flour), 10, None).await.unwrap();
    assert_eq!(movements.len(), 1);
}

#[tokio::test]
async fn partial_payments_then_complete_order() {
    let printer = Arc::new(RecordingPrinter::default());
    let engine = engine_with_printer(printer.clone()).await;
    let item = engine
        .create_menu_item("Thali", Money::major(500))
        .await
        .unwrap();
    let order = engine
        .create_order(CreateOrderCmd::new(OrderType::Takeaway, CASHIER))
        .await
        .unwrap();
    engine
        .add_item(AddItemCmd::new(order.id, item.id, 1, CASHIER))
        .await
        .unwrap();

    let err = engine
        .add_payment(PaymentCmd::new(order.id, PaymentMethod::Card, CASHIER).amount(Money::major(600)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    engine
        .add_payment(PaymentCmd::new(order.id, PaymentMethod::Card, CASHIER).amount(Money::major(200)))
        .await
        .unwrap();
    let view = engine.order_view(order.id).await.unwrap();
    assert_eq!(view.order.payment_status, PaymentStatus::Partial);
    assert_eq!(view.order.outstanding(), Money::major(300));

    let err = engine.complete_order(order.id, CASHIER).await.unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));

    engine
        .add_payment(PaymentCmd::new(order.id, PaymentMethod::Cash, CASHIER).amount(Money::major(300)))
        .await
        .unwrap();
    let order = engine.complete_order(order.id, CASHIER).await.unwrap();
    assert_eq!(order.status, OrderStatus::Completed);
    assert_eq!(order.payment_status, PaymentStatus::Paid);

    let jobs = printer.jobs.lock().unwrap();
    assert!(matches!(jobs.last(), Some(PrintJob::Bill { paid, .. }) if *paid == Money::major(500)));
}

#[tokio::test]
async fn printer_failure_does_not_fail_the_order() {
    let engine = engine_with_printer(Arc::new(BrokenPrinter)).await;
    let item = engine
        .create_menu_item("Chai", Money::major(30))
        .await
        .unwrap();
    let order = engine
        .create_order(CreateOrderCmd::new(OrderType::Takeaway, CASHIER))
        .await
        .unwrap();
    engine
        .add_item(AddItemCmd::new(order.id, item.id, 1, CASHIER))
        .await
        .unwrap();

    assert_eq!(engine.send_to_kitchen(order.id, CASHIER).await.unwrap(), 1);
    let order = engine
        .complete_payment(PaymentCmd::new(order.id, PaymentMethod::Cash, CASHIER))
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Completed);
}

#[tokio::test]
async fn credit_sale_charges_customer_until_settled() {
    let (engine, _db) = engine_with_db(StockPolicy::Reject).await;
    let books = setup_books(&engine).await;
    let customer = engine
        .create_customer("Ram", Some("9800000000"), Money::major(1_000))
        .await
        .unwrap();
    let item = engine
        .create_menu_item("Buffet", Money::major(700))
        .await
        .unwrap();

    let anonymous = engine
        .create_order(CreateOrderCmd::new(OrderType::Takeaway, CASHIER))
        .await
        .unwrap();
    engine
        .add_item(AddItemCmd::new(anonymous.id, item.id, 1, CASHIER))
        .await
        .unwrap();
    let err = engine
        .complete_payment(PaymentCmd::new(anonymous.id, PaymentMethod::Credit, CASHIER))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let order = engine
        .create_order(CreateOrderCmd::new(OrderType::Takeaway, CASHIER).customer_id(customer.id))
        .await
        .unwrap();
    engine
        .add_item(AddItemCmd::new(order.id, item.id, 2, CASHIER))
        .await
        .unwrap();
    let order = engine
        .complete_payment(PaymentCmd::new(order.id, PaymentMethod::Credit, CASHIER))
        .await
        .unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Credit);

    let charged = engine.customer(customer.id).await.unwrap();
    assert_eq!(charged.current_credit, Money::major(1_400));
    assert_eq!(charged.total_orders, 1);
    assert!(charged.is_over_limit());
    assert_eq!(engine.customers_over_limit().await.unwrap().len(), 1);
    assert_eq!(
        engine.account(books.receivable).await.unwrap().current_balance,
        Money::major(1_400)
    );

    let err = engine
        .record_credit_payment(customer.id, Money::major(2_000), PaymentMethod::Cash, CASHIER)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let settled = engine
        .record_credit_payment(customer.id, Money::major(1_400), PaymentMethod::Cash, CASHIER)
        .await
        .unwrap();
    assert_eq!(settled.current_credit, Money::ZERO);
    assert_eq!(
        engine.account(books.receivable).await.unwrap().current_balance,
        Money::ZERO
    );
    assert_eq!(
        engine.account(books.cash).await.unwrap().current_balance,
        Money::major(1_400)
    );
}

#[tokio::test]
async fn order_numbers_are_sequential_and_lists_paginate() {
    let (engine, _db) = engine_with_db(StockPolicy::Reject).await;
    let mut numbers = Vec::new();
    for _ in 0..5 {
        let order = engine
            .create_order(CreateOrderCmd::new(OrderType::Takeaway, CASHIER))
            .await
            .unwrap();
        numbers.push(order.order_number);
    }
    assert!(numbers[0].ends_with("-000001"));
    assert!(numbers[4].ends_with("-000005"));

    let (first, cursor) = engine
        .list_orders(OrderListFilter::default(), 3, None)
        .await
        .unwrap();
    assert_eq!(first.len(), 3);
    let cursor = cursor.unwrap();
    let (rest, cursor) = engine
        .list_orders(OrderListFilter::default(), 3, Some(&cursor))
        .await
        .unwrap();
    assert_eq!(rest.len(), 2);
    assert!(cursor.is_none());

    let mut seen: Vec<_> = first
        .iter()
        .chain(rest.iter())
        .map(|view| view.order.order_number.clone())
        .collect();
    seen.sort();
    assert_eq!(seen, numbers);

    let cancelled = engine
        .list_orders(
            OrderListFilter {
                status: Some(OrderStatus::Cancelled),
                ..OrderListFilter::default()
            },
            10,
            None,
        )
        .await
        .unwrap();
    assert!(cancelled.0.is_empty());

    let err = engine
        .list_orders(OrderListFilter::default(), 3, Some("not-a-cursor"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidCursor(_)));
}
