use engine::{
    AddItemCmd, CreateOrderCmd, EngineError, Money, OrderListFilter, OrderType, PaymentCmd,
    PaymentMethod, SessionStatus, StockPolicy,
};

mod common;

use common::{CASHIER, engine_with_db};

#[tokio::test]
async fn one_open_session_per_cashier() {
    let (engine, _db) = engine_with_db(StockPolicy::Reject).await;
    let session = engine.open_session(CASHIER, Money::major(100)).await.unwrap();

    let err = engine
        .open_session(CASHIER, Money::major(100))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));
    engine.open_session("cashier-2", Money::ZERO).await.unwrap();

    let current = engine.current_session(CASHIER).await.unwrap().unwrap();
    assert_eq!(current.id, session.id);

    engine
        .close_session(session.id, Money::major(100), None, CASHIER)
        .await
        .unwrap();
    assert!(engine.current_session(CASHIER).await.unwrap().is_none());
    let err = engine
        .close_session(session.id, Money::major(100), None, CASHIER)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));
}

#[tokio::test]
async fn closing_records_variance_against_expected_cash() {
    let (engine, _db) = engine_with_db(StockPolicy::Reject).await;
    let session = engine.open_session(CASHIER, Money::major(1_000)).await.unwrap();
    let item = engine
        .create_menu_item("Set menu", Money::major(1_500))
        .await
        .unwrap();

    for _ in 0..2 {
        let order = engine
            .create_order(CreateOrderCmd::new(OrderType::Takeaway, CASHIER))
            .await
            .unwrap();
        assert_eq!(order.session_id, Some(session.id));
        engine
            .add_item(AddItemCmd::new(order.id, item.id, 1, CASHIER))
            .await
            .unwrap();
        engine
            .complete_payment(PaymentCmd::new(order.id, PaymentMethod::Cash, CASHIER))
            .await
            .unwrap();
    }

    let card_order = engine
        .create_order(CreateOrderCmd::new(OrderType::Takeaway, CASHIER))
        .await
        .unwrap();
    engine
        .add_item(AddItemCmd::new(card_order.id, item.id, 1, CASHIER))
        .await
        .unwrap();
    engine
        .complete_payment(PaymentCmd::new(card_order.id, PaymentMethod::Card, CASHIER))
        .await
        .unwrap();

    let summary = engine.session_summary(session.id).await.unwrap();
    assert_eq!(summary.session.cash_sales, Money::major(3_000));
    assert_eq!(summary.session.card_sales, Money::major(1_500));
    assert_eq!(summary.session.total_sales, Money::major(4_500));
    assert_eq!(summary.session.order_count, 3);
    assert_eq!(summary.payments.len(), 3);
    assert_eq!(summary.expected_cash, Money::major(4_000));

    let closed = engine
        .close_session(session.id, Money::major(3_900), Some("short"), CASHIER)
        .await
        .unwrap();
    assert_eq!(closed.status, SessionStatus::Closed);
    assert_eq!(closed.expected_cash, Some(Money::major(4_000)));
    assert_eq!(closed.counted_cash, Some(Money::major(3_900)));
    assert_eq!(closed.cash_variance, Some(Money::major(-100)));
    assert!(closed.closed_at.is_some());

    let (orders, _) = engine
        .list_orders(
            OrderListFilter {
                session_id: Some(session.id),
                ..OrderListFilter::default()
            },
            10,
            None,
        )
        .await
        .unwrap();
    assert_eq!(orders.len(), 3);
}

#[tokio::test]
async fn payments_after_close_are_not_added_to_the_session() {
    let (engine, _db) = engine_with_db(StockPolicy::Reject).await;
    let session = engine.open_session(CASHIER, Money::ZERO).await.unwrap();
    let item = engine
        .create_menu_item("Coffee", Money::major(90))
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
    engine
        .close_session(session.id, Money::ZERO, None, CASHIER)
        .await
        .unwrap();

    let order = engine
        .complete_payment(PaymentCmd::new(order.id, PaymentMethod::Cash, CASHIER))
        .await
        .unwrap();
    let view = engine.order_view(order.id).await.unwrap();
    assert_eq!(view.payments[0].session_id, None);

    let summary = engine.session_summary(session.id).await.unwrap();
    assert_eq!(summary.session.cash_sales, Money::ZERO);
    assert!(summary.payments.is_empty());
}

#[tokio::test]
async fn negative_opening_cash_is_rejected() {
    let (engine, _db) = engine_with_db(StockPolicy::Reject).await;
    let err = engine
        .open_session(CASHIER, Money::major(-1))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}
