use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ConnectionTrait, Statement};
use uuid::Uuid;

use engine::{
    AddItemCmd, CreateOrderCmd, CreatePurchaseCmd, Engine, EngineError, Money, MovementType,
    NewIngredientCmd, OrderStatus, OrderType, PaymentCmd, PaymentMethod, PurchaseStatus,
    Quantity, RecipeLine, ReferenceType, StockCmd, StockPolicy,
};

mod common;

use common::{CASHIER, dish, engine_on_file, engine_with_db, ingredient, setup_books};

#[tokio::test]
async fn opening_stock_is_a_movement() {
    let (engine, _db) = engine_with_db(StockPolicy::Reject).await;
    let id = ingredient(&engine, "Onion", 12, 1).await;

    let (movements, next) = engine.stock_movements(Some(id), 10, None).await.unwrap();
    assert!(next.is_none());
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].movement_type, MovementType::Opening);
    assert_eq!(movements[0].previous_stock, Quantity::ZERO);
    assert_eq!(movements[0].new_stock, Quantity::units(12));

    let err = engine
        .create_ingredient(NewIngredientCmd::new("onion", "kg", CASHIER))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));
}

#[tokio::test]
async fn rejecting_policy_fails_short_deduction_without_writes() {
    let (engine, _db) = engine_with_db(StockPolicy::Reject).await;
    let id = ingredient(&engine, "Butter", 10, 1).await;

    let err = engine
        .deduct(StockCmd::new(id, Quantity::units(15), CASHIER))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientStock(_)));

    assert_eq!(
        engine.ingredient(id).await.unwrap().current_stock,
        Quantity::units(10)
    );
    let (movements, _) = engine.stock_movements(Some(id), 10, None).await.unwrap();
    assert_eq!(movements.len(), 1);
}

#[tokio::test]
async fn clamping_policy_floors_at_zero_and_keeps_requested_quantity() {
    let (engine, _db) = engine_with_db(StockPolicy::Clamp).await;
    let id = ingredient(&engine, "Cheese", 10, 1).await;
    let dish_id = dish(&engine, "Pizza", 500, id, 15).await;

    let order = engine
        .create_order(CreateOrderCmd::new(OrderType::Takeaway, CASHIER))
        .await
        .unwrap();
    engine
        .add_item(AddItemCmd::new(order.id, dish_id, 1, CASHIER))
        .await
        .unwrap();
    let order = engine
        .complete_payment(PaymentCmd::new(order.id, PaymentMethod::Cash, CASHIER))
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Completed);

    assert_eq!(
        engine.ingredient(id).await.unwrap().current_stock,
        Quantity::ZERO
    );
    let (movements, _) = engine.stock_movements(Some(id), 1, None).await.unwrap();
    let sale = &movements[0];
    assert_eq!(sale.movement_type, MovementType::Sale);
    assert_eq!(sale.reference_type, ReferenceType::Order);
    assert_eq!(sale.reference_id.as_deref(), Some(order.id.to_string().as_str()));
    assert_eq!(sale.note.as_deref(), Some(order.order_number.as_str()));
    assert_eq!(sale.previous_stock, Quantity::units(10));
    assert_eq!(sale.new_stock, Quantity::ZERO);
    assert_eq!(sale.quantity, -Quantity::units(15));
    assert!(sale.is_clamped());

    // Clamped rows still replay to the stored stock.
    assert!(engine.verify_stock_ledger().await.unwrap().is_empty());
}

#[tokio::test]
async fn replay_matches_stock_after_mixed_movements() {
    let (engine, _db) = engine_with_db(StockPolicy::Reject).await;
    let oil = ingredient(&engine, "Oil", 20, 3).await;
    let salt = ingredient(&engine, "Salt", 5, 1).await;

    engine
        .receive(StockCmd::new(oil, Quantity::new(2_500), CASHIER).note("top up"))
        .await
        .unwrap();
    engine
        .deduct(StockCmd::new(oil, Quantity::units(4), CASHIER))
        .await
        .unwrap();
    let waste = engine
        .record_waste(StockCmd::new(salt, Quantity::units(1), CASHIER).note("spilled"))
        .await
        .unwrap();
    assert_eq!(waste.movement_type, MovementType::Waste);
    assert_eq!(waste.quantity, -Quantity::units(1));

    let adjusted = engine
        .adjust_stock(oil, Quantity::units(18), Some("stock take"), CASHIER)
        .await
        .unwrap();
    assert_eq!(adjusted.previous_stock, Quantity::new(18_500));
    assert_eq!(adjusted.quantity, Quantity::new(-500));
    assert_eq!(adjusted.new_stock, Quantity::units(18));

    let err = engine
        .deduct(StockCmd::new(oil, Quantity::ZERO, CASHIER))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    assert!(engine.verify_stock_ledger().await.unwrap().is_empty());
    assert_eq!(
        engine.ingredient(salt).await.unwrap().current_stock,
        Quantity::units(4)
    );
}

#[tokio::test]
async fn replay_reports_rows_edited_outside_the_engine() {
    let (engine, db) = engine_with_db(StockPolicy::Reject).await;
    let id = ingredient(&engine, "Sugar", 7, 1).await;

    db.execute(Statement::from_sql_and_values(
        db.get_database_backend(),
        "UPDATE ingredients SET current_stock = ? WHERE id = ?",
        vec![1_000i64.into(), id.to_string().into()],
    ))
    .await
    .unwrap();

    let drifts = engine.verify_stock_ledger().await.unwrap();
    assert_eq!(drifts.len(), 1);
    assert_eq!(drifts[0].ingredient_id, id);
    assert_eq!(drifts[0].stored, Quantity::units(1));
    assert_eq!(drifts[0].replayed, Quantity::units(7));
    assert!(drifts[0].broken_rows.is_empty());
}

#[tokio::test]
async fn movements_paginate_newest_first() {
    let (engine, _db) = engine_with_db(StockPolicy::Reject).await;
    let id = ingredient(&engine, "Garlic", 1, 1).await;
    for _ in 0..4 {
        engine
            .receive(StockCmd::new(id, Quantity::units(1), CASHIER))
            .await
            .unwrap();
    }

    let (page, cursor) = engine.stock_movements(Some(id), 3, None).await.unwrap();
    assert_eq!(page.len(), 3);
    assert!(page.windows(2).all(|pair| pair[0].seq > pair[1].seq));
    let (rest, cursor) = engine
        .stock_movements(Some(id), 3, cursor.as_deref())
        .await
        .unwrap();
    assert_eq!(rest.len(), 2);
    assert!(cursor.is_none());
    assert_eq!(rest[1].movement_type, MovementType::Opening);
}

#[tokio::test]
async fn low_stock_lists_ingredients_at_reorder_level() {
    let (engine, _db) = engine_with_db(StockPolicy::Reject).await;
    engine
        .create_ingredient(
            NewIngredientCmd::new("Milk", "l", CASHIER)
                .opening_stock(Quantity::units(2))
                .reorder_level(Quantity::units(5)),
        )
        .await
        .unwrap();
    engine
        .create_ingredient(
            NewIngredientCmd::new("Tea leaves", "kg", CASHIER)
                .opening_stock(Quantity::units(9))
                .reorder_level(Quantity::units(1)),
        )
        .await
        .unwrap();

    let low = engine.low_stock_ingredients().await.unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].name, "Milk");
    assert!(low[0].needs_reorder());
}

#[tokio::test]
async fn recipes_scale_by_ordered_quantity() {
    let (engine, _db) = engine_with_db(StockPolicy::Reject).await;
    let flour = ingredient(&engine, "Flour", 50, 1).await;
    let egg = ingredient(&engine, "Egg", 30, 1).await;
    let item = engine
        .create_menu_item("Pancake", Money::major(150))
        .await
        .unwrap();

    let err = engine
        .set_recipe(
            item.id,
            vec![
                RecipeLine {
                    ingredient_id: flour,
                    quantity: Quantity::new(200),
                },
                RecipeLine {
                    ingredient_id: flour,
                    quantity: Quantity::new(100),
                },
            ],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    engine
        .set_recipe(
            item.id,
            vec![
                RecipeLine {
                    ingredient_id: flour,
                    quantity: Quantity::new(200),
                },
                RecipeLine {
                    ingredient_id: egg,
                    quantity: Quantity::units(2),
                },
            ],
        )
        .await
        .unwrap();

    let usage = engine.resolve_recipe(item.id, 3).await.unwrap();
    let flour_use = usage.iter().find(|u| u.ingredient_id == flour).unwrap();
    let egg_use = usage.iter().find(|u| u.ingredient_id == egg).unwrap();
    assert_eq!(flour_use.quantity, Quantity::new(600));
    assert_eq!(egg_use.quantity, Quantity::units(6));

    let err = engine.resolve_recipe(item.id, 0).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    // Resolving has no side effects.
    assert_eq!(
        engine.ingredient(flour).await.unwrap().current_stock,
        Quantity::units(50)
    );
}

#[tokio::test]
async fn receiving_a_purchase_adds_stock_once() {
    let (engine, _db) = engine_with_db(StockPolicy::Reject).await;
    let books = setup_books(&engine).await;
    let rice = ingredient(&engine, "Rice", 5, 8).await;

    let purchase = engine
        .create_purchase(
            CreatePurchaseCmd::new("Wholesale Co", Utc::now().date_naive(), CASHIER)
                .invoice_number("INV-7")
                .line(rice, Quantity::units(50), Money::major(10)),
        )
        .await
        .unwrap();
    assert_eq!(purchase.status, PurchaseStatus::Draft);
    assert_eq!(purchase.total, Money::major(500));
    assert_eq!(
        engine.ingredient(rice).await.unwrap().current_stock,
        Quantity::units(5)
    );

    let received = engine.receive_purchase(purchase.id, CASHIER).await.unwrap();
    assert_eq!(received.status, PurchaseStatus::Received);
    assert_eq!(received.received_by.as_deref(), Some(CASHIER));

    let stocked = engine.ingredient(rice).await.unwrap();
    assert_eq!(stocked.current_stock, Quantity::units(55));
    assert_eq!(stocked.cost_per_unit, Money::major(10));

    let (movements, _) = engine.stock_movements(Some(rice), 10, None).await.unwrap();
    let purchases: Vec<_> = movements
        .iter()
        .filter(|m| m.movement_type == MovementType::Purchase)
        .collect();
    assert_eq!(purchases.len(), 1);
    assert_eq!(purchases[0].quantity, Quantity::units(50));
    assert_eq!(purchases[0].reference_type, ReferenceType::Purchase);
    assert_eq!(purchases[0].note.as_deref(), Some("INV-7"));

    assert_eq!(
        engine.account(books.inventory).await.unwrap().current_balance,
        Money::major(500)
    );
    assert_eq!(
        engine.account(books.payable).await.unwrap().current_balance,
        Money::major(500)
    );

    let err = engine
        .receive_purchase(purchase.id, CASHIER)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));
    let err = engine.delete_purchase(purchase.id, CASHIER).await.unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));
    assert_eq!(
        engine.ingredient(rice).await.unwrap().current_stock,
        Quantity::units(55)
    );
}

#[tokio::test]
async fn draft_purchases_can_be_cancelled_or_deleted() {
    let (engine, _db) = engine_with_db(StockPolicy::Reject).await;
    let beans = ingredient(&engine, "Beans", 0, 0).await;
    let date = Utc::now().date_naive();

    let err = engine
        .create_purchase(CreatePurchaseCmd::new("Farm", date, CASHIER))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let cancelled = engine
        .create_purchase(
            CreatePurchaseCmd::new("Farm", date, CASHIER).line(beans, Quantity::units(3), Money::major(2)),
        )
        .await
        .unwrap();
    let cancelled = engine.cancel_purchase(cancelled.id, CASHIER).await.unwrap();
    assert_eq!(cancelled.status, PurchaseStatus::Cancelled);
    let err = engine
        .receive_purchase(cancelled.id, CASHIER)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));

    let draft = engine
        .create_purchase(
            CreatePurchaseCmd::new("Farm", date, CASHIER).line(beans, Quantity::units(1), Money::major(2)),
        )
        .await
        .unwrap();
    engine.delete_purchase(draft.id, CASHIER).await.unwrap();
    let err = engine.purchase(draft.id).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    assert_eq!(
        engine.ingredient(beans).await.unwrap().current_stock,
        Quantity::ZERO
    );
}

/// Creates `count` takeaway orders of one `dish_id` each.
async fn open_orders(engine: &Engine, dish_id: Uuid, count: usize) -> Vec<Uuid> {
    let mut ids = Vec::with_capacity(count);
    for _ in 0..count {
        let order = engine
            .create_order(CreateOrderCmd::new(OrderType::Takeaway, CASHIER))
            .await
            .unwrap();
        engine
            .add_item(AddItemCmd::new(order.id, dish_id, 1, CASHIER))
            .await
            .unwrap();
        ids.push(order.id);
    }
    ids
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_fulfillments_deduct_shared_stock_once_each() {
    let engine = Arc::new(engine_on_file(StockPolicy::Reject).await);
    let flour = ingredient(&engine, "Flour", 100, 1).await;
    let bread = dish(&engine, "Bread", 10, flour, 1).await;
    let orders = open_orders(&engine, bread, 8).await;

    let mut tasks = tokio::task::JoinSet::new();
    for order_id in orders {
        let engine = Arc::clone(&engine);
        tasks.spawn(async move {
            engine
                .complete_payment(PaymentCmd::new(order_id, PaymentMethod::Cash, CASHIER))
                .await
        });
    }
    while let Some(joined) = tasks.join_next().await {
        let order = joined.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
    }

    assert_eq!(
        engine.ingredient(flour).await.unwrap().current_stock,
        Quantity::units(92)
    );
    let (movements, _) = engine.stock_movements(Some(flour), 20, None).await.unwrap();
    let sales = movements
        .iter()
        .filter(|movement| movement.movement_type == MovementType::Sale)
        .count();
    assert_eq!(sales, 8);
    assert!(engine.verify_stock_ledger().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_fulfillments_never_oversell() {
    let engine = Arc::new(engine_on_file(StockPolicy::Reject).await);
    let cheese = ingredient(&engine, "Cheese", 5, 2).await;
    let toastie = dish(&engine, "Toastie", 8, cheese, 1).await;
    let orders = open_orders(&engine, toastie, 8).await;

    let mut tasks = tokio::task::JoinSet::new();
    for order_id in orders {
        let engine = Arc::clone(&engine);
        tasks.spawn(async move {
            engine
                .complete_payment(PaymentCmd::new(order_id, PaymentMethod::Cash, CASHIER))
                .await
        });
    }
    let mut completed = 0;
    let mut short = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined.unwrap() {
            Ok(_) => completed += 1,
            Err(EngineError::InsufficientStock(_)) => short += 1,
            Err(err) => panic!("unexpected error: {err}"),
        }
    }

    assert_eq!(completed, 5);
    assert_eq!(short, 3);
    assert_eq!(
        engine.ingredient(cheese).await.unwrap().current_stock,
        Quantity::ZERO
    );
    assert!(engine.verify_stock_ledger().await.unwrap().is_empty());
}
