#![allow(dead_code)]

use chrono::{Datelike, NaiveDate, Utc};
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

use engine::{
    AccountType, Engine, Money, NewIngredientCmd, PointerKey, Quantity, RecipeLine, StockPolicy,
};
use migration::MigratorTrait;

pub const CASHIER: &str = "cashier-1";

pub async fn engine_with_db(policy: StockPolicy) -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .stock_policy(policy)
        .build()
        .await
        .unwrap();
    (engine, db)
}

/// An engine on a fresh SQLite file, for tests that run operations from
/// several tasks at once.
pub async fn engine_on_file(policy: StockPolicy) -> Engine {
    let path = std::env::temp_dir().join(format!("tavola-{}.db", Uuid::new_v4()));
    let db = Database::connect(format!("sqlite:{}?mode=rwc", path.display()))
        .await
        .unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Engine::builder()
        .database(db)
        .stock_policy(policy)
        .conflict_retries(10)
        .build()
        .await
        .unwrap()
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Posting accounts bound to every role.
pub struct Books {
    pub cash: Uuid,
    pub bank: Uuid,
    pub receivable: Uuid,
    pub inventory: Uuid,
    pub payable: Uuid,
    pub tax_payable: Uuid,
    pub capital: Uuid,
    pub sales: Uuid,
    pub cost_of_goods: Uuid,
}

/// Creates a chart of accounts, a current financial year covering today and
/// binds every posting role.
pub async fn setup_books(engine: &Engine) -> Books {
    let year = today().year();
    let fy = engine
        .create_financial_year(
            &format!("FY{year}"),
            NaiveDate::from_ymd_opt(year, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(year, 12, 31).unwrap(),
        )
        .await
        .unwrap();
    engine.set_current_financial_year(fy.id).await.unwrap();

    let books = Books {
        cash: account(engine, "1000", "Cash", AccountType::Asset).await,
        bank: account(engine, "1010", "Bank", AccountType::Asset).await,
        receivable: account(engine, "1100", "Receivables", AccountType::Asset).await,
        inventory: account(engine, "1200", "Inventory", AccountType::Asset).await,
        payable: account(engine, "2000", "Payables", AccountType::Liability).await,
        tax_payable: account(engine, "2100", "Tax payable", AccountType::Liability).await,
        capital: account(engine, "3000", "Capital", AccountType::Equity).await,
        sales: account(engine, "4000", "Sales", AccountType::Income).await,
        cost_of_goods: account(engine, "5000", "Cost of goods", AccountType::Expense).await,
    };

    for (role, id) in [
        (PointerKey::CashAccount, books.cash),
        (PointerKey::BankAccount, books.bank),
        (PointerKey::ReceivableAccount, books.receivable),
        (PointerKey::SalesAccount, books.sales),
        (PointerKey::TaxPayableAccount, books.tax_payable),
        (PointerKey::InventoryAccount, books.inventory),
        (PointerKey::CostOfGoodsAccount, books.cost_of_goods),
        (PointerKey::PayableAccount, books.payable),
    ] {
        engine.set_posting_account(role, id).await.unwrap();
    }
    books
}

async fn account(engine: &Engine, code: &str, name: &str, kind: AccountType) -> Uuid {
    engine.create_account(code, name, kind).await.unwrap().id
}

pub async fn ingredient(engine: &Engine, name: &str, stock: i64, cost: i64) -> Uuid {
    engine
        .create_ingredient(
            NewIngredientCmd::new(name, "kg", CASHIER)
                .opening_stock(Quantity::units(stock))
                .cost_per_unit(Money::major(cost)),
        )
        .await
        .unwrap()
        .id
}

/// A menu item whose recipe consumes `per_unit` whole units of `ingredient_id`.
pub async fn dish(engine: &Engine, name: &str, price: i64, ingredient_id: Uuid, per_unit: i64) -> Uuid {
    let item = engine
        .create_menu_item(name, Money::major(price))
        .await
        .unwrap();
    engine
        .set_recipe(
            item.id,
            vec![RecipeLine {
                ingredient_id,
                quantity: Quantity::units(per_unit),
            }],
        )
        .await
        .unwrap();
    item.id
}
