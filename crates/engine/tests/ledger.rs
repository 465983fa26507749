use chrono::{Datelike, NaiveDate};
use sea_orm::{ConnectionTrait, Statement};

use engine::{
    AccountType, EngineError, EntryLine, Money, PointerKey, PostTransactionCmd, StockPolicy,
    VoucherType,
};

mod common;

use common::{CASHIER, engine_with_db, setup_books, today};

fn day_in_year(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(today().year(), month, day).unwrap()
}

#[tokio::test]
async fn journal_moves_both_accounts_by_the_amount() {
    let (engine, _db) = engine_with_db(StockPolicy::Reject).await;
    let books = setup_books(&engine).await;

    let posted = engine
        .post_transaction(
            PostTransactionCmd::new(today(), VoucherType::Journal, "Catering income", CASHIER)
                .debit(books.cash, Money::major(500))
                .credit(books.sales, Money::major(500)),
        )
        .await
        .unwrap();
    assert_eq!(posted.voucher_number, "JOU-00001");
    assert_eq!(posted.total_debit, posted.total_credit);
    assert_eq!(posted.entries.len(), 2);

    assert_eq!(
        engine.account(books.cash).await.unwrap().current_balance,
        Money::major(500)
    );
    assert_eq!(
        engine.account(books.sales).await.unwrap().current_balance,
        Money::major(500)
    );

    let second = engine
        .post_transaction(
            PostTransactionCmd::new(today(), VoucherType::Journal, "Owner top up", CASHIER)
                .debit(books.cash, Money::major(50))
                .credit(books.capital, Money::major(50)),
        )
        .await
        .unwrap();
    assert_eq!(second.voucher_number, "JOU-00002");
    let reread = engine.transaction(second.id).await.unwrap();
    assert_eq!(reread.voucher_number, second.voucher_number);
    assert_eq!(reread.entries.len(), 2);
}

#[tokio::test]
async fn unbalanced_or_malformed_entries_are_rejected() {
    let (engine, _db) = engine_with_db(StockPolicy::Reject).await;
    let books = setup_books(&engine).await;

    let err = engine
        .post_transaction(
            PostTransactionCmd::new(today(), VoucherType::Journal, "Typo", CASHIER)
                .debit(books.cash, Money::major(500))
                .credit(books.sales, Money::major(499)),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::UnbalancedTransaction {
            debit: 50_000,
            credit: 49_900,
        }
    );

    let err = engine
        .post_transaction(
            PostTransactionCmd::new(today(), VoucherType::Journal, "Both sides", CASHIER).entry(
                EntryLine {
                    account_id: books.cash,
                    debit: Money::major(1),
                    credit: Money::major(1),
                    description: None,
                },
            ),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .post_transaction(PostTransactionCmd::new(
            today(),
            VoucherType::Journal,
            "Empty",
            CASHIER,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    assert_eq!(
        engine.account(books.cash).await.unwrap().current_balance,
        Money::ZERO
    );
    assert!(engine.transactions(10, None).await.unwrap().0.is_empty());
}

#[tokio::test]
async fn overflowing_amounts_are_rejected_before_posting() {
    let (engine, _db) = engine_with_db(StockPolicy::Reject).await;
    let books = setup_books(&engine).await;

    let err = engine
        .post_transaction(
            PostTransactionCmd::new(today(), VoucherType::Journal, "Wraps around", CASHIER)
                .debit(books.cash, Money::new(i64::MAX))
                .debit(books.cash, Money::new(i64::MAX))
                .debit(books.cash, Money::new(3))
                .credit(books.sales, Money::new(1)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert!(engine.transactions(10, None).await.unwrap().0.is_empty());

    engine
        .post_transaction(
            PostTransactionCmd::new(today(), VoucherType::Journal, "Large sale", CASHIER)
                .debit(books.cash, Money::new(i64::MAX))
                .credit(books.sales, Money::new(i64::MAX)),
        )
        .await
        .unwrap();
    let err = engine
        .post_transaction(
            PostTransactionCmd::new(today(), VoucherType::Journal, "One more", CASHIER)
                .debit(books.cash, Money::new(1))
                .credit(books.capital, Money::new(1)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    assert_eq!(
        engine.account(books.cash).await.unwrap().current_balance,
        Money::new(i64::MAX)
    );
    assert_eq!(engine.transactions(10, None).await.unwrap().0.len(), 1);
}

#[tokio::test]
async fn posting_needs_a_current_year_covering_the_date() {
    let (engine, _db) = engine_with_db(StockPolicy::Reject).await;
    let cash = engine
        .create_account("1000", "Cash", AccountType::Asset)
        .await
        .unwrap();
    let sales = engine
        .create_account("4000", "Sales", AccountType::Income)
        .await
        .unwrap();
    let cmd = PostTransactionCmd::new(today(), VoucherType::Journal, "Sale", CASHIER)
        .debit(cash.id, Money::major(5))
        .credit(sales.id, Money::major(5));

    let err = engine.post_transaction(cmd.clone()).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let year = today().year();
    let fy = engine
        .create_financial_year(
            "Last year",
            NaiveDate::from_ymd_opt(year - 1, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(year - 1, 12, 31).unwrap(),
        )
        .await
        .unwrap();
    engine.set_current_financial_year(fy.id).await.unwrap();
    let err = engine.post_transaction(cmd).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn chart_and_posting_roles_are_validated() {
    let (engine, _db) = engine_with_db(StockPolicy::Reject).await;
    let books = setup_books(&engine).await;

    let err = engine
        .create_account("1000", "Petty cash", AccountType::Asset)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    let err = engine
        .set_posting_account(PointerKey::TaxSetting, books.cash)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let roles = engine.posting_accounts().await.unwrap();
    assert_eq!(roles.len(), PointerKey::POSTING_ROLES.len());
    assert!(
        roles
            .iter()
            .any(|(role, account)| *role == PointerKey::SalesAccount && account.id == books.sales)
    );

    let codes: Vec<_> = engine
        .accounts()
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.code)
        .collect();
    let mut sorted = codes.clone();
    sorted.sort();
    assert_eq!(codes, sorted);
}

#[tokio::test]
async fn account_ledger_rereads_identically_with_running_balance() {
    let (engine, _db) = engine_with_db(StockPolicy::Reject).await;
    let books = setup_books(&engine).await;

    for (date, amount) in [
        (day_in_year(1, 10), 100),
        (day_in_year(3, 5), 250),
        (day_in_year(6, 1), 40),
    ] {
        engine
            .post_transaction(
                PostTransactionCmd::new(date, VoucherType::Receipt, "Takings", CASHIER)
                    .debit(books.cash, Money::major(amount))
                    .credit(books.sales, Money::major(amount)),
            )
            .await
            .unwrap();
    }
    engine
        .post_transaction(
            PostTransactionCmd::new(day_in_year(4, 1), VoucherType::Payment, "Supplier", CASHIER)
                .debit(books.payable, Money::major(30))
                .credit(books.cash, Money::major(30)),
        )
        .await
        .unwrap();

    let first = engine.account_ledger(books.cash, None, None).await.unwrap();
    let second = engine.account_ledger(books.cash, None, None).await.unwrap();
    assert_eq!(first, second);

    let balances: Vec<_> = first.lines.iter().map(|l| l.balance).collect();
    assert_eq!(
        balances,
        vec![
            Money::major(100),
            Money::major(350),
            Money::major(320),
            Money::major(360),
        ]
    );
    assert_eq!(first.closing_balance, Money::major(360));
    assert_eq!(
        first.closing_balance,
        engine.account(books.cash).await.unwrap().current_balance
    );

    let window = engine
        .account_ledger(books.cash, Some(day_in_year(3, 1)), Some(day_in_year(4, 30)))
        .await
        .unwrap();
    assert_eq!(window.opening_balance, Money::major(100));
    assert_eq!(window.lines.len(), 2);
    assert_eq!(window.closing_balance, Money::major(320));

    let err = engine
        .account_ledger(books.cash, Some(day_in_year(5, 1)), Some(day_in_year(4, 1)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn every_committed_transaction_balances() {
    let (engine, _db) = engine_with_db(StockPolicy::Reject).await;
    let books = setup_books(&engine).await;
    for amount in [10, 20, 30, 40, 50] {
        engine
            .post_transaction(
                PostTransactionCmd::new(today(), VoucherType::Sales, "Sale", CASHIER)
                    .debit(books.bank, Money::major(amount))
                    .credit(books.sales, Money::major(amount - 1))
                    .credit(books.tax_payable, Money::major(1)),
            )
            .await
            .unwrap();
    }

    let (page, cursor) = engine.transactions(3, None).await.unwrap();
    let (rest, end) = engine.transactions(3, cursor.as_deref()).await.unwrap();
    assert!(end.is_none());
    let all: Vec<_> = page.into_iter().chain(rest).collect();
    assert_eq!(all.len(), 5);
    for transaction in &all {
        let debit: Money = transaction.entries.iter().map(|e| e.debit).sum();
        let credit: Money = transaction.entries.iter().map(|e| e.credit).sum();
        assert_eq!(debit, credit);
        assert_eq!(debit, transaction.total_debit);
    }

    let trial = engine.trial_balance().await.unwrap();
    assert!(trial.is_balanced());
    assert_eq!(trial.total_debit, Money::major(150));
}

#[tokio::test]
async fn statements_follow_the_balances() {
    let (engine, _db) = engine_with_db(StockPolicy::Reject).await;
    let books = setup_books(&engine).await;
    engine
        .post_transaction(
            PostTransactionCmd::new(today(), VoucherType::Journal, "Capital", CASHIER)
                .debit(books.cash, Money::major(1_000))
                .credit(books.capital, Money::major(1_000)),
        )
        .await
        .unwrap();
    engine
        .post_transaction(
            PostTransactionCmd::new(today(), VoucherType::Sales, "Sales", CASHIER)
                .debit(books.cash, Money::major(400))
                .credit(books.sales, Money::major(400)),
        )
        .await
        .unwrap();
    engine
        .post_transaction(
            PostTransactionCmd::new(today(), VoucherType::Journal, "Cost", CASHIER)
                .debit(books.cost_of_goods, Money::major(150))
                .credit(books.cash, Money::major(150)),
        )
        .await
        .unwrap();

    let year = today().year();
    let pnl = engine
        .profit_and_loss(
            NaiveDate::from_ymd_opt(year, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(year, 12, 31).unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(pnl.total_income, Money::major(400));
    assert_eq!(pnl.total_expenses, Money::major(150));
    assert_eq!(pnl.net_profit, Money::major(250));

    let sheet = engine.balance_sheet().await.unwrap();
    assert_eq!(sheet.total_assets, Money::major(1_250));
    assert_eq!(sheet.total_equity, Money::major(1_000));
    assert_eq!(sheet.retained_earnings, Money::major(250));
    assert!(sheet.is_balanced());
}

#[tokio::test]
async fn balances_are_rebuilt_from_entries() {
    let (engine, db) = engine_with_db(StockPolicy::Reject).await;
    let books = setup_books(&engine).await;
    engine
        .post_transaction(
            PostTransactionCmd::new(today(), VoucherType::Journal, "Float", CASHIER)
                .debit(books.cash, Money::major(75))
                .credit(books.capital, Money::major(75)),
        )
        .await
        .unwrap();

    db.execute(Statement::from_sql_and_values(
        db.get_database_backend(),
        "UPDATE accounts SET current_balance_minor = ? WHERE id = ?",
        vec![0i64.into(), books.cash.to_string().into()],
    ))
    .await
    .unwrap();

    let chart = engine.recompute_account_balances().await.unwrap();
    let cash = chart.iter().find(|a| a.id == books.cash).unwrap();
    assert_eq!(cash.current_balance, Money::major(75));
}
