//! Initial schema migration - creates all tables from scratch.
//!
//! - `ingredients`, `stock_movements`: stock levels and their append-only history
//! - `menu_items`, `recipe_lines`: what an order consumes
//! - `discounts`, `tax_settings`, `dining_tables`, `customers`: order inputs
//! - `cashier_sessions`, `orders`, `order_items`, `payments`: the sales path
//! - `purchases`, `purchase_items`: inbound stock
//! - `accounts`, `financial_years`, `accounting_transactions`,
//!   `accounting_entries`: the general ledger
//! - `sequences`, `current_pointers`: counters and "current" selections

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Ingredients {
    Table,
    Id,
    Name,
    Unit,
    CurrentStock,
    ReorderLevel,
    CostPerUnitMinor,
    Version,
    CreatedAt,
}

#[derive(Iden)]
enum StockMovements {
    Table,
    Id,
    Seq,
    IngredientId,
    MovementType,
    Quantity,
    PreviousStock,
    NewStock,
    ReferenceType,
    ReferenceId,
    Note,
    CreatedBy,
    CreatedAt,
}

#[derive(Iden)]
enum MenuItems {
    Table,
    Id,
    Name,
    PriceMinor,
    Available,
    CreatedAt,
}

#[derive(Iden)]
enum RecipeLines {
    Table,
    Id,
    MenuItemId,
    IngredientId,
    Quantity,
}

#[derive(Iden)]
enum Discounts {
    Table,
    Id,
    Name,
    Kind,
    Value,
    MaxDiscountMinor,
    Active,
}

#[derive(Iden)]
enum TaxSettings {
    Table,
    Id,
    Name,
    RateBp,
    ServiceChargeBp,
}

#[derive(Iden)]
enum DiningTables {
    Table,
    Id,
    Name,
    Status,
    CurrentOrderId,
}

#[derive(Iden)]
enum Customers {
    Table,
    Id,
    Name,
    Phone,
    CreditLimitMinor,
    CurrentCreditMinor,
    TotalOrders,
    TotalSpentMinor,
}

#[derive(Iden)]
enum CashierSessions {
    Table,
    Id,
    CashierId,
    OpeningCashMinor,
    CashSalesMinor,
    CardSalesMinor,
    OnlineSalesMinor,
    CreditSalesMinor,
    TotalSalesMinor,
    OrderCount,
    Status,
    CountedCashMinor,
    ExpectedCashMinor,
    CashVarianceMinor,
    Notes,
    OpenedAt,
    ClosedAt,
}

#[derive(Iden)]
enum Orders {
    Table,
    Id,
    OrderNumber,
    OrderType,
    TableId,
    CustomerId,
    WaiterId,
    CashierId,
    SessionId,
    DiscountId,
    ManualDiscountMinor,
    SubtotalMinor,
    DiscountMinor,
    TaxMinor,
    ServiceChargeMinor,
    GrandTotalMinor,
    PaidMinor,
    Status,
    PaymentStatus,
    Notes,
    Version,
    CreatedAt,
    UpdatedAt,
    CompletedAt,
    CancelledAt,
}

#[derive(Iden)]
enum OrderItems {
    Table,
    Id,
    OrderId,
    MenuItemId,
    ItemName,
    UnitPriceMinor,
    Quantity,
    TotalPriceMinor,
    Notes,
    Status,
    KotPrinted,
    CreatedAt,
}

#[derive(Iden)]
enum Payments {
    Table,
    Id,
    OrderId,
    SessionId,
    Method,
    AmountMinor,
    TenderedMinor,
    ChangeMinor,
    ReceivedBy,
    CreatedAt,
}

#[derive(Iden)]
enum Purchases {
    Table,
    Id,
    SupplierId,
    SupplierName,
    InvoiceNumber,
    PurchaseDate,
    TotalMinor,
    Status,
    Notes,
    CreatedBy,
    ReceivedBy,
    CreatedAt,
    ReceivedAt,
}

#[derive(Iden)]
enum PurchaseItems {
    Table,
    Id,
    PurchaseId,
    IngredientId,
    Quantity,
    UnitPriceMinor,
    TotalPriceMinor,
}

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
    Code,
    Name,
    AccountType,
    CurrentBalanceMinor,
    CreatedAt,
}

#[derive(Iden)]
enum FinancialYears {
    Table,
    Id,
    Name,
    StartDate,
    EndDate,
}

#[derive(Iden)]
enum AccountingTransactions {
    Table,
    Id,
    FinancialYearId,
    VoucherType,
    VoucherNumber,
    Seq,
    Date,
    Description,
    ReferenceType,
    ReferenceId,
    TotalDebitMinor,
    TotalCreditMinor,
    CreatedBy,
    CreatedAt,
}

#[derive(Iden)]
enum AccountingEntries {
    Table,
    Id,
    TransactionId,
    Line,
    AccountId,
    DebitMinor,
    CreditMinor,
    Description,
}

#[derive(Iden)]
enum Sequences {
    Table,
    Scope,
    Value,
}

#[derive(Iden)]
enum CurrentPointers {
    Table,
    Key,
    TargetId,
    UpdatedAt,
}

fn id_col<T: IntoIden>(column: T) -> ColumnDef {
    ColumnDef::new(column).string().not_null().primary_key().to_owned()
}

fn minor_col<T: IntoIden>(column: T) -> ColumnDef {
    ColumnDef::new(column)
        .big_integer()
        .not_null()
        .default(0)
        .to_owned()
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Stock
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Ingredients::Table)
                    .if_not_exists()
                    .col(id_col(Ingredients::Id))
                    .col(ColumnDef::new(Ingredients::Name).string().not_null())
                    .col(ColumnDef::new(Ingredients::Unit).string().not_null())
                    .col(minor_col(Ingredients::CurrentStock))
                    .col(minor_col(Ingredients::ReorderLevel))
                    .col(minor_col(Ingredients::CostPerUnitMinor))
                    .col(minor_col(Ingredients::Version))
                    .col(
                        ColumnDef::new(Ingredients::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .check(Expr::col(Ingredients::CurrentStock).gte(0))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(StockMovements::Table)
                    .if_not_exists()
                    .col(id_col(StockMovements::Id))
                    .col(ColumnDef::new(StockMovements::Seq).big_integer().not_null())
                    .col(
                        ColumnDef::new(StockMovements::IngredientId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockMovements::MovementType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockMovements::Quantity)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockMovements::PreviousStock)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockMovements::NewStock)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockMovements::ReferenceType)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockMovements::ReferenceId).string())
                    .col(ColumnDef::new(StockMovements::Note).string())
                    .col(ColumnDef::new(StockMovements::CreatedBy).string().not_null())
                    .col(
                        ColumnDef::new(StockMovements::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-stock_movements-ingredient_id")
                            .from(StockMovements::Table, StockMovements::IngredientId)
                            .to(Ingredients::Table, Ingredients::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-stock_movements-seq-unique")
                    .table(StockMovements::Table)
                    .col(StockMovements::Seq)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-stock_movements-ingredient_id-seq")
                    .table(StockMovements::Table)
                    .col(StockMovements::IngredientId)
                    .col(StockMovements::Seq)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Menu and recipes
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(MenuItems::Table)
                    .if_not_exists()
                    .col(id_col(MenuItems::Id))
                    .col(ColumnDef::new(MenuItems::Name).string().not_null())
                    .col(minor_col(MenuItems::PriceMinor))
                    .col(
                        ColumnDef::new(MenuItems::Available)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(MenuItems::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RecipeLines::Table)
                    .if_not_exists()
                    .col(id_col(RecipeLines::Id))
                    .col(ColumnDef::new(RecipeLines::MenuItemId).string().not_null())
                    .col(ColumnDef::new(RecipeLines::IngredientId).string().not_null())
                    .col(ColumnDef::new(RecipeLines::Quantity).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-recipe_lines-menu_item_id")
                            .from(RecipeLines::Table, RecipeLines::MenuItemId)
                            .to(MenuItems::Table, MenuItems::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-recipe_lines-ingredient_id")
                            .from(RecipeLines::Table, RecipeLines::IngredientId)
                            .to(Ingredients::Table, Ingredients::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-recipe_lines-menu_item_id-ingredient_id-unique")
                    .table(RecipeLines::Table)
                    .col(RecipeLines::MenuItemId)
                    .col(RecipeLines::IngredientId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Order inputs
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Discounts::Table)
                    .if_not_exists()
                    .col(id_col(Discounts::Id))
                    .col(ColumnDef::new(Discounts::Name).string().not_null())
                    .col(ColumnDef::new(Discounts::Kind).string().not_null())
                    .col(ColumnDef::new(Discounts::Value).big_integer().not_null())
                    .col(ColumnDef::new(Discounts::MaxDiscountMinor).big_integer())
                    .col(
                        ColumnDef::new(Discounts::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TaxSettings::Table)
                    .if_not_exists()
                    .col(id_col(TaxSettings::Id))
                    .col(ColumnDef::new(TaxSettings::Name).string().not_null())
                    .col(minor_col(TaxSettings::RateBp))
                    .col(minor_col(TaxSettings::ServiceChargeBp))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DiningTables::Table)
                    .if_not_exists()
                    .col(id_col(DiningTables::Id))
                    .col(
                        ColumnDef::new(DiningTables::Name)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(DiningTables::Status)
                            .string()
                            .not_null()
                            .default("available"),
                    )
                    .col(ColumnDef::new(DiningTables::CurrentOrderId).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Customers::Table)
                    .if_not_exists()
                    .col(id_col(Customers::Id))
                    .col(ColumnDef::new(Customers::Name).string().not_null())
                    .col(ColumnDef::new(Customers::Phone).string())
                    .col(minor_col(Customers::CreditLimitMinor))
                    .col(minor_col(Customers::CurrentCreditMinor))
                    .col(minor_col(Customers::TotalOrders))
                    .col(minor_col(Customers::TotalSpentMinor))
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Sales path
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(CashierSessions::Table)
                    .if_not_exists()
                    .col(id_col(CashierSessions::Id))
                    .col(ColumnDef::new(CashierSessions::CashierId).string().not_null())
                    .col(minor_col(CashierSessions::OpeningCashMinor))
                    .col(minor_col(CashierSessions::CashSalesMinor))
                    .col(minor_col(CashierSessions::CardSalesMinor))
                    .col(minor_col(CashierSessions::OnlineSalesMinor))
                    .col(minor_col(CashierSessions::CreditSalesMinor))
                    .col(minor_col(CashierSessions::TotalSalesMinor))
                    .col(minor_col(CashierSessions::OrderCount))
                    .col(ColumnDef::new(CashierSessions::Status).string().not_null())
                    .col(ColumnDef::new(CashierSessions::CountedCashMinor).big_integer())
                    .col(ColumnDef::new(CashierSessions::ExpectedCashMinor).big_integer())
                    .col(ColumnDef::new(CashierSessions::CashVarianceMinor).big_integer())
                    .col(ColumnDef::new(CashierSessions::Notes).string())
                    .col(
                        ColumnDef::new(CashierSessions::OpenedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CashierSessions::ClosedAt).timestamp())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-cashier_sessions-cashier_id-status")
                    .table(CashierSessions::Table)
                    .col(CashierSessions::CashierId)
                    .col(CashierSessions::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(id_col(Orders::Id))
                    .col(
                        ColumnDef::new(Orders::OrderNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Orders::OrderType).string().not_null())
                    .col(ColumnDef::new(Orders::TableId).string())
                    .col(ColumnDef::new(Orders::CustomerId).string())
                    .col(ColumnDef::new(Orders::WaiterId).string())
                    .col(ColumnDef::new(Orders::CashierId).string().not_null())
                    .col(ColumnDef::new(Orders::SessionId).string())
                    .col(ColumnDef::new(Orders::DiscountId).string())
                    .col(ColumnDef::new(Orders::ManualDiscountMinor).big_integer())
                    .col(minor_col(Orders::SubtotalMinor))
                    .col(minor_col(Orders::DiscountMinor))
                    .col(minor_col(Orders::TaxMinor))
                    .col(minor_col(Orders::ServiceChargeMinor))
                    .col(minor_col(Orders::GrandTotalMinor))
                    .col(minor_col(Orders::PaidMinor))
                    .col(ColumnDef::new(Orders::Status).string().not_null())
                    .col(ColumnDef::new(Orders::PaymentStatus).string().not_null())
                    .col(ColumnDef::new(Orders::Notes).string())
                    .col(minor_col(Orders::Version))
                    .col(ColumnDef::new(Orders::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Orders::UpdatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Orders::CompletedAt).timestamp())
                    .col(ColumnDef::new(Orders::CancelledAt).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-orders-table_id")
                            .from(Orders::Table, Orders::TableId)
                            .to(DiningTables::Table, DiningTables::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-orders-customer_id")
                            .from(Orders::Table, Orders::CustomerId)
                            .to(Customers::Table, Customers::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-orders-session_id")
                            .from(Orders::Table, Orders::SessionId)
                            .to(CashierSessions::Table, CashierSessions::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-orders-created_at-id")
                    .table(Orders::Table)
                    .col(Orders::CreatedAt)
                    .col(Orders::Id)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrderItems::Table)
                    .if_not_exists()
                    .col(id_col(OrderItems::Id))
                    .col(ColumnDef::new(OrderItems::OrderId).string().not_null())
                    .col(ColumnDef::new(OrderItems::MenuItemId).string().not_null())
                    .col(ColumnDef::new(OrderItems::ItemName).string().not_null())
                    .col(minor_col(OrderItems::UnitPriceMinor))
                    .col(ColumnDef::new(OrderItems::Quantity).big_integer().not_null())
                    .col(minor_col(OrderItems::TotalPriceMinor))
                    .col(ColumnDef::new(OrderItems::Notes).string())
                    .col(ColumnDef::new(OrderItems::Status).string().not_null())
                    .col(
                        ColumnDef::new(OrderItems::KotPrinted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(OrderItems::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-order_items-order_id")
                            .from(OrderItems::Table, OrderItems::OrderId)
                            .to(Orders::Table, Orders::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-order_items-menu_item_id")
                            .from(OrderItems::Table, OrderItems::MenuItemId)
                            .to(MenuItems::Table, MenuItems::Id),
                    )
                    .check(Expr::col(OrderItems::Quantity).gt(0))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(id_col(Payments::Id))
                    .col(ColumnDef::new(Payments::OrderId).string().not_null())
                    .col(ColumnDef::new(Payments::SessionId).string())
                    .col(ColumnDef::new(Payments::Method).string().not_null())
                    .col(minor_col(Payments::AmountMinor))
                    .col(minor_col(Payments::TenderedMinor))
                    .col(minor_col(Payments::ChangeMinor))
                    .col(ColumnDef::new(Payments::ReceivedBy).string().not_null())
                    .col(ColumnDef::new(Payments::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-payments-order_id")
                            .from(Payments::Table, Payments::OrderId)
                            .to(Orders::Table, Orders::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Purchases
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Purchases::Table)
                    .if_not_exists()
                    .col(id_col(Purchases::Id))
                    .col(ColumnDef::new(Purchases::SupplierId).string())
                    .col(ColumnDef::new(Purchases::SupplierName).string().not_null())
                    .col(ColumnDef::new(Purchases::InvoiceNumber).string())
                    .col(ColumnDef::new(Purchases::PurchaseDate).date().not_null())
                    .col(minor_col(Purchases::TotalMinor))
                    .col(ColumnDef::new(Purchases::Status).string().not_null())
                    .col(ColumnDef::new(Purchases::Notes).string())
                    .col(ColumnDef::new(Purchases::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Purchases::ReceivedBy).string())
                    .col(ColumnDef::new(Purchases::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Purchases::ReceivedAt).timestamp())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PurchaseItems::Table)
                    .if_not_exists()
                    .col(id_col(PurchaseItems::Id))
                    .col(ColumnDef::new(PurchaseItems::PurchaseId).string().not_null())
                    .col(
                        ColumnDef::new(PurchaseItems::IngredientId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseItems::Quantity)
                            .big_integer()
                            .not_null(),
                    )
                    .col(minor_col(PurchaseItems::UnitPriceMinor))
                    .col(minor_col(PurchaseItems::TotalPriceMinor))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-purchase_items-purchase_id")
                            .from(PurchaseItems::Table, PurchaseItems::PurchaseId)
                            .to(Purchases::Table, Purchases::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-purchase_items-ingredient_id")
                            .from(PurchaseItems::Table, PurchaseItems::IngredientId)
                            .to(Ingredients::Table, Ingredients::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. General ledger
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(id_col(Accounts::Id))
                    .col(
                        ColumnDef::new(Accounts::Code)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Accounts::Name).string().not_null())
                    .col(ColumnDef::new(Accounts::AccountType).string().not_null())
                    .col(minor_col(Accounts::CurrentBalanceMinor))
                    .col(ColumnDef::new(Accounts::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FinancialYears::Table)
                    .if_not_exists()
                    .col(id_col(FinancialYears::Id))
                    .col(ColumnDef::new(FinancialYears::Name).string().not_null())
                    .col(ColumnDef::new(FinancialYears::StartDate).date().not_null())
                    .col(ColumnDef::new(FinancialYears::EndDate).date().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AccountingTransactions::Table)
                    .if_not_exists()
                    .col(id_col(AccountingTransactions::Id))
                    .col(
                        ColumnDef::new(AccountingTransactions::FinancialYearId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AccountingTransactions::VoucherType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AccountingTransactions::VoucherNumber)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AccountingTransactions::Seq)
                            .big_integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(AccountingTransactions::Date)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AccountingTransactions::Description)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AccountingTransactions::ReferenceType).string())
                    .col(ColumnDef::new(AccountingTransactions::ReferenceId).string())
                    .col(minor_col(AccountingTransactions::TotalDebitMinor))
                    .col(minor_col(AccountingTransactions::TotalCreditMinor))
                    .col(
                        ColumnDef::new(AccountingTransactions::CreatedBy)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AccountingTransactions::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-accounting_transactions-financial_year_id")
                            .from(
                                AccountingTransactions::Table,
                                AccountingTransactions::FinancialYearId,
                            )
                            .to(FinancialYears::Table, FinancialYears::Id),
                    )
                    .check(
                        Expr::col(AccountingTransactions::TotalDebitMinor)
                            .equals(AccountingTransactions::TotalCreditMinor),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-accounting_transactions-year-voucher-unique")
                    .table(AccountingTransactions::Table)
                    .col(AccountingTransactions::FinancialYearId)
                    .col(AccountingTransactions::VoucherNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AccountingEntries::Table)
                    .if_not_exists()
                    .col(id_col(AccountingEntries::Id))
                    .col(
                        ColumnDef::new(AccountingEntries::TransactionId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AccountingEntries::Line).big_integer().not_null())
                    .col(
                        ColumnDef::new(AccountingEntries::AccountId)
                            .string()
                            .not_null(),
                    )
                    .col(minor_col(AccountingEntries::DebitMinor))
                    .col(minor_col(AccountingEntries::CreditMinor))
                    .col(ColumnDef::new(AccountingEntries::Description).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-accounting_entries-transaction_id")
                            .from(AccountingEntries::Table, AccountingEntries::TransactionId)
                            .to(AccountingTransactions::Table, AccountingTransactions::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-accounting_entries-account_id")
                            .from(AccountingEntries::Table, AccountingEntries::AccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-accounting_entries-account_id")
                    .table(AccountingEntries::Table)
                    .col(AccountingEntries::AccountId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 7. Counters and current pointers
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Sequences::Table)
                    .if_not_exists()
                    .col(id_col(Sequences::Scope))
                    .col(ColumnDef::new(Sequences::Value).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CurrentPointers::Table)
                    .if_not_exists()
                    .col(id_col(CurrentPointers::Key))
                    .col(ColumnDef::new(CurrentPointers::TargetId).string().not_null())
                    .col(
                        ColumnDef::new(CurrentPointers::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(CurrentPointers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Sequences::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AccountingEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AccountingTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FinancialYears::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PurchaseItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Purchases::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OrderItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CashierSessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Customers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DiningTables::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TaxSettings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Discounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RecipeLines::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MenuItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(StockMovements::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Ingredients::Table).to_owned())
            .await?;
        Ok(())
    }
}
