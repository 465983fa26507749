//! Request and response bodies of the HTTP API.
//!
//! Amounts travel as integer minor units (`*_minor`), stock quantities as
//! integer milli-units (`*_milli`).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct Created {
    pub id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Success {
    pub success: bool,
}

impl Success {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Online,
    Credit,
}

pub mod catalog {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct IngredientNew {
        pub name: String,
        pub unit: String,
        #[serde(default)]
        pub opening_stock_milli: i64,
        #[serde(default)]
        pub reorder_level_milli: i64,
        #[serde(default)]
        pub cost_per_unit_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct IngredientView {
        pub id: Uuid,
        pub name: String,
        pub unit: String,
        pub current_stock_milli: i64,
        pub reorder_level_milli: i64,
        pub cost_per_unit_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct IngredientList {
        pub ingredients: Vec<IngredientView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MenuItemNew {
        pub name: String,
        pub price_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MenuItemAvailability {
        pub available: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RecipeLine {
        pub ingredient_id: Uuid,
        /// Consumption per single unit of the menu item.
        pub quantity_milli: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Recipe {
        pub lines: Vec<RecipeLine>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum DiscountKind {
        /// `value` in basis points of the subtotal.
        Percentage,
        /// `value` in minor units.
        Flat,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DiscountNew {
        pub name: String,
        pub kind: DiscountKind,
        pub value: i64,
        pub max_discount_minor: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TableNew {
        pub name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CustomerNew {
        pub name: String,
        pub phone: Option<String>,
        #[serde(default)]
        pub credit_limit_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CustomerView {
        pub id: Uuid,
        pub name: String,
        pub phone: Option<String>,
        pub credit_limit_minor: i64,
        pub current_credit_minor: i64,
        pub total_orders: i64,
        pub total_spent_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CreditPayment {
        pub amount_minor: i64,
        pub method: PaymentMethod,
    }
}

pub mod order {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum OrderType {
        DineIn,
        Takeaway,
        Delivery,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum OrderStatus {
        Pending,
        Confirmed,
        Preparing,
        Ready,
        Served,
        Completed,
        Cancelled,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OrderNew {
        pub order_type: OrderType,
        pub table_id: Option<Uuid>,
        pub customer_id: Option<Uuid>,
        pub waiter_id: Option<String>,
        pub notes: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OrderCreated {
        pub id: Uuid,
        pub order_number: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ItemAdd {
        pub menu_item_id: Uuid,
        pub quantity: i64,
        pub notes: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ItemQuantity {
        /// Zero or less removes the line.
        pub quantity: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DiscountApply {
        pub discount_id: Option<Uuid>,
        pub manual_amount_minor: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct StatusUpdate {
        pub status: OrderStatus,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OrderCancel {
        pub reason: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct KitchenSent {
        pub items_sent: usize,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentNew {
        pub method: PaymentMethod,
        pub amount_minor: i64,
        pub tendered_minor: Option<i64>,
    }

    /// Settles the outstanding balance; the amount is always what is due.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentComplete {
        pub method: PaymentMethod,
        pub tendered_minor: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OrderItemView {
        pub id: Uuid,
        pub menu_item_id: Uuid,
        pub name: String,
        pub quantity: i64,
        pub unit_price_minor: i64,
        pub total_price_minor: i64,
        pub notes: Option<String>,
        pub status: String,
        pub sent_to_kitchen: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentView {
        pub id: Uuid,
        pub method: PaymentMethod,
        pub amount_minor: i64,
        pub tendered_minor: i64,
        pub change_minor: i64,
        pub session_id: Option<Uuid>,
        pub received_by: String,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OrderView {
        pub id: Uuid,
        pub order_number: String,
        pub order_type: OrderType,
        pub status: OrderStatus,
        pub payment_status: String,
        pub table_name: Option<String>,
        pub customer_name: Option<String>,
        pub cashier_id: String,
        pub subtotal_minor: i64,
        pub discount_minor: i64,
        pub tax_minor: i64,
        pub service_charge_minor: i64,
        pub grand_total_minor: i64,
        pub paid_minor: i64,
        pub notes: Option<String>,
        pub created_at: DateTime<Utc>,
        pub items: Vec<OrderItemView>,
        pub payments: Vec<PaymentView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OrderListQuery {
        pub status: Option<OrderStatus>,
        pub session_id: Option<Uuid>,
        pub limit: Option<u64>,
        /// Opaque pagination cursor (base64), from `next_cursor`.
        pub cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OrderListResponse {
        pub orders: Vec<OrderView>,
        /// Cursor for the next page (older orders).
        pub next_cursor: Option<String>,
    }
}

pub mod stock {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct StockChange {
        /// Always positive; the endpoint decides the direction.
        pub quantity_milli: i64,
        pub note: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct StockCount {
        pub counted_milli: i64,
        pub note: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MovementView {
        pub id: Uuid,
        pub seq: i64,
        pub ingredient_id: Uuid,
        pub movement_type: String,
        pub quantity_milli: i64,
        pub previous_stock_milli: i64,
        pub new_stock_milli: i64,
        pub reference_type: String,
        pub reference_id: Option<String>,
        pub note: Option<String>,
        pub created_by: String,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MovementListQuery {
        pub ingredient_id: Option<Uuid>,
        pub limit: Option<u64>,
        pub cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MovementListResponse {
        pub movements: Vec<MovementView>,
        pub next_cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DriftView {
        pub ingredient_id: Uuid,
        pub name: String,
        pub stored_milli: i64,
        pub replayed_milli: i64,
        pub broken_rows: Vec<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct VerifyResponse {
        pub consistent: bool,
        pub drifts: Vec<DriftView>,
    }
}

pub mod purchase {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PurchaseLine {
        pub ingredient_id: Uuid,
        pub quantity_milli: i64,
        pub unit_price_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PurchaseNew {
        pub supplier_name: String,
        pub supplier_id: Option<String>,
        pub invoice_number: Option<String>,
        pub purchase_date: NaiveDate,
        pub notes: Option<String>,
        pub lines: Vec<PurchaseLine>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PurchaseView {
        pub id: Uuid,
        pub supplier_name: String,
        pub invoice_number: Option<String>,
        pub purchase_date: NaiveDate,
        pub status: String,
        pub total_minor: i64,
        pub lines: Vec<PurchaseLine>,
    }
}

pub mod session {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SessionOpen {
        #[serde(default)]
        pub opening_cash_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SessionClose {
        pub counted_cash_minor: i64,
        pub notes: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SessionView {
        pub id: Uuid,
        pub cashier_id: String,
        pub status: String,
        pub opening_cash_minor: i64,
        pub cash_sales_minor: i64,
        pub card_sales_minor: i64,
        pub online_sales_minor: i64,
        pub credit_sales_minor: i64,
        pub total_sales_minor: i64,
        pub order_count: i64,
        pub expected_cash_minor: i64,
        pub counted_cash_minor: Option<i64>,
        pub cash_variance_minor: Option<i64>,
        pub opened_at: DateTime<Utc>,
        pub closed_at: Option<DateTime<Utc>>,
    }
}

pub mod ledger {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum VoucherType {
        Journal,
        Payment,
        Receipt,
        Contra,
        Sales,
        Purchase,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EntryNew {
        pub account_id: Uuid,
        #[serde(default)]
        pub debit_minor: i64,
        #[serde(default)]
        pub credit_minor: i64,
        pub description: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct VoucherNew {
        pub date: NaiveDate,
        pub voucher_type: VoucherType,
        pub description: String,
        pub reference_type: Option<String>,
        pub reference_id: Option<String>,
        pub entries: Vec<EntryNew>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct VoucherCreated {
        pub id: Uuid,
        pub voucher_number: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LedgerQuery {
        pub from: Option<NaiveDate>,
        pub to: Option<NaiveDate>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LedgerLineView {
        pub transaction_id: Uuid,
        pub voucher_number: String,
        pub date: NaiveDate,
        pub description: String,
        pub debit_minor: i64,
        pub credit_minor: i64,
        pub balance_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountLedgerView {
        pub account_id: Uuid,
        pub code: String,
        pub name: String,
        pub opening_balance_minor: i64,
        pub closing_balance_minor: i64,
        pub lines: Vec<LedgerLineView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TrialBalanceRow {
        pub account_id: Uuid,
        pub code: String,
        pub name: String,
        pub debit_minor: i64,
        pub credit_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TrialBalanceView {
        pub rows: Vec<TrialBalanceRow>,
        pub total_debit_minor: i64,
        pub total_credit_minor: i64,
        pub balanced: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReportQuery {
        pub from: NaiveDate,
        pub to: NaiveDate,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReportLine {
        pub account_id: Uuid,
        pub code: String,
        pub name: String,
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProfitAndLossView {
        pub from: NaiveDate,
        pub to: NaiveDate,
        pub income: Vec<ReportLine>,
        pub expenses: Vec<ReportLine>,
        pub net_profit_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceSheetView {
        pub assets: Vec<ReportLine>,
        pub liabilities: Vec<ReportLine>,
        pub equity: Vec<ReportLine>,
        pub retained_earnings_minor: i64,
        pub balanced: bool,
    }
}
