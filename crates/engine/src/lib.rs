//! Order, stock and ledger consistency engine for a restaurant point of sale.
//!
//! Every public [`Engine`] operation runs in one database transaction: it
//! either commits all of its writes (order rows, stock movements, ledger
//! entries, session accumulators) or none of them.

pub use accounting::{AccountingEntry, AccountingTransaction, EntryLine, VoucherType};
pub use accounts::{Account, AccountType};
pub use cashier_sessions::{CashierSession, SessionStatus};
pub use commands::{
    AddItemCmd, CreateOrderCmd, CreatePurchaseCmd, NewIngredientCmd, PaymentCmd,
    PostTransactionCmd, PurchaseLine, StockCmd,
};
pub use current_pointers::PointerKey;
pub use customers::Customer;
pub use dining_tables::{DiningTable, TableStatus};
pub use discounts::{Discount, DiscountKind};
pub use error::EngineError;
pub use financial_years::FinancialYear;
pub use ingredients::{Ingredient, StockPolicy};
pub use menu_items::MenuItem;
pub use money::{BASIS_POINTS, Money};
pub use ops::{
    AccountLedger, BalanceSheet, Engine, EngineBuilder, LedgerLine, OrderListFilter, OrderView,
    ProfitAndLoss, ReportLine, SessionSummary, StockDrift, TrialBalance, TrialBalanceRow,
};
pub use order_items::{ItemStatus, OrderItem};
pub use orders::{Order, OrderStatus, OrderType, PaymentStatus};
pub use payments::{Payment, PaymentMethod};
pub use printing::{LogPrinter, NoopPrinter, PrintDispatcher, PrintError, PrintJob, PrintLine};
pub use purchases::{Purchase, PurchaseItem, PurchaseStatus};
pub use quantity::Quantity;
pub use recipes::{IngredientUsage, RecipeLine};
pub use stock_movements::{MovementType, ReferenceType, StockMovement};
pub use tax_settings::TaxSetting;
pub use totals::{DiscountInput, OrderTotals};

pub mod accounting;
pub mod accounts;
pub mod cashier_sessions;
mod commands;
pub mod current_pointers;
pub mod customers;
pub mod dining_tables;
pub mod discounts;
mod error;
pub mod financial_years;
pub mod ingredients;
pub mod menu_items;
mod money;
mod ops;
pub mod order_items;
pub mod orders;
pub mod payments;
mod printing;
pub mod purchases;
mod quantity;
pub mod recipes;
pub mod sequences;
pub mod stock_movements;
pub mod tax_settings;
pub mod totals;
mod util;

pub type ResultEngine<T> = Result<T, EngineError>;
