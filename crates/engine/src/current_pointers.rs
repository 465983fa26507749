//! "Current" selections stored as one row per key.
//!
//! The key is the primary key, so at most one current financial year, one
//! active tax setting and one account per posting role can exist. Switching
//! is a single upsert inside the caller's transaction.

use sea_orm::entity::prelude::*;

use crate::util::string_enum;

string_enum! {
    pub enum PointerKey("pointer key") {
        FinancialYear => "financial_year",
        TaxSetting => "tax_setting",
        /// Drawer cash, debited for cash sales.
        CashAccount => "posting.cash",
        /// Bank clearing, debited for card and online payments.
        BankAccount => "posting.bank",
        /// Customer receivables, debited for credit sales.
        ReceivableAccount => "posting.receivable",
        /// Income account credited with net sales and service charge.
        SalesAccount => "posting.sales",
        TaxPayableAccount => "posting.tax_payable",
        InventoryAccount => "posting.inventory",
        CostOfGoodsAccount => "posting.cost_of_goods",
        /// Supplier payables, credited when purchases are received.
        PayableAccount => "posting.payable",
    }
}

impl PointerKey {
    /// Keys that name a ledger posting account.
    pub const POSTING_ROLES: [PointerKey; 8] = [
        Self::CashAccount,
        Self::BankAccount,
        Self::ReceivableAccount,
        Self::SalesAccount,
        Self::TaxPayableAccount,
        Self::InventoryAccount,
        Self::CostOfGoodsAccount,
        Self::PayableAccount,
    ];

    #[must_use]
    pub fn is_posting_role(self) -> bool {
        Self::POSTING_ROLES.contains(&self)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "current_pointers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,
    pub target_id: String,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
