//! Chart of accounts.
//!
//! An account's `current_balance` is expressed on its **normal side**: for
//! debit-normal accounts (asset, expense) debits increase it, for
//! credit-normal accounts (liability, equity, income) credits do. Balances
//! only move when the general ledger posts entries against them.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Money,
    util::{parse_uuid, string_enum},
};

string_enum! {
    pub enum AccountType("account type") {
        Asset => "asset",
        Liability => "liability",
        Equity => "equity",
        Income => "income",
        Expense => "expense",
    }
}

impl AccountType {
    #[must_use]
    pub fn is_debit_normal(self) -> bool {
        matches!(self, Self::Asset | Self::Expense)
    }

    /// Balance change produced by one entry on an account of this type.
    #[must_use]
    pub fn balance_delta(self, debit: Money, credit: Money) -> Money {
        if self.is_debit_normal() {
            debit - credit
        } else {
            credit - debit
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub current_balance: Money,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(code: String, name: String, account_type: AccountType) -> Self {
        Self {
            id: Uuid::new_v4(),
            code,
            name,
            account_type,
            current_balance: Money::ZERO,
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub code: String,
    pub name: String,
    pub account_type: String,
    pub current_balance_minor: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::accounting::entries::Entity")]
    Entries,
}

impl Related<super::accounting::entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Entries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Account> for ActiveModel {
    fn from(value: &Account) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            code: ActiveValue::Set(value.code.clone()),
            name: ActiveValue::Set(value.name.clone()),
            account_type: ActiveValue::Set(value.account_type.as_str().to_string()),
            current_balance_minor: ActiveValue::Set(value.current_balance.minor()),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for Account {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "account")?,
            code: model.code,
            name: model.name,
            account_type: AccountType::try_from(model.account_type.as_str())?,
            current_balance: Money::new(model.current_balance_minor),
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_sides() {
        let d = Money::major(500);
        assert_eq!(AccountType::Asset.balance_delta(d, Money::ZERO), d);
        assert_eq!(AccountType::Expense.balance_delta(d, Money::ZERO), d);
        assert_eq!(AccountType::Income.balance_delta(Money::ZERO, d), d);
        assert_eq!(AccountType::Liability.balance_delta(Money::ZERO, d), d);
        assert_eq!(AccountType::Equity.balance_delta(d, Money::ZERO), -d);
    }
}
