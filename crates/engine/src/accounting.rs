//! Double-entry accounting transactions.
//!
//! An [`AccountingTransaction`] (a voucher) groups one or more
//! [`AccountingEntry`] rows whose debits and credits sum to the same amount.
//! Amounts are integer minor units, so "balanced" is an exact equality.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Money, ResultEngine,
    util::{parse_uuid, string_enum, too_large},
};

string_enum! {
    pub enum VoucherType("voucher type") {
        Journal => "journal",
        Payment => "payment",
        Receipt => "receipt",
        Contra => "contra",
        Sales => "sales",
        Purchase => "purchase",
    }
}

impl VoucherType {
    /// Three-letter uppercase voucher prefix (`JOU`, `SAL`, ...).
    #[must_use]
    pub fn prefix(self) -> String {
        self.as_str().chars().take(3).collect::<String>().to_uppercase()
    }

    /// Formats a voucher number for a sequence value: `SAL-00042`.
    #[must_use]
    pub fn voucher_number(self, sequence: i64) -> String {
        format!("{}-{sequence:05}", self.prefix())
    }
}

/// One requested entry of a transaction to post.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryLine {
    pub account_id: Uuid,
    pub debit: Money,
    pub credit: Money,
    pub description: Option<String>,
}

impl EntryLine {
    pub fn debit(account_id: Uuid, amount: Money) -> Self {
        Self {
            account_id,
            debit: amount,
            credit: Money::ZERO,
            description: None,
        }
    }

    pub fn credit(account_id: Uuid, amount: Money) -> Self {
        Self {
            account_id,
            debit: Money::ZERO,
            credit: amount,
            description: None,
        }
    }
}

/// Checks entry shape and balance; returns the (equal) debit and credit sums.
pub fn validate_entries(entries: &[EntryLine]) -> ResultEngine<(Money, Money)> {
    if entries.is_empty() {
        return Err(EngineError::Validation(
            "a transaction needs at least one entry".to_string(),
        ));
    }
    for entry in entries {
        if entry.debit.is_negative() || entry.credit.is_negative() {
            return Err(EngineError::Validation(
                "entry amounts must be >= 0".to_string(),
            ));
        }
        if entry.debit.is_zero() == entry.credit.is_zero() {
            return Err(EngineError::Validation(
                "each entry must carry exactly one of debit or credit".to_string(),
            ));
        }
    }

    let debit = Money::checked_sum(entries.iter().map(|e| e.debit))
        .ok_or_else(|| too_large("transaction debit total"))?;
    let credit = Money::checked_sum(entries.iter().map(|e| e.credit))
        .ok_or_else(|| too_large("transaction credit total"))?;
    if debit != credit {
        return Err(EngineError::UnbalancedTransaction {
            debit: debit.minor(),
            credit: credit.minor(),
        });
    }
    Ok((debit, credit))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountingTransaction {
    pub id: Uuid,
    pub financial_year_id: Uuid,
    pub voucher_type: VoucherType,
    pub voucher_number: String,
    pub date: NaiveDate,
    pub description: String,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub total_debit: Money,
    pub total_credit: Money,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub entries: Vec<AccountingEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountingEntry {
    pub id: Uuid,
    pub transaction_id: Uuid,
    /// Position inside the transaction.
    pub line: i64,
    pub account_id: Uuid,
    pub debit: Money,
    pub credit: Money,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounting_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub financial_year_id: String,
    pub voucher_type: String,
    pub voucher_number: String,
    /// Global posting sequence; orders ledgers deterministically.
    pub seq: i64,
    pub date: Date,
    pub description: String,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub total_debit_minor: i64,
    pub total_credit_minor: i64,
    pub created_by: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "entries::Entity")]
    Entries,
}

impl Related<entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Entries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<(Model, Vec<entries::Model>)> for AccountingTransaction {
    type Error = EngineError;

    fn try_from((model, entry_models): (Model, Vec<entries::Model>)) -> Result<Self, Self::Error> {
        let mut entries = entry_models
            .into_iter()
            .map(AccountingEntry::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort_by_key(|e| e.line);
        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            financial_year_id: parse_uuid(&model.financial_year_id, "financial year")?,
            voucher_type: VoucherType::try_from(model.voucher_type.as_str())?,
            voucher_number: model.voucher_number,
            date: model.date,
            description: model.description,
            reference_type: model.reference_type,
            reference_id: model.reference_id,
            total_debit: Money::new(model.total_debit_minor),
            total_credit: Money::new(model.total_credit_minor),
            created_by: model.created_by,
            created_at: model.created_at,
            entries,
        })
    }
}

/// Transaction entries.
pub mod entries {
    use sea_orm::entity::{ActiveValue, prelude::*};
    use uuid::Uuid;

    use crate::{EngineError, Money, util::parse_uuid};

    use super::{AccountingEntry, EntryLine};

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "accounting_entries")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub transaction_id: String,
        pub line: i64,
        pub account_id: String,
        pub debit_minor: i64,
        pub credit_minor: i64,
        pub description: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::Entity",
            from = "Column::TransactionId",
            to = "super::Column::Id",
            on_update = "NoAction",
            on_delete = "NoAction"
        )]
        Transactions,
        #[sea_orm(
            belongs_to = "crate::accounts::Entity",
            from = "Column::AccountId",
            to = "crate::accounts::Column::Id",
            on_update = "NoAction",
            on_delete = "NoAction"
        )]
        Accounts,
    }

    impl Related<super::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Transactions.def()
        }
    }

    impl Related<crate::accounts::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Accounts.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}

    impl ActiveModel {
        pub(crate) fn for_line(transaction_id: Uuid, line: i64, entry: &EntryLine) -> Self {
            Self {
                id: ActiveValue::Set(Uuid::new_v4().to_string()),
                transaction_id: ActiveValue::Set(transaction_id.to_string()),
                line: ActiveValue::Set(line),
                account_id: ActiveValue::Set(entry.account_id.to_string()),
                debit_minor: ActiveValue::Set(entry.debit.minor()),
                credit_minor: ActiveValue::Set(entry.credit.minor()),
                description: ActiveValue::Set(entry.description.clone()),
            }
        }
    }

    impl TryFrom<Model> for AccountingEntry {
        type Error = EngineError;

        fn try_from(model: Model) -> Result<Self, Self::Error> {
            Ok(Self {
                id: parse_uuid(&model.id, "entry")?,
                transaction_id: parse_uuid(&model.transaction_id, "transaction")?,
                line: model.line,
                account_id: parse_uuid(&model.account_id, "account")?,
                debit: Money::new(model.debit_minor),
                credit: Money::new(model.credit_minor),
                description: model.description,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voucher_numbers_use_three_letter_prefix() {
        assert_eq!(VoucherType::Journal.voucher_number(1), "JOU-00001");
        assert_eq!(VoucherType::Sales.voucher_number(42), "SAL-00042");
        assert_eq!(VoucherType::Purchase.voucher_number(123_456), "PUR-123456");
    }

    #[test]
    fn balanced_entries_pass() {
        let cash = Uuid::new_v4();
        let sales = Uuid::new_v4();
        let (debit, credit) = validate_entries(&[
            EntryLine::debit(cash, Money::major(500)),
            EntryLine::credit(sales, Money::major(500)),
        ])
        .unwrap();
        assert_eq!(debit, credit);
    }

    #[test]
    fn unbalanced_entries_fail() {
        let cash = Uuid::new_v4();
        let sales = Uuid::new_v4();
        let err = validate_entries(&[
            EntryLine::debit(cash, Money::major(500)),
            EntryLine::credit(sales, Money::new(49_999)),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            EngineError::UnbalancedTransaction {
                debit: 50_000,
                credit: 49_999
            }
        );
    }

    #[test]
    fn overflowing_sums_are_rejected_not_wrapped() {
        let cash = Uuid::new_v4();
        let sales = Uuid::new_v4();
        let err = validate_entries(&[
            EntryLine::debit(cash, Money::new(i64::MAX)),
            EntryLine::debit(cash, Money::new(i64::MAX)),
            EntryLine::debit(cash, Money::new(3)),
            EntryLine::credit(sales, Money::new(1)),
        ])
        .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn entries_need_exactly_one_side() {
        let account = Uuid::new_v4();
        let both = EntryLine {
            account_id: account,
            debit: Money::major(1),
            credit: Money::major(1),
            description: None,
        };
        assert!(validate_entries(&[both]).is_err());
        assert!(validate_entries(&[]).is_err());
    }
}
