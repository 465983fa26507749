//! Financial statements derived from the ledger. Nothing here writes.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    Account, AccountType, EngineError, Money, ResultEngine,
    accounting::{self, entries},
    accounts,
};

use super::{Engine, with_tx};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalanceRow {
    pub account_id: Uuid,
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub debit: Money,
    pub credit: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalance {
    pub rows: Vec<TrialBalanceRow>,
    pub total_debit: Money,
    pub total_credit: Money,
}

impl TrialBalance {
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.total_debit == self.total_credit
    }
}

/// One account's amount in a statement section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLine {
    pub account_id: Uuid,
    pub code: String,
    pub name: String,
    pub amount: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitAndLoss {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub income: Vec<ReportLine>,
    pub expenses: Vec<ReportLine>,
    pub total_income: Money,
    pub total_expenses: Money,
    pub net_profit: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSheet {
    pub assets: Vec<ReportLine>,
    pub liabilities: Vec<ReportLine>,
    pub equity: Vec<ReportLine>,
    pub total_assets: Money,
    pub total_liabilities: Money,
    pub total_equity: Money,
    /// Income minus expenses not yet closed into equity.
    pub retained_earnings: Money,
}

impl BalanceSheet {
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.total_assets == self.total_liabilities + self.total_equity + self.retained_earnings
    }
}

fn report_line(account: &Account, amount: Money) -> ReportLine {
    ReportLine {
        account_id: account.id,
        code: account.code.clone(),
        name: account.name.clone(),
        amount,
    }
}

impl Engine {
    /// Current balances split into debit and credit columns.
    pub async fn trial_balance(&self) -> ResultEngine<TrialBalance> {
        let chart = self.accounts().await?;
        let mut rows = Vec::with_capacity(chart.len());
        let mut total_debit = Money::ZERO;
        let mut total_credit = Money::ZERO;
        for account in chart {
            let balance = account.current_balance;
            // A balance below zero sits on the opposite side.
            let on_normal_side = !balance.is_negative();
            let debit_side = account.account_type.is_debit_normal() == on_normal_side;
            let (debit, credit) = if debit_side {
                (balance.max(-balance), Money::ZERO)
            } else {
                (Money::ZERO, balance.max(-balance))
            };
            total_debit += debit;
            total_credit += credit;
            rows.push(TrialBalanceRow {
                account_id: account.id,
                code: account.code,
                name: account.name,
                account_type: account.account_type,
                debit,
                credit,
            });
        }
        Ok(TrialBalance {
            rows,
            total_debit,
            total_credit,
        })
    }

    /// Income and expense movement between two dates, inclusive.
    pub async fn profit_and_loss(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ResultEngine<ProfitAndLoss> {
        if to < from {
            return Err(EngineError::Validation(
                "report range ends before it starts".to_string(),
            ));
        }
        let (chart, movement) = with_tx!(self, |db_tx| {
            let chart = accounts::Entity::find()
                .order_by_asc(accounts::Column::Code)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Account::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;

            let transaction_ids: Vec<String> = accounting::Entity::find()
                .filter(accounting::Column::Date.gte(from))
                .filter(accounting::Column::Date.lte(to))
                .all(&db_tx)
                .await?
                .into_iter()
                .map(|model| model.id)
                .collect();
            let mut movement: HashMap<String, (Money, Money)> = HashMap::new();
            if !transaction_ids.is_empty() {
                let rows = entries::Entity::find()
                    .filter(entries::Column::TransactionId.is_in(transaction_ids))
                    .all(&db_tx)
                    .await?;
                for entry in rows {
                    let sums = movement.entry(entry.account_id).or_default();
                    sums.0 += Money::new(entry.debit_minor);
                    sums.1 += Money::new(entry.credit_minor);
                }
            }
            Ok((chart, movement))
        })?;

        let mut income = Vec::new();
        let mut expenses = Vec::new();
        for account in &chart {
            let (debit, credit) = movement
                .get(&account.id.to_string())
                .copied()
                .unwrap_or_default();
            let amount = account.account_type.balance_delta(debit, credit);
            match account.account_type {
                AccountType::Income => income.push(report_line(account, amount)),
                AccountType::Expense => expenses.push(report_line(account, amount)),
                _ => {}
            }
        }
        let total_income: Money = income.iter().map(|line| line.amount).sum();
        let total_expenses: Money = expenses.iter().map(|line| line.amount).sum();
        Ok(ProfitAndLoss {
            from,
            to,
            income,
            expenses,
            total_income,
            total_expenses,
            net_profit: total_income - total_expenses,
        })
    }

    /// Position at the current balances.
    pub async fn balance_sheet(&self) -> ResultEngine<BalanceSheet> {
        let chart = self.accounts().await?;
        let mut sheet = BalanceSheet {
            assets: Vec::new(),
            liabilities: Vec::new(),
            equity: Vec::new(),
            total_assets: Money::ZERO,
            total_liabilities: Money::ZERO,
            total_equity: Money::ZERO,
            retained_earnings: Money::ZERO,
        };
        for account in &chart {
            let amount = account.current_balance;
            match account.account_type {
                AccountType::Asset => {
                    sheet.total_assets += amount;
                    sheet.assets.push(report_line(account, amount));
                }
                AccountType::Liability => {
                    sheet.total_liabilities += amount;
                    sheet.liabilities.push(report_line(account, amount));
                }
                AccountType::Equity => {
                    sheet.total_equity += amount;
                    sheet.equity.push(report_line(account, amount));
                }
                AccountType::Income => sheet.retained_earnings += amount,
                AccountType::Expense => sheet.retained_earnings -= amount,
            }
        }
        Ok(sheet)
    }
}
