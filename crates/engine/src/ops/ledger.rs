use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*, sea_query::Expr,
};

use crate::{
    Account, AccountingTransaction, EngineError, Money, PostTransactionCmd, ResultEngine,
    accounting::{self, entries, validate_entries},
    accounts,
    sequences::{LEDGER_SCOPE, voucher_scope},
    util::{parse_uuid, too_large},
};

use super::{Engine, decode_cursor, encode_cursor, normalize_required_name, require_actor, with_tx};

/// One entry of an account ledger with the balance after it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerLine {
    pub transaction_id: Uuid,
    pub voucher_number: String,
    pub date: NaiveDate,
    pub description: String,
    pub debit: Money,
    pub credit: Money,
    /// Running balance on the account's normal side.
    pub balance: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountLedger {
    pub account: Account,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Balance of everything dated before `from`.
    pub opening_balance: Money,
    pub lines: Vec<LedgerLine>,
    pub closing_balance: Money,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct TransactionsCursor {
    seq: i64,
}

impl Engine {
    /// Posts a balanced transaction into the current financial year.
    pub async fn post_transaction(
        &self,
        cmd: PostTransactionCmd,
    ) -> ResultEngine<AccountingTransaction> {
        let actor = require_actor(&cmd.actor)?;
        normalize_required_name(&cmd.description, "transaction description")?;
        validate_entries(&cmd.entries)?;
        with_tx!(self, |db_tx| {
            self.post_in_tx(&db_tx, &cmd, &actor).await
        })
    }

    pub async fn transaction(&self, transaction_id: Uuid) -> ResultEngine<AccountingTransaction> {
        with_tx!(self, |db_tx| {
            let model = accounting::Entity::find_by_id(transaction_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))?;
            self.with_entries(&db_tx, model).await
        })
    }

    /// Posted transactions, newest first.
    pub async fn transactions(
        &self,
        limit: u64,
        cursor: Option<&str>,
    ) -> ResultEngine<(Vec<AccountingTransaction>, Option<String>)> {
        let cursor = cursor
            .map(|c| decode_cursor::<TransactionsCursor>(c, "transactions"))
            .transpose()?;
        with_tx!(self, |db_tx| {
            let mut query = accounting::Entity::find()
                .order_by_desc(accounting::Column::Seq)
                .limit(limit.saturating_add(1));
            if let Some(cursor) = &cursor {
                query = query.filter(accounting::Column::Seq.lt(cursor.seq));
            }
            let rows = query.all(&db_tx).await?;
            let has_more = rows.len() > limit as usize;

            let mut transactions = Vec::new();
            let mut last_seq = None;
            for model in rows.into_iter().take(limit as usize) {
                last_seq = Some(model.seq);
                transactions.push(self.with_entries(&db_tx, model).await?);
            }
            let next = match last_seq {
                Some(seq) if has_more => {
                    Some(encode_cursor(&TransactionsCursor { seq }, "transactions")?)
                }
                _ => None,
            };
            Ok((transactions, next))
        })
    }

    /// Entries touching one account with a running balance, ordered by date
    /// then posting order. Either bound may be open.
    pub async fn account_ledger(
        &self,
        account_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> ResultEngine<AccountLedger> {
        if let (Some(from), Some(to)) = (from, to)
            && to < from
        {
            return Err(EngineError::Validation(
                "ledger range ends before it starts".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            let account = Account::try_from(self.require_account(&db_tx, account_id).await?)?;

            let entry_models = entries::Entity::find()
                .filter(entries::Column::AccountId.eq(account_id.to_string()))
                .all(&db_tx)
                .await?;
            let transaction_ids: Vec<String> = entry_models
                .iter()
                .map(|entry| entry.transaction_id.clone())
                .collect();
            let headers: HashMap<String, accounting::Model> = accounting::Entity::find()
                .filter(accounting::Column::Id.is_in(transaction_ids))
                .all(&db_tx)
                .await?
                .into_iter()
                .map(|model| (model.id.clone(), model))
                .collect();

            let mut rows = Vec::with_capacity(entry_models.len());
            for entry in entry_models {
                let header = headers.get(&entry.transaction_id).ok_or_else(|| {
                    EngineError::KeyNotFound("transaction not exists".to_string())
                })?;
                rows.push((header, entry));
            }
            rows.sort_by_key(|(header, entry)| (header.date, header.seq, entry.line));

            let mut opening_balance = Money::ZERO;
            let mut balance = Money::ZERO;
            let mut lines = Vec::new();
            for (header, entry) in rows {
                if to.is_some_and(|to| header.date > to) {
                    break;
                }
                let debit = Money::new(entry.debit_minor);
                let credit = Money::new(entry.credit_minor);
                balance += account.account_type.balance_delta(debit, credit);
                if from.is_some_and(|from| header.date < from) {
                    opening_balance = balance;
                    continue;
                }
                lines.push(LedgerLine {
                    transaction_id: parse_uuid(&header.id, "transaction")?,
                    voucher_number: header.voucher_number.clone(),
                    date: header.date,
                    description: entry
                        .description
                        .clone()
                        .unwrap_or_else(|| header.description.clone()),
                    debit,
                    credit,
                    balance,
                });
            }

            Ok(AccountLedger {
                account,
                from,
                to,
                opening_balance,
                lines,
                closing_balance: balance,
            })
        })
    }

    /// Rebuilds every account balance from the posted entries.
    ///
    /// Balances only drift if rows were edited outside the engine; this is
    /// the repair path. Returns the chart after the rebuild.
    pub async fn recompute_account_balances(&self) -> ResultEngine<Vec<Account>> {
        with_tx!(self, |db_tx| {
            let mut totals: HashMap<String, (Money, Money)> = HashMap::new();
            for entry in entries::Entity::find().all(&db_tx).await? {
                let total = totals.entry(entry.account_id).or_default();
                total.0 += Money::new(entry.debit_minor);
                total.1 += Money::new(entry.credit_minor);
            }

            let models = accounts::Entity::find()
                .order_by_asc(accounts::Column::Code)
                .all(&db_tx)
                .await?;
            let mut chart = Vec::with_capacity(models.len());
            for model in models {
                let (debit, credit) = totals.get(&model.id).copied().unwrap_or_default();
                let mut account = Account::try_from(model)?;
                let balance = account.account_type.balance_delta(debit, credit);
                if balance != account.current_balance {
                    tracing::warn!(
                        account = %account.code,
                        stored = %account.current_balance,
                        replayed = %balance,
                        "account balance rebuilt"
                    );
                    accounts::Entity::update_many()
                        .col_expr(
                            accounts::Column::CurrentBalanceMinor,
                            Expr::value(balance.minor()),
                        )
                        .filter(accounts::Column::Id.eq(account.id.to_string()))
                        .exec(&db_tx)
                        .await?;
                    account.current_balance = balance;
                }
                chart.push(account);
            }
            Ok(chart)
        })
    }

    /// Posting step shared by every caller that books vouchers. Runs inside
    /// the caller's transaction; the balance updates are the only writes to
    /// account balances.
    pub(super) async fn post_in_tx(
        &self,
        db_tx: &DatabaseTransaction,
        cmd: &PostTransactionCmd,
        actor: &str,
    ) -> ResultEngine<AccountingTransaction> {
        let (total_debit, total_credit) = validate_entries(&cmd.entries)?;
        let year = self
            .load_current_year(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("current financial year".to_string()))?;
        if !year.contains(cmd.date) {
            return Err(EngineError::Validation(format!(
                "{} is outside financial year {}",
                cmd.date, year.name
            )));
        }

        let mut accounts_by_id = HashMap::new();
        for entry in &cmd.entries {
            if !accounts_by_id.contains_key(&entry.account_id) {
                let account = Account::try_from(self.require_account(db_tx, entry.account_id).await?)?;
                accounts_by_id.insert(entry.account_id, account);
            }
        }
        // Balances move by SQL increments below; they must stay in range.
        let mut projected: HashMap<Uuid, Money> = accounts_by_id
            .iter()
            .map(|(id, account)| (*id, account.current_balance))
            .collect();
        for entry in &cmd.entries {
            let account = &accounts_by_id[&entry.account_id];
            let balance = projected.entry(entry.account_id).or_default();
            *balance = balance
                .checked_add(account.account_type.balance_delta(entry.debit, entry.credit))
                .ok_or_else(|| too_large(&format!("balance of account {}", account.code)))?;
        }

        let voucher_seq = self
            .next_sequence(db_tx, &voucher_scope(year.id, cmd.voucher_type))
            .await?;
        let seq = self.next_sequence(db_tx, LEDGER_SCOPE).await?;
        let transaction_id = Uuid::new_v4();
        let model = accounting::ActiveModel {
            id: ActiveValue::Set(transaction_id.to_string()),
            financial_year_id: ActiveValue::Set(year.id.to_string()),
            voucher_type: ActiveValue::Set(cmd.voucher_type.as_str().to_string()),
            voucher_number: ActiveValue::Set(cmd.voucher_type.voucher_number(voucher_seq)),
            seq: ActiveValue::Set(seq),
            date: ActiveValue::Set(cmd.date),
            description: ActiveValue::Set(cmd.description.trim().to_string()),
            reference_type: ActiveValue::Set(cmd.reference_type.clone()),
            reference_id: ActiveValue::Set(cmd.reference_id.clone()),
            total_debit_minor: ActiveValue::Set(total_debit.minor()),
            total_credit_minor: ActiveValue::Set(total_credit.minor()),
            created_by: ActiveValue::Set(actor.to_string()),
            created_at: ActiveValue::Set(Utc::now()),
        }
        .insert(db_tx)
        .await?;

        let mut entry_models = Vec::with_capacity(cmd.entries.len());
        for (line, entry) in (1_i64..).zip(&cmd.entries) {
            let entry_model = entries::ActiveModel::for_line(transaction_id, line, entry)
                .insert(db_tx)
                .await?;
            entry_models.push(entry_model);

            let account = &accounts_by_id[&entry.account_id];
            let delta = account.account_type.balance_delta(entry.debit, entry.credit);
            accounts::Entity::update_many()
                .col_expr(
                    accounts::Column::CurrentBalanceMinor,
                    Expr::col(accounts::Column::CurrentBalanceMinor).add(delta.minor()),
                )
                .filter(accounts::Column::Id.eq(entry.account_id.to_string()))
                .exec(db_tx)
                .await?;
        }

        tracing::debug!(
            voucher = %model.voucher_number,
            amount = %total_debit,
            "transaction posted"
        );
        AccountingTransaction::try_from((model, entry_models))
    }

    async fn with_entries(
        &self,
        db_tx: &DatabaseTransaction,
        model: accounting::Model,
    ) -> ResultEngine<AccountingTransaction> {
        let entry_models = entries::Entity::find()
            .filter(entries::Column::TransactionId.eq(model.id.clone()))
            .order_by_asc(entries::Column::Line)
            .all(db_tx)
            .await?;
        AccountingTransaction::try_from((model, entry_models))
    }
}
