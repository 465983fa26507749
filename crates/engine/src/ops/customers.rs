use uuid::Uuid;

use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr};

use crate::{
    Customer, EngineError, Money, PaymentMethod, PointerKey, PostTransactionCmd, ResultEngine,
    VoucherType, customers,
};

use super::{Engine, require_actor, with_tx};

impl Engine {
    /// Customers ordered by name.
    pub async fn customers(&self) -> ResultEngine<Vec<Customer>> {
        with_tx!(self, |db_tx| {
            customers::Entity::find()
                .order_by_asc(customers::Column::Name)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Customer::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    /// Customers whose outstanding credit is above their limit.
    pub async fn customers_over_limit(&self) -> ResultEngine<Vec<Customer>> {
        with_tx!(self, |db_tx| {
            customers::Entity::find()
                .filter(
                    Expr::col(customers::Column::CurrentCreditMinor)
                        .gt(Expr::col(customers::Column::CreditLimitMinor)),
                )
                .order_by_asc(customers::Column::Name)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Customer::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    /// Collects money against a customer's outstanding credit and books a
    /// receipt voucher when posting accounts are set up.
    pub async fn record_credit_payment(
        &self,
        customer_id: Uuid,
        amount: Money,
        method: PaymentMethod,
        actor: &str,
    ) -> ResultEngine<Customer> {
        let actor = require_actor(actor)?;
        if method == PaymentMethod::Credit {
            return Err(EngineError::Validation(
                "credit can't be settled with credit".to_string(),
            ));
        }
        if !amount.is_positive() {
            return Err(EngineError::Validation("amount must be > 0".to_string()));
        }

        with_tx!(self, |db_tx| {
            let model = customers::Entity::find_by_id(customer_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("customer not exists".to_string()))?;
            let mut customer = Customer::try_from(model)?;
            if amount > customer.current_credit {
                return Err(EngineError::Validation(format!(
                    "amount {amount} exceeds outstanding credit {}",
                    customer.current_credit
                )));
            }

            let result = customers::Entity::update_many()
                .col_expr(
                    customers::Column::CurrentCreditMinor,
                    Expr::col(customers::Column::CurrentCreditMinor).sub(amount.minor()),
                )
                .filter(customers::Column::Id.eq(customer_id.to_string()))
                .filter(customers::Column::CurrentCreditMinor.gte(amount.minor()))
                .exec(&db_tx)
                .await?;
            if result.rows_affected != 1 {
                return Err(EngineError::WriteConflict(format!(
                    "customer {customer_id} changed concurrently"
                )));
            }
            customer.current_credit -= amount;

            let Some(date) = self.posting_date(&db_tx).await? else {
                return Ok(customer);
            };
            let debit_role = match method {
                PaymentMethod::Cash => PointerKey::CashAccount,
                _ => PointerKey::BankAccount,
            };
            let (Some(debit), Some(receivable)) = (
                self.posting_account(&db_tx, debit_role).await?,
                self.posting_account(&db_tx, PointerKey::ReceivableAccount)
                    .await?,
            ) else {
                return Ok(customer);
            };
            let cmd = PostTransactionCmd::new(
                date,
                VoucherType::Receipt,
                format!("Credit payment {}", customer.name),
                actor.as_str(),
            )
            .reference("customer", customer_id.to_string())
            .debit(debit.id, amount)
            .credit(receivable.id, amount);
            self.post_in_tx(&db_tx, &cmd, &actor).await?;
            Ok(customer)
        })
    }
}
