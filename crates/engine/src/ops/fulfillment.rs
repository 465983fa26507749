use std::collections::BTreeMap;

use chrono::Utc;
use uuid::Uuid;

use sea_orm::{
    DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr,
};

use crate::{
    Customer, EngineError, ItemStatus, Money, MovementType, Order, OrderStatus, Payment,
    PaymentCmd, PaymentMethod, PaymentStatus, PointerKey, PostTransactionCmd, PrintJob,
    ReferenceType, ResultEngine, VoucherType, customers, payments, recipes,
    util::too_large,
};

use super::{Engine, orders::print_line, require_actor, stock::MovementRequest, with_tx};

/// Order reference stored on movements and vouchers written by fulfillment.
const ORDER_REFERENCE: &str = "order";

impl Engine {
    /// Takes a partial payment. The order stays open; its payment status
    /// becomes `partial`, or `paid` once nothing is outstanding.
    ///
    /// Credit settlement goes through [`Engine::complete_payment`].
    pub async fn add_payment(&self, cmd: PaymentCmd) -> ResultEngine<Payment> {
        let actor = require_actor(&cmd.actor)?;
        if cmd.method == PaymentMethod::Credit {
            return Err(EngineError::Validation(
                "credit is settled by completing the payment".to_string(),
            ));
        }
        if !cmd.amount.is_positive() {
            return Err(EngineError::Validation("amount must be > 0".to_string()));
        }
        let tendered = cmd.tendered.unwrap_or(cmd.amount);
        if tendered < cmd.amount {
            return Err(EngineError::Validation(format!(
                "tendered {tendered} is less than {}",
                cmd.amount
            )));
        }

        with_tx!(self, |db_tx| {
            let (mut order, version) = self.require_order(&db_tx, cmd.order_id).await?;
            require_payable(&order)?;
            let outstanding = order.outstanding();
            if cmd.amount > outstanding {
                return Err(EngineError::Validation(format!(
                    "amount {} exceeds outstanding {outstanding}",
                    cmd.amount
                )));
            }

            let payment = self
                .record_payment(&db_tx, &order, cmd.method, cmd.amount, tendered, &actor)
                .await?;
            order.paid_amount += cmd.amount;
            order.payment_status = if order.outstanding().is_zero() {
                PaymentStatus::Paid
            } else {
                PaymentStatus::Partial
            };
            order.updated_at = Utc::now();
            self.save_order(&db_tx, &order, version).await?;
            Ok(payment)
        })
    }

    /// Settles the outstanding balance with one payment and fulfils the order.
    ///
    /// `cmd.amount` is ignored: the payment always covers what is due. Cash
    /// tendered above it is recorded as change. A credit payment charges the
    /// order's customer and marks the order `credit`.
    pub async fn complete_payment(&self, cmd: PaymentCmd) -> ResultEngine<Order> {
        let actor = require_actor(&cmd.actor)?;
        let (order, job) = with_tx!(self, |db_tx| {
            let (mut order, version) = self.require_order(&db_tx, cmd.order_id).await?;
            require_payable(&order)?;
            let due = order.outstanding();

            let tendered = match cmd.method {
                PaymentMethod::Credit => {
                    if order.customer_id.is_none() {
                        return Err(EngineError::Validation(
                            "credit sales need a customer".to_string(),
                        ));
                    }
                    due
                }
                _ => cmd.tendered.unwrap_or(due),
            };
            if tendered < due {
                return Err(EngineError::Validation(format!(
                    "tendered {tendered} is less than due {due}"
                )));
            }

            let change = if due.is_positive() {
                let payment = self
                    .record_payment(&db_tx, &order, cmd.method, due, tendered, &actor)
                    .await?;
                order.paid_amount += due;
                payment.change
            } else {
                Money::ZERO
            };
            order.payment_status = match cmd.method {
                PaymentMethod::Credit => PaymentStatus::Credit,
                _ => PaymentStatus::Paid,
            };

            let job = self
                .fulfil(&db_tx, &mut order, version, &actor, change)
                .await?;
            Ok((order, job))
        })?;

        self.dispatch(job);
        Ok(order)
    }

    /// Fulfils an order whose balance is already covered by earlier payments.
    pub async fn complete_order(&self, order_id: Uuid, actor: &str) -> ResultEngine<Order> {
        let actor = require_actor(actor)?;
        let (order, job) = with_tx!(self, |db_tx| {
            let (mut order, version) = self.require_order(&db_tx, order_id).await?;
            require_payable(&order)?;
            let due = order.outstanding();
            if due.is_positive() {
                return Err(EngineError::StateConflict(format!(
                    "order {} still has {due} outstanding",
                    order.order_number
                )));
            }
            order.payment_status = PaymentStatus::Paid;

            let job = self
                .fulfil(&db_tx, &mut order, version, &actor, Money::ZERO)
                .await?;
            Ok((order, job))
        })?;

        self.dispatch(job);
        Ok(order)
    }

    async fn record_payment(
        &self,
        db_tx: &DatabaseTransaction,
        order: &Order,
        method: PaymentMethod,
        amount: Money,
        tendered: Money,
        actor: &str,
    ) -> ResultEngine<Payment> {
        let session_id = self.payment_session(db_tx, actor, order.session_id).await?;
        let payment = Payment {
            id: Uuid::new_v4(),
            order_id: order.id,
            session_id,
            method,
            amount,
            tendered,
            change: tendered - amount,
            received_by: actor.to_string(),
            created_at: Utc::now(),
        };
        payments::ActiveModel::from(&payment).insert(db_tx).await?;
        if let Some(session_id) = session_id {
            self.accumulate_sale(db_tx, session_id, method, amount)
                .await?;
        }
        Ok(payment)
    }

    /// The fulfillment step: completes the order, frees its table, deducts
    /// recipe stock, updates the customer and session, and books the sale.
    /// Any failure aborts the caller's transaction as a whole.
    async fn fulfil(
        &self,
        db_tx: &DatabaseTransaction,
        order: &mut Order,
        version: i64,
        actor: &str,
        change: Money,
    ) -> ResultEngine<PrintJob> {
        let now = Utc::now();
        order.status = OrderStatus::Completed;
        order.completed_at = Some(now);
        order.updated_at = now;
        self.save_order(db_tx, order, version).await?;
        if let Some(table_id) = order.table_id {
            self.free_table(db_tx, table_id, order.id).await?;
        }

        let items: Vec<_> = self
            .order_items(db_tx, order.id)
            .await?
            .into_iter()
            .filter(|item| item.status != ItemStatus::Cancelled)
            .collect();

        let order_ref = order.id.to_string();
        let mut cost_of_goods = Money::ZERO;
        for item in &items {
            let usages =
                recipes::scale(&self.recipe_lines(db_tx, item.menu_item_id).await?, item.quantity)?;
            for usage in usages {
                let (ingredient, movement) = self
                    .apply_movement(
                        db_tx,
                        MovementRequest {
                            ingredient_id: usage.ingredient_id,
                            movement_type: MovementType::Sale,
                            delta: -usage.quantity,
                            reference_type: ReferenceType::Order,
                            reference_id: Some(order_ref.as_str()),
                            note: Some(order.order_number.as_str()),
                            actor,
                        },
                    )
                    .await?;
                let consumed = movement.previous_stock - movement.new_stock;
                cost_of_goods = ingredient
                    .cost_per_unit
                    .checked_times_quantity(consumed)
                    .and_then(|cost| cost_of_goods.checked_add(cost))
                    .ok_or_else(|| too_large("cost of goods"))?;
            }
        }

        let paid_by_method = self.paid_by_method(db_tx, order.id).await?;
        let credit = paid_by_method
            .get(PaymentMethod::Credit.as_str())
            .copied()
            .unwrap_or_default();
        if let Some(customer_id) = order.customer_id {
            self.book_customer_sale(db_tx, customer_id, order.totals.grand_total, credit)
                .await?;
        }
        if let Some(session_id) = self.payment_session(db_tx, actor, order.session_id).await? {
            self.count_session_order(db_tx, session_id).await?;
        }

        self.post_sale(db_tx, order, &paid_by_method, actor).await?;
        self.post_cost_of_goods(db_tx, order, cost_of_goods, actor)
            .await?;

        tracing::info!(
            order = %order.order_number,
            total = %order.totals.grand_total,
            cogs = %cost_of_goods,
            "order completed"
        );
        Ok(PrintJob::Bill {
            order_id: order.id,
            order_number: order.order_number.clone(),
            lines: items.iter().map(print_line).collect(),
            totals: order.totals,
            paid: order.paid_amount,
            change,
        })
    }

    /// Payments of an order summed per method, keyed by the method's name.
    async fn paid_by_method(
        &self,
        db_tx: &DatabaseTransaction,
        order_id: Uuid,
    ) -> ResultEngine<BTreeMap<&'static str, Money>> {
        let mut sums = BTreeMap::new();
        let models = payments::Entity::find()
            .filter(payments::Column::OrderId.eq(order_id.to_string()))
            .order_by_asc(payments::Column::CreatedAt)
            .all(db_tx)
            .await?;
        for model in models {
            let payment = Payment::try_from(model)?;
            *sums.entry(payment.method.as_str()).or_insert(Money::ZERO) += payment.amount;
        }
        Ok(sums)
    }

    async fn book_customer_sale(
        &self,
        db_tx: &DatabaseTransaction,
        customer_id: Uuid,
        total: Money,
        credit: Money,
    ) -> ResultEngine<()> {
        customers::Entity::update_many()
            .col_expr(
                customers::Column::TotalOrders,
                Expr::col(customers::Column::TotalOrders).add(1),
            )
            .col_expr(
                customers::Column::TotalSpentMinor,
                Expr::col(customers::Column::TotalSpentMinor).add(total.minor()),
            )
            .col_expr(
                customers::Column::CurrentCreditMinor,
                Expr::col(customers::Column::CurrentCreditMinor).add(credit.minor()),
            )
            .filter(customers::Column::Id.eq(customer_id.to_string()))
            .exec(db_tx)
            .await?;

        let customer = customers::Entity::find_by_id(customer_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("customer not exists".to_string()))?;
        let customer = Customer::try_from(customer)?;
        if credit.is_positive() && customer.is_over_limit() {
            tracing::warn!(
                customer = %customer.id,
                credit = %customer.current_credit,
                limit = %customer.credit_limit,
                "customer over credit limit"
            );
        }
        Ok(())
    }

    /// Books the sale: the takings by payment method against net sales and
    /// tax payable. Skipped when no posting year or accounts are set up.
    async fn post_sale(
        &self,
        db_tx: &DatabaseTransaction,
        order: &Order,
        paid_by_method: &BTreeMap<&'static str, Money>,
        actor: &str,
    ) -> ResultEngine<()> {
        let total = order.totals.grand_total;
        if !total.is_positive() {
            return Ok(());
        }
        let received: Money = paid_by_method.values().copied().sum();
        if received != total {
            tracing::warn!(
                order = %order.order_number,
                %received,
                %total,
                "payments differ from total, sale not posted"
            );
            return Ok(());
        }
        let Some(date) = self.posting_date(db_tx).await? else {
            return Ok(());
        };

        let mut debit_roles = Vec::new();
        for (method, amount) in paid_by_method {
            let role = match PaymentMethod::try_from(*method)? {
                PaymentMethod::Cash => PointerKey::CashAccount,
                PaymentMethod::Card | PaymentMethod::Online => PointerKey::BankAccount,
                PaymentMethod::Credit => PointerKey::ReceivableAccount,
            };
            debit_roles.push((role, *amount));
        }
        let tax = order.totals.tax_amount;
        let mut credit_roles = vec![(PointerKey::SalesAccount, total - tax)];
        if tax.is_positive() {
            credit_roles.push((PointerKey::TaxPayableAccount, tax));
        }

        let mut cmd = PostTransactionCmd::new(
            date,
            VoucherType::Sales,
            format!("Sale {}", order.order_number),
            actor,
        )
        .reference(ORDER_REFERENCE, order.id.to_string());
        for (role, amount) in debit_roles {
            let Some(account) = self.posting_account(db_tx, role).await? else {
                tracing::debug!(%role, order = %order.order_number, "posting account not set, sale not posted");
                return Ok(());
            };
            cmd = cmd.debit(account.id, amount);
        }
        for (role, amount) in credit_roles {
            if !amount.is_positive() {
                continue;
            }
            let Some(account) = self.posting_account(db_tx, role).await? else {
                tracing::debug!(%role, order = %order.order_number, "posting account not set, sale not posted");
                return Ok(());
            };
            cmd = cmd.credit(account.id, amount);
        }
        self.post_in_tx(db_tx, &cmd, actor).await?;
        Ok(())
    }

    /// Moves the cost of the consumed stock from inventory to cost of goods.
    async fn post_cost_of_goods(
        &self,
        db_tx: &DatabaseTransaction,
        order: &Order,
        amount: Money,
        actor: &str,
    ) -> ResultEngine<()> {
        if !amount.is_positive() {
            return Ok(());
        }
        let Some(date) = self.posting_date(db_tx).await? else {
            return Ok(());
        };
        let (Some(cogs), Some(inventory)) = (
            self.posting_account(db_tx, PointerKey::CostOfGoodsAccount)
                .await?,
            self.posting_account(db_tx, PointerKey::InventoryAccount)
                .await?,
        ) else {
            tracing::debug!(order = %order.order_number, "posting accounts not set, cost of goods not posted");
            return Ok(());
        };

        let cmd = PostTransactionCmd::new(
            date,
            VoucherType::Journal,
            format!("Cost of goods {}", order.order_number),
            actor,
        )
        .reference(ORDER_REFERENCE, order.id.to_string())
        .debit(cogs.id, amount)
        .credit(inventory.id, amount);
        self.post_in_tx(db_tx, &cmd, actor).await?;
        Ok(())
    }

    /// Today's business date if a current financial year covers it.
    pub(super) async fn posting_date(
        &self,
        db_tx: &DatabaseTransaction,
    ) -> ResultEngine<Option<chrono::NaiveDate>> {
        let day = self.business_day();
        match self.load_current_year(db_tx).await? {
            Some(year) if year.contains(day) => Ok(Some(day)),
            Some(year) => {
                tracing::debug!(%day, year = %year.name, "business day outside current year, not posted");
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

/// Orders can take payments and be completed until they are terminal.
fn require_payable(order: &Order) -> ResultEngine<()> {
    if order.status.is_terminal() {
        return Err(EngineError::StateConflict(format!(
            "order {} is {}",
            order.order_number, order.status
        )));
    }
    Ok(())
}
