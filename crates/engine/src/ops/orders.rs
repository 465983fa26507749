use chrono::Utc;
use uuid::Uuid;

use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};

use crate::{
    AddItemCmd, CreateOrderCmd, Discount, DiscountInput, EngineError, ItemStatus, MenuItem, Money,
    Order, OrderItem, OrderStatus, OrderTotals, OrderType, PaymentStatus, PrintJob, PrintLine,
    ResultEngine, TableStatus, customers, dining_tables, discounts, order_items, orders,
    sequences::{order_number, order_scope},
    totals,
};

use super::{Engine, normalize_optional_text, require_actor, with_tx};

impl Engine {
    /// Opens an order with zero totals.
    ///
    /// The number comes from a per-day counter in the business timezone. A
    /// dine-in order needs an available table, which becomes occupied by it in
    /// the same transaction.
    pub async fn create_order(&self, cmd: CreateOrderCmd) -> ResultEngine<Order> {
        let actor = require_actor(&cmd.actor)?;
        if cmd.order_type == OrderType::DineIn && cmd.table_id.is_none() {
            return Err(EngineError::Validation(
                "dine-in orders need a table".to_string(),
            ));
        }
        let notes = normalize_optional_text(cmd.notes.as_deref());
        let waiter_id = normalize_optional_text(cmd.waiter_id.as_deref());

        with_tx!(self, |db_tx| {
            if let Some(customer_id) = cmd.customer_id {
                customers::Entity::find_by_id(customer_id.to_string())
                    .one(&db_tx)
                    .await?
                    .ok_or_else(|| EngineError::KeyNotFound("customer not exists".to_string()))?;
            }
            if let Some(table_id) = cmd.table_id {
                let table = dining_tables::Entity::find_by_id(table_id.to_string())
                    .one(&db_tx)
                    .await?
                    .ok_or_else(|| EngineError::KeyNotFound("table not exists".to_string()))?;
                if table.status != TableStatus::Available.as_str() {
                    return Err(EngineError::StateConflict(format!(
                        "table {} is occupied",
                        table.name
                    )));
                }
            }

            let day = self.business_day();
            let seq = self.next_sequence(&db_tx, &order_scope(day)).await?;
            let session_id = self
                .open_session_for(&db_tx, &actor)
                .await?
                .map(|session| session.id);

            let now = Utc::now();
            let order = Order {
                id: Uuid::new_v4(),
                order_number: order_number(day, seq),
                order_type: cmd.order_type,
                table_id: cmd.table_id,
                customer_id: cmd.customer_id,
                waiter_id: waiter_id.clone(),
                cashier_id: actor.clone(),
                session_id,
                discount_id: None,
                manual_discount: None,
                totals: OrderTotals::default(),
                paid_amount: Money::ZERO,
                status: OrderStatus::Pending,
                payment_status: PaymentStatus::Unpaid,
                notes: notes.clone(),
                created_at: now,
                updated_at: now,
                completed_at: None,
                cancelled_at: None,
            };
            orders::ActiveModel::from(&order).insert(&db_tx).await?;

            if let Some(table_id) = order.table_id {
                let result = dining_tables::Entity::update_many()
                    .col_expr(
                        dining_tables::Column::Status,
                        Expr::value(TableStatus::Occupied.as_str()),
                    )
                    .col_expr(
                        dining_tables::Column::CurrentOrderId,
                        Expr::value(order.id.to_string()),
                    )
                    .filter(dining_tables::Column::Id.eq(table_id.to_string()))
                    .filter(dining_tables::Column::Status.eq(TableStatus::Available.as_str()))
                    .exec(&db_tx)
                    .await?;
                if result.rows_affected != 1 {
                    return Err(EngineError::WriteConflict(format!(
                        "table {table_id} taken concurrently"
                    )));
                }
            }

            tracing::info!(order = %order.order_number, cashier = %actor, "order created");
            Ok(order)
        })
    }

    /// Adds a menu item to an open order and recalculates the totals.
    ///
    /// A line without notes merges into an existing un-noted line of the same
    /// item that has not gone to the kitchen yet. A line with notes is always
    /// new.
    pub async fn add_item(&self, cmd: AddItemCmd) -> ResultEngine<OrderItem> {
        require_actor(&cmd.actor)?;
        if cmd.quantity <= 0 {
            return Err(EngineError::Validation("quantity must be > 0".to_string()));
        }
        let notes = normalize_optional_text(cmd.notes.as_deref());

        with_tx!(self, |db_tx| {
            let (mut order, version) = self.require_order(&db_tx, cmd.order_id).await?;
            require_open(&order)?;

            let menu_item = MenuItem::try_from(
                self.require_menu_item(&db_tx, cmd.menu_item_id).await?,
            )?;
            if !menu_item.available {
                return Err(EngineError::Validation(format!(
                    "{} is not available",
                    menu_item.name
                )));
            }

            let mergeable = match &notes {
                Some(_) => None,
                None => order_items::Entity::find()
                    .filter(order_items::Column::OrderId.eq(order.id.to_string()))
                    .filter(order_items::Column::MenuItemId.eq(menu_item.id.to_string()))
                    .filter(order_items::Column::Notes.is_null())
                    .filter(order_items::Column::KotPrinted.eq(false))
                    .filter(order_items::Column::Status.ne(ItemStatus::Cancelled.as_str()))
                    .one(&db_tx)
                    .await?
                    .map(OrderItem::try_from)
                    .transpose()?,
            };

            let item = match mergeable {
                Some(mut item) => {
                    item.add_quantity(cmd.quantity)?;
                    order_items::ActiveModel::from(&item)
                        .update(&db_tx)
                        .await?;
                    item
                }
                None => {
                    let item = OrderItem::new(
                        order.id,
                        menu_item.id,
                        menu_item.name.clone(),
                        menu_item.price,
                        cmd.quantity,
                        notes.clone(),
                    )?;
                    order_items::ActiveModel::from(&item)
                        .insert(&db_tx)
                        .await?;
                    item
                }
            };

            self.recalculate(&db_tx, &mut order).await?;
            self.save_order(&db_tx, &order, version).await?;
            Ok(item)
        })
    }

    /// Sets a line's quantity. Zero or less removes the line.
    pub async fn update_item_quantity(
        &self,
        order_id: Uuid,
        item_id: Uuid,
        quantity: i64,
        actor: &str,
    ) -> ResultEngine<Order> {
        require_actor(actor)?;
        with_tx!(self, |db_tx| {
            let (mut order, version) = self.require_order(&db_tx, order_id).await?;
            require_open(&order)?;
            let mut item = self.require_item(&db_tx, order_id, item_id).await?;

            if quantity <= 0 {
                order_items::Entity::delete_by_id(item_id.to_string())
                    .exec(&db_tx)
                    .await?;
            } else {
                item.set_quantity(quantity)?;
                order_items::ActiveModel::from(&item).update(&db_tx).await?;
            }

            self.recalculate(&db_tx, &mut order).await?;
            self.save_order(&db_tx, &order, version).await?;
            Ok(order)
        })
    }

    pub async fn remove_item(
        &self,
        order_id: Uuid,
        item_id: Uuid,
        actor: &str,
    ) -> ResultEngine<Order> {
        require_actor(actor)?;
        with_tx!(self, |db_tx| {
            let (mut order, version) = self.require_order(&db_tx, order_id).await?;
            require_open(&order)?;
            self.require_item(&db_tx, order_id, item_id).await?;
            order_items::Entity::delete_by_id(item_id.to_string())
                .exec(&db_tx)
                .await?;

            self.recalculate(&db_tx, &mut order).await?;
            self.save_order(&db_tx, &order, version).await?;
            Ok(order)
        })
    }

    /// Attaches a discount rule, a manual override amount, or both; the
    /// override wins when computing totals.
    pub async fn apply_discount(
        &self,
        order_id: Uuid,
        discount_id: Option<Uuid>,
        manual_amount: Option<Money>,
        actor: &str,
    ) -> ResultEngine<Order> {
        require_actor(actor)?;
        if discount_id.is_none() && manual_amount.is_none() {
            return Err(EngineError::Validation(
                "a discount or a manual amount is required".to_string(),
            ));
        }
        if manual_amount.is_some_and(Money::is_negative) {
            return Err(EngineError::Validation(
                "manual discount must be >= 0".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            let (mut order, version) = self.require_order(&db_tx, order_id).await?;
            require_open(&order)?;
            if let Some(discount_id) = discount_id {
                let discount = self.require_discount(&db_tx, discount_id).await?;
                if !discount.active {
                    return Err(EngineError::Validation(format!(
                        "discount {} is not active",
                        discount.name
                    )));
                }
            }
            order.discount_id = discount_id;
            order.manual_discount = manual_amount;

            self.recalculate(&db_tx, &mut order).await?;
            self.save_order(&db_tx, &order, version).await?;
            Ok(order)
        })
    }

    pub async fn remove_discount(&self, order_id: Uuid, actor: &str) -> ResultEngine<Order> {
        require_actor(actor)?;
        with_tx!(self, |db_tx| {
            let (mut order, version) = self.require_order(&db_tx, order_id).await?;
            require_open(&order)?;
            order.discount_id = None;
            order.manual_discount = None;

            self.recalculate(&db_tx, &mut order).await?;
            self.save_order(&db_tx, &order, version).await?;
            Ok(order)
        })
    }

    /// Moves an order along the kitchen states. Completion and cancellation
    /// have their own operations.
    pub async fn update_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
        actor: &str,
    ) -> ResultEngine<Order> {
        let actor = require_actor(actor)?;
        if status.is_terminal() {
            return Err(EngineError::StateConflict(format!(
                "orders become {status} through their own operation"
            )));
        }

        with_tx!(self, |db_tx| {
            let (mut order, version) = self.require_order(&db_tx, order_id).await?;
            if !order.status.can_transition_to(status) {
                return Err(EngineError::StateConflict(format!(
                    "order {} can't go from {} to {status}",
                    order.order_number, order.status
                )));
            }
            order.status = status;
            order.updated_at = Utc::now();
            self.save_order(&db_tx, &order, version).await?;

            if let Some(item_status) = ItemStatus::for_order_status(status) {
                self.set_item_statuses(&db_tx, order.id, item_status).await?;
            }
            tracing::debug!(order = %order.order_number, %status, by = %actor, "order status");
            Ok(order)
        })
    }

    /// Cancels an open order and frees its table. Completed orders can't be
    /// cancelled, so deducted stock never needs reversing.
    pub async fn cancel_order(
        &self,
        order_id: Uuid,
        reason: Option<&str>,
        actor: &str,
    ) -> ResultEngine<Order> {
        let actor = require_actor(actor)?;
        let reason = normalize_optional_text(reason);

        with_tx!(self, |db_tx| {
            let (mut order, version) = self.require_order(&db_tx, order_id).await?;
            if !order.status.can_transition_to(OrderStatus::Cancelled) {
                return Err(EngineError::StateConflict(format!(
                    "order {} is already {}",
                    order.order_number, order.status
                )));
            }

            let now = Utc::now();
            order.status = OrderStatus::Cancelled;
            order.cancelled_at = Some(now);
            order.updated_at = now;
            if let Some(reason) = &reason {
                order.notes = Some(match order.notes.take() {
                    Some(notes) => format!("{notes}\ncancelled: {reason}"),
                    None => format!("cancelled: {reason}"),
                });
            }
            self.save_order(&db_tx, &order, version).await?;
            self.set_item_statuses(&db_tx, order.id, ItemStatus::Cancelled)
                .await?;
            if let Some(table_id) = order.table_id {
                self.free_table(&db_tx, table_id, order.id).await?;
            }

            tracing::info!(order = %order.order_number, by = %actor, "order cancelled");
            Ok(order)
        })
    }

    /// Marks every unprinted line as sent and hands a kitchen ticket to the
    /// printer after commit. Returns how many lines were sent.
    pub async fn send_to_kitchen(&self, order_id: Uuid, actor: &str) -> ResultEngine<usize> {
        require_actor(actor)?;
        let (count, job) = with_tx!(self, |db_tx| {
            let (order, _) = self.require_order(&db_tx, order_id).await?;
            require_open(&order)?;

            let pending = order_items::Entity::find()
                .filter(order_items::Column::OrderId.eq(order.id.to_string()))
                .filter(order_items::Column::KotPrinted.eq(false))
                .filter(order_items::Column::Status.ne(ItemStatus::Cancelled.as_str()))
                .order_by_asc(order_items::Column::CreatedAt)
                .order_by_asc(order_items::Column::Id)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(OrderItem::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            if pending.is_empty() {
                return Ok((0, None));
            }

            order_items::Entity::update_many()
                .col_expr(order_items::Column::KotPrinted, Expr::value(true))
                .filter(
                    order_items::Column::Id
                        .is_in(pending.iter().map(|item| item.id.to_string())),
                )
                .exec(&db_tx)
                .await?;

            let table = match order.table_id {
                Some(table_id) => dining_tables::Entity::find_by_id(table_id.to_string())
                    .one(&db_tx)
                    .await?
                    .map(|table| table.name),
                None => None,
            };
            let job = PrintJob::Kot {
                order_id: order.id,
                order_number: order.order_number.clone(),
                table,
                lines: pending.iter().map(print_line).collect(),
            };
            Ok((pending.len(), Some(job)))
        })?;

        if let Some(job) = job {
            self.dispatch(job);
        }
        Ok(count)
    }

    /// Loads an order with its version token.
    pub(super) async fn require_order(
        &self,
        db_tx: &DatabaseTransaction,
        order_id: Uuid,
    ) -> ResultEngine<(Order, i64)> {
        let model = orders::Entity::find_by_id(order_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("order not exists".to_string()))?;
        let version = model.version;
        Ok((Order::try_from(model)?, version))
    }

    async fn require_item(
        &self,
        db_tx: &DatabaseTransaction,
        order_id: Uuid,
        item_id: Uuid,
    ) -> ResultEngine<OrderItem> {
        let model = order_items::Entity::find_by_id(item_id.to_string())
            .filter(order_items::Column::OrderId.eq(order_id.to_string()))
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("order item not exists".to_string()))?;
        OrderItem::try_from(model)
    }

    async fn require_discount(
        &self,
        db_tx: &DatabaseTransaction,
        discount_id: Uuid,
    ) -> ResultEngine<Discount> {
        let model = discounts::Entity::find_by_id(discount_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("discount not exists".to_string()))?;
        Discount::try_from(model)
    }

    /// Lines of an order in insertion order, cancelled ones included.
    pub(super) async fn order_items(
        &self,
        db_tx: &DatabaseTransaction,
        order_id: Uuid,
    ) -> ResultEngine<Vec<OrderItem>> {
        order_items::Entity::find()
            .filter(order_items::Column::OrderId.eq(order_id.to_string()))
            .order_by_asc(order_items::Column::CreatedAt)
            .order_by_asc(order_items::Column::Id)
            .all(db_tx)
            .await?
            .into_iter()
            .map(OrderItem::try_from)
            .collect::<ResultEngine<Vec<_>>>()
    }

    /// Rewrites the stored totals from the current lines, discount and active
    /// tax setting. The only writer of the totals columns.
    async fn recalculate(&self, db_tx: &DatabaseTransaction, order: &mut Order) -> ResultEngine<()> {
        let items = self.order_items(db_tx, order.id).await?;
        let discount = match order.discount_id {
            Some(discount_id) => Some(self.require_discount(db_tx, discount_id).await?),
            None => None,
        };
        let input = match (order.manual_discount, &discount) {
            (Some(amount), _) => DiscountInput::Manual(amount),
            (None, Some(rule)) => DiscountInput::Rule(rule),
            (None, None) => DiscountInput::None,
        };
        let tax = self.load_active_tax(db_tx).await?;

        order.totals = totals::calculate(
            items
                .iter()
                .filter(|item| item.status != ItemStatus::Cancelled)
                .map(|item| item.total_price),
            input,
            tax.as_ref(),
        )?;
        order.updated_at = Utc::now();
        Ok(())
    }

    /// Writes the whole order row if nobody changed it since `version` was
    /// read, bumping the version.
    pub(super) async fn save_order(
        &self,
        db_tx: &DatabaseTransaction,
        order: &Order,
        version: i64,
    ) -> ResultEngine<()> {
        let mut active = orders::ActiveModel::from(order);
        active.version = ActiveValue::Set(version + 1);
        let result = orders::Entity::update_many()
            .set(active)
            .filter(orders::Column::Id.eq(order.id.to_string()))
            .filter(orders::Column::Version.eq(version))
            .exec(db_tx)
            .await?;
        if result.rows_affected != 1 {
            return Err(EngineError::WriteConflict(format!(
                "order {} changed concurrently",
                order.order_number
            )));
        }
        Ok(())
    }

    async fn set_item_statuses(
        &self,
        db_tx: &DatabaseTransaction,
        order_id: Uuid,
        status: ItemStatus,
    ) -> ResultEngine<()> {
        order_items::Entity::update_many()
            .col_expr(order_items::Column::Status, Expr::value(status.as_str()))
            .filter(order_items::Column::OrderId.eq(order_id.to_string()))
            .filter(order_items::Column::Status.ne(ItemStatus::Cancelled.as_str()))
            .exec(db_tx)
            .await?;
        Ok(())
    }

    /// Releases a table held by `order_id`. A table already re-seated for
    /// another order is left alone.
    pub(super) async fn free_table(
        &self,
        db_tx: &DatabaseTransaction,
        table_id: Uuid,
        order_id: Uuid,
    ) -> ResultEngine<()> {
        dining_tables::Entity::update_many()
            .col_expr(
                dining_tables::Column::Status,
                Expr::value(TableStatus::Available.as_str()),
            )
            .col_expr(
                dining_tables::Column::CurrentOrderId,
                Expr::value(Option::<String>::None),
            )
            .filter(dining_tables::Column::Id.eq(table_id.to_string()))
            .filter(dining_tables::Column::CurrentOrderId.eq(order_id.to_string()))
            .exec(db_tx)
            .await?;
        Ok(())
    }
}

fn require_open(order: &Order) -> ResultEngine<()> {
    if order.status.is_terminal() {
        return Err(EngineError::StateConflict(format!(
            "order {} is {}",
            order.order_number, order.status
        )));
    }
    Ok(())
}

pub(super) fn print_line(item: &OrderItem) -> PrintLine {
    PrintLine {
        name: item.item_name.clone(),
        quantity: item.quantity,
        notes: item.notes.clone(),
    }
}
