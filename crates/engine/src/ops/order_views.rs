use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{
    Condition, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*,
};

use crate::{
    Order, OrderItem, OrderStatus, Payment, ResultEngine, customers, dining_tables, orders,
    payments,
};

use super::{Engine, decode_cursor, encode_cursor, with_tx};

/// An order with everything a screen or receipt needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderView {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub payments: Vec<Payment>,
    pub table_name: Option<String>,
    pub customer_name: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct OrderListFilter {
    pub status: Option<OrderStatus>,
    pub session_id: Option<Uuid>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct OrdersCursor {
    created_at: DateTime<Utc>,
    id: String,
}

impl Engine {
    pub async fn order_view(&self, order_id: Uuid) -> ResultEngine<OrderView> {
        with_tx!(self, |db_tx| {
            let (order, _) = self.require_order(&db_tx, order_id).await?;
            self.build_view(&db_tx, order).await
        })
    }

    /// Orders newest first, optionally narrowed by status or session.
    pub async fn list_orders(
        &self,
        filter: OrderListFilter,
        limit: u64,
        cursor: Option<&str>,
    ) -> ResultEngine<(Vec<OrderView>, Option<String>)> {
        let cursor = cursor
            .map(|c| decode_cursor::<OrdersCursor>(c, "orders"))
            .transpose()?;
        with_tx!(self, |db_tx| {
            let mut query = orders::Entity::find()
                .order_by_desc(orders::Column::CreatedAt)
                .order_by_desc(orders::Column::Id)
                .limit(limit.saturating_add(1));
            if let Some(status) = filter.status {
                query = query.filter(orders::Column::Status.eq(status.as_str()));
            }
            if let Some(session_id) = filter.session_id {
                query = query.filter(orders::Column::SessionId.eq(session_id.to_string()));
            }
            if let Some(cursor) = &cursor {
                query = query.filter(
                    Condition::any()
                        .add(orders::Column::CreatedAt.lt(cursor.created_at))
                        .add(
                            Condition::all()
                                .add(orders::Column::CreatedAt.eq(cursor.created_at))
                                .add(orders::Column::Id.lt(cursor.id.clone())),
                        ),
                );
            }

            let rows = query.all(&db_tx).await?;
            let has_more = rows.len() > limit as usize;
            let mut views = Vec::new();
            for model in rows.into_iter().take(limit as usize) {
                let order = Order::try_from(model)?;
                views.push(self.build_view(&db_tx, order).await?);
            }

            let next = match views.last() {
                Some(last) if has_more => Some(encode_cursor(
                    &OrdersCursor {
                        created_at: last.order.created_at,
                        id: last.order.id.to_string(),
                    },
                    "orders",
                )?),
                _ => None,
            };
            Ok((views, next))
        })
    }

    async fn build_view(&self, db_tx: &DatabaseTransaction, order: Order) -> ResultEngine<OrderView> {
        let items = self.order_items(db_tx, order.id).await?;
        let payments = payments::Entity::find()
            .filter(payments::Column::OrderId.eq(order.id.to_string()))
            .order_by_asc(payments::Column::CreatedAt)
            .order_by_asc(payments::Column::Id)
            .all(db_tx)
            .await?
            .into_iter()
            .map(Payment::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;

        let table_name = match order.table_id {
            Some(table_id) => dining_tables::Entity::find_by_id(table_id.to_string())
                .one(db_tx)
                .await?
                .map(|table| table.name),
            None => None,
        };
        let customer_name = match order.customer_id {
            Some(customer_id) => customers::Entity::find_by_id(customer_id.to_string())
                .one(db_tx)
                .await?
                .map(|customer| customer.name),
            None => None,
        };

        Ok(OrderView {
            order,
            items,
            payments,
            table_name,
            customer_name,
        })
    }
}
