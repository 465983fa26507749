use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Money, OrderStatus, ResultEngine,
    util::{parse_uuid, string_enum, too_large},
};

string_enum! {
    pub enum ItemStatus("item status") {
        Pending => "pending",
        Preparing => "preparing",
        Ready => "ready",
        Served => "served",
        Cancelled => "cancelled",
    }
}

impl ItemStatus {
    /// Item status mirrored from a kitchen order status, if any.
    #[must_use]
    pub fn for_order_status(status: OrderStatus) -> Option<ItemStatus> {
        match status {
            OrderStatus::Preparing => Some(Self::Preparing),
            OrderStatus::Ready => Some(Self::Ready),
            OrderStatus::Served => Some(Self::Served),
            OrderStatus::Cancelled => Some(Self::Cancelled),
            OrderStatus::Pending | OrderStatus::Confirmed | OrderStatus::Completed => None,
        }
    }
}

/// One line of an order. Name and unit price are copied from the menu item
/// when the line is created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub menu_item_id: Uuid,
    pub item_name: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub total_price: Money,
    pub notes: Option<String>,
    pub status: ItemStatus,
    pub kot_printed: bool,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    pub fn new(
        order_id: Uuid,
        menu_item_id: Uuid,
        item_name: String,
        unit_price: Money,
        quantity: i64,
        notes: Option<String>,
    ) -> ResultEngine<Self> {
        let mut item = Self {
            id: Uuid::new_v4(),
            order_id,
            menu_item_id,
            item_name,
            unit_price,
            quantity: 0,
            total_price: Money::ZERO,
            notes,
            status: ItemStatus::Pending,
            kot_printed: false,
            created_at: Utc::now(),
        };
        item.set_quantity(quantity)?;
        Ok(item)
    }

    /// Sets the line quantity and its total price.
    pub fn set_quantity(&mut self, quantity: i64) -> ResultEngine<()> {
        self.total_price = self
            .unit_price
            .checked_times(quantity)
            .ok_or_else(|| too_large("quantity"))?;
        self.quantity = quantity;
        Ok(())
    }

    /// Adds to the line quantity, as when an identical line is merged.
    pub fn add_quantity(&mut self, quantity: i64) -> ResultEngine<()> {
        let merged = self
            .quantity
            .checked_add(quantity)
            .ok_or_else(|| too_large("quantity"))?;
        self.set_quantity(merged)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub order_id: String,
    pub menu_item_id: String,
    pub item_name: String,
    pub unit_price_minor: i64,
    pub quantity: i64,
    pub total_price_minor: i64,
    pub notes: Option<String>,
    pub status: String,
    pub kot_printed: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::orders::Entity",
        from = "Column::OrderId",
        to = "super::orders::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Orders,
}

impl Related<super::orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&OrderItem> for ActiveModel {
    fn from(value: &OrderItem) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            order_id: ActiveValue::Set(value.order_id.to_string()),
            menu_item_id: ActiveValue::Set(value.menu_item_id.to_string()),
            item_name: ActiveValue::Set(value.item_name.clone()),
            unit_price_minor: ActiveValue::Set(value.unit_price.minor()),
            quantity: ActiveValue::Set(value.quantity),
            total_price_minor: ActiveValue::Set(value.total_price.minor()),
            notes: ActiveValue::Set(value.notes.clone()),
            status: ActiveValue::Set(value.status.as_str().to_string()),
            kot_printed: ActiveValue::Set(value.kot_printed),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for OrderItem {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "order item")?,
            order_id: parse_uuid(&model.order_id, "order")?,
            menu_item_id: parse_uuid(&model.menu_item_id, "menu item")?,
            item_name: model.item_name,
            unit_price: Money::new(model.unit_price_minor),
            quantity: model.quantity,
            total_price: Money::new(model.total_price_minor),
            notes: model.notes,
            status: ItemStatus::try_from(model.status.as_str())?,
            kot_printed: model.kot_printed,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(unit_price: Money, quantity: i64) -> ResultEngine<OrderItem> {
        OrderItem::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Momo".to_string(),
            unit_price,
            quantity,
            None,
        )
    }

    #[test]
    fn total_follows_quantity() {
        let mut item = line(Money::major(45), 2).unwrap();
        assert_eq!(item.total_price, Money::major(90));
        item.add_quantity(1).unwrap();
        assert_eq!(item.quantity, 3);
        assert_eq!(item.total_price, Money::major(135));
    }

    #[test]
    fn quantity_that_overflows_the_total_is_rejected() {
        let err = line(Money::major(100), i64::MAX / 100).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn failed_merge_leaves_the_line_untouched() {
        let mut item = line(Money::major(100), 1).unwrap();
        assert!(item.add_quantity(i64::MAX).is_err());
        assert!(item.set_quantity(i64::MAX / 100).is_err());
        assert_eq!(item.quantity, 1);
        assert_eq!(item.total_price, Money::major(100));
    }
}
