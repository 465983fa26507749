//! Supplier purchases.
//!
//! `draft -> received` affects stock and is terminal; `draft -> cancelled` is
//! terminal with no stock effect. Only drafts can be changed or deleted.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Money, Quantity, ResultEngine,
    util::{parse_uuid, string_enum, too_large},
};

string_enum! {
    pub enum PurchaseStatus("purchase status") {
        Draft => "draft",
        Received => "received",
        Cancelled => "cancelled",
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: Uuid,
    /// Opaque supplier reference from the supplier directory.
    pub supplier_id: Option<String>,
    pub supplier_name: String,
    pub invoice_number: Option<String>,
    pub purchase_date: NaiveDate,
    pub total: Money,
    pub status: PurchaseStatus,
    pub notes: Option<String>,
    pub created_by: String,
    pub received_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub received_at: Option<DateTime<Utc>>,
    pub items: Vec<PurchaseItem>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseItem {
    pub id: Uuid,
    pub purchase_id: Uuid,
    pub ingredient_id: Uuid,
    pub quantity: Quantity,
    /// Price of one whole unit.
    pub unit_price: Money,
    pub total_price: Money,
}

impl PurchaseItem {
    pub fn new(
        purchase_id: Uuid,
        ingredient_id: Uuid,
        quantity: Quantity,
        unit_price: Money,
    ) -> ResultEngine<Self> {
        let total_price = unit_price
            .checked_times_quantity(quantity)
            .ok_or_else(|| too_large("purchase line total"))?;
        Ok(Self {
            id: Uuid::new_v4(),
            purchase_id,
            ingredient_id,
            quantity,
            unit_price,
            total_price,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "purchases")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub supplier_id: Option<String>,
    pub supplier_name: String,
    pub invoice_number: Option<String>,
    pub purchase_date: Date,
    pub total_minor: i64,
    pub status: String,
    pub notes: Option<String>,
    pub created_by: String,
    pub received_by: Option<String>,
    pub created_at: DateTimeUtc,
    pub received_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::purchases::items::Entity")]
    Items,
}

impl Related<items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Purchase> for ActiveModel {
    fn from(value: &Purchase) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            supplier_id: ActiveValue::Set(value.supplier_id.clone()),
            supplier_name: ActiveValue::Set(value.supplier_name.clone()),
            invoice_number: ActiveValue::Set(value.invoice_number.clone()),
            purchase_date: ActiveValue::Set(value.purchase_date),
            total_minor: ActiveValue::Set(value.total.minor()),
            status: ActiveValue::Set(value.status.as_str().to_string()),
            notes: ActiveValue::Set(value.notes.clone()),
            created_by: ActiveValue::Set(value.created_by.clone()),
            received_by: ActiveValue::Set(value.received_by.clone()),
            created_at: ActiveValue::Set(value.created_at),
            received_at: ActiveValue::Set(value.received_at),
        }
    }
}

impl TryFrom<(Model, Vec<items::Model>)> for Purchase {
    type Error = EngineError;

    fn try_from((model, item_models): (Model, Vec<items::Model>)) -> Result<Self, Self::Error> {
        let items = item_models
            .into_iter()
            .map(PurchaseItem::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            id: parse_uuid(&model.id, "purchase")?,
            supplier_id: model.supplier_id,
            supplier_name: model.supplier_name,
            invoice_number: model.invoice_number,
            purchase_date: model.purchase_date,
            total: Money::new(model.total_minor),
            status: PurchaseStatus::try_from(model.status.as_str())?,
            notes: model.notes,
            created_by: model.created_by,
            received_by: model.received_by,
            created_at: model.created_at,
            received_at: model.received_at,
            items,
        })
    }
}

/// Purchase lines.
pub mod items {
    use sea_orm::entity::{ActiveValue, prelude::*};

    use crate::{EngineError, Money, Quantity, util::parse_uuid};

    use super::PurchaseItem;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "purchase_items")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub purchase_id: String,
        pub ingredient_id: String,
        pub quantity: i64,
        pub unit_price_minor: i64,
        pub total_price_minor: i64,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::Entity",
            from = "Column::PurchaseId",
            to = "super::Column::Id",
            on_update = "NoAction",
            on_delete = "NoAction"
        )]
        Purchases,
    }

    impl Related<super::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Purchases.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}

    impl From<&PurchaseItem> for ActiveModel {
        fn from(value: &PurchaseItem) -> Self {
            Self {
                id: ActiveValue::Set(value.id.to_string()),
                purchase_id: ActiveValue::Set(value.purchase_id.to_string()),
                ingredient_id: ActiveValue::Set(value.ingredient_id.to_string()),
                quantity: ActiveValue::Set(value.quantity.milli()),
                unit_price_minor: ActiveValue::Set(value.unit_price.minor()),
                total_price_minor: ActiveValue::Set(value.total_price.minor()),
            }
        }
    }

    impl TryFrom<Model> for PurchaseItem {
        type Error = EngineError;

        fn try_from(model: Model) -> Result<Self, Self::Error> {
            Ok(Self {
                id: parse_uuid(&model.id, "purchase item")?,
                purchase_id: parse_uuid(&model.purchase_id, "purchase")?,
                ingredient_id: parse_uuid(&model.ingredient_id, "ingredient")?,
                quantity: Quantity::new(model.quantity),
                unit_price: Money::new(model.unit_price_minor),
                total_price: Money::new(model.total_price_minor),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_total_is_unit_price_times_quantity() {
        let item = PurchaseItem::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "2.5".parse().unwrap(),
            Money::major(40),
        )
        .unwrap();
        assert_eq!(item.total_price, Money::major(100));
    }

    #[test]
    fn line_total_that_does_not_fit_is_rejected() {
        let err = PurchaseItem::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Quantity::new(i64::MAX),
            Money::major(100),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}
