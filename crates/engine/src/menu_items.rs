use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, util::parse_uuid};

/// A sellable menu item. Prices are copied onto order lines when added, so a
/// later price change never rewrites existing orders.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: Uuid,
    pub name: String,
    pub price: Money,
    pub available: bool,
    pub created_at: DateTime<Utc>,
}

impl MenuItem {
    pub fn new(name: String, price: Money) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            price,
            available: true,
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "menu_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub price_minor: i64,
    pub available: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::recipes::Entity")]
    RecipeLines,
}

impl Related<super::recipes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecipeLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&MenuItem> for ActiveModel {
    fn from(value: &MenuItem) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            name: ActiveValue::Set(value.name.clone()),
            price_minor: ActiveValue::Set(value.price.minor()),
            available: ActiveValue::Set(value.available),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for MenuItem {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "menu item")?,
            name: model.name,
            price: Money::new(model.price_minor),
            available: model.available,
            created_at: model.created_at,
        })
    }
}
