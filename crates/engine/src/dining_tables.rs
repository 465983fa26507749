use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_optional_uuid, util::parse_uuid, util::string_enum};

string_enum! {
    pub enum TableStatus("table status") {
        Available => "available",
        Occupied => "occupied",
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiningTable {
    pub id: Uuid,
    pub name: String,
    pub status: TableStatus,
    pub current_order_id: Option<Uuid>,
}

impl DiningTable {
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            status: TableStatus::Available,
            current_order_id: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "dining_tables")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub status: String,
    pub current_order_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&DiningTable> for ActiveModel {
    fn from(value: &DiningTable) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            name: ActiveValue::Set(value.name.clone()),
            status: ActiveValue::Set(value.status.as_str().to_string()),
            current_order_id: ActiveValue::Set(value.current_order_id.map(|id| id.to_string())),
        }
    }
}

impl TryFrom<Model> for DiningTable {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "table")?,
            name: model.name,
            status: TableStatus::try_from(model.status.as_str())?,
            current_order_id: parse_optional_uuid(model.current_order_id.as_deref(), "order")?,
        })
    }
}
