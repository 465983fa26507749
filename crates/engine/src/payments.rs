use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Money,
    util::{parse_optional_uuid, parse_uuid, string_enum},
};

string_enum! {
    pub enum PaymentMethod("payment method") {
        Cash => "cash",
        Card => "card",
        Online => "online",
        /// Charged to the customer's account.
        Credit => "credit",
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub session_id: Option<Uuid>,
    pub method: PaymentMethod,
    /// Amount applied to the order.
    pub amount: Money,
    /// Amount handed over; `tendered - amount` went back as change.
    pub tendered: Money,
    pub change: Money,
    pub received_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub order_id: String,
    pub session_id: Option<String>,
    pub method: String,
    pub amount_minor: i64,
    pub tendered_minor: i64,
    pub change_minor: i64,
    pub received_by: String,
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

impl From<&Payment> for ActiveModel {
    fn from(value: &Payment) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            order_id: ActiveValue::Set(value.order_id.to_string()),
            session_id: ActiveValue::Set(value.session_id.map(|id| id.to_string())),
            method: ActiveValue::Set(value.method.as_str().to_string()),
            amount_minor: ActiveValue::Set(value.amount.minor()),
            tendered_minor: ActiveValue::Set(value.tendered.minor()),
            change_minor: ActiveValue::Set(value.change.minor()),
            received_by: ActiveValue::Set(value.received_by.clone()),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for Payment {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "payment")?,
            order_id: parse_uuid(&model.order_id, "order")?,
            session_id: parse_optional_uuid(model.session_id.as_deref(), "session")?,
            method: PaymentMethod::try_from(model.method.as_str())?,
            amount: Money::new(model.amount_minor),
            tendered: Money::new(model.tendered_minor),
            change: Money::new(model.change_minor),
            received_by: model.received_by,
            created_at: model.created_at,
        })
    }
}
