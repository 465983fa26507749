use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine, util::parse_uuid, util::string_enum};

string_enum! {
    pub enum DiscountKind("discount kind") {
        /// `value` is in basis points of the subtotal.
        Percentage => "percentage",
        /// `value` is a fixed amount in minor units.
        Flat => "flat",
    }
}

/// A reusable discount rule attached to orders.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    pub id: Uuid,
    pub name: String,
    pub kind: DiscountKind,
    pub value: i64,
    /// Cap for percentage discounts; ignored for flat ones.
    pub max_discount_amount: Option<Money>,
    pub active: bool,
}

impl Discount {
    pub fn new(
        name: String,
        kind: DiscountKind,
        value: i64,
        max_discount_amount: Option<Money>,
    ) -> ResultEngine<Self> {
        if value <= 0 {
            return Err(EngineError::Validation(
                "discount value must be > 0".to_string(),
            ));
        }
        if kind == DiscountKind::Percentage && value > crate::money::BASIS_POINTS {
            return Err(EngineError::Validation(
                "percentage discount cannot exceed 100%".to_string(),
            ));
        }
        if max_discount_amount.is_some_and(|cap| cap.is_negative()) {
            return Err(EngineError::Validation(
                "max discount amount must be >= 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            kind,
            value,
            max_discount_amount,
            active: true,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "discounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub kind: String,
    pub value: i64,
    pub max_discount_minor: Option<i64>,
    pub active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Discount> for ActiveModel {
    fn from(value: &Discount) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            name: ActiveValue::Set(value.name.clone()),
            kind: ActiveValue::Set(value.kind.as_str().to_string()),
            value: ActiveValue::Set(value.value),
            max_discount_minor: ActiveValue::Set(value.max_discount_amount.map(Money::minor)),
            active: ActiveValue::Set(value.active),
        }
    }
}

impl TryFrom<Model> for Discount {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "discount")?,
            name: model.name,
            kind: DiscountKind::try_from(model.kind.as_str())?,
            value: model.value,
            max_discount_amount: model.max_discount_minor.map(Money::new),
            active: model.active,
        })
    }
}
