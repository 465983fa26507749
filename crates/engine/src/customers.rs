//! The module contains the credit-relevant subset of a customer.

use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub credit_limit: Money,
    /// Outstanding receivable.
    pub current_credit: Money,
    pub total_orders: i64,
    pub total_spent: Money,
}

impl Customer {
    pub fn new(name: String, phone: Option<String>, credit_limit: Money) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            phone,
            credit_limit,
            current_credit: Money::ZERO,
            total_orders: 0,
            total_spent: Money::ZERO,
        }
    }

    /// The credit limit is a soft limit: exceeding it is reported, not refused.
    #[must_use]
    pub fn is_over_limit(&self) -> bool {
        self.current_credit > self.credit_limit
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "customers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub credit_limit_minor: i64,
    pub current_credit_minor: i64,
    pub total_orders: i64,
    pub total_spent_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Customer> for ActiveModel {
    fn from(value: &Customer) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            name: ActiveValue::Set(value.name.clone()),
            phone: ActiveValue::Set(value.phone.clone()),
            credit_limit_minor: ActiveValue::Set(value.credit_limit.minor()),
            current_credit_minor: ActiveValue::Set(value.current_credit.minor()),
            total_orders: ActiveValue::Set(value.total_orders),
            total_spent_minor: ActiveValue::Set(value.total_spent.minor()),
        }
    }
}

impl TryFrom<Model> for Customer {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "customer")?,
            name: model.name,
            phone: model.phone,
            credit_limit: Money::new(model.credit_limit_minor),
            current_credit: Money::new(model.current_credit_minor),
            total_orders: model.total_orders,
            total_spent: Money::new(model.total_spent_minor),
        })
    }
}
