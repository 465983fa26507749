use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, money::BASIS_POINTS, util::parse_uuid};

/// A tax configuration. At most one is active at a time; which one is
/// recorded in the current-pointer table, not on the row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxSetting {
    pub id: Uuid,
    pub name: String,
    /// Tax rate in basis points (`1300` = 13%).
    pub rate: i64,
    /// Service charge rate in basis points, applied on the same base as tax.
    pub service_charge_rate: i64,
}

impl TaxSetting {
    pub fn new(name: String, rate: i64, service_charge_rate: i64) -> ResultEngine<Self> {
        for (label, value) in [("tax rate", rate), ("service charge rate", service_charge_rate)] {
            if !(0..=BASIS_POINTS).contains(&value) {
                return Err(EngineError::Validation(format!(
                    "{label} must be between 0 and {BASIS_POINTS} basis points"
                )));
            }
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            rate,
            service_charge_rate,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tax_settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub rate_bp: i64,
    pub service_charge_bp: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&TaxSetting> for ActiveModel {
    fn from(value: &TaxSetting) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            name: ActiveValue::Set(value.name.clone()),
            rate_bp: ActiveValue::Set(value.rate),
            service_charge_bp: ActiveValue::Set(value.service_charge_rate),
        }
    }
}

impl TryFrom<Model> for TaxSetting {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "tax setting")?,
            name: model.name,
            rate: model.rate_bp,
            service_charge_rate: model.service_charge_bp,
        })
    }
}
