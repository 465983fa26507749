use chrono::NaiveDate;
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, util::parse_uuid};

/// A bounded accounting period. Which year is current lives in the
/// current-pointer table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialYear {
    pub id: Uuid,
    pub name: String,
    pub start_date: NaiveDate,
    /// Inclusive.
    pub end_date: NaiveDate,
}

impl FinancialYear {
    pub fn new(name: String, start_date: NaiveDate, end_date: NaiveDate) -> ResultEngine<Self> {
        if end_date < start_date {
            return Err(EngineError::Validation(
                "financial year must end after it starts".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            start_date,
            end_date,
        })
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "financial_years")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub start_date: Date,
    pub end_date: Date,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&FinancialYear> for ActiveModel {
    fn from(value: &FinancialYear) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            name: ActiveValue::Set(value.name.clone()),
            start_date: ActiveValue::Set(value.start_date),
            end_date: ActiveValue::Set(value.end_date),
        }
    }
}

impl TryFrom<Model> for FinancialYear {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "financial year")?,
            name: model.name,
            start_date: model.start_date,
            end_date: model.end_date,
        })
    }
}
