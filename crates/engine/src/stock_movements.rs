//! Stock movements.
//!
//! A [`StockMovement`] is an immutable audit row written once per ingredient
//! per stock-affecting call. Rows are never updated or deleted; together they
//! reconstruct the ingredient's stock:
//! `new_stock == previous_stock + quantity` on every row, except for rows
//! written under the clamping stock policy, where `new_stock` is floored at
//! zero and `quantity` keeps the requested (larger) deduction.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Quantity, util::parse_uuid, util::string_enum};

string_enum! {
    pub enum MovementType("movement type") {
        /// Stock given when the ingredient was created.
        Opening => "opening",
        Purchase => "purchase",
        Sale => "sale",
        Adjustment => "adjustment",
        Waste => "waste",
    }
}

string_enum! {
    /// What caused a movement.
    pub enum ReferenceType("reference type") {
        Order => "order",
        Purchase => "purchase",
        Manual => "manual",
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: Uuid,
    /// Global insertion sequence; orders rows deterministically.
    pub seq: i64,
    pub ingredient_id: Uuid,
    pub movement_type: MovementType,
    pub quantity: Quantity,
    pub previous_stock: Quantity,
    pub new_stock: Quantity,
    pub reference_type: ReferenceType,
    pub reference_id: Option<String>,
    pub note: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    /// Returns `true` when the row was floored at zero by the clamping policy.
    #[must_use]
    pub fn is_clamped(&self) -> bool {
        self.previous_stock + self.quantity != self.new_stock
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "stock_movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub seq: i64,
    pub ingredient_id: String,
    pub movement_type: String,
    pub quantity: i64,
    pub previous_stock: i64,
    pub new_stock: i64,
    pub reference_type: String,
    pub reference_id: Option<String>,
    pub note: Option<String>,
    pub created_by: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::ingredients::Entity",
        from = "Column::IngredientId",
        to = "super::ingredients::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Ingredients,
}

impl Related<super::ingredients::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ingredients.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&StockMovement> for ActiveModel {
    fn from(value: &StockMovement) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            seq: ActiveValue::Set(value.seq),
            ingredient_id: ActiveValue::Set(value.ingredient_id.to_string()),
            movement_type: ActiveValue::Set(value.movement_type.as_str().to_string()),
            quantity: ActiveValue::Set(value.quantity.milli()),
            previous_stock: ActiveValue::Set(value.previous_stock.milli()),
            new_stock: ActiveValue::Set(value.new_stock.milli()),
            reference_type: ActiveValue::Set(value.reference_type.as_str().to_string()),
            reference_id: ActiveValue::Set(value.reference_id.clone()),
            note: ActiveValue::Set(value.note.clone()),
            created_by: ActiveValue::Set(value.created_by.clone()),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for StockMovement {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "stock movement")?,
            seq: model.seq,
            ingredient_id: parse_uuid(&model.ingredient_id, "ingredient")?,
            movement_type: MovementType::try_from(model.movement_type.as_str())?,
            quantity: Quantity::new(model.quantity),
            previous_stock: Quantity::new(model.previous_stock),
            new_stock: Quantity::new(model.new_stock),
            reference_type: ReferenceType::try_from(model.reference_type.as_str())?,
            reference_id: model.reference_id,
            note: model.note,
            created_by: model.created_by,
            created_at: model.created_at,
        })
    }
}
