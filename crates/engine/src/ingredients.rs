//! The module contains `Ingredient` struct and its storage model.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Money, Quantity, ResultEngine,
    util::{parse_uuid, string_enum, too_large},
};

string_enum! {
    /// What a deduction does when it would take stock below zero.
    #[derive(Default)]
    pub enum StockPolicy("stock policy") {
        /// Fail with `InsufficientStock`; nothing is written.
        #[default]
        Reject => "reject",
        /// Floor at zero and keep the requested quantity on the movement row.
        Clamp => "clamp",
    }
}

impl StockPolicy {
    /// Stock after applying a signed delta to `previous`.
    pub fn settle(self, ingredient: &str, previous: Quantity, delta: Quantity) -> ResultEngine<Quantity> {
        let next = previous
            .checked_add(delta)
            .ok_or_else(|| too_large(&format!("{ingredient} stock")))?;
        if !next.is_negative() {
            return Ok(next);
        }
        match self {
            Self::Reject => Err(EngineError::InsufficientStock(format!(
                "{ingredient}: available {previous}, requested {}",
                -delta
            ))),
            Self::Clamp => Ok(Quantity::ZERO),
        }
    }
}

/// Replays one movement row: the floor at zero reproduces clamped rows.
#[must_use]
pub fn replay_step(stock: Quantity, quantity: Quantity) -> Quantity {
    let next = stock + quantity;
    if next.is_negative() { Quantity::ZERO } else { next }
}

/// A stocked ingredient.
///
/// `current_stock` is a denormalized value: it always equals the replay of
/// the ingredient's stock movements, and the stock ledger is the only writer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    /// Unit label (`kg`, `l`, `pcs`); quantities are milli-units of it.
    pub unit: String,
    pub current_stock: Quantity,
    pub reorder_level: Quantity,
    /// Cost of one whole unit.
    pub cost_per_unit: Money,
    pub created_at: DateTime<Utc>,
}

impl Ingredient {
    pub fn new(name: String, unit: String, reorder_level: Quantity, cost_per_unit: Money) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            unit,
            current_stock: Quantity::ZERO,
            reorder_level,
            cost_per_unit,
            created_at: Utc::now(),
        }
    }

    /// Returns `true` when stock is at or below the reorder level.
    #[must_use]
    pub fn needs_reorder(&self) -> bool {
        self.current_stock <= self.reorder_level
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "ingredients")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub unit: String,
    pub current_stock: i64,
    pub reorder_level: i64,
    pub cost_per_unit_minor: i64,
    /// Optimistic concurrency token, bumped on every stock write.
    pub version: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::stock_movements::Entity")]
    StockMovements,
}

impl Related<super::stock_movements::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockMovements.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Ingredient> for ActiveModel {
    fn from(value: &Ingredient) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            name: ActiveValue::Set(value.name.clone()),
            unit: ActiveValue::Set(value.unit.clone()),
            current_stock: ActiveValue::Set(value.current_stock.milli()),
            reorder_level: ActiveValue::Set(value.reorder_level.milli()),
            cost_per_unit_minor: ActiveValue::Set(value.cost_per_unit.minor()),
            version: ActiveValue::Set(0),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for Ingredient {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "ingredient")?,
            name: model.name,
            unit: model.unit,
            current_stock: Quantity::new(model.current_stock),
            reorder_level: Quantity::new(model.reorder_level),
            cost_per_unit: Money::new(model.cost_per_unit_minor),
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reorder_at_or_below_level() {
        let mut ingredient = Ingredient::new(
            "Flour".to_string(),
            "kg".to_string(),
            Quantity::units(5),
            Money::major(1),
        );
        ingredient.current_stock = Quantity::units(5);
        assert!(ingredient.needs_reorder());
        ingredient.current_stock = Quantity::new(5_001);
        assert!(!ingredient.needs_reorder());
    }

    #[test]
    fn reject_policy_refuses_negative_stock() {
        let err = StockPolicy::Reject
            .settle("Cheese", Quantity::units(10), -Quantity::units(15))
            .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientStock(_)));
    }

    #[test]
    fn clamp_policy_floors_at_zero() {
        let next = StockPolicy::Clamp
            .settle("Cheese", Quantity::units(10), -Quantity::units(15))
            .unwrap();
        assert_eq!(next, Quantity::ZERO);
        assert_eq!(replay_step(Quantity::units(10), -Quantity::units(15)), Quantity::ZERO);
    }

    #[test]
    fn receipt_past_the_quantity_range_is_rejected() {
        let err = StockPolicy::Reject
            .settle("Flour", Quantity::new(i64::MAX), Quantity::new(1))
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn policy_is_irrelevant_when_stock_suffices() {
        for policy in [StockPolicy::Reject, StockPolicy::Clamp] {
            let next = policy
                .settle("Flour", Quantity::units(10), -Quantity::units(4))
                .unwrap();
            assert_eq!(next, Quantity::units(6));
        }
        assert_eq!(StockPolicy::default(), StockPolicy::Reject);
    }
}
