//! Recipes.
//!
//! A recipe is the fixed list of ingredient quantities consumed by **one**
//! unit of a menu item. Resolving a recipe for an order line scales every
//! line by the ordered quantity; resolution has no side effects.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Quantity, ResultEngine,
    util::{parse_uuid, too_large},
};

/// One stored recipe line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeLine {
    pub ingredient_id: Uuid,
    /// Consumption per single unit of the menu item.
    pub quantity: Quantity,
}

/// Ingredient consumption resolved for a concrete multiplier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientUsage {
    pub ingredient_id: Uuid,
    pub quantity: Quantity,
}

/// Scales recipe lines by an order-line quantity.
pub fn scale(lines: &[RecipeLine], multiplier: i64) -> ResultEngine<Vec<IngredientUsage>> {
    if multiplier <= 0 {
        return Err(EngineError::Validation(
            "recipe multiplier must be > 0".to_string(),
        ));
    }
    lines
        .iter()
        .map(|line| {
            let quantity = line
                .quantity
                .checked_times(multiplier)
                .ok_or_else(|| too_large("recipe quantity"))?;
            Ok(IngredientUsage {
                ingredient_id: line.ingredient_id,
                quantity,
            })
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "recipe_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub menu_item_id: String,
    pub ingredient_id: String,
    pub quantity: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::menu_items::Entity",
        from = "Column::MenuItemId",
        to = "super::menu_items::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    MenuItems,
}

impl Related<super::menu_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MenuItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub(crate) fn for_menu_item(menu_item_id: Uuid, line: &RecipeLine) -> Self {
        Self {
            id: ActiveValue::Set(Uuid::new_v4().to_string()),
            menu_item_id: ActiveValue::Set(menu_item_id.to_string()),
            ingredient_id: ActiveValue::Set(line.ingredient_id.to_string()),
            quantity: ActiveValue::Set(line.quantity.milli()),
        }
    }
}

impl TryFrom<Model> for RecipeLine {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            ingredient_id: parse_uuid(&model.ingredient_id, "ingredient")?,
            quantity: Quantity::new(model.quantity),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_each_line_by_multiplier() {
        let flour = Uuid::new_v4();
        let cheese = Uuid::new_v4();
        let lines = vec![
            RecipeLine {
                ingredient_id: flour,
                quantity: Quantity::new(250),
            },
            RecipeLine {
                ingredient_id: cheese,
                quantity: Quantity::new(120),
            },
        ];

        let usage = scale(&lines, 3).unwrap();

        assert_eq!(usage.len(), 2);
        assert_eq!(usage[0].ingredient_id, flour);
        assert_eq!(usage[0].quantity, Quantity::new(750));
        assert_eq!(usage[1].quantity, Quantity::new(360));
    }

    #[test]
    fn rejects_non_positive_multiplier() {
        assert!(scale(&[], 0).is_err());
    }

    #[test]
    fn rejects_multiplier_that_overflows_a_line() {
        let lines = vec![RecipeLine {
            ingredient_id: Uuid::new_v4(),
            quantity: Quantity::new(250),
        }];
        let err = scale(&lines, i64::MAX / 100).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn empty_recipe_resolves_to_nothing() {
        assert!(scale(&[], 2).unwrap().is_empty());
    }
}
