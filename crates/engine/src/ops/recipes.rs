use uuid::Uuid;

use sea_orm::{DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*};

use crate::{IngredientUsage, RecipeLine, ResultEngine, recipes};

use super::{Engine, with_tx};

impl Engine {
    /// Ingredient consumption of `multiplier` units of a menu item.
    ///
    /// A menu item without a recipe resolves to an empty list.
    pub async fn resolve_recipe(
        &self,
        menu_item_id: Uuid,
        multiplier: i64,
    ) -> ResultEngine<Vec<IngredientUsage>> {
        with_tx!(self, |db_tx| {
            self.require_menu_item(&db_tx, menu_item_id).await?;
            let lines = self.recipe_lines(&db_tx, menu_item_id).await?;
            recipes::scale(&lines, multiplier)
        })
    }

    /// The stored recipe of a menu item.
    pub async fn recipe(&self, menu_item_id: Uuid) -> ResultEngine<Vec<RecipeLine>> {
        with_tx!(self, |db_tx| {
            self.require_menu_item(&db_tx, menu_item_id).await?;
            self.recipe_lines(&db_tx, menu_item_id).await
        })
    }

    pub(super) async fn recipe_lines(
        &self,
        db_tx: &DatabaseTransaction,
        menu_item_id: Uuid,
    ) -> ResultEngine<Vec<RecipeLine>> {
        let mut lines = recipes::Entity::find()
            .filter(recipes::Column::MenuItemId.eq(menu_item_id.to_string()))
            .all(db_tx)
            .await?
            .into_iter()
            .map(RecipeLine::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;
        // Stable deduction order across calls.
        lines.sort_by_key(|line| line.ingredient_id);
        Ok(lines)
    }
}
