use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{
    DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*,
    sea_query::Expr,
};

use crate::{
    EngineError, Ingredient, MovementType, Quantity, ReferenceType, ResultEngine, StockCmd,
    StockMovement, ingredients, ingredients::replay_step, sequences::STOCK_MOVEMENT_SCOPE,
    stock_movements,
};

use super::{
    Engine, decode_cursor, encode_cursor, normalize_optional_text, require_actor, with_tx,
};

/// One ingredient whose stored stock disagrees with its movement history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockDrift {
    pub ingredient_id: Uuid,
    pub name: String,
    pub stored: Quantity,
    pub replayed: Quantity,
    /// Sequence numbers of rows whose `previous_stock` does not continue the
    /// chain or whose `new_stock` does not follow from their quantity.
    pub broken_rows: Vec<i64>,
}

/// A stock change to apply inside an open transaction.
pub(super) struct MovementRequest<'a> {
    pub ingredient_id: Uuid,
    pub movement_type: MovementType,
    /// Signed change; negative values go through the stock policy.
    pub delta: Quantity,
    pub reference_type: ReferenceType,
    pub reference_id: Option<&'a str>,
    pub note: Option<&'a str>,
    pub actor: &'a str,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct MovementsCursor {
    seq: i64,
}

fn require_positive(quantity: Quantity) -> ResultEngine<()> {
    if !quantity.is_positive() {
        return Err(EngineError::Validation(
            "quantity must be > 0".to_string(),
        ));
    }
    Ok(())
}

impl Engine {
    /// Writes one stock change: a version-checked ingredient update plus one
    /// movement row. Returns the ingredient after the change.
    pub(super) async fn apply_movement(
        &self,
        db_tx: &DatabaseTransaction,
        request: MovementRequest<'_>,
    ) -> ResultEngine<(Ingredient, StockMovement)> {
        let model = ingredients::Entity::find_by_id(request.ingredient_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("ingredient not exists".to_string()))?;
        let version = model.version;
        let mut ingredient = Ingredient::try_from(model)?;

        let previous = ingredient.current_stock;
        let new_stock = self
            .stock_policy
            .settle(&ingredient.name, previous, request.delta)?;
        if previous.checked_add(request.delta) != Some(new_stock) {
            let requested = -request.delta;
            tracing::warn!(
                ingredient = %ingredient.id,
                name = %ingredient.name,
                %previous,
                %requested,
                "stock deduction clamped at zero"
            );
        }

        let result = ingredients::Entity::update_many()
            .col_expr(
                ingredients::Column::CurrentStock,
                Expr::value(new_stock.milli()),
            )
            .col_expr(ingredients::Column::Version, Expr::value(version + 1))
            .filter(ingredients::Column::Id.eq(ingredient.id.to_string()))
            .filter(ingredients::Column::Version.eq(version))
            .exec(db_tx)
            .await?;
        if result.rows_affected != 1 {
            return Err(EngineError::WriteConflict(format!(
                "ingredient {} changed concurrently",
                ingredient.id
            )));
        }

        let seq = self.next_sequence(db_tx, STOCK_MOVEMENT_SCOPE).await?;
        let movement = StockMovement {
            id: Uuid::new_v4(),
            seq,
            ingredient_id: ingredient.id,
            movement_type: request.movement_type,
            quantity: request.delta,
            previous_stock: previous,
            new_stock,
            reference_type: request.reference_type,
            reference_id: request.reference_id.map(ToString::to_string),
            note: normalize_optional_text(request.note),
            created_by: request.actor.to_string(),
            created_at: Utc::now(),
        };
        stock_movements::ActiveModel::from(&movement)
            .insert(db_tx)
            .await?;

        ingredient.current_stock = new_stock;
        Ok((ingredient, movement))
    }

    async fn stock_call(
        &self,
        cmd: &StockCmd,
        movement_type: MovementType,
        delta: Quantity,
    ) -> ResultEngine<StockMovement> {
        let actor = require_actor(&cmd.actor)?;
        with_tx!(self, |db_tx| {
            let (_, movement) = self
                .apply_movement(
                    &db_tx,
                    MovementRequest {
                        ingredient_id: cmd.ingredient_id,
                        movement_type,
                        delta,
                        reference_type: cmd.reference_type,
                        reference_id: cmd.reference_id.as_deref(),
                        note: cmd.note.as_deref(),
                        actor: &actor,
                    },
                )
                .await?;
            Ok(movement)
        })
    }

    /// Takes stock out for a sale.
    ///
    /// Under [`crate::StockPolicy::Reject`] a deduction larger than the stock
    /// fails with `InsufficientStock` and writes nothing.
    pub async fn deduct(&self, cmd: StockCmd) -> ResultEngine<StockMovement> {
        require_positive(cmd.quantity)?;
        self.stock_call(&cmd, MovementType::Sale, -cmd.quantity)
            .await
    }

    /// Adds stock. Receiving is unbounded.
    pub async fn receive(&self, cmd: StockCmd) -> ResultEngine<StockMovement> {
        require_positive(cmd.quantity)?;
        self.stock_call(&cmd, MovementType::Purchase, cmd.quantity)
            .await
    }

    /// Writes off spoiled or lost stock.
    pub async fn record_waste(&self, cmd: StockCmd) -> ResultEngine<StockMovement> {
        require_positive(cmd.quantity)?;
        self.stock_call(&cmd, MovementType::Waste, -cmd.quantity)
            .await
    }

    /// Records a physical count: the movement carries the difference between
    /// the counted and the stored stock.
    pub async fn adjust_stock(
        &self,
        ingredient_id: Uuid,
        counted: Quantity,
        note: Option<&str>,
        actor: &str,
    ) -> ResultEngine<StockMovement> {
        let actor = require_actor(actor)?;
        if counted.is_negative() {
            return Err(EngineError::Validation(
                "counted stock must be >= 0".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            let current = ingredients::Entity::find_by_id(ingredient_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("ingredient not exists".to_string()))?;
            let delta = counted - Quantity::new(current.current_stock);

            let (_, movement) = self
                .apply_movement(
                    &db_tx,
                    MovementRequest {
                        ingredient_id,
                        movement_type: MovementType::Adjustment,
                        delta,
                        reference_type: ReferenceType::Manual,
                        reference_id: None,
                        note,
                        actor: &actor,
                    },
                )
                .await?;
            Ok(movement)
        })
    }

    /// Lists stock movements, newest first, optionally for one ingredient.
    pub async fn stock_movements(
        &self,
        ingredient_id: Option<Uuid>,
        limit: u64,
        cursor: Option<&str>,
    ) -> ResultEngine<(Vec<StockMovement>, Option<String>)> {
        let cursor = cursor
            .map(|c| decode_cursor::<MovementsCursor>(c, "stock movements"))
            .transpose()?;
        with_tx!(self, |db_tx| {
            let mut query = stock_movements::Entity::find()
                .order_by_desc(stock_movements::Column::Seq)
                .limit(limit.saturating_add(1));
            if let Some(ingredient_id) = ingredient_id {
                query =
                    query.filter(stock_movements::Column::IngredientId.eq(ingredient_id.to_string()));
            }
            if let Some(cursor) = &cursor {
                query = query.filter(stock_movements::Column::Seq.lt(cursor.seq));
            }

            let rows = query.all(&db_tx).await?;
            let has_more = rows.len() > limit as usize;
            let movements = rows
                .into_iter()
                .take(limit as usize)
                .map(StockMovement::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;

            let next = match movements.last() {
                Some(last) if has_more => Some(encode_cursor(
                    &MovementsCursor { seq: last.seq },
                    "stock movements",
                )?),
                _ => None,
            };
            Ok((movements, next))
        })
    }

    /// Ingredients at or below their reorder level.
    pub async fn low_stock_ingredients(&self) -> ResultEngine<Vec<Ingredient>> {
        with_tx!(self, |db_tx| {
            let models = ingredients::Entity::find()
                .filter(
                    Expr::col(ingredients::Column::CurrentStock)
                        .lte(Expr::col(ingredients::Column::ReorderLevel)),
                )
                .order_by_asc(ingredients::Column::Name)
                .all(&db_tx)
                .await?;
            models
                .into_iter()
                .map(Ingredient::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    /// Replays every ingredient's movements from zero and reports the ones
    /// whose stored stock or movement chain disagrees with the replay.
    pub async fn verify_stock_ledger(&self) -> ResultEngine<Vec<StockDrift>> {
        with_tx!(self, |db_tx| {
            let ingredient_models = ingredients::Entity::find()
                .order_by_asc(ingredients::Column::Name)
                .all(&db_tx)
                .await?;
            let movement_models = stock_movements::Entity::find()
                .order_by_asc(stock_movements::Column::Seq)
                .all(&db_tx)
                .await?;

            let mut by_ingredient: HashMap<Uuid, Vec<StockMovement>> = HashMap::new();
            for model in movement_models {
                let movement = StockMovement::try_from(model)?;
                by_ingredient
                    .entry(movement.ingredient_id)
                    .or_default()
                    .push(movement);
            }

            let mut drifts = Vec::new();
            for model in ingredient_models {
                let ingredient = Ingredient::try_from(model)?;
                let mut replayed = Quantity::ZERO;
                let mut broken_rows = Vec::new();
                for movement in by_ingredient.get(&ingredient.id).into_iter().flatten() {
                    let next = replay_step(replayed, movement.quantity);
                    if movement.previous_stock != replayed || movement.new_stock != next {
                        broken_rows.push(movement.seq);
                    }
                    replayed = next;
                }

                if replayed != ingredient.current_stock || !broken_rows.is_empty() {
                    tracing::warn!(
                        ingredient = %ingredient.id,
                        stored = %ingredient.current_stock,
                        %replayed,
                        "stock ledger drift"
                    );
                    drifts.push(StockDrift {
                        ingredient_id: ingredient.id,
                        name: ingredient.name,
                        stored: ingredient.current_stock,
                        replayed,
                        broken_rows,
                    });
                }
            }
            Ok(drifts)
        })
    }
}
