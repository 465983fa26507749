use chrono::Utc;
use uuid::Uuid;

use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter,
    prelude::*,
    sea_query::{Expr, OnConflict},
};

use crate::{
    EngineError, PointerKey, ResultEngine, current_pointers, sequences, util::parse_uuid,
};

use super::{Engine, map_unique_violation};

impl Engine {
    /// Hands out the next value of a counter scope, starting at 1.
    ///
    /// The bump is conditional on the value just read, so two writers can
    /// never receive the same number; the loser gets a `WriteConflict`.
    pub(super) async fn next_sequence(
        &self,
        db_tx: &DatabaseTransaction,
        scope: &str,
    ) -> ResultEngine<i64> {
        let current = sequences::Entity::find_by_id(scope.to_string())
            .one(db_tx)
            .await?;

        let Some(current) = current else {
            sequences::ActiveModel {
                scope: ActiveValue::Set(scope.to_string()),
                value: ActiveValue::Set(1),
            }
            .insert(db_tx)
            .await
            .map_err(|err| {
                map_unique_violation(err, || {
                    EngineError::WriteConflict(format!("sequence {scope}"))
                })
            })?;
            return Ok(1);
        };

        let next = current.value + 1;
        let result = sequences::Entity::update_many()
            .col_expr(sequences::Column::Value, Expr::value(next))
            .filter(sequences::Column::Scope.eq(scope))
            .filter(sequences::Column::Value.eq(current.value))
            .exec(db_tx)
            .await?;
        if result.rows_affected != 1 {
            return Err(EngineError::WriteConflict(format!("sequence {scope}")));
        }
        Ok(next)
    }

    pub(super) async fn pointer(
        &self,
        db_tx: &DatabaseTransaction,
        key: PointerKey,
    ) -> ResultEngine<Option<Uuid>> {
        current_pointers::Entity::find_by_id(key.as_str().to_string())
            .one(db_tx)
            .await?
            .map(|model| parse_uuid(&model.target_id, key.as_str()))
            .transpose()
    }

    /// Points `key` at `target`, replacing any previous value.
    pub(super) async fn set_pointer(
        &self,
        db_tx: &DatabaseTransaction,
        key: PointerKey,
        target: Uuid,
    ) -> ResultEngine<()> {
        let model = current_pointers::ActiveModel {
            key: ActiveValue::Set(key.as_str().to_string()),
            target_id: ActiveValue::Set(target.to_string()),
            updated_at: ActiveValue::Set(Utc::now()),
        };
        current_pointers::Entity::insert(model)
            .on_conflict(
                OnConflict::column(current_pointers::Column::Key)
                    .update_columns([
                        current_pointers::Column::TargetId,
                        current_pointers::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(db_tx)
            .await?;
        Ok(())
    }

    pub(super) async fn clear_pointer(
        &self,
        db_tx: &DatabaseTransaction,
        key: PointerKey,
    ) -> ResultEngine<()> {
        current_pointers::Entity::delete_by_id(key.as_str().to_string())
            .exec(db_tx)
            .await?;
        Ok(())
    }
}
