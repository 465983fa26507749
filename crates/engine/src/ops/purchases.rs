use std::collections::HashSet;

use chrono::Utc;
use uuid::Uuid;

use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};

use crate::{
    CreatePurchaseCmd, EngineError, Money, MovementType, PointerKey, PostTransactionCmd,
    Purchase, PurchaseItem, PurchaseStatus, ReferenceType, ResultEngine, VoucherType,
    ingredients, purchases,
    util::too_large,
};

use super::{
    Engine, normalize_optional_text, normalize_required_name, require_actor,
    stock::MovementRequest, with_tx,
};

const PURCHASE_REFERENCE: &str = "purchase";

impl Engine {
    /// Records a supplier purchase as a draft. Stock is untouched until the
    /// purchase is received.
    pub async fn create_purchase(&self, cmd: CreatePurchaseCmd) -> ResultEngine<Purchase> {
        let actor = require_actor(&cmd.actor)?;
        let supplier_name = normalize_required_name(&cmd.supplier_name, "supplier")?;
        if cmd.lines.is_empty() {
            return Err(EngineError::Validation(
                "a purchase needs at least one line".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for line in &cmd.lines {
            if !line.quantity.is_positive() {
                return Err(EngineError::Validation(
                    "purchase quantity must be > 0".to_string(),
                ));
            }
            if line.unit_price.is_negative() {
                return Err(EngineError::Validation(
                    "unit price must be >= 0".to_string(),
                ));
            }
            if !seen.insert(line.ingredient_id) {
                return Err(EngineError::Validation(format!(
                    "ingredient {} listed twice",
                    line.ingredient_id
                )));
            }
        }

        with_tx!(self, |db_tx| {
            for line in &cmd.lines {
                ingredients::Entity::find_by_id(line.ingredient_id.to_string())
                    .one(&db_tx)
                    .await?
                    .ok_or_else(|| EngineError::KeyNotFound("ingredient not exists".to_string()))?;
            }

            let purchase_id = Uuid::new_v4();
            let items = cmd
                .lines
                .iter()
                .map(|line| {
                    PurchaseItem::new(purchase_id, line.ingredient_id, line.quantity, line.unit_price)
                })
                .collect::<ResultEngine<Vec<PurchaseItem>>>()?;
            let total = Money::checked_sum(items.iter().map(|item| item.total_price))
                .ok_or_else(|| too_large("purchase total"))?;
            let purchase = Purchase {
                id: purchase_id,
                supplier_id: normalize_optional_text(cmd.supplier_id.as_deref()),
                supplier_name: supplier_name.clone(),
                invoice_number: normalize_optional_text(cmd.invoice_number.as_deref()),
                purchase_date: cmd.purchase_date,
                total,
                status: PurchaseStatus::Draft,
                notes: normalize_optional_text(cmd.notes.as_deref()),
                created_by: actor.clone(),
                received_by: None,
                created_at: Utc::now(),
                received_at: None,
                items,
            };

            purchases::ActiveModel::from(&purchase)
                .insert(&db_tx)
                .await?;
            for item in &purchase.items {
                purchases::items::ActiveModel::from(item)
                    .insert(&db_tx)
                    .await?;
            }
            Ok(purchase)
        })
    }

    pub async fn purchase(&self, purchase_id: Uuid) -> ResultEngine<Purchase> {
        with_tx!(self, |db_tx| {
            self.require_purchase(&db_tx, purchase_id).await
        })
    }

    /// Receives a draft purchase: one stock movement per line, the line price
    /// becomes the ingredient's cost, and a purchase voucher is booked when
    /// posting accounts are set up.
    pub async fn receive_purchase(&self, purchase_id: Uuid, actor: &str) -> ResultEngine<Purchase> {
        let actor = require_actor(actor)?;
        with_tx!(self, |db_tx| {
            let mut purchase = self.require_purchase(&db_tx, purchase_id).await?;
            require_draft(&purchase)?;
            let now = Utc::now();
            self.transition_purchase(&db_tx, purchase_id, PurchaseStatus::Received, |active| {
                active.received_by = ActiveValue::Set(Some(actor.clone()));
                active.received_at = ActiveValue::Set(Some(now));
            })
            .await?;

            let reference = purchase_id.to_string();
            for item in &purchase.items {
                self.apply_movement(
                    &db_tx,
                    MovementRequest {
                        ingredient_id: item.ingredient_id,
                        movement_type: MovementType::Purchase,
                        delta: item.quantity,
                        reference_type: ReferenceType::Purchase,
                        reference_id: Some(reference.as_str()),
                        note: purchase.invoice_number.as_deref(),
                        actor: &actor,
                    },
                )
                .await?;
                ingredients::Entity::update_many()
                    .col_expr(
                        ingredients::Column::CostPerUnitMinor,
                        Expr::value(item.unit_price.minor()),
                    )
                    .filter(ingredients::Column::Id.eq(item.ingredient_id.to_string()))
                    .exec(&db_tx)
                    .await?;
            }

            self.post_purchase(&db_tx, &purchase, &actor).await?;

            purchase.status = PurchaseStatus::Received;
            purchase.received_by = Some(actor.clone());
            purchase.received_at = Some(now);
            tracing::info!(purchase = %purchase_id, total = %purchase.total, "purchase received");
            Ok(purchase)
        })
    }

    pub async fn cancel_purchase(&self, purchase_id: Uuid, actor: &str) -> ResultEngine<Purchase> {
        require_actor(actor)?;
        with_tx!(self, |db_tx| {
            let mut purchase = self.require_purchase(&db_tx, purchase_id).await?;
            require_draft(&purchase)?;
            self.transition_purchase(&db_tx, purchase_id, PurchaseStatus::Cancelled, |_| {})
                .await?;
            purchase.status = PurchaseStatus::Cancelled;
            Ok(purchase)
        })
    }

    /// Deletes a draft purchase with its lines.
    pub async fn delete_purchase(&self, purchase_id: Uuid, actor: &str) -> ResultEngine<()> {
        require_actor(actor)?;
        with_tx!(self, |db_tx| {
            let purchase = self.require_purchase(&db_tx, purchase_id).await?;
            require_draft(&purchase)?;
            purchases::items::Entity::delete_many()
                .filter(purchases::items::Column::PurchaseId.eq(purchase_id.to_string()))
                .exec(&db_tx)
                .await?;
            let result = purchases::Entity::delete_many()
                .filter(purchases::Column::Id.eq(purchase_id.to_string()))
                .filter(purchases::Column::Status.eq(PurchaseStatus::Draft.as_str()))
                .exec(&db_tx)
                .await?;
            if result.rows_affected != 1 {
                return Err(EngineError::WriteConflict(format!(
                    "purchase {purchase_id} changed concurrently"
                )));
            }
            Ok(())
        })
    }

    async fn require_purchase(
        &self,
        db_tx: &DatabaseTransaction,
        purchase_id: Uuid,
    ) -> ResultEngine<Purchase> {
        let model = purchases::Entity::find_by_id(purchase_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("purchase not exists".to_string()))?;
        let items = purchases::items::Entity::find()
            .filter(purchases::items::Column::PurchaseId.eq(purchase_id.to_string()))
            .order_by_asc(purchases::items::Column::Id)
            .all(db_tx)
            .await?;
        Purchase::try_from((model, items))
    }

    /// Moves a draft to `status`. The update only matches a draft row, so a
    /// concurrent receive or cancel loses with `StateConflict`.
    async fn transition_purchase(
        &self,
        db_tx: &DatabaseTransaction,
        purchase_id: Uuid,
        status: PurchaseStatus,
        stamp: impl FnOnce(&mut purchases::ActiveModel),
    ) -> ResultEngine<()> {
        let mut active = purchases::ActiveModel {
            status: ActiveValue::Set(status.as_str().to_string()),
            ..Default::default()
        };
        stamp(&mut active);
        let result = purchases::Entity::update_many()
            .set(active)
            .filter(purchases::Column::Id.eq(purchase_id.to_string()))
            .filter(purchases::Column::Status.eq(PurchaseStatus::Draft.as_str()))
            .exec(db_tx)
            .await?;
        if result.rows_affected != 1 {
            return Err(EngineError::StateConflict(format!(
                "purchase {purchase_id} is no longer a draft"
            )));
        }
        Ok(())
    }

    /// Books received stock: inventory against supplier payables.
    async fn post_purchase(
        &self,
        db_tx: &DatabaseTransaction,
        purchase: &Purchase,
        actor: &str,
    ) -> ResultEngine<()> {
        if purchase.total == Money::ZERO {
            return Ok(());
        }
        let Some(date) = self.posting_date(db_tx).await? else {
            return Ok(());
        };
        let (Some(inventory), Some(payable)) = (
            self.posting_account(db_tx, PointerKey::InventoryAccount)
                .await?,
            self.posting_account(db_tx, PointerKey::PayableAccount)
                .await?,
        ) else {
            tracing::debug!(purchase = %purchase.id, "posting accounts not set, purchase not posted");
            return Ok(());
        };

        let cmd = PostTransactionCmd::new(
            date,
            VoucherType::Purchase,
            format!("Purchase from {}", purchase.supplier_name),
            actor,
        )
        .reference(PURCHASE_REFERENCE, purchase.id.to_string())
        .debit(inventory.id, purchase.total)
        .credit(payable.id, purchase.total);
        self.post_in_tx(db_tx, &cmd, actor).await?;
        Ok(())
    }
}

fn require_draft(purchase: &Purchase) -> ResultEngine<()> {
    if purchase.status != PurchaseStatus::Draft {
        return Err(EngineError::StateConflict(format!(
            "purchase {} is {}",
            purchase.id, purchase.status
        )));
    }
    Ok(())
}
