use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{
    DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr,
};

use crate::{
    CashierSession, EngineError, Money, Payment, PaymentMethod, ResultEngine, SessionStatus,
    cashier_sessions, payments,
};

use super::{Engine, normalize_optional_text, require_actor, with_tx};

/// A session with the payments taken during it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session: CashierSession,
    pub payments: Vec<Payment>,
    /// Opening cash plus cash sales, at the time of the call.
    pub expected_cash: Money,
}

impl Engine {
    /// Opens a drawer session. A cashier can hold only one open session.
    pub async fn open_session(
        &self,
        cashier_id: &str,
        opening_cash: Money,
    ) -> ResultEngine<CashierSession> {
        let cashier_id = require_actor(cashier_id)?;
        if opening_cash.is_negative() {
            return Err(EngineError::Validation(
                "opening cash must be >= 0".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            if self.open_session_for(&db_tx, &cashier_id).await?.is_some() {
                return Err(EngineError::StateConflict(format!(
                    "cashier {cashier_id} already has an open session"
                )));
            }
            let session = CashierSession::open(cashier_id.clone(), opening_cash);
            cashier_sessions::ActiveModel::from(&session)
                .insert(&db_tx)
                .await?;
            tracing::info!(session = %session.id, cashier = %cashier_id, "session opened");
            Ok(session)
        })
    }

    /// Closes a session against the counted drawer. The variance is recorded
    /// whatever its size.
    pub async fn close_session(
        &self,
        session_id: Uuid,
        counted_cash: Money,
        notes: Option<&str>,
        actor: &str,
    ) -> ResultEngine<CashierSession> {
        let actor = require_actor(actor)?;
        if counted_cash.is_negative() {
            return Err(EngineError::Validation(
                "counted cash must be >= 0".to_string(),
            ));
        }
        let notes = normalize_optional_text(notes);
        with_tx!(self, |db_tx| {
            let mut session = self.require_session(&db_tx, session_id).await?;
            if session.status != SessionStatus::Open {
                return Err(EngineError::StateConflict(
                    "session already closed".to_string(),
                ));
            }
            session.close(counted_cash, notes.clone());

            let result = cashier_sessions::Entity::update_many()
                .set(cashier_sessions::ActiveModel::from(&session))
                .filter(cashier_sessions::Column::Id.eq(session_id.to_string()))
                .filter(cashier_sessions::Column::Status.eq(SessionStatus::Open.as_str()))
                .exec(&db_tx)
                .await?;
            if result.rows_affected != 1 {
                return Err(EngineError::WriteConflict(format!(
                    "session {session_id} changed concurrently"
                )));
            }
            if let Some(variance) = session.cash_variance.filter(|v| !v.is_zero()) {
                tracing::warn!(session = %session_id, %variance, closed_by = %actor, "cash variance");
            }
            Ok(session)
        })
    }

    /// The open session of a cashier, if any.
    pub async fn current_session(&self, cashier_id: &str) -> ResultEngine<Option<CashierSession>> {
        let cashier_id = require_actor(cashier_id)?;
        with_tx!(self, |db_tx| {
            self.open_session_for(&db_tx, &cashier_id).await
        })
    }

    pub async fn session_summary(&self, session_id: Uuid) -> ResultEngine<SessionSummary> {
        with_tx!(self, |db_tx| {
            let session = self.require_session(&db_tx, session_id).await?;
            let payments = payments::Entity::find()
                .filter(payments::Column::SessionId.eq(session_id.to_string()))
                .order_by_asc(payments::Column::CreatedAt)
                .order_by_asc(payments::Column::Id)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Payment::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            let expected_cash = session.expected_cash();
            Ok(SessionSummary {
                session,
                payments,
                expected_cash,
            })
        })
    }

    pub(super) async fn require_session(
        &self,
        db_tx: &DatabaseTransaction,
        session_id: Uuid,
    ) -> ResultEngine<CashierSession> {
        let model = cashier_sessions::Entity::find_by_id(session_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("session not exists".to_string()))?;
        CashierSession::try_from(model)
    }

    pub(super) async fn open_session_for(
        &self,
        db_tx: &DatabaseTransaction,
        cashier_id: &str,
    ) -> ResultEngine<Option<CashierSession>> {
        cashier_sessions::Entity::find()
            .filter(cashier_sessions::Column::CashierId.eq(cashier_id))
            .filter(cashier_sessions::Column::Status.eq(SessionStatus::Open.as_str()))
            .one(db_tx)
            .await?
            .map(CashierSession::try_from)
            .transpose()
    }

    /// The session a payment by `actor` is booked to: the actor's own open
    /// session, else the order's session while it is still open.
    pub(super) async fn payment_session(
        &self,
        db_tx: &DatabaseTransaction,
        actor: &str,
        order_session: Option<Uuid>,
    ) -> ResultEngine<Option<Uuid>> {
        if let Some(session) = self.open_session_for(db_tx, actor).await? {
            return Ok(Some(session.id));
        }
        let Some(session_id) = order_session else {
            return Ok(None);
        };
        let session = self.require_session(db_tx, session_id).await?;
        Ok((session.status == SessionStatus::Open).then_some(session.id))
    }

    /// Adds a payment to the session's per-method accumulators.
    pub(super) async fn accumulate_sale(
        &self,
        db_tx: &DatabaseTransaction,
        session_id: Uuid,
        method: PaymentMethod,
        amount: Money,
    ) -> ResultEngine<()> {
        let column = match method {
            PaymentMethod::Cash => cashier_sessions::Column::CashSalesMinor,
            PaymentMethod::Card => cashier_sessions::Column::CardSalesMinor,
            PaymentMethod::Online => cashier_sessions::Column::OnlineSalesMinor,
            PaymentMethod::Credit => cashier_sessions::Column::CreditSalesMinor,
        };
        let result = cashier_sessions::Entity::update_many()
            .col_expr(column, Expr::col(column).add(amount.minor()))
            .col_expr(
                cashier_sessions::Column::TotalSalesMinor,
                Expr::col(cashier_sessions::Column::TotalSalesMinor).add(amount.minor()),
            )
            .filter(cashier_sessions::Column::Id.eq(session_id.to_string()))
            .filter(cashier_sessions::Column::Status.eq(SessionStatus::Open.as_str()))
            .exec(db_tx)
            .await?;
        if result.rows_affected != 1 {
            return Err(EngineError::StateConflict(
                "session is not open".to_string(),
            ));
        }
        Ok(())
    }

    pub(super) async fn count_session_order(
        &self,
        db_tx: &DatabaseTransaction,
        session_id: Uuid,
    ) -> ResultEngine<()> {
        cashier_sessions::Entity::update_many()
            .col_expr(
                cashier_sessions::Column::OrderCount,
                Expr::col(cashier_sessions::Column::OrderCount).add(1),
            )
            .filter(cashier_sessions::Column::Id.eq(session_id.to_string()))
            .filter(cashier_sessions::Column::Status.eq(SessionStatus::Open.as_str()))
            .exec(db_tx)
            .await?;
        Ok(())
    }
}
