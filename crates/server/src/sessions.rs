//! Cashier session API endpoints.

use api_types::session::{SessionClose, SessionOpen, SessionView};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{CashierSession, Money};
use uuid::Uuid;

use crate::{
    ServerError,
    server::{Actor, ServerState},
};

fn map_session(session: CashierSession) -> SessionView {
    let expected_cash = session
        .expected_cash
        .unwrap_or_else(|| session.expected_cash());
    SessionView {
        id: session.id,
        cashier_id: session.cashier_id,
        status: session.status.as_str().to_string(),
        opening_cash_minor: session.opening_cash.minor(),
        cash_sales_minor: session.cash_sales.minor(),
        card_sales_minor: session.card_sales.minor(),
        online_sales_minor: session.online_sales.minor(),
        credit_sales_minor: session.credit_sales.minor(),
        total_sales_minor: session.total_sales.minor(),
        order_count: session.order_count,
        expected_cash_minor: expected_cash.minor(),
        counted_cash_minor: session.counted_cash.map(Money::minor),
        cash_variance_minor: session.cash_variance.map(Money::minor),
        opened_at: session.opened_at,
        closed_at: session.closed_at,
    }
}

pub async fn open(
    Extension(Actor(actor)): Extension<Actor>,
    State(state): State<ServerState>,
    Json(payload): Json<SessionOpen>,
) -> Result<(StatusCode, Json<SessionView>), ServerError> {
    let session = state
        .engine
        .open_session(&actor, Money::new(payload.opening_cash_minor))
        .await?;

    Ok((StatusCode::CREATED, Json(map_session(session))))
}

pub async fn current(
    Extension(Actor(actor)): Extension<Actor>,
    State(state): State<ServerState>,
) -> Result<Json<SessionView>, ServerError> {
    let session = state
        .engine
        .current_session(&actor)
        .await?
        .ok_or_else(|| engine::EngineError::KeyNotFound("no open session".to_string()))?;

    Ok(Json(map_session(session)))
}

pub async fn summary(
    State(state): State<ServerState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, ServerError> {
    let summary = state.engine.session_summary(session_id).await?;

    Ok(Json(map_session(summary.session)))
}

pub async fn close(
    Extension(Actor(actor)): Extension<Actor>,
    State(state): State<ServerState>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<SessionClose>,
) -> Result<Json<SessionView>, ServerError> {
    let session = state
        .engine
        .close_session(
            session_id,
            Money::new(payload.counted_cash_minor),
            payload.notes.as_deref(),
            &actor,
        )
        .await?;

    Ok(Json(map_session(session)))
}
