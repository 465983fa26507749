//! Stock ledger API endpoints.

use api_types::{
    catalog::IngredientList,
    stock::{
        DriftView, MovementListQuery, MovementListResponse, MovementView, StockChange, StockCount,
        VerifyResponse,
    },
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{Quantity, StockCmd};
use uuid::Uuid;

use crate::{
    ServerError,
    catalog::map_ingredient,
    server::{Actor, ServerState},
};

fn map_movement(movement: engine::StockMovement) -> MovementView {
    MovementView {
        id: movement.id,
        seq: movement.seq,
        ingredient_id: movement.ingredient_id,
        movement_type: movement.movement_type.as_str().to_string(),
        quantity_milli: movement.quantity.milli(),
        previous_stock_milli: movement.previous_stock.milli(),
        new_stock_milli: movement.new_stock.milli(),
        reference_type: movement.reference_type.as_str().to_string(),
        reference_id: movement.reference_id,
        note: movement.note,
        created_by: movement.created_by,
        created_at: movement.created_at,
    }
}

fn stock_cmd(ingredient_id: Uuid, payload: StockChange, actor: String) -> StockCmd {
    let mut cmd = StockCmd::new(ingredient_id, Quantity::new(payload.quantity_milli), actor);
    cmd.note = payload.note;
    cmd
}

pub async fn receive(
    Extension(Actor(actor)): Extension<Actor>,
    State(state): State<ServerState>,
    Path(ingredient_id): Path<Uuid>,
    Json(payload): Json<StockChange>,
) -> Result<(StatusCode, Json<MovementView>), ServerError> {
    let movement = state
        .engine
        .receive(stock_cmd(ingredient_id, payload, actor))
        .await?;

    Ok((StatusCode::CREATED, Json(map_movement(movement))))
}

pub async fn deduct(
    Extension(Actor(actor)): Extension<Actor>,
    State(state): State<ServerState>,
    Path(ingredient_id): Path<Uuid>,
    Json(payload): Json<StockChange>,
) -> Result<(StatusCode, Json<MovementView>), ServerError> {
    let movement = state
        .engine
        .deduct(stock_cmd(ingredient_id, payload, actor))
        .await?;

    Ok((StatusCode::CREATED, Json(map_movement(movement))))
}

pub async fn waste(
    Extension(Actor(actor)): Extension<Actor>,
    State(state): State<ServerState>,
    Path(ingredient_id): Path<Uuid>,
    Json(payload): Json<StockChange>,
) -> Result<(StatusCode, Json<MovementView>), ServerError> {
    let movement = state
        .engine
        .record_waste(stock_cmd(ingredient_id, payload, actor))
        .await?;

    Ok((StatusCode::CREATED, Json(map_movement(movement))))
}

pub async fn adjust(
    Extension(Actor(actor)): Extension<Actor>,
    State(state): State<ServerState>,
    Path(ingredient_id): Path<Uuid>,
    Json(payload): Json<StockCount>,
) -> Result<(StatusCode, Json<MovementView>), ServerError> {
    let movement = state
        .engine
        .adjust_stock(
            ingredient_id,
            Quantity::new(payload.counted_milli),
            payload.note.as_deref(),
            &actor,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(map_movement(movement))))
}

pub async fn movements(
    State(state): State<ServerState>,
    Query(query): Query<MovementListQuery>,
) -> Result<Json<MovementListResponse>, ServerError> {
    let limit = query.limit.unwrap_or(50);
    let (movements, next_cursor) = state
        .engine
        .stock_movements(query.ingredient_id, limit, query.cursor.as_deref())
        .await?;

    Ok(Json(MovementListResponse {
        movements: movements.into_iter().map(map_movement).collect(),
        next_cursor,
    }))
}

pub async fn low_stock(
    State(state): State<ServerState>,
) -> Result<Json<IngredientList>, ServerError> {
    let ingredients = state
        .engine
        .low_stock_ingredients()
        .await?
        .into_iter()
        .map(map_ingredient)
        .collect();

    Ok(Json(IngredientList { ingredients }))
}

pub async fn verify(State(state): State<ServerState>) -> Result<Json<VerifyResponse>, ServerError> {
    let drifts: Vec<DriftView> = state
        .engine
        .verify_stock_ledger()
        .await?
        .into_iter()
        .map(|drift| DriftView {
            ingredient_id: drift.ingredient_id,
            name: drift.name,
            stored_milli: drift.stored.milli(),
            replayed_milli: drift.replayed.milli(),
            broken_rows: drift.broken_rows,
        })
        .collect();

    Ok(Json(VerifyResponse {
        consistent: drifts.is_empty(),
        drifts,
    }))
}
