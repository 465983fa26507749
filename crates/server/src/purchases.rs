//! Purchase API endpoints.

use api_types::{
    Created, Success,
    purchase::{PurchaseLine, PurchaseNew, PurchaseView},
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{CreatePurchaseCmd, Money, Quantity};
use uuid::Uuid;

use crate::{
    ServerError,
    server::{Actor, ServerState},
};

fn map_purchase(purchase: engine::Purchase) -> PurchaseView {
    PurchaseView {
        id: purchase.id,
        supplier_name: purchase.supplier_name,
        invoice_number: purchase.invoice_number,
        purchase_date: purchase.purchase_date,
        status: purchase.status.as_str().to_string(),
        total_minor: purchase.total.minor(),
        lines: purchase
            .items
            .into_iter()
            .map(|item| PurchaseLine {
                ingredient_id: item.ingredient_id,
                quantity_milli: item.quantity.milli(),
                unit_price_minor: item.unit_price.minor(),
            })
            .collect(),
    }
}

pub async fn purchase_new(
    Extension(Actor(actor)): Extension<Actor>,
    State(state): State<ServerState>,
    Json(payload): Json<PurchaseNew>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let mut cmd = CreatePurchaseCmd::new(payload.supplier_name, payload.purchase_date, actor);
    cmd.supplier_id = payload.supplier_id;
    cmd.invoice_number = payload.invoice_number;
    cmd.notes = payload.notes;
    for line in payload.lines {
        cmd = cmd.line(
            line.ingredient_id,
            Quantity::new(line.quantity_milli),
            Money::new(line.unit_price_minor),
        );
    }
    let purchase = state.engine.create_purchase(cmd).await?;

    Ok((StatusCode::CREATED, Json(Created { id: purchase.id })))
}

pub async fn get(
    State(state): State<ServerState>,
    Path(purchase_id): Path<Uuid>,
) -> Result<Json<PurchaseView>, ServerError> {
    let purchase = state.engine.purchase(purchase_id).await?;

    Ok(Json(map_purchase(purchase)))
}

pub async fn receive(
    Extension(Actor(actor)): Extension<Actor>,
    State(state): State<ServerState>,
    Path(purchase_id): Path<Uuid>,
) -> Result<Json<PurchaseView>, ServerError> {
    let purchase = state.engine.receive_purchase(purchase_id, &actor).await?;

    Ok(Json(map_purchase(purchase)))
}

pub async fn cancel(
    Extension(Actor(actor)): Extension<Actor>,
    State(state): State<ServerState>,
    Path(purchase_id): Path<Uuid>,
) -> Result<Json<PurchaseView>, ServerError> {
    let purchase = state.engine.cancel_purchase(purchase_id, &actor).await?;

    Ok(Json(map_purchase(purchase)))
}

pub async fn remove(
    Extension(Actor(actor)): Extension<Actor>,
    State(state): State<ServerState>,
    Path(purchase_id): Path<Uuid>,
) -> Result<Json<Success>, ServerError> {
    state.engine.delete_purchase(purchase_id, &actor).await?;

    Ok(Json(Success::ok()))
}
