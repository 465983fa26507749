//! Catalog API endpoints: ingredients, menu, recipes, discounts, tables and
//! customers.

use api_types::{
    Created, Success,
    catalog::{
        CreditPayment, CustomerNew, CustomerView, DiscountKind, DiscountNew, IngredientList,
        IngredientNew, IngredientView, MenuItemAvailability, MenuItemNew, Recipe, RecipeLine,
        TableNew,
    },
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{Money, Quantity};
use uuid::Uuid;

use crate::{
    ServerError,
    orders::map_method_in,
    server::{Actor, ServerState},
};

pub(crate) fn map_ingredient(ingredient: engine::Ingredient) -> IngredientView {
    IngredientView {
        id: ingredient.id,
        name: ingredient.name,
        unit: ingredient.unit,
        current_stock_milli: ingredient.current_stock.milli(),
        reorder_level_milli: ingredient.reorder_level.milli(),
        cost_per_unit_minor: ingredient.cost_per_unit.minor(),
    }
}

fn map_customer(customer: engine::Customer) -> CustomerView {
    CustomerView {
        id: customer.id,
        name: customer.name,
        phone: customer.phone,
        credit_limit_minor: customer.credit_limit.minor(),
        current_credit_minor: customer.current_credit.minor(),
        total_orders: customer.total_orders,
        total_spent_minor: customer.total_spent.minor(),
    }
}

pub async fn ingredient_new(
    Extension(Actor(actor)): Extension<Actor>,
    State(state): State<ServerState>,
    Json(payload): Json<IngredientNew>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let cmd = engine::NewIngredientCmd::new(payload.name, payload.unit, actor)
        .opening_stock(Quantity::new(payload.opening_stock_milli))
        .reorder_level(Quantity::new(payload.reorder_level_milli))
        .cost_per_unit(Money::new(payload.cost_per_unit_minor));
    let ingredient = state.engine.create_ingredient(cmd).await?;

    Ok((StatusCode::CREATED, Json(Created { id: ingredient.id })))
}

pub async fn ingredient_list(
    State(state): State<ServerState>,
) -> Result<Json<IngredientList>, ServerError> {
    let ingredients = state
        .engine
        .ingredients()
        .await?
        .into_iter()
        .map(map_ingredient)
        .collect();

    Ok(Json(IngredientList { ingredients }))
}

pub async fn menu_item_new(
    State(state): State<ServerState>,
    Json(payload): Json<MenuItemNew>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let item = state
        .engine
        .create_menu_item(&payload.name, Money::new(payload.price_minor))
        .await?;

    Ok((StatusCode::CREATED, Json(Created { id: item.id })))
}

pub async fn menu_item_availability(
    State(state): State<ServerState>,
    Path(menu_item_id): Path<Uuid>,
    Json(payload): Json<MenuItemAvailability>,
) -> Result<Json<Success>, ServerError> {
    state
        .engine
        .set_menu_item_available(menu_item_id, payload.available)
        .await?;

    Ok(Json(Success::ok()))
}

pub async fn recipe_set(
    State(state): State<ServerState>,
    Path(menu_item_id): Path<Uuid>,
    Json(payload): Json<Recipe>,
) -> Result<Json<Success>, ServerError> {
    let lines = payload
        .lines
        .into_iter()
        .map(|line| engine::RecipeLine {
            ingredient_id: line.ingredient_id,
            quantity: Quantity::new(line.quantity_milli),
        })
        .collect();
    state.engine.set_recipe(menu_item_id, lines).await?;

    Ok(Json(Success::ok()))
}

pub async fn recipe_get(
    State(state): State<ServerState>,
    Path(menu_item_id): Path<Uuid>,
) -> Result<Json<Recipe>, ServerError> {
    let lines = state
        .engine
        .recipe(menu_item_id)
        .await?
        .into_iter()
        .map(|line| RecipeLine {
            ingredient_id: line.ingredient_id,
            quantity_milli: line.quantity.milli(),
        })
        .collect();

    Ok(Json(Recipe { lines }))
}

pub async fn discount_new(
    State(state): State<ServerState>,
    Json(payload): Json<DiscountNew>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let kind = match payload.kind {
        DiscountKind::Percentage => engine::DiscountKind::Percentage,
        DiscountKind::Flat => engine::DiscountKind::Flat,
    };
    let discount = state
        .engine
        .create_discount(
            &payload.name,
            kind,
            payload.value,
            payload.max_discount_minor.map(Money::new),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(Created { id: discount.id })))
}

pub async fn table_new(
    State(state): State<ServerState>,
    Json(payload): Json<TableNew>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let table = state.engine.create_table(&payload.name).await?;

    Ok((StatusCode::CREATED, Json(Created { id: table.id })))
}

pub async fn customer_new(
    State(state): State<ServerState>,
    Json(payload): Json<CustomerNew>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let customer = state
        .engine
        .create_customer(
            &payload.name,
            payload.phone.as_deref(),
            Money::new(payload.credit_limit_minor),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(Created { id: customer.id })))
}

pub async fn customer_get(
    State(state): State<ServerState>,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<CustomerView>, ServerError> {
    let customer = state.engine.customer(customer_id).await?;

    Ok(Json(map_customer(customer)))
}

pub async fn credit_payment(
    Extension(Actor(actor)): Extension<Actor>,
    State(state): State<ServerState>,
    Path(customer_id): Path<Uuid>,
    Json(payload): Json<CreditPayment>,
) -> Result<Json<CustomerView>, ServerError> {
    let customer = state
        .engine
        .record_credit_payment(
            customer_id,
            Money::new(payload.amount_minor),
            map_method_in(payload.method),
            &actor,
        )
        .await?;

    Ok(Json(map_customer(customer)))
}
