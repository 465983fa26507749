//! Orders API endpoints

use api_types::{
    PaymentMethod,
    order::{
        DiscountApply, ItemAdd, ItemQuantity, KitchenSent, OrderCancel, OrderCreated,
        OrderItemView, OrderListQuery, OrderListResponse, OrderNew, OrderStatus, OrderType,
        OrderView, PaymentComplete, PaymentNew, PaymentView, StatusUpdate,
    },
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::Money;
use uuid::Uuid;

use crate::{
    ServerError,
    server::{Actor, ServerState},
};

fn map_type(order_type: engine::OrderType) -> OrderType {
    match order_type {
        engine::OrderType::DineIn => OrderType::DineIn,
        engine::OrderType::Takeaway => OrderType::Takeaway,
        engine::OrderType::Delivery => OrderType::Delivery,
    }
}

fn map_type_in(order_type: OrderType) -> engine::OrderType {
    match order_type {
        OrderType::DineIn => engine::OrderType::DineIn,
        OrderType::Takeaway => engine::OrderType::Takeaway,
        OrderType::Delivery => engine::OrderType::Delivery,
    }
}

fn map_status(status: engine::OrderStatus) -> OrderStatus {
    match status {
        engine::OrderStatus::Pending => OrderStatus::Pending,
        engine::OrderStatus::Confirmed => OrderStatus::Confirmed,
        engine::OrderStatus::Preparing => OrderStatus::Preparing,
        engine::OrderStatus::Ready => OrderStatus::Ready,
        engine::OrderStatus::Served => OrderStatus::Served,
        engine::OrderStatus::Completed => OrderStatus::Completed,
        engine::OrderStatus::Cancelled => OrderStatus::Cancelled,
    }
}

fn map_status_in(status: OrderStatus) -> engine::OrderStatus {
    match status {
        OrderStatus::Pending => engine::OrderStatus::Pending,
        OrderStatus::Confirmed => engine::OrderStatus::Confirmed,
        OrderStatus::Preparing => engine::OrderStatus::Preparing,
        OrderStatus::Ready => engine::OrderStatus::Ready,
        OrderStatus::Served => engine::OrderStatus::Served,
        OrderStatus::Completed => engine::OrderStatus::Completed,
        OrderStatus::Cancelled => engine::OrderStatus::Cancelled,
    }
}

fn map_method(method: engine::PaymentMethod) -> PaymentMethod {
    match method {
        engine::PaymentMethod::Cash => PaymentMethod::Cash,
        engine::PaymentMethod::Card => PaymentMethod::Card,
        engine::PaymentMethod::Online => PaymentMethod::Online,
        engine::PaymentMethod::Credit => PaymentMethod::Credit,
    }
}

pub(crate) fn map_method_in(method: PaymentMethod) -> engine::PaymentMethod {
    match method {
        PaymentMethod::Cash => engine::PaymentMethod::Cash,
        PaymentMethod::Card => engine::PaymentMethod::Card,
        PaymentMethod::Online => engine::PaymentMethod::Online,
        PaymentMethod::Credit => engine::PaymentMethod::Credit,
    }
}

fn map_item(item: engine::OrderItem) -> OrderItemView {
    OrderItemView {
        id: item.id,
        menu_item_id: item.menu_item_id,
        name: item.item_name,
        quantity: item.quantity,
        unit_price_minor: item.unit_price.minor(),
        total_price_minor: item.total_price.minor(),
        notes: item.notes,
        status: item.status.as_str().to_string(),
        sent_to_kitchen: item.kot_printed,
    }
}

fn map_payment(payment: engine::Payment) -> PaymentView {
    PaymentView {
        id: payment.id,
        method: map_method(payment.method),
        amount_minor: payment.amount.minor(),
        tendered_minor: payment.tendered.minor(),
        change_minor: payment.change.minor(),
        session_id: payment.session_id,
        received_by: payment.received_by,
        created_at: payment.created_at,
    }
}

fn map_view(view: engine::OrderView) -> OrderView {
    let order = view.order;
    OrderView {
        id: order.id,
        order_number: order.order_number,
        order_type: map_type(order.order_type),
        status: map_status(order.status),
        payment_status: order.payment_status.as_str().to_string(),
        table_name: view.table_name,
        customer_name: view.customer_name,
        cashier_id: order.cashier_id,
        subtotal_minor: order.totals.subtotal.minor(),
        discount_minor: order.totals.discount_amount.minor(),
        tax_minor: order.totals.tax_amount.minor(),
        service_charge_minor: order.totals.service_charge.minor(),
        grand_total_minor: order.totals.grand_total.minor(),
        paid_minor: order.paid_amount.minor(),
        notes: order.notes,
        created_at: order.created_at,
        items: view.items.into_iter().map(map_item).collect(),
        payments: view.payments.into_iter().map(map_payment).collect(),
    }
}

async fn view_of(state: &ServerState, order_id: Uuid) -> Result<Json<OrderView>, ServerError> {
    let view = state.engine.order_view(order_id).await?;
    Ok(Json(map_view(view)))
}

pub async fn order_new(
    Extension(Actor(actor)): Extension<Actor>,
    State(state): State<ServerState>,
    Json(payload): Json<OrderNew>,
) -> Result<(StatusCode, Json<OrderCreated>), ServerError> {
    let cmd = engine::CreateOrderCmd {
        order_type: map_type_in(payload.order_type),
        table_id: payload.table_id,
        customer_id: payload.customer_id,
        waiter_id: payload.waiter_id,
        notes: payload.notes,
        actor,
    };
    let order = state.engine.create_order(cmd).await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderCreated {
            id: order.id,
            order_number: order.order_number,
        }),
    ))
}

pub async fn get(
    State(state): State<ServerState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderView>, ServerError> {
    view_of(&state, order_id).await
}

pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<OrderListResponse>, ServerError> {
    let filter = engine::OrderListFilter {
        status: query.status.map(map_status_in),
        session_id: query.session_id,
    };
    let limit = query.limit.unwrap_or(50);
    let (orders, next_cursor) = state
        .engine
        .list_orders(filter, limit, query.cursor.as_deref())
        .await?;

    Ok(Json(OrderListResponse {
        orders: orders.into_iter().map(map_view).collect(),
        next_cursor,
    }))
}

pub async fn item_add(
    Extension(Actor(actor)): Extension<Actor>,
    State(state): State<ServerState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<ItemAdd>,
) -> Result<(StatusCode, Json<OrderView>), ServerError> {
    let mut cmd = engine::AddItemCmd::new(order_id, payload.menu_item_id, payload.quantity, actor);
    cmd.notes = payload.notes;
    state.engine.add_item(cmd).await?;

    let view = view_of(&state, order_id).await?;
    Ok((StatusCode::CREATED, view))
}

pub async fn item_quantity(
    Extension(Actor(actor)): Extension<Actor>,
    State(state): State<ServerState>,
    Path((order_id, item_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ItemQuantity>,
) -> Result<Json<OrderView>, ServerError> {
    state
        .engine
        .update_item_quantity(order_id, item_id, payload.quantity, &actor)
        .await?;

    view_of(&state, order_id).await
}

pub async fn item_remove(
    Extension(Actor(actor)): Extension<Actor>,
    State(state): State<ServerState>,
    Path((order_id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<OrderView>, ServerError> {
    state.engine.remove_item(order_id, item_id, &actor).await?;

    view_of(&state, order_id).await
}

pub async fn discount_apply(
    Extension(Actor(actor)): Extension<Actor>,
    State(state): State<ServerState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<DiscountApply>,
) -> Result<Json<OrderView>, ServerError> {
    state
        .engine
        .apply_discount(
            order_id,
            payload.discount_id,
            payload.manual_amount_minor.map(Money::new),
            &actor,
        )
        .await?;

    view_of(&state, order_id).await
}

pub async fn discount_remove(
    Extension(Actor(actor)): Extension<Actor>,
    State(state): State<ServerState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderView>, ServerError> {
    state.engine.remove_discount(order_id, &actor).await?;

    view_of(&state, order_id).await
}

pub async fn status_update(
    Extension(Actor(actor)): Extension<Actor>,
    State(state): State<ServerState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<StatusUpdate>,
) -> Result<Json<OrderView>, ServerError> {
    state
        .engine
        .update_status(order_id, map_status_in(payload.status), &actor)
        .await?;

    view_of(&state, order_id).await
}

pub async fn cancel(
    Extension(Actor(actor)): Extension<Actor>,
    State(state): State<ServerState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<OrderCancel>,
) -> Result<Json<OrderView>, ServerError> {
    state
        .engine
        .cancel_order(order_id, payload.reason.as_deref(), &actor)
        .await?;

    view_of(&state, order_id).await
}

pub async fn send_to_kitchen(
    Extension(Actor(actor)): Extension<Actor>,
    State(state): State<ServerState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<KitchenSent>, ServerError> {
    let items_sent = state.engine.send_to_kitchen(order_id, &actor).await?;

    Ok(Json(KitchenSent { items_sent }))
}

pub async fn payment_new(
    Extension(Actor(actor)): Extension<Actor>,
    State(state): State<ServerState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<PaymentNew>,
) -> Result<(StatusCode, Json<PaymentView>), ServerError> {
    let mut cmd = engine::PaymentCmd::new(order_id, map_method_in(payload.method), actor)
        .amount(Money::new(payload.amount_minor));
    cmd.tendered = payload.tendered_minor.map(Money::new);
    let payment = state.engine.add_payment(cmd).await?;

    Ok((StatusCode::CREATED, Json(map_payment(payment))))
}

pub async fn payment_complete(
    Extension(Actor(actor)): Extension<Actor>,
    State(state): State<ServerState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<PaymentComplete>,
) -> Result<Json<OrderView>, ServerError> {
    let mut cmd = engine::PaymentCmd::new(order_id, map_method_in(payload.method), actor);
    cmd.tendered = payload.tendered_minor.map(Money::new);
    state.engine.complete_payment(cmd).await?;

    view_of(&state, order_id).await
}

pub async fn complete(
    Extension(Actor(actor)): Extension<Actor>,
    State(state): State<ServerState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderView>, ServerError> {
    state.engine.complete_order(order_id, &actor).await?;

    view_of(&state, order_id).await
}
