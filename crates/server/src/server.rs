use axum::{
    Router,
    extract::Request,
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use axum_extra::{
    TypedHeader,
    headers::{Error as AxumError, Header},
};

use std::sync::Arc;

use crate::{catalog, ledger, orders, purchases, sessions, stock};
use engine::Engine;

static ACTOR_HEADER: axum::http::HeaderName = axum::http::HeaderName::from_static("x-actor-id");

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

/// `TypedHeader` for the acting user.
///
/// Every request must carry a non-empty "x-actor-id" entry in the header.
#[derive(Debug)]
struct ActorHeader(String);

impl Header for ActorHeader {
    fn name() -> &'static axum::http::HeaderName {
        &ACTOR_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, AxumError>
    where
        Self: Sized,
        I: Iterator<Item = &'i axum::http::HeaderValue>,
    {
        let value = values.next().ok_or_else(AxumError::invalid)?;
        let Ok(value) = value.to_str() else {
            return Err(AxumError::invalid());
        };
        let value = value.trim();
        if value.is_empty() {
            return Err(AxumError::invalid());
        }

        Ok(ActorHeader(value.to_string()))
    }

    fn encode<E: Extend<axum::http::HeaderValue>>(&self, values: &mut E) {
        match axum::http::HeaderValue::from_str(&self.0) {
            Ok(value) => values.extend(std::iter::once(value)),
            Err(_) => tracing::error!("failed to encode x-actor-id header"),
        }
    }
}

/// Actor id of the current request, set by the actor middleware.
#[derive(Clone, Debug)]
pub(crate) struct Actor(pub String);

async fn actor(
    actor_header: Option<TypedHeader<ActorHeader>>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(TypedHeader(ActorHeader(actor))) = actor_header else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    request.extensions_mut().insert(Actor(actor));
    Ok(next.run(request).await)
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route(
            "/ingredients",
            post(catalog::ingredient_new).get(catalog::ingredient_list),
        )
        .route("/ingredients/low", get(stock::low_stock))
        .route("/ingredients/{id}/receive", post(stock::receive))
        .route("/ingredients/{id}/deduct", post(stock::deduct))
        .route("/ingredients/{id}/waste", post(stock::waste))
        .route("/ingredients/{id}/adjust", post(stock::adjust))
        .route("/stock/movements", get(stock::movements))
        .route("/stock/verify", get(stock::verify))
        .route("/menuItems", post(catalog::menu_item_new))
        .route("/menuItems/{id}/availability", put(catalog::menu_item_availability))
        .route(
            "/menuItems/{id}/recipe",
            put(catalog::recipe_set).get(catalog::recipe_get),
        )
        .route("/discounts", post(catalog::discount_new))
        .route("/tables", post(catalog::table_new))
        .route("/customers", post(catalog::customer_new))
        .route("/customers/{id}", get(catalog::customer_get))
        .route("/customers/{id}/payments", post(catalog::credit_payment))
        .route("/orders", post(orders::order_new).get(orders::list))
        .route("/orders/{id}", get(orders::get))
        .route("/orders/{id}/items", post(orders::item_add))
        .route(
            "/orders/{id}/items/{item_id}",
            put(orders::item_quantity).delete(orders::item_remove),
        )
        .route(
            "/orders/{id}/discount",
            put(orders::discount_apply).delete(orders::discount_remove),
        )
        .route("/orders/{id}/status", put(orders::status_update))
        .route("/orders/{id}/cancel", post(orders::cancel))
        .route("/orders/{id}/kitchen", post(orders::send_to_kitchen))
        .route("/orders/{id}/payments", post(orders::payment_new))
        .route("/orders/{id}/complete", post(orders::complete))
        .route("/orders/{id}/pay", post(orders::payment_complete))
        .route("/purchases", post(purchases::purchase_new))
        .route(
            "/purchases/{id}",
            get(purchases::get).delete(purchases::remove),
        )
        .route("/purchases/{id}/receive", post(purchases::receive))
        .route("/purchases/{id}/cancel", post(purchases::cancel))
        .route("/sessions", post(sessions::open))
        .route("/sessions/current", get(sessions::current))
        .route("/sessions/{id}", get(sessions::summary))
        .route("/sessions/{id}/close", post(sessions::close))
        .route("/vouchers", post(ledger::voucher_new))
        .route("/accounts/{id}/ledger", get(ledger::account_ledger))
        .route("/reports/trialBalance", get(ledger::trial_balance))
        .route("/reports/profitAndLoss", get(ledger::profit_and_loss))
        .route("/reports/balanceSheet", get(ledger::balance_sheet))
        .route_layer(middleware::from_fn(actor))
        .with_state(state)
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
    };

    axum::serve(listener, router(state)).await
}
