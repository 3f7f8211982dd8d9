use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, post, put},
};

use setu_auth::Role;
use setu_core::OrderId;
use setu_infra::services::PlaceOrderRequest;

use crate::app::{Market, dto, errors};
use crate::authz;
use crate::middleware::Authenticated;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_order))
        .route("/mine", get(my_orders))
        .route("/agency", get(agency_orders))
        .route("/agency/recent", get(recent_agency_orders))
        .route("/agency/stats", get(agency_stats))
        .route("/:id", get(get_order))
        .route("/:id/status", put(update_status))
        .route("/:id/tracking", post(add_tracking))
        .route("/:id/cancel", post(cancel_order))
}

pub async fn create_order(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
    Json(body): Json<PlaceOrderRequest>,
) -> Response {
    errors::respond(StatusCode::CREATED, market.orders.create_order(&caller, body))
}

pub async fn my_orders(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
) -> Result<Response, Response> {
    authz::require(&caller, &[Role::Customer])?;
    Ok(errors::respond_items(
        market.orders.list_orders_for_customer(caller.user_id),
    ))
}

pub async fn agency_orders(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
) -> Result<Response, Response> {
    authz::require(&caller, &[Role::Agency])?;
    Ok(errors::respond_items(
        market.orders.list_orders_for_agency(caller.user_id),
    ))
}

pub async fn recent_agency_orders(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
) -> Result<Response, Response> {
    authz::require(&caller, &[Role::Agency])?;
    Ok(errors::respond_items(
        market.orders.recent_orders_for_agency(caller.user_id),
    ))
}

pub async fn agency_stats(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
) -> Result<Response, Response> {
    authz::require(&caller, &[Role::Agency])?;
    Ok(errors::respond(
        StatusCode::OK,
        market.orders.agency_order_stats(caller.user_id),
    ))
}

pub async fn get_order(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
    Path(id): Path<String>,
) -> Result<Response, Response> {
    let id: OrderId = errors::parse_id(&id, "order")?;
    Ok(errors::respond(StatusCode::OK, market.orders.get_order(&caller, id)))
}

pub async fn update_status(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateStatusRequest>,
) -> Result<Response, Response> {
    let id: OrderId = errors::parse_id(&id, "order")?;
    Ok(errors::respond(
        StatusCode::OK,
        market.orders.update_order_status(&caller, id, &body.status),
    ))
}

pub async fn add_tracking(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
    Path(id): Path<String>,
    Json(body): Json<dto::TrackingRequest>,
) -> Result<Response, Response> {
    let id: OrderId = errors::parse_id(&id, "order")?;
    Ok(errors::respond(
        StatusCode::OK,
        market
            .orders
            .add_tracking_update(&caller, id, &body.status, &body.message),
    ))
}

/// The body is optional; an empty one cancels with the default reason.
pub async fn cancel_order(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
    Path(id): Path<String>,
    body: Option<Json<dto::CancelRequest>>,
) -> Result<Response, Response> {
    let id: OrderId = errors::parse_id(&id, "order")?;
    let reason = body.and_then(|Json(b)| b.reason);
    Ok(errors::respond(
        StatusCode::OK,
        market.orders.cancel_order(&caller, id, reason),
    ))
}
