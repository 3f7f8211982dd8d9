use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, post, put},
};

use setu_auth::Role;
use setu_core::ProductId;

use crate::app::{Market, dto, errors};
use crate::authz;
use crate::middleware::Authenticated;

pub fn router() -> Router {
    Router::new()
        .route("/", get(get_cart).post(add_item).delete(clear_cart))
        .route("/checkout", post(checkout))
        .route("/:product_id", put(update_item).delete(remove_item))
}

pub async fn get_cart(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
) -> Result<Response, Response> {
    authz::require(&caller, &[Role::Customer])?;
    Ok(errors::respond(StatusCode::OK, market.cart.get_cart(caller.user_id)))
}

pub async fn add_item(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
    Json(body): Json<dto::CartItemRequest>,
) -> Result<Response, Response> {
    let product: ProductId = errors::parse_id(&body.product_id, "product")?;
    Ok(errors::respond(
        StatusCode::OK,
        market.cart.add_to_cart(&caller, product, body.quantity),
    ))
}

pub async fn update_item(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
    Path(product_id): Path<String>,
    Json(body): Json<dto::CartQuantityRequest>,
) -> Result<Response, Response> {
    let product: ProductId = errors::parse_id(&product_id, "product")?;
    Ok(errors::respond(
        StatusCode::OK,
        market.cart.update_cart_item(&caller, product, body.quantity),
    ))
}

pub async fn remove_item(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
    Path(product_id): Path<String>,
) -> Result<Response, Response> {
    let product: ProductId = errors::parse_id(&product_id, "product")?;
    Ok(errors::respond(
        StatusCode::OK,
        market.cart.remove_from_cart(&caller, product),
    ))
}

pub async fn clear_cart(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
) -> Response {
    errors::respond(StatusCode::OK, market.cart.clear_cart(&caller))
}

pub async fn checkout(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
    Json(body): Json<dto::CheckoutRequest>,
) -> Response {
    errors::respond(
        StatusCode::CREATED,
        market
            .orders
            .checkout_cart(&caller, body.shipping_address, body.payment_method),
    )
}
