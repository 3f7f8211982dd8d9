use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    response::Response,
    routing::{delete, get},
};

use setu_auth::Role;
use setu_core::ProductId;

use crate::app::{Market, dto, errors};
use crate::authz;
use crate::middleware::Authenticated;

pub fn router() -> Router {
    Router::new()
        .route("/", get(get_wishlist).post(add_item))
        .route("/:product_id", delete(remove_item))
}

pub async fn get_wishlist(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
) -> Result<Response, Response> {
    authz::require(&caller, &[Role::Customer])?;
    Ok(errors::respond_items(market.wishlist.get_wishlist(caller.user_id)))
}

pub async fn add_item(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
    Json(body): Json<dto::WishlistItemRequest>,
) -> Result<Response, Response> {
    let product: ProductId = errors::parse_id(&body.product_id, "product")?;
    Ok(errors::respond_items(
        market.wishlist.add_to_wishlist(&caller, product),
    ))
}

pub async fn remove_item(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
    Path(product_id): Path<String>,
) -> Result<Response, Response> {
    let product: ProductId = errors::parse_id(&product_id, "product")?;
    Ok(errors::respond_items(
        market.wishlist.remove_from_wishlist(&caller, product),
    ))
}
