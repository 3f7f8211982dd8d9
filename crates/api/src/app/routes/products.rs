use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};

use setu_auth::Role;
use setu_catalog::{ListingChanges, ListingDetails, ProductFilter};
use setu_core::ProductId;

use crate::app::{Market, dto, errors};
use crate::authz;
use crate::middleware::Authenticated;

pub fn router() -> Router {
    Router::new()
        .route("/", get(browse).post(list_product))
        .route("/mine", get(my_products))
        .route("/analytics", get(analytics))
        .route(
            "/:id",
            get(get_product).put(update_listing).delete(delete_listing),
        )
}

/// Public: approved listings only.
pub async fn browse(
    Extension(market): Extension<Arc<Market>>,
    Query(filter): Query<ProductFilter>,
) -> Response {
    errors::respond_items(market.catalog.browse(&filter))
}

pub async fn get_product(
    Extension(market): Extension<Arc<Market>>,
    Path(id): Path<String>,
) -> Result<Response, Response> {
    let id: ProductId = errors::parse_id(&id, "product")?;
    Ok(errors::respond(StatusCode::OK, market.catalog.get_product(id)))
}

pub async fn list_product(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
    Json(body): Json<ListingDetails>,
) -> Response {
    errors::respond(StatusCode::CREATED, market.catalog.list_product(&caller, body))
}

pub async fn analytics(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
) -> Result<Response, Response> {
    authz::require(&caller, &[Role::Agency])?;
    Ok(errors::respond(
        StatusCode::OK,
        market.dashboards.agency_analytics(caller.user_id),
    ))
}

pub async fn my_products(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
    Query(query): Query<dto::ProductStatusQuery>,
) -> Result<Response, Response> {
    authz::require(&caller, &[Role::Agency])?;
    Ok(errors::respond_items(
        market.catalog.agency_products(caller.user_id, query.status),
    ))
}

pub async fn update_listing(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
    Path(id): Path<String>,
    Json(body): Json<ListingChanges>,
) -> Result<Response, Response> {
    let id: ProductId = errors::parse_id(&id, "product")?;
    Ok(errors::respond(
        StatusCode::OK,
        market.catalog.update_listing(&caller, id, body),
    ))
}

pub async fn delete_listing(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
    Path(id): Path<String>,
) -> Result<Response, Response> {
    let id: ProductId = errors::parse_id(&id, "product")?;
    Ok(match market.catalog.delete_listing(&caller, id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    })
}
