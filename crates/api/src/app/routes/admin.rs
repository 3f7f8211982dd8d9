use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Response,
    routing::{get, post},
};

use setu_auth::Role;
use setu_core::{ProductId, UserId};

use crate::app::{Market, dto, errors};
use crate::authz;
use crate::middleware::Authenticated;

pub fn router() -> Router {
    Router::new()
        .route("/dashboard-stats", get(dashboard_stats))
        .route("/products", get(all_products))
        .route("/products/pending", get(pending_products))
        .route("/products/:id/approve", post(approve_product))
        .route("/products/:id/reject", post(reject_product))
        .route("/users", get(list_users).post(register_user))
        .route("/users/:id/suspend", post(suspend_user))
        .route("/users/:id/reactivate", post(reactivate_user))
}

pub async fn dashboard_stats(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
) -> Result<Response, Response> {
    authz::require(&caller, &[Role::Admin])?;
    Ok(errors::respond(StatusCode::OK, market.dashboards.admin_dashboard()))
}

pub async fn all_products(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
    Query(query): Query<dto::ProductStatusQuery>,
) -> Result<Response, Response> {
    authz::require(&caller, &[Role::Admin])?;
    Ok(errors::respond_items(market.catalog.all_products(query.status)))
}

pub async fn pending_products(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
) -> Result<Response, Response> {
    authz::require(&caller, &[Role::Admin])?;
    Ok(errors::respond_items(market.catalog.pending_products()))
}

pub async fn approve_product(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
    Path(id): Path<String>,
) -> Result<Response, Response> {
    let id: ProductId = errors::parse_id(&id, "product")?;
    Ok(errors::respond(
        StatusCode::OK,
        market.catalog.approve_product(&caller, id),
    ))
}

pub async fn reject_product(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
    Path(id): Path<String>,
    Json(body): Json<dto::RejectRequest>,
) -> Result<Response, Response> {
    let id: ProductId = errors::parse_id(&id, "product")?;
    Ok(errors::respond(
        StatusCode::OK,
        market.catalog.reject_product(&caller, id, &body.reason),
    ))
}

pub async fn list_users(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
    Query(query): Query<dto::RoleQuery>,
) -> Result<Response, Response> {
    authz::require(&caller, &[Role::Admin])?;
    Ok(errors::respond_items(market.users.list(query.role)))
}

/// Accounts are provisioned by the identity provider; admins mirror them here.
pub async fn register_user(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
    Json(body): Json<dto::RegisterUserRequest>,
) -> Result<Response, Response> {
    authz::require(&caller, &[Role::Admin])?;
    Ok(errors::respond(
        StatusCode::CREATED,
        market
            .users
            .register(&body.name, &body.email, &body.credential_hash, body.role),
    ))
}

pub async fn suspend_user(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
    Path(id): Path<String>,
) -> Result<Response, Response> {
    let id: UserId = errors::parse_id(&id, "user")?;
    Ok(errors::respond(StatusCode::OK, market.users.suspend(&caller, id)))
}

pub async fn reactivate_user(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
    Path(id): Path<String>,
) -> Result<Response, Response> {
    let id: UserId = errors::parse_id(&id, "user")?;
    Ok(errors::respond(
        StatusCode::OK,
        market.users.reactivate(&caller, id),
    ))
}
