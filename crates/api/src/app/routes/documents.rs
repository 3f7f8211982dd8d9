use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, post},
};

use setu_agency::DocumentFiles;
use setu_auth::Role;
use setu_core::DocumentId;

use crate::app::{Market, dto, errors};
use crate::authz;
use crate::middleware::Authenticated;

pub fn router() -> Router {
    Router::new()
        .route("/", get(all_documents).post(submit_documents))
        .route("/mine", get(my_documents))
        .route("/verification", get(verification_status))
        .route("/pending", get(pending_documents))
        .route("/:id/review", post(review_documents))
}

pub async fn submit_documents(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
    Json(body): Json<DocumentFiles>,
) -> Response {
    errors::respond(StatusCode::CREATED, market.agency.submit_documents(&caller, body))
}

/// `null` until the agency has submitted.
pub async fn my_documents(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
) -> Result<Response, Response> {
    authz::require(&caller, &[Role::Agency])?;
    Ok(errors::respond(StatusCode::OK, market.agency.my_documents(caller.user_id)))
}

pub async fn verification_status(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
) -> Result<Response, Response> {
    authz::require(&caller, &[Role::Agency])?;
    Ok(errors::respond(
        StatusCode::OK,
        market.agency.verification_status(caller.user_id),
    ))
}

pub async fn pending_documents(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
) -> Result<Response, Response> {
    authz::require(&caller, &[Role::Admin])?;
    Ok(errors::respond_items(market.agency.pending_documents()))
}

pub async fn all_documents(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
) -> Result<Response, Response> {
    authz::require(&caller, &[Role::Admin])?;
    Ok(errors::respond_items(market.agency.all_documents()))
}

pub async fn review_documents(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
    Path(id): Path<String>,
    Json(body): Json<dto::ReviewRequest>,
) -> Result<Response, Response> {
    let id: DocumentId = errors::parse_id(&id, "document")?;
    Ok(errors::respond(
        StatusCode::OK,
        market
            .agency
            .review_documents(&caller, id, &body.status, body.rejection_reason),
    ))
}
