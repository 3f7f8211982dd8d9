use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
};

use setu_auth::Role;
use setu_core::MessageId;
use setu_infra::services::SendMessageRequest;

use crate::app::{Market, dto, errors};
use crate::authz;
use crate::middleware::Authenticated;

pub fn router() -> Router {
    Router::new()
        .route("/", post(send_message))
        .route("/customer", get(customer_messages))
        .route("/agency", get(agency_messages))
        .route("/unread-count", get(unread_count))
        .route("/:id/read", patch(mark_read))
        .route("/:id/reply", post(reply))
        .route("/:id", delete(delete_message))
}

pub async fn send_message(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
    Json(body): Json<SendMessageRequest>,
) -> Response {
    errors::respond(StatusCode::CREATED, market.agency.send_message(&caller, body))
}

pub async fn customer_messages(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
) -> Result<Response, Response> {
    authz::require(&caller, &[Role::Customer])?;
    Ok(errors::respond_items(market.agency.customer_messages(caller.user_id)))
}

pub async fn agency_messages(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
    Query(query): Query<dto::MessageStatusQuery>,
) -> Result<Response, Response> {
    authz::require(&caller, &[Role::Agency])?;
    Ok(errors::respond_items(
        market.agency.agency_messages(caller.user_id, query.status),
    ))
}

pub async fn unread_count(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
) -> Result<Response, Response> {
    authz::require(&caller, &[Role::Agency])?;
    Ok(match market.agency.unread_count(caller.user_id) {
        Ok(count) => Json(serde_json::json!({ "count": count })).into_response(),
        Err(e) => errors::service_error_to_response(e),
    })
}

pub async fn mark_read(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
    Path(id): Path<String>,
) -> Result<Response, Response> {
    let id: MessageId = errors::parse_id(&id, "message")?;
    Ok(errors::respond(StatusCode::OK, market.agency.mark_read(&caller, id)))
}

pub async fn reply(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
    Path(id): Path<String>,
    Json(body): Json<dto::ReplyRequest>,
) -> Result<Response, Response> {
    let id: MessageId = errors::parse_id(&id, "message")?;
    Ok(errors::respond(
        StatusCode::OK,
        market.agency.reply(&caller, id, &body.reply),
    ))
}

pub async fn delete_message(
    Extension(market): Extension<Arc<Market>>,
    Authenticated(caller): Authenticated,
    Path(id): Path<String>,
) -> Result<Response, Response> {
    let id: MessageId = errors::parse_id(&id, "message")?;
    Ok(match market.agency.delete_message(&caller, id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    })
}
