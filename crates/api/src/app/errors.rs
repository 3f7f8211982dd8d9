use core::str::FromStr;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;

use setu_core::DomainError;
use setu_infra::{ServiceError, ServiceResult, StoreError};

pub fn service_error_to_response(err: ServiceError) -> Response {
    let status = match &err {
        ServiceError::Domain(e) => domain_status(e),
        ServiceError::Store(StoreError::Conflict(_) | StoreError::Duplicate(_)) => StatusCode::CONFLICT,
        ServiceError::Store(_) | ServiceError::Serialize(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ServiceError::Publish(_) => StatusCode::BAD_GATEWAY,
    };
    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    }
    json_error(status, err.code(), err.to_string())
}

fn domain_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
        DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::InvariantViolation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::InvalidRequest(_)
        | DomainError::InvalidAddress(_)
        | DomainError::Unavailable(_)
        | DomainError::InsufficientStock(_)
        | DomainError::InvalidStatus(_)
        | DomainError::InvalidTransition(_)
        | DomainError::InvalidId(_) => StatusCode::BAD_REQUEST,
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Parse a path id, answering 400 on garbage.
pub fn parse_id<T>(raw: &str, what: &str) -> Result<T, Response>
where
    T: FromStr,
{
    raw.parse()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what} id")))
}

/// Render a service result with `status` on success.
pub fn respond<T: Serialize>(status: StatusCode, result: ServiceResult<T>) -> Response {
    match result {
        Ok(body) => (status, axum::Json(body)).into_response(),
        Err(e) => service_error_to_response(e),
    }
}

/// Lists go out wrapped as `{"items": [...]}`.
pub fn respond_items<T: Serialize>(result: ServiceResult<Vec<T>>) -> Response {
    match result {
        Ok(items) => (StatusCode::OK, axum::Json(json!({ "items": items }))).into_response(),
        Err(e) => service_error_to_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicts_are_409_without_retry_hint() {
        let resp = service_error_to_response(DomainError::conflict("stale").into());
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let resp = service_error_to_response(StoreError::Duplicate("email".into()).into());
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn business_failures_are_client_errors() {
        for (err, status) in [
            (DomainError::not_found("order"), StatusCode::NOT_FOUND),
            (DomainError::forbidden("no"), StatusCode::FORBIDDEN),
            (DomainError::insufficient_stock("x"), StatusCode::BAD_REQUEST),
            (DomainError::invalid_transition("x"), StatusCode::BAD_REQUEST),
        ] {
            assert_eq!(service_error_to_response(err.into()).status(), status);
        }
        assert_eq!(
            service_error_to_response(ServiceError::Publish("bus down".into())).status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
