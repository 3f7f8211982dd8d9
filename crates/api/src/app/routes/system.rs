use axum::{Json, http::StatusCode, response::IntoResponse};

use crate::middleware::Authenticated;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Authenticated(caller): Authenticated) -> impl IntoResponse {
    Json(serde_json::json!({
        "user_id": caller.user_id.to_string(),
        "role": caller.role.as_str(),
        "name": caller.name,
        "email": caller.email,
    }))
}
