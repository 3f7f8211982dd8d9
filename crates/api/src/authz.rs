//! Route-level role guard.
//!
//! Services repeat the check for writes; this one keeps reads from leaking
//! across roles and turns refusals into 403 responses early.

use axum::{http::StatusCode, response::Response};

use setu_auth::{Caller, Role, require_role};

use crate::app::errors;

pub fn require(caller: &Caller, allowed: &[Role]) -> Result<(), Response> {
    require_role(caller, allowed).map_err(|e| {
        tracing::warn!(user_id = %caller.user_id, role = %caller.role, "route refused: {e}");
        errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string())
    })
}
