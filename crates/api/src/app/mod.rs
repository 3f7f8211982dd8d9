//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request bodies and query strings
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use setu_infra::{EngineConfig, EventLog, InMemoryMarketplace, SharedBus};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;

/// What every handler receives as an extension.
///
/// Services are synchronous. The in-memory store and bus take `std` locks
/// only around map and channel operations and never across an `.await`, so
/// handlers call them directly on the runtime threads.
pub type Market = InMemoryMarketplace;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// Committed events go to the trace log for as long as the marketplace lives.
pub fn build_app(jwt_secret: String, engine: EngineConfig) -> Router {
    let (market, _store, bus) = setu_infra::in_memory_marketplace(engine);
    start_event_log(&bus);
    build_app_with(jwt_secret, Arc::new(market))
}

fn start_event_log(bus: &SharedBus) {
    match EventLog::spawn(&**bus) {
        Ok(handle) => handle.detach(),
        Err(err) => tracing::warn!(error = %err, "event log not started"),
    }
}

/// Same router over an existing marketplace.
pub fn build_app_with(jwt_secret: String, market: Arc<Market>) -> Router {
    let jwt = Arc::new(setu_auth::Hs256JwtValidator::new(jwt_secret.into_bytes()));
    let auth_state = middleware::AuthState { jwt };

    let api = routes::router()
        .layer(Extension(market))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(api)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
