use axum::{Router, routing::get};

pub mod admin;
pub mod cart;
pub mod documents;
pub mod messages;
pub mod orders;
pub mod products;
pub mod system;
pub mod wishlist;

/// Router for everything but `/health`. Authentication is per handler.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/products", products::router())
        .nest("/orders", orders::router())
        .nest("/cart", cart::router())
        .nest("/wishlist", wishlist::router())
        .nest("/documents", documents::router())
        .nest("/messages", messages::router())
        .nest("/admin", admin::router())
}
