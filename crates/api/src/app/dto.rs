//! Request bodies and query strings that have no domain type of their own.

use serde::Deserialize;

use setu_agency::MessageStatus;
use setu_auth::Role;
use setu_catalog::ProductStatus;
use setu_orders::{PaymentMethod, ShippingAddress};

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct TrackingRequest {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CartItemRequest {
    pub product_id: String,
    #[serde(default = "one")]
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct WishlistItemRequest {
    pub product_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CartQuantityRequest {
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub shipping_address: ShippingAddress,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    /// `approved` or `rejected`.
    pub status: String,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    pub reply: String,
}

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    pub name: String,
    pub email: String,
    pub credential_hash: String,
    pub role: Role,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductStatusQuery {
    pub status: Option<ProductStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MessageStatusQuery {
    pub status: Option<MessageStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RoleQuery {
    pub role: Option<Role>,
}

fn one() -> u32 {
    1
}
