//! Orders domain module: the order lifecycle state machine, the cart and the
//! wishlist.
//!
//! Pure, deterministic domain logic (no IO, no HTTP, no storage). Inventory is
//! not touched here; the order engine in `setu-infra` pairs every order change
//! with the matching product commands and commits them together.

pub mod address;
pub mod cart;
pub mod number;
pub mod order;
pub mod pricing;
pub mod wishlist;

pub use address::ShippingAddress;
pub use cart::{
    AddToCart, Cart, CartCleared, CartCommand, CartEvent, CartItemAdded, CartItemQuantityChanged,
    CartItemRemoved, CartLine, ClearCart, RemoveFromCart, UpdateCartItem,
};
pub use number::OrderNumberGenerator;
pub use order::{
    AddTrackingUpdate, AdvanceStatus, CancelOrder, Order, OrderCancelled, OrderCommand, OrderEvent,
    OrderItem, OrderPlaced, OrderStatus, PaymentMethod, PaymentStatus, PlaceOrder, StatusChanged,
    TrackingAppended, TrackingUpdate,
};
pub use pricing::OrderTotals;
pub use wishlist::{
    AddToWishlist, RemoveFromWishlist, Wishlist, WishlistCommand, WishlistEvent, WishlistItemAdded,
    WishlistItemRemoved,
};
