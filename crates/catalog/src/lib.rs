//! Catalog domain module: agency listings and their inventory ledger.
//!
//! Pure domain logic (no IO, no HTTP, no storage). The `quantity`/`status` pair
//! on a product is only moved by `ReserveStock` and `RestoreStock`, which the
//! order engine issues.

pub mod filter;
pub mod product;

pub use filter::ProductFilter;
pub use product::{
    ApproveProduct, Category, Condition, DeleteListing, ListProduct, ListingChanges, ListingDeleted,
    ListingDetails, ListingUpdated, MAX_PRICE, Product, ProductApproved, ProductCommand,
    ProductEvent, ProductListed, ProductRejected, ProductRelisted, ProductSoldOut, ProductStatus,
    RejectProduct, ReserveStock, RestoreStock, StockReserved, StockRestored, UpdateListing,
};
