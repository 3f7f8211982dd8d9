//! Document store boundary.
//!
//! Each collection holds current-state documents (products, orders, carts,
//! users, verification bundles, messages) versioned by the number of events
//! applied to them. Writers submit a [`ChangeSet`] of conditional puts and
//! deletes; the store applies all of it or none of it.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryMarketStore;
pub use r#trait::{Change, ChangeSet, MarketStore, Record, RecordKey, StoreError};
