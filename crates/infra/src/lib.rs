//! Infrastructure layer: document store, command pipeline and the services
//! the HTTP layer calls.

pub mod command_dispatcher;
pub mod config;
pub mod error;
pub mod event_log;
pub mod services;
pub mod store;


use std::sync::Arc;

use serde_json::Value as JsonValue;

use setu_events::{EventEnvelope, InMemoryEventBus};

pub use config::{EngineConfig, InitialOrderStatus};
pub use error::{ServiceError, ServiceResult};
pub use event_log::{EventLog, EventLogHandle};
pub use services::Marketplace;
pub use store::{InMemoryMarketStore, MarketStore, StoreError};

pub type SharedBus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;

/// Every service over the in-memory store and bus.
pub type InMemoryMarketplace = Marketplace<Arc<InMemoryMarketStore>, SharedBus>;

/// Wire the in-memory store and bus into a ready marketplace.
///
/// The store and bus handles are returned too, for subscribers and tests.
pub fn in_memory_marketplace(
    config: EngineConfig,
) -> (InMemoryMarketplace, Arc<InMemoryMarketStore>, SharedBus) {
    let store = Arc::new(InMemoryMarketStore::new());
    let bus: SharedBus = Arc::new(InMemoryEventBus::new());
    let marketplace = Marketplace::new(store.clone(), bus.clone(), config);
    (marketplace, store, bus)
}
