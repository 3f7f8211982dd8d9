//! Domain events: the facts aggregates emit and the bus that fans them out.
//!
//! Events are published only after the state change they describe has been
//! committed to the store.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
