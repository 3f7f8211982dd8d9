//! Command execution pipeline.
//!
//! ```text
//! load documents (remember each version)
//!   ↓
//! handle + apply commands in memory (UnitOfWork collects events)
//!   ↓
//! stage puts/deletes conditioned on the remembered versions
//!   ↓
//! commit the change set atomically
//!   ↓
//! publish the collected events
//! ```
//!
//! An operation that touches several documents (an order and every product it
//! reserves) commits them in one change set, so either all of it lands or none
//! of it does. Events are published only after the commit succeeded.

use serde::Serialize;
use serde_json::Value as JsonValue;

use setu_agency::{Message, VerificationDocument};
use setu_auth::User;
use setu_catalog::Product;
use setu_core::{Aggregate, AggregateRoot, DomainError, ExpectedVersion};
use setu_events::{Event, EventBus, EventEnvelope};
use setu_orders::{Cart, Order, Wishlist};

use crate::error::ServiceError;
use crate::store::{Change, ChangeSet, MarketStore, Record, RecordKey};

/// An aggregate that lives as a document in the store.
pub trait StoredAggregate: Aggregate<Error = DomainError> + Into<Record> + Clone {
    const AGGREGATE_TYPE: &'static str;

    fn record_key(&self) -> RecordKey;
}

impl StoredAggregate for Product {
    const AGGREGATE_TYPE: &'static str = "catalog.product";

    fn record_key(&self) -> RecordKey {
        RecordKey::Product(self.id_typed())
    }
}

impl StoredAggregate for Order {
    const AGGREGATE_TYPE: &'static str = "orders.order";

    fn record_key(&self) -> RecordKey {
        RecordKey::Order(self.id_typed())
    }
}

impl StoredAggregate for Cart {
    const AGGREGATE_TYPE: &'static str = "orders.cart";

    fn record_key(&self) -> RecordKey {
        RecordKey::Cart(self.customer())
    }
}

impl StoredAggregate for Wishlist {
    const AGGREGATE_TYPE: &'static str = "orders.wishlist";

    fn record_key(&self) -> RecordKey {
        RecordKey::Wishlist(self.customer())
    }
}

impl StoredAggregate for User {
    const AGGREGATE_TYPE: &'static str = "auth.user";

    fn record_key(&self) -> RecordKey {
        RecordKey::User(self.id)
    }
}

impl StoredAggregate for VerificationDocument {
    const AGGREGATE_TYPE: &'static str = "agency.documents";

    fn record_key(&self) -> RecordKey {
        RecordKey::Document(self.id_typed())
    }
}

impl StoredAggregate for Message {
    const AGGREGATE_TYPE: &'static str = "agency.message";

    fn record_key(&self) -> RecordKey {
        RecordKey::Message(self.id_typed())
    }
}

/// A document together with the version it had when it was read.
#[derive(Debug, Clone)]
pub struct Tracked<A> {
    aggregate: A,
    loaded_version: u64,
}

impl<A: AggregateRoot> Tracked<A> {
    /// Wrap a document read from the store.
    pub fn loaded(aggregate: A) -> Self {
        let loaded_version = aggregate.version();
        Self {
            aggregate,
            loaded_version,
        }
    }

    /// Wrap a document that does not exist yet (commits only if still absent).
    pub fn fresh(aggregate: A) -> Self {
        Self {
            aggregate,
            loaded_version: 0,
        }
    }

    pub fn get(&self) -> &A {
        &self.aggregate
    }

    pub fn into_inner(self) -> A {
        self.aggregate
    }

    pub fn expected(&self) -> ExpectedVersion {
        ExpectedVersion::Exact(self.loaded_version)
    }

    pub fn is_dirty(&self) -> bool {
        self.aggregate.version() != self.loaded_version
    }
}

/// Everything one operation wants to write and announce.
#[derive(Debug, Default)]
pub struct UnitOfWork {
    changes: ChangeSet,
    envelopes: Vec<EventEnvelope<JsonValue>>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide and apply one command on a tracked document.
    ///
    /// Nothing is staged for writing yet; call [`UnitOfWork::put`] once the
    /// document has taken every command of the operation.
    pub fn execute<A>(
        &mut self,
        tracked: &mut Tracked<A>,
        command: &A::Command,
    ) -> Result<Vec<A::Event>, ServiceError>
    where
        A: StoredAggregate,
        A::Event: Event + Serialize,
    {
        let events = tracked.aggregate.handle(command)?;
        for event in &events {
            tracked.aggregate.apply(event);
            self.envelopes.push(EventEnvelope::from_event(
                tracked.aggregate.record_key().uuid(),
                A::AGGREGATE_TYPE,
                tracked.aggregate.version(),
                event,
            )?);
        }
        Ok(events)
    }

    /// Stage a conditional write of the document's current state.
    ///
    /// Untouched documents are skipped.
    pub fn put<A: StoredAggregate>(&mut self, tracked: &Tracked<A>) {
        if !tracked.is_dirty() {
            return;
        }
        self.changes.push(Change::Put {
            record: tracked.aggregate.clone().into(),
            expected: tracked.expected(),
        });
    }

    /// Stage a conditional delete of the document.
    pub fn delete<A: StoredAggregate>(&mut self, tracked: &Tracked<A>) {
        self.changes.push(Change::Delete {
            key: tracked.aggregate.record_key(),
            expected: tracked.expected(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn into_parts(self) -> (ChangeSet, Vec<EventEnvelope<JsonValue>>) {
        (self.changes, self.envelopes)
    }
}

/// Commits units of work and publishes their events.
#[derive(Debug)]
pub struct CommandDispatcher<S, B> {
    store: S,
    bus: B,
}

impl<S, B> CommandDispatcher<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self { store, bus }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn into_parts(self) -> (S, B) {
        (self.store, self.bus)
    }
}

impl<S, B> CommandDispatcher<S, B>
where
    S: MarketStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Commit atomically, then publish.
    ///
    /// A publish failure is reported after the data is already durable; the
    /// caller must not retry the whole operation.
    pub fn commit(&self, work: UnitOfWork) -> Result<Vec<EventEnvelope<JsonValue>>, ServiceError> {
        let (changes, envelopes) = work.into_parts();
        if changes.is_empty() {
            return Ok(vec![]);
        }

        self.store.commit(changes)?;

        for envelope in &envelopes {
            self.bus
                .publish(envelope.clone())
                .map_err(|e| ServiceError::Publish(format!("{e:?}")))?;
        }

        Ok(envelopes)
    }
}
