use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use setu_agency::{Message, VerificationDocument};
use setu_auth::User;
use setu_catalog::Product;
use setu_core::{
    AggregateRoot, DocumentId, ExpectedVersion, MessageId, OrderId, ProductId, UserId,
};
use setu_orders::{Cart, Order, Wishlist};

/// A stored document of any collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Product(Product),
    Order(Order),
    Cart(Cart),
    Wishlist(Wishlist),
    User(User),
    Document(VerificationDocument),
    Message(Message),
}

/// Primary key of a stored document.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RecordKey {
    Product(ProductId),
    Order(OrderId),
    Cart(UserId),
    Wishlist(UserId),
    User(UserId),
    Document(DocumentId),
    Message(MessageId),
}

impl RecordKey {
    pub fn uuid(&self) -> Uuid {
        match *self {
            RecordKey::Product(id) => id.into(),
            RecordKey::Order(id) => id.into(),
            RecordKey::Cart(id) | RecordKey::Wishlist(id) | RecordKey::User(id) => id.into(),
            RecordKey::Document(id) => id.into(),
            RecordKey::Message(id) => id.into(),
        }
    }
}

impl Record {
    pub fn key(&self) -> RecordKey {
        match self {
            Record::Product(p) => RecordKey::Product(p.id_typed()),
            Record::Order(o) => RecordKey::Order(o.id_typed()),
            Record::Cart(c) => RecordKey::Cart(c.customer()),
            Record::Wishlist(w) => RecordKey::Wishlist(w.customer()),
            Record::User(u) => RecordKey::User(u.id),
            Record::Document(d) => RecordKey::Document(d.id_typed()),
            Record::Message(m) => RecordKey::Message(m.id_typed()),
        }
    }

    pub fn version(&self) -> u64 {
        match self {
            Record::Product(p) => p.version(),
            Record::Order(o) => o.version(),
            Record::Cart(c) => c.version(),
            Record::Wishlist(w) => w.version(),
            Record::User(u) => u.version(),
            Record::Document(d) => d.version(),
            Record::Message(m) => m.version(),
        }
    }
}

macro_rules! impl_into_record {
    ($($variant:ident => $t:ty),* $(,)?) => {
        $(
            impl From<$t> for Record {
                fn from(value: $t) -> Self {
                    Record::$variant(value)
                }
            }
        )*
    };
}

impl_into_record!(
    Product => Product,
    Order => Order,
    Cart => Cart,
    Wishlist => Wishlist,
    User => User,
    Document => VerificationDocument,
    Message => Message,
);

/// One conditional write.
///
/// `expected` is the version the writer read; `Exact(0)` means the document
/// must not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Put {
        record: Record,
        expected: ExpectedVersion,
    },
    Delete {
        key: RecordKey,
        expected: ExpectedVersion,
    },
}

impl Change {
    pub fn key(&self) -> RecordKey {
        match self {
            Change::Put { record, .. } => record.key(),
            Change::Delete { key, .. } => *key,
        }
    }

    pub fn expected(&self) -> ExpectedVersion {
        match self {
            Change::Put { expected, .. } | Change::Delete { expected, .. } => *expected,
        }
    }
}

/// Writes that commit together or not at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, change: Change) {
        self.changes.push(change);
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn into_changes(self) -> Vec<Change> {
        self.changes
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A document changed (or appeared) since it was read.
    #[error("optimistic concurrency check failed: {0}")]
    Conflict(String),

    /// A unique field (email, order number, agency bundle) is already taken.
    #[error("duplicate: {0}")]
    Duplicate(String),

    #[error("invalid change set: {0}")]
    InvalidChangeSet(String),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Document store for the marketplace collections.
///
/// Reads return owned snapshots. `commit` validates every change's expected
/// version and every uniqueness rule before writing anything, then applies the
/// whole set atomically.
///
/// Product view counters live beside the documents and are not versioned:
/// `record_view` never conflicts with a concurrent commit, and every product
/// read carries the current count.
pub trait MarketStore: Send + Sync {
    fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;
    fn find_products(&self, filter: &dyn Fn(&Product) -> bool) -> Result<Vec<Product>, StoreError>;

    /// Bump the view counter and return the new count, or `None` when the
    /// product does not exist.
    fn record_view(&self, id: ProductId) -> Result<Option<u64>, StoreError>;

    fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError>;
    fn find_orders(&self, filter: &dyn Fn(&Order) -> bool) -> Result<Vec<Order>, StoreError>;

    fn cart(&self, customer: UserId) -> Result<Option<Cart>, StoreError>;
    fn wishlist(&self, customer: UserId) -> Result<Option<Wishlist>, StoreError>;

    fn user(&self, id: UserId) -> Result<Option<User>, StoreError>;
    fn find_users(&self, filter: &dyn Fn(&User) -> bool) -> Result<Vec<User>, StoreError>;

    fn document(&self, id: DocumentId) -> Result<Option<VerificationDocument>, StoreError>;
    fn document_for_agency(&self, agency: UserId) -> Result<Option<VerificationDocument>, StoreError>;
    fn find_documents(
        &self,
        filter: &dyn Fn(&VerificationDocument) -> bool,
    ) -> Result<Vec<VerificationDocument>, StoreError>;

    fn message(&self, id: MessageId) -> Result<Option<Message>, StoreError>;
    fn find_messages(&self, filter: &dyn Fn(&Message) -> bool) -> Result<Vec<Message>, StoreError>;

    fn commit(&self, changes: ChangeSet) -> Result<(), StoreError>;
}

impl<S> MarketStore for Arc<S>
where
    S: MarketStore + ?Sized,
{
    fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        (**self).product(id)
    }

    fn find_products(&self, filter: &dyn Fn(&Product) -> bool) -> Result<Vec<Product>, StoreError> {
        (**self).find_products(filter)
    }

    fn record_view(&self, id: ProductId) -> Result<Option<u64>, StoreError> {
        (**self).record_view(id)
    }

    fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        (**self).order(id)
    }

    fn find_orders(&self, filter: &dyn Fn(&Order) -> bool) -> Result<Vec<Order>, StoreError> {
        (**self).find_orders(filter)
    }

    fn cart(&self, customer: UserId) -> Result<Option<Cart>, StoreError> {
        (**self).cart(customer)
    }

    fn wishlist(&self, customer: UserId) -> Result<Option<Wishlist>, StoreError> {
        (**self).wishlist(customer)
    }

    fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        (**self).user(id)
    }

    fn find_users(&self, filter: &dyn Fn(&User) -> bool) -> Result<Vec<User>, StoreError> {
        (**self).find_users(filter)
    }

    fn document(&self, id: DocumentId) -> Result<Option<VerificationDocument>, StoreError> {
        (**self).document(id)
    }

    fn document_for_agency(&self, agency: UserId) -> Result<Option<VerificationDocument>, StoreError> {
        (**self).document_for_agency(agency)
    }

    fn find_documents(
        &self,
        filter: &dyn Fn(&VerificationDocument) -> bool,
    ) -> Result<Vec<VerificationDocument>, StoreError> {
        (**self).find_documents(filter)
    }

    fn message(&self, id: MessageId) -> Result<Option<Message>, StoreError> {
        (**self).message(id)
    }

    fn find_messages(&self, filter: &dyn Fn(&Message) -> bool) -> Result<Vec<Message>, StoreError> {
        (**self).find_messages(filter)
    }

    fn commit(&self, changes: ChangeSet) -> Result<(), StoreError> {
        (**self).commit(changes)
    }
}
