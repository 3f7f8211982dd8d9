use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use setu_agency::{Message, VerificationDocument};
use setu_auth::User;
use setu_catalog::Product;
use setu_core::{AggregateRoot, DocumentId, MessageId, OrderId, ProductId, UserId};
use setu_orders::{Cart, Order, Wishlist};

use super::r#trait::{Change, ChangeSet, MarketStore, Record, RecordKey, StoreError};

#[derive(Debug, Default)]
struct Collections {
    products: HashMap<ProductId, Product>,
    views: HashMap<ProductId, u64>,
    orders: HashMap<OrderId, Order>,
    carts: HashMap<UserId, Cart>,
    wishlists: HashMap<UserId, Wishlist>,
    users: HashMap<UserId, User>,
    documents: HashMap<DocumentId, VerificationDocument>,
    messages: HashMap<MessageId, Message>,
}

impl Collections {
    fn stamped(&self, product: &Product) -> Product {
        let views = self.views.get(&product.id_typed()).copied().unwrap_or(0);
        product.clone().with_views(views)
    }

    fn version_of(&self, key: RecordKey) -> u64 {
        match key {
            RecordKey::Product(id) => self.products.get(&id).map_or(0, |d| d.version()),
            RecordKey::Order(id) => self.orders.get(&id).map_or(0, |d| d.version()),
            RecordKey::Cart(id) => self.carts.get(&id).map_or(0, |d| d.version()),
            RecordKey::Wishlist(id) => self.wishlists.get(&id).map_or(0, |d| d.version()),
            RecordKey::User(id) => self.users.get(&id).map_or(0, |d| d.version()),
            RecordKey::Document(id) => self.documents.get(&id).map_or(0, |d| d.version()),
            RecordKey::Message(id) => self.messages.get(&id).map_or(0, |d| d.version()),
        }
    }

    /// Reject a put whose unique field is held by a different document.
    fn check_unique(&self, record: &Record) -> Result<(), StoreError> {
        let clash = match record {
            Record::Order(order) => self.orders.values().any(|o| {
                o.id_typed() != order.id_typed() && o.order_number() == order.order_number()
            }),
            Record::User(user) => self
                .users
                .values()
                .any(|u| u.id != user.id && u.email == user.email),
            Record::Document(doc) => self
                .documents
                .values()
                .any(|d| d.id_typed() != doc.id_typed() && d.agency() == doc.agency()),
            Record::Product(_) | Record::Cart(_) | Record::Wishlist(_) | Record::Message(_) => false,
        };

        match unique_field(record) {
            Some((field, value)) if clash => {
                Err(StoreError::Duplicate(format!("{field} '{value}' is already taken")))
            }
            _ => Ok(()),
        }
    }

    fn put(&mut self, record: Record) {
        match record {
            Record::Product(d) => {
                self.products.insert(d.id_typed(), d);
            }
            Record::Order(d) => {
                self.orders.insert(d.id_typed(), d);
            }
            Record::Cart(d) => {
                self.carts.insert(d.customer(), d);
            }
            Record::Wishlist(d) => {
                self.wishlists.insert(d.customer(), d);
            }
            Record::User(d) => {
                self.users.insert(d.id, d);
            }
            Record::Document(d) => {
                self.documents.insert(d.id_typed(), d);
            }
            Record::Message(d) => {
                self.messages.insert(d.id_typed(), d);
            }
        }
    }

    fn delete(&mut self, key: RecordKey) {
        match key {
            RecordKey::Product(id) => {
                self.products.remove(&id);
                self.views.remove(&id);
            }
            RecordKey::Order(id) => {
                self.orders.remove(&id);
            }
            RecordKey::Cart(id) => {
                self.carts.remove(&id);
            }
            RecordKey::Wishlist(id) => {
                self.wishlists.remove(&id);
            }
            RecordKey::User(id) => {
                self.users.remove(&id);
            }
            RecordKey::Document(id) => {
                self.documents.remove(&id);
            }
            RecordKey::Message(id) => {
                self.messages.remove(&id);
            }
        }
    }
}

fn unique_field(record: &Record) -> Option<(&'static str, String)> {
    match record {
        Record::Order(o) => Some(("order number", o.order_number().to_string())),
        Record::User(u) => Some(("email", u.email.clone())),
        Record::Document(d) => Some(("verification bundle for agency", d.agency().to_string())),
        Record::Product(_) | Record::Cart(_) | Record::Wishlist(_) | Record::Message(_) => None,
    }
}

/// In-memory document store.
///
/// All collections sit behind one lock, so a commit is atomic with respect to
/// every reader and writer. Intended for tests, demos and single-node dev.
#[derive(Debug, Default)]
pub struct InMemoryMarketStore {
    inner: RwLock<Collections>,
}

impl InMemoryMarketStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&Collections) -> T) -> Result<T, StoreError> {
        let guard = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&guard))
    }
}

fn select<T: Clone>(items: impl Iterator<Item = T>, filter: &dyn Fn(&T) -> bool) -> Vec<T> {
    items.filter(|item| filter(item)).collect()
}

impl MarketStore for InMemoryMarketStore {
    fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        self.read(|c| c.products.get(&id).map(|p| c.stamped(p)))
    }

    fn find_products(&self, filter: &dyn Fn(&Product) -> bool) -> Result<Vec<Product>, StoreError> {
        self.read(|c| select(c.products.values().map(|p| c.stamped(p)), filter))
    }

    fn record_view(&self, id: ProductId) -> Result<Option<u64>, StoreError> {
        let mut collections = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        if !collections.products.contains_key(&id) {
            return Ok(None);
        }
        let views = collections.views.entry(id).or_insert(0);
        *views = views.saturating_add(1);
        Ok(Some(*views))
    }

    fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        self.read(|c| c.orders.get(&id).cloned())
    }

    fn find_orders(&self, filter: &dyn Fn(&Order) -> bool) -> Result<Vec<Order>, StoreError> {
        self.read(|c| select(c.orders.values().cloned(), filter))
    }

    fn cart(&self, customer: UserId) -> Result<Option<Cart>, StoreError> {
        self.read(|c| c.carts.get(&customer).cloned())
    }

    fn wishlist(&self, customer: UserId) -> Result<Option<Wishlist>, StoreError> {
        self.read(|c| c.wishlists.get(&customer).cloned())
    }

    fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        self.read(|c| c.users.get(&id).cloned())
    }

    fn find_users(&self, filter: &dyn Fn(&User) -> bool) -> Result<Vec<User>, StoreError> {
        self.read(|c| select(c.users.values().cloned(), filter))
    }

    fn document(&self, id: DocumentId) -> Result<Option<VerificationDocument>, StoreError> {
        self.read(|c| c.documents.get(&id).cloned())
    }

    fn document_for_agency(&self, agency: UserId) -> Result<Option<VerificationDocument>, StoreError> {
        self.read(|c| c.documents.values().find(|d| d.agency() == agency).cloned())
    }

    fn find_documents(
        &self,
        filter: &dyn Fn(&VerificationDocument) -> bool,
    ) -> Result<Vec<VerificationDocument>, StoreError> {
        self.read(|c| select(c.documents.values().cloned(), filter))
    }

    fn message(&self, id: MessageId) -> Result<Option<Message>, StoreError> {
        self.read(|c| c.messages.get(&id).cloned())
    }

    fn find_messages(&self, filter: &dyn Fn(&Message) -> bool) -> Result<Vec<Message>, StoreError> {
        self.read(|c| select(c.messages.values().cloned(), filter))
    }

    fn commit(&self, changes: ChangeSet) -> Result<(), StoreError> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut collections = self.inner.write().map_err(|_| StoreError::Poisoned)?;

        // Validate everything first; nothing is written unless all checks pass.
        let mut keys = HashSet::with_capacity(changes.len());
        let mut claimed: HashSet<(&'static str, String)> = HashSet::new();
        for change in changes.changes() {
            let key = change.key();
            if !keys.insert(key) {
                return Err(StoreError::InvalidChangeSet(format!(
                    "{key:?} appears more than once"
                )));
            }

            let current = collections.version_of(key);
            let expected = change.expected();
            if !expected.matches(current) {
                return Err(StoreError::Conflict(format!(
                    "{key:?}: expected {expected:?}, found {current}"
                )));
            }

            if let Change::Put { record, .. } = change {
                collections.check_unique(record)?;
                if let Some(field) = unique_field(record) {
                    if !claimed.insert(field.clone()) {
                        return Err(StoreError::Duplicate(format!(
                            "{} '{}' appears twice in one commit",
                            field.0, field.1
                        )));
                    }
                }
            }
        }

        for change in changes.into_changes() {
            match change {
                Change::Put { record, .. } => collections.put(record),
                Change::Delete { key, .. } => collections.delete(key),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use setu_auth::{RegisterUser, Role, UserCommand};
    use setu_catalog::{Category, Condition, ListProduct, ListingDetails, ProductCommand};
    use setu_core::{Aggregate, ExpectedVersion};

    fn product() -> Product {
        let product_id = ProductId::new();
        let mut p = Product::empty(product_id);
        p.execute(&ProductCommand::ListProduct(ListProduct {
            product_id,
            agency: UserId::new(),
            agency_name: "Customs".to_string(),
            details: ListingDetails {
                title: "Phone".to_string(),
                description: "Seized phone".to_string(),
                category: Category::Electronics,
                original_price: 500,
                selling_price: 300,
                quantity: 2,
                condition: Condition::Good,
                images: vec![],
            },
            occurred_at: Utc::now(),
        }))
        .unwrap();
        p
    }

    fn user(email: &str) -> User {
        let user_id = UserId::new();
        let mut u = User::empty(user_id);
        u.execute(&UserCommand::Register(RegisterUser {
            user_id,
            name: "Someone".to_string(),
            email: email.to_string(),
            credential_hash: "hash".to_string(),
            role: Role::Customer,
            occurred_at: Utc::now(),
        }))
        .unwrap();
        u
    }

    fn put(record: impl Into<Record>, expected: u64) -> Change {
        Change::Put {
            record: record.into(),
            expected: ExpectedVersion::Exact(expected),
        }
    }

    fn single(change: Change) -> ChangeSet {
        let mut set = ChangeSet::new();
        set.push(change);
        set
    }

    #[test]
    fn insert_then_read_back() {
        let store = InMemoryMarketStore::new();
        let p = product();
        store.commit(single(put(p.clone(), 0))).unwrap();
        assert_eq!(store.product(p.id_typed()).unwrap(), Some(p));
    }

    #[test]
    fn stale_expected_version_conflicts() {
        let store = InMemoryMarketStore::new();
        let p = product();
        store.commit(single(put(p.clone(), 0))).unwrap();

        // A second "create" of the same document is stale.
        match store.commit(single(put(p, 0))) {
            Err(StoreError::Conflict(_)) => {}
            other => panic!("Expected Conflict, got {other:?}"),
        }
    }

    #[test]
    fn failed_commit_writes_nothing() {
        let store = InMemoryMarketStore::new();
        let existing = product();
        store.commit(single(put(existing.clone(), 0))).unwrap();

        let fresh = product();
        let mut set = ChangeSet::new();
        set.push(put(fresh.clone(), 0));
        set.push(put(existing, 7));

        assert!(matches!(store.commit(set), Err(StoreError::Conflict(_))));
        assert_eq!(store.product(fresh.id_typed()).unwrap(), None);
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let store = InMemoryMarketStore::new();
        store.commit(single(put(user("a@example.com"), 0))).unwrap();
        match store.commit(single(put(user("a@example.com"), 0))) {
            Err(StoreError::Duplicate(msg)) => assert!(msg.contains("email")),
            other => panic!("Expected Duplicate, got {other:?}"),
        }
    }

    #[test]
    fn delete_requires_current_version() {
        let store = InMemoryMarketStore::new();
        let p = product();
        let key = RecordKey::Product(p.id_typed());
        store.commit(single(put(p.clone(), 0))).unwrap();

        let stale = Change::Delete {
            key,
            expected: ExpectedVersion::Exact(0),
        };
        assert!(matches!(store.commit(single(stale)), Err(StoreError::Conflict(_))));

        let current = Change::Delete {
            key,
            expected: ExpectedVersion::Exact(p.version()),
        };
        store.commit(single(current)).unwrap();
        assert_eq!(store.product(p.id_typed()).unwrap(), None);
    }

    #[test]
    fn same_key_twice_is_invalid() {
        let store = InMemoryMarketStore::new();
        let p = product();
        let mut set = ChangeSet::new();
        set.push(put(p.clone(), 0));
        set.push(put(p, 0));
        assert!(matches!(store.commit(set), Err(StoreError::InvalidChangeSet(_))));
    }

    #[test]
    fn find_applies_filter() {
        let store = InMemoryMarketStore::new();
        store.commit(single(put(user("a@example.com"), 0))).unwrap();
        store.commit(single(put(user("b@example.com"), 0))).unwrap();
        let found = store.find_users(&|u| u.email.starts_with('b')).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn views_do_not_touch_the_version() {
        let store = InMemoryMarketStore::new();
        let p = product();
        let id = p.id_typed();
        store.commit(single(put(p.clone(), 0))).unwrap();

        assert_eq!(store.record_view(id).unwrap(), Some(1));
        assert_eq!(store.record_view(id).unwrap(), Some(2));
        let read = store.product(id).unwrap().unwrap();
        assert_eq!(read.views(), 2);
        assert_eq!(read.version(), p.version());

        // A writer holding the pre-view snapshot still commits.
        store.commit(single(put(p.clone(), p.version()))).unwrap();
        let mut set = ChangeSet::new();
        set.push(Change::Delete {
            key: RecordKey::Product(id),
            expected: ExpectedVersion::Exact(p.version()),
        });
        store.commit(set).unwrap();
        assert_eq!(store.record_view(id).unwrap(), None);
    }
}
