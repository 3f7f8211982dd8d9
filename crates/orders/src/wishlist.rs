//! Customer wishlist: a set of saved products, no quantities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use setu_core::{Aggregate, AggregateRoot, DomainError, ProductId, UserId};
use setu_events::Event;

/// Aggregate root: Wishlist, keyed by its customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Wishlist {
    customer: UserId,
    products: Vec<ProductId>,
    updated_at: Option<DateTime<Utc>>,
    version: u64,
}

impl Wishlist {
    pub fn empty(customer: UserId) -> Self {
        Self {
            customer,
            products: Vec::new(),
            updated_at: None,
            version: 0,
        }
    }

    pub fn customer(&self) -> UserId {
        self.customer
    }

    /// Saved products in the order they were added.
    pub fn products(&self) -> &[ProductId] {
        &self.products
    }

    pub fn contains(&self, product: ProductId) -> bool {
        self.products.contains(&product)
    }
}

impl AggregateRoot for Wishlist {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.customer
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddToWishlist {
    pub customer: UserId,
    pub product: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveFromWishlist {
    pub customer: UserId,
    pub product: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WishlistCommand {
    Add(AddToWishlist),
    Remove(RemoveFromWishlist),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistItemAdded {
    pub customer: UserId,
    pub product: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistItemRemoved {
    pub customer: UserId,
    pub product: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WishlistEvent {
    ItemAdded(WishlistItemAdded),
    ItemRemoved(WishlistItemRemoved),
}

impl Event for WishlistEvent {
    fn event_type(&self) -> &'static str {
        match self {
            WishlistEvent::ItemAdded(_) => "orders.wishlist.item_added",
            WishlistEvent::ItemRemoved(_) => "orders.wishlist.item_removed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            WishlistEvent::ItemAdded(e) => e.occurred_at,
            WishlistEvent::ItemRemoved(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Wishlist {
    type Command = WishlistCommand;
    type Event = WishlistEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            WishlistEvent::ItemAdded(e) => {
                self.products.push(e.product);
                self.updated_at = Some(e.occurred_at);
            }
            WishlistEvent::ItemRemoved(e) => {
                self.products.retain(|p| *p != e.product);
                self.updated_at = Some(e.occurred_at);
            }
        }

        self.version += 1;
    }

    /// Adding a saved product or removing an unsaved one emits nothing.
    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            WishlistCommand::Add(cmd) => {
                self.ensure_owner(cmd.customer)?;
                if self.contains(cmd.product) {
                    return Ok(vec![]);
                }
                Ok(vec![WishlistEvent::ItemAdded(WishlistItemAdded {
                    customer: cmd.customer,
                    product: cmd.product,
                    occurred_at: cmd.occurred_at,
                })])
            }
            WishlistCommand::Remove(cmd) => {
                self.ensure_owner(cmd.customer)?;
                if !self.contains(cmd.product) {
                    return Ok(vec![]);
                }
                Ok(vec![WishlistEvent::ItemRemoved(WishlistItemRemoved {
                    customer: cmd.customer,
                    product: cmd.product,
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}

impl Wishlist {
    fn ensure_owner(&self, customer: UserId) -> Result<(), DomainError> {
        if self.customer != customer {
            return Err(DomainError::invariant("wishlist customer mismatch"));
        }
        Ok(())
    }
}
