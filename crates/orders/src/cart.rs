//! Customer cart: one line per product, quantities only.
//!
//! Prices are never stored here. Availability is checked against the catalog
//! by the cart service when a line is added and again at checkout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use setu_core::{Aggregate, AggregateRoot, DomainError, ProductId, UserId};
use setu_events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: ProductId,
    pub quantity: u32,
}

/// Aggregate root: Cart, keyed by its customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cart {
    customer: UserId,
    items: Vec<CartLine>,
    updated_at: Option<DateTime<Utc>>,
    version: u64,
}

impl Cart {
    pub fn empty(customer: UserId) -> Self {
        Self {
            customer,
            items: Vec::new(),
            updated_at: None,
            version: 0,
        }
    }

    pub fn customer(&self) -> UserId {
        self.customer
    }

    pub fn items(&self) -> &[CartLine] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn line(&self, product: ProductId) -> Option<&CartLine> {
        self.items.iter().find(|l| l.product == product)
    }

    fn line_mut(&mut self, product: ProductId) -> Option<&mut CartLine> {
        self.items.iter_mut().find(|l| l.product == product)
    }
}

impl AggregateRoot for Cart {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.customer
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddToCart {
    pub customer: UserId,
    pub product: ProductId,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCartItem {
    pub customer: UserId,
    pub product: ProductId,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveFromCart {
    pub customer: UserId,
    pub product: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearCart {
    pub customer: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CartCommand {
    AddToCart(AddToCart),
    UpdateCartItem(UpdateCartItem),
    RemoveFromCart(RemoveFromCart),
    ClearCart(ClearCart),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItemAdded {
    pub customer: UserId,
    pub product: ProductId,
    pub quantity: u32,
    /// Line quantity after the addition.
    pub line_quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItemQuantityChanged {
    pub customer: UserId,
    pub product: ProductId,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItemRemoved {
    pub customer: UserId,
    pub product: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartCleared {
    pub customer: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CartEvent {
    ItemAdded(CartItemAdded),
    QuantityChanged(CartItemQuantityChanged),
    ItemRemoved(CartItemRemoved),
    Cleared(CartCleared),
}

impl Event for CartEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CartEvent::ItemAdded(_) => "orders.cart.item_added",
            CartEvent::QuantityChanged(_) => "orders.cart.quantity_changed",
            CartEvent::ItemRemoved(_) => "orders.cart.item_removed",
            CartEvent::Cleared(_) => "orders.cart.cleared",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CartEvent::ItemAdded(e) => e.occurred_at,
            CartEvent::QuantityChanged(e) => e.occurred_at,
            CartEvent::ItemRemoved(e) => e.occurred_at,
            CartEvent::Cleared(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Cart {
    type Command = CartCommand;
    type Event = CartEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CartEvent::ItemAdded(e) => {
                match self.line_mut(e.product) {
                    Some(line) => line.quantity = e.line_quantity,
                    None => self.items.push(CartLine {
                        product: e.product,
                        quantity: e.line_quantity,
                    }),
                }
                self.updated_at = Some(e.occurred_at);
            }
            CartEvent::QuantityChanged(e) => {
                if let Some(line) = self.line_mut(e.product) {
                    line.quantity = e.quantity;
                }
                self.updated_at = Some(e.occurred_at);
            }
            CartEvent::ItemRemoved(e) => {
                self.items.retain(|l| l.product != e.product);
                self.updated_at = Some(e.occurred_at);
            }
            CartEvent::Cleared(e) => {
                self.items.clear();
                self.updated_at = Some(e.occurred_at);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CartCommand::AddToCart(cmd) => self.handle_add(cmd),
            CartCommand::UpdateCartItem(cmd) => self.handle_update(cmd),
            CartCommand::RemoveFromCart(cmd) => self.handle_remove(cmd),
            CartCommand::ClearCart(cmd) => self.handle_clear(cmd),
        }
    }
}

impl Cart {
    fn ensure_owner(&self, customer: UserId) -> Result<(), DomainError> {
        if self.customer != customer {
            return Err(DomainError::invariant("cart customer mismatch"));
        }
        Ok(())
    }

    fn handle_add(&self, cmd: &AddToCart) -> Result<Vec<CartEvent>, DomainError> {
        self.ensure_owner(cmd.customer)?;
        if cmd.quantity == 0 {
            return Err(DomainError::invalid_request("quantity must be at least 1"));
        }

        let current = self.line(cmd.product).map_or(0, |l| l.quantity);
        let line_quantity = current
            .checked_add(cmd.quantity)
            .ok_or_else(|| DomainError::invalid_request("quantity too large"))?;

        Ok(vec![CartEvent::ItemAdded(CartItemAdded {
            customer: cmd.customer,
            product: cmd.product,
            quantity: cmd.quantity,
            line_quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateCartItem) -> Result<Vec<CartEvent>, DomainError> {
        self.ensure_owner(cmd.customer)?;
        if cmd.quantity == 0 {
            return Err(DomainError::invalid_request("quantity must be at least 1"));
        }
        if self.line(cmd.product).is_none() {
            return Err(DomainError::not_found("cart item"));
        }

        Ok(vec![CartEvent::QuantityChanged(CartItemQuantityChanged {
            customer: cmd.customer,
            product: cmd.product,
            quantity: cmd.quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove(&self, cmd: &RemoveFromCart) -> Result<Vec<CartEvent>, DomainError> {
        self.ensure_owner(cmd.customer)?;
        if self.line(cmd.product).is_none() {
            return Err(DomainError::not_found("cart item"));
        }

        Ok(vec![CartEvent::ItemRemoved(CartItemRemoved {
            customer: cmd.customer,
            product: cmd.product,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_clear(&self, cmd: &ClearCart) -> Result<Vec<CartEvent>, DomainError> {
        self.ensure_owner(cmd.customer)?;
        if self.items.is_empty() {
            return Ok(vec![]);
        }

        Ok(vec![CartEvent::Cleared(CartCleared {
            customer: cmd.customer,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(
        cart: &mut Cart,
        product: ProductId,
        quantity: u32,
    ) -> Result<Vec<CartEvent>, DomainError> {
        cart.execute(&CartCommand::AddToCart(AddToCart {
            customer: cart.customer(),
            product,
            quantity,
            occurred_at: Utc::now(),
        }))
    }

    #[test]
    fn adding_same_product_increments_line() {
        let mut cart = Cart::empty(UserId::new());
        let p = ProductId::new();
        add(&mut cart, p, 2).unwrap();
        add(&mut cart, p, 3).unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.line(p).unwrap().quantity, 5);
        assert_eq!(cart.version(), 2);
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let mut cart = Cart::empty(UserId::new());
        match add(&mut cart, ProductId::new(), 0) {
            Err(DomainError::InvalidRequest(_)) => {}
            other => panic!("Expected InvalidRequest, got {other:?}"),
        }
        assert_eq!(cart.version(), 0);
    }

    #[test]
    fn update_and_remove_require_existing_line() {
        let mut cart = Cart::empty(UserId::new());
        let customer = cart.customer();
        let p = ProductId::new();

        let err = cart
            .handle(&CartCommand::UpdateCartItem(UpdateCartItem {
                customer,
                product: p,
                quantity: 1,
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::not_found("cart item"));

        add(&mut cart, p, 1).unwrap();
        cart.execute(&CartCommand::UpdateCartItem(UpdateCartItem {
            customer,
            product: p,
            quantity: 4,
            occurred_at: Utc::now(),
        }))
        .unwrap();
        assert_eq!(cart.line(p).unwrap().quantity, 4);

        cart.execute(&CartCommand::RemoveFromCart(RemoveFromCart {
            customer,
            product: p,
            occurred_at: Utc::now(),
        }))
        .unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn clearing_empty_cart_is_a_no_op() {
        let mut cart = Cart::empty(UserId::new());
        let events = cart
            .execute(&CartCommand::ClearCart(ClearCart {
                customer: cart.customer(),
                occurred_at: Utc::now(),
            }))
            .unwrap();
        assert!(events.is_empty());
        assert_eq!(cart.version(), 0);
    }

    #[test]
    fn clear_drops_all_lines() {
        let mut cart = Cart::empty(UserId::new());
        add(&mut cart, ProductId::new(), 1).unwrap();
        add(&mut cart, ProductId::new(), 2).unwrap();
        cart.execute(&CartCommand::ClearCart(ClearCart {
            customer: cart.customer(),
            occurred_at: Utc::now(),
        }))
        .unwrap();
        assert!(cart.is_empty());
    }
}
