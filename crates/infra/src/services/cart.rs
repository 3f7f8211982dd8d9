//! Customer carts with live pricing from the catalog.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value as JsonValue;

use setu_auth::{Caller, Role};
use setu_catalog::{Product, ProductStatus};
use setu_core::{DomainError, ProductId, UserId};
use setu_events::{EventBus, EventEnvelope};
use setu_orders::{
    AddToCart, Cart, CartCommand, ClearCart, OrderTotals, RemoveFromCart, UpdateCartItem,
};

use super::ServiceContext;
use crate::command_dispatcher::{Tracked, UnitOfWork};
use crate::error::ServiceResult;
use crate::store::MarketStore;

/// Current catalog data for a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartProduct {
    pub title: String,
    pub image: String,
    pub selling_price: u64,
    pub original_price: u64,
    pub status: ProductStatus,
    pub quantity_available: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartItemView {
    pub product_id: ProductId,
    pub quantity: u32,
    /// `None` once the listing has been deleted.
    pub product: Option<CartProduct>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub total_amount: u64,
    pub total_savings: i64,
}

pub struct CartService<S, B> {
    ctx: ServiceContext<S, B>,
}

impl<S, B> CartService<S, B> {
    pub fn new(ctx: ServiceContext<S, B>) -> Self {
        Self { ctx }
    }
}

impl<S, B> CartService<S, B>
where
    S: MarketStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn get_cart(&self, customer: UserId) -> ServiceResult<CartView> {
        match self.ctx.store().cart(customer)? {
            Some(cart) => self.view(&cart),
            None => Ok(CartView::default()),
        }
    }

    pub fn add_to_cart(&self, caller: &Caller, product_id: ProductId, quantity: u32) -> ServiceResult<CartView> {
        self.ctx.authorize_write(caller, &[Role::Customer])?;
        let customer = caller.user_id;
        let product = self
            .ctx
            .store()
            .product(product_id)?
            .ok_or_else(|| DomainError::not_found("product"))?;
        ensure_purchasable(&product)?;

        self.run(
            customer,
            CartCommand::AddToCart(AddToCart {
                customer,
                product: product_id,
                quantity,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn update_cart_item(
        &self,
        caller: &Caller,
        product_id: ProductId,
        quantity: u32,
    ) -> ServiceResult<CartView> {
        self.ctx.authorize_write(caller, &[Role::Customer])?;
        let customer = caller.user_id;
        self.run(
            customer,
            CartCommand::UpdateCartItem(UpdateCartItem {
                customer,
                product: product_id,
                quantity,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn remove_from_cart(&self, caller: &Caller, product_id: ProductId) -> ServiceResult<CartView> {
        self.ctx.authorize_write(caller, &[Role::Customer])?;
        let customer = caller.user_id;
        self.run(
            customer,
            CartCommand::RemoveFromCart(RemoveFromCart {
                customer,
                product: product_id,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn clear_cart(&self, caller: &Caller) -> ServiceResult<CartView> {
        self.ctx.authorize_write(caller, &[Role::Customer])?;
        let customer = caller.user_id;
        self.run(
            customer,
            CartCommand::ClearCart(ClearCart {
                customer,
                occurred_at: Utc::now(),
            }),
        )
    }

    fn run(&self, customer: UserId, command: CartCommand) -> ServiceResult<CartView> {
        let mut cart = match self.ctx.store().cart(customer)? {
            Some(cart) => Tracked::loaded(cart),
            None => Tracked::fresh(Cart::empty(customer)),
        };
        let mut work = UnitOfWork::new();
        work.execute(&mut cart, &command)?;
        // Priced before the commit so an unrepresentable total leaves the cart untouched.
        let view = self.view(cart.get())?;
        work.put(&cart);
        self.ctx.commit(work)?;

        tracing::debug!(customer = %customer, lines = cart.get().items().len(), "cart updated");
        Ok(view)
    }

    /// Totals are computed over lines whose product still exists.
    fn view(&self, cart: &Cart) -> ServiceResult<CartView> {
        let mut totals = OrderTotals::default();
        let mut items = Vec::with_capacity(cart.items().len());
        for line in cart.items() {
            let product = match self.ctx.store().product(line.product)? {
                Some(p) => {
                    totals = totals.add_line(p.original_price(), p.selling_price(), line.quantity)?;
                    Some(CartProduct {
                        title: p.title().to_string(),
                        image: p.primary_image().to_string(),
                        selling_price: p.selling_price(),
                        original_price: p.original_price(),
                        status: p.status(),
                        quantity_available: p.quantity(),
                    })
                }
                None => None,
            };
            items.push(CartItemView {
                product_id: line.product,
                quantity: line.quantity,
                product,
            });
        }
        Ok(CartView {
            items,
            total_amount: totals.total_amount,
            total_savings: totals.total_savings,
        })
    }
}

fn ensure_purchasable(product: &Product) -> Result<(), DomainError> {
    if product.is_purchasable() {
        Ok(())
    } else {
        Err(DomainError::unavailable(format!(
            "'{}' is {}",
            product.title(),
            product.status().as_str()
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use setu_catalog::{ApproveProduct, Category, Condition, ListProduct, ListingDetails, ProductCommand};
    use setu_events::InMemoryEventBus;

    use super::*;
    use crate::command_dispatcher::CommandDispatcher;
    use crate::config::EngineConfig;
    use crate::error::ServiceError;
    use crate::store::InMemoryMarketStore;

    type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;

    fn service() -> (CartService<Arc<InMemoryMarketStore>, Bus>, Arc<InMemoryMarketStore>) {
        let store = Arc::new(InMemoryMarketStore::new());
        let ctx = ServiceContext::new(
            Arc::new(CommandDispatcher::new(store.clone(), Arc::new(InMemoryEventBus::new()))),
            Arc::new(EngineConfig::default()),
        );
        (CartService::new(ctx), store)
    }

    fn seed(store: &InMemoryMarketStore, approve: bool) -> ProductId {
        seed_priced(store, approve, 600, 3)
    }

    fn seed_priced(store: &InMemoryMarketStore, approve: bool, selling_price: u64, quantity: u32) -> ProductId {
        let product_id = ProductId::new();
        let mut product = Tracked::fresh(Product::empty(product_id));
        let mut work = UnitOfWork::new();
        work.execute(
            &mut product,
            &ProductCommand::ListProduct(ListProduct {
                product_id,
                agency: UserId::new(),
                agency_name: "Police Dept".to_string(),
                details: ListingDetails {
                    title: "Bicycle".to_string(),
                    description: "Unclaimed".to_string(),
                    category: Category::Vehicles,
                    original_price: selling_price.max(1000),
                    selling_price,
                    quantity,
                    condition: Condition::Fair,
                    images: vec!["bike.jpg".to_string()],
                },
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        if approve {
            work.execute(
                &mut product,
                &ProductCommand::ApproveProduct(ApproveProduct {
                    product_id,
                    occurred_at: Utc::now(),
                }),
            )
            .unwrap();
        }
        work.put(&product);
        store.commit(work.into_parts().0).unwrap();
        product_id
    }

    fn customer() -> Caller {
        Caller::new(UserId::new(), Role::Customer, "Ravi", "ravi@example.com")
    }

    #[test]
    fn totals_follow_live_prices() {
        let (svc, store) = service();
        let customer = customer();
        let product = seed(&store, true);

        svc.add_to_cart(&customer, product, 1).unwrap();
        let view = svc.add_to_cart(&customer, product, 1).unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].quantity, 2);
        assert_eq!(view.total_amount, 1200);
        assert_eq!(view.total_savings, 800);
        assert_eq!(view.items[0].product.as_ref().unwrap().image, "bike.jpg");
    }

    #[test]
    fn unapproved_products_cannot_be_added() {
        let (svc, store) = service();
        let product = seed(&store, false);
        assert!(matches!(
            svc.add_to_cart(&customer(), product, 1),
            Err(ServiceError::Domain(DomainError::Unavailable(_)))
        ));
        assert!(matches!(
            svc.add_to_cart(&customer(), ProductId::new(), 1),
            Err(ServiceError::Domain(DomainError::NotFound(_)))
        ));
    }

    #[test]
    fn update_and_remove_need_an_existing_line() {
        let (svc, store) = service();
        let customer = customer();
        let product = seed(&store, true);

        assert!(matches!(
            svc.update_cart_item(&customer, product, 2),
            Err(ServiceError::Domain(DomainError::NotFound(_)))
        ));
        svc.add_to_cart(&customer, product, 1).unwrap();
        assert_eq!(svc.update_cart_item(&customer, product, 3).unwrap().total_amount, 1800);
        assert!(svc.remove_from_cart(&customer, product).unwrap().items.is_empty());
    }

    #[test]
    fn agencies_have_no_cart() {
        let (svc, store) = service();
        let product = seed(&store, true);
        let agency = Caller::new(UserId::new(), Role::Agency, "Police Dept", "police@example.com");
        assert!(matches!(
            svc.add_to_cart(&agency, product, 1),
            Err(ServiceError::Domain(DomainError::Forbidden(_)))
        ));
    }

    #[test]
    fn clearing_an_empty_cart_is_fine() {
        let (svc, _) = service();
        let view = svc.clear_cart(&customer()).unwrap();
        assert!(view.items.is_empty());
        assert_eq!(view.total_amount, 0);
    }

    #[test]
    fn unrepresentable_total_is_refused_without_writing() {
        let (svc, store) = service();
        let customer = customer();
        let first = seed_priced(&store, true, setu_catalog::MAX_PRICE, 5);
        svc.add_to_cart(&customer, first, 4_000_000_000).unwrap();

        let mut last = Ok(CartView::default());
        let mut added = 1;
        for _ in 0..8 {
            let product = seed_priced(&store, true, setu_catalog::MAX_PRICE, 5);
            last = svc.add_to_cart(&customer, product, 4_000_000_000);
            if last.is_err() {
                break;
            }
            added += 1;
        }
        assert!(matches!(
            last,
            Err(ServiceError::Domain(DomainError::InvalidRequest(_)))
        ));

        let view = svc.get_cart(customer.user_id).unwrap();
        assert_eq!(view.items.len(), added);
    }
}
