//! Saved products per customer.

use chrono::Utc;
use serde_json::Value as JsonValue;

use setu_auth::{Caller, Role};
use setu_catalog::Product;
use setu_core::{DomainError, ProductId, UserId};
use setu_events::{EventBus, EventEnvelope};
use setu_orders::{AddToWishlist, RemoveFromWishlist, Wishlist, WishlistCommand};

use super::ServiceContext;
use crate::command_dispatcher::{Tracked, UnitOfWork};
use crate::error::ServiceResult;
use crate::store::MarketStore;

pub struct WishlistService<S, B> {
    ctx: ServiceContext<S, B>,
}

impl<S, B> WishlistService<S, B> {
    pub fn new(ctx: ServiceContext<S, B>) -> Self {
        Self { ctx }
    }
}

impl<S, B> WishlistService<S, B>
where
    S: MarketStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Saved products that still exist, in the order they were saved.
    ///
    /// A customer without a wishlist gets an empty one; nothing is written.
    pub fn get_wishlist(&self, customer: UserId) -> ServiceResult<Vec<Product>> {
        match self.ctx.store().wishlist(customer)? {
            Some(list) => self.products(&list),
            None => Ok(Vec::new()),
        }
    }

    /// Saving an already saved product is a no-op.
    pub fn add_to_wishlist(&self, caller: &Caller, product_id: ProductId) -> ServiceResult<Vec<Product>> {
        self.ctx.authorize_write(caller, &[Role::Customer])?;
        if self.ctx.store().product(product_id)?.is_none() {
            return Err(DomainError::not_found("product").into());
        }

        let customer = caller.user_id;
        let list = match self.ctx.store().wishlist(customer)? {
            Some(list) => Tracked::loaded(list),
            None => Tracked::fresh(Wishlist::empty(customer)),
        };
        self.run(
            list,
            WishlistCommand::Add(AddToWishlist {
                customer,
                product: product_id,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn remove_from_wishlist(
        &self,
        caller: &Caller,
        product_id: ProductId,
    ) -> ServiceResult<Vec<Product>> {
        self.ctx.authorize_write(caller, &[Role::Customer])?;
        let customer = caller.user_id;
        let list = self
            .ctx
            .store()
            .wishlist(customer)?
            .map(Tracked::loaded)
            .ok_or_else(|| DomainError::not_found("wishlist"))?;
        self.run(
            list,
            WishlistCommand::Remove(RemoveFromWishlist {
                customer,
                product: product_id,
                occurred_at: Utc::now(),
            }),
        )
    }

    fn run(&self, mut list: Tracked<Wishlist>, command: WishlistCommand) -> ServiceResult<Vec<Product>> {
        let mut work = UnitOfWork::new();
        work.execute(&mut list, &command)?;
        work.put(&list);
        self.ctx.commit(work)?;

        tracing::debug!(customer = %list.get().customer(), saved = list.get().products().len(), "wishlist updated");
        self.products(list.get())
    }

    fn products(&self, list: &Wishlist) -> ServiceResult<Vec<Product>> {
        let mut products = Vec::with_capacity(list.products().len());
        for id in list.products() {
            if let Some(product) = self.ctx.store().product(*id)? {
                products.push(product);
            }
        }
        Ok(products)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use setu_catalog::{Category, Condition, ListProduct, ListingDetails, ProductCommand};
    use setu_events::InMemoryEventBus;

    use super::*;
    use crate::command_dispatcher::CommandDispatcher;
    use crate::config::EngineConfig;
    use crate::error::ServiceError;
    use crate::store::InMemoryMarketStore;

    type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;

    fn service() -> (WishlistService<Arc<InMemoryMarketStore>, Bus>, Arc<InMemoryMarketStore>) {
        let store = Arc::new(InMemoryMarketStore::new());
        let ctx = ServiceContext::new(
            Arc::new(CommandDispatcher::new(store.clone(), Arc::new(InMemoryEventBus::new()))),
            Arc::new(EngineConfig::default()),
        );
        (WishlistService::new(ctx), store)
    }

    fn seed(store: &InMemoryMarketStore, title: &str) -> ProductId {
        let product_id = ProductId::new();
        let mut product = Tracked::fresh(Product::empty(product_id));
        let mut work = UnitOfWork::new();
        work.execute(
            &mut product,
            &ProductCommand::ListProduct(ListProduct {
                product_id,
                agency: UserId::new(),
                agency_name: "Excise Dept".to_string(),
                details: ListingDetails {
                    title: title.to_string(),
                    description: "Confiscated".to_string(),
                    category: Category::Furniture,
                    original_price: 4000,
                    selling_price: 2500,
                    quantity: 1,
                    condition: Condition::Good,
                    images: vec![],
                },
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        work.put(&product);
        store.commit(work.into_parts().0).unwrap();
        product_id
    }

    fn customer() -> Caller {
        Caller::new(UserId::new(), Role::Customer, "Lata", "lata@example.com")
    }

    #[test]
    fn missing_wishlist_reads_as_empty_without_writing() {
        let (svc, store) = service();
        let customer = customer();
        assert!(svc.get_wishlist(customer.user_id).unwrap().is_empty());
        assert!(store.wishlist(customer.user_id).unwrap().is_none());
    }

    #[test]
    fn saving_twice_keeps_one_entry() {
        let (svc, store) = service();
        let customer = customer();
        let chair = seed(&store, "Chair");
        let desk = seed(&store, "Desk");

        svc.add_to_wishlist(&customer, chair).unwrap();
        svc.add_to_wishlist(&customer, desk).unwrap();
        let saved = svc.add_to_wishlist(&customer, chair).unwrap();
        let titles: Vec<&str> = saved.iter().map(Product::title).collect();
        assert_eq!(titles, vec!["Chair", "Desk"]);

        let saved = svc.remove_from_wishlist(&customer, chair).unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].title(), "Desk");
    }

    #[test]
    fn unknown_product_and_missing_list_are_not_found() {
        let (svc, store) = service();
        let customer = customer();
        assert!(matches!(
            svc.add_to_wishlist(&customer, ProductId::new()),
            Err(ServiceError::Domain(DomainError::NotFound(_)))
        ));
        let chair = seed(&store, "Chair");
        match svc.remove_from_wishlist(&customer, chair) {
            Err(ServiceError::Domain(err)) => assert_eq!(err, DomainError::not_found("wishlist")),
            other => panic!("Expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn only_customers_keep_wishlists() {
        let (svc, store) = service();
        let chair = seed(&store, "Chair");
        let admin = Caller::new(UserId::new(), Role::Admin, "Admin", "admin@example.com");
        assert!(matches!(
            svc.add_to_wishlist(&admin, chair),
            Err(ServiceError::Domain(DomainError::Forbidden(_)))
        ));
    }
}
