//! Order lifecycle and inventory consistency.
//!
//! Every operation reads the documents it needs, runs the domain commands in
//! memory and commits one change set. Placing an order reserves stock on every
//! product it names; cancelling puts that stock back. Either every document of
//! the operation is written or none is.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use setu_auth::{Caller, Role};
use setu_catalog::{Product, ProductCommand, ReserveStock, RestoreStock};
use setu_core::{DomainError, OrderId, ProductId, UserId};
use setu_events::{EventBus, EventEnvelope};
use setu_orders::{
    AddTrackingUpdate, AdvanceStatus, CancelOrder, Cart, CartCommand, ClearCart, Order,
    OrderCommand, OrderItem, OrderNumberGenerator, OrderStatus, PaymentMethod, PlaceOrder,
    ShippingAddress,
};

use super::{ServiceContext, newest_first};
use crate::command_dispatcher::{Tracked, UnitOfWork};
use crate::error::{ServiceError, ServiceResult};
use crate::store::MarketStore;

static ORDER_NUMBERS: OrderNumberGenerator = OrderNumberGenerator::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    pub items: Vec<OrderLineRequest>,
    pub shipping_address: ShippingAddress,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

/// Per-status counts over the orders an agency takes part in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AgencyOrderStats {
    pub total_orders: usize,
    pub pending: usize,
    pub confirmed: usize,
    pub processing: usize,
    pub shipped: usize,
    pub delivered: usize,
    pub cancelled: usize,
    /// Sum of the agency's own lines in delivered orders.
    pub total_revenue: u64,
}

pub struct OrderEngine<S, B> {
    ctx: ServiceContext<S, B>,
}

impl<S, B> OrderEngine<S, B> {
    pub fn new(ctx: ServiceContext<S, B>) -> Self {
        Self { ctx }
    }
}

impl<S, B> OrderEngine<S, B>
where
    S: MarketStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn create_order(&self, caller: &Caller, request: PlaceOrderRequest) -> ServiceResult<Order> {
        audit("create_order", caller, self.create(caller, request))
    }

    /// Turn the caller's cart into an order and empty the cart in the same commit.
    pub fn checkout_cart(
        &self,
        caller: &Caller,
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
    ) -> ServiceResult<Order> {
        audit(
            "checkout_cart",
            caller,
            self.checkout(caller, shipping_address, payment_method),
        )
    }

    pub fn update_order_status(
        &self,
        caller: &Caller,
        order_id: OrderId,
        status: &str,
    ) -> ServiceResult<Order> {
        audit(
            "update_order_status",
            caller,
            self.advance(caller, order_id, status),
        )
    }

    pub fn add_tracking_update(
        &self,
        caller: &Caller,
        order_id: OrderId,
        status: &str,
        message: &str,
    ) -> ServiceResult<Order> {
        audit(
            "add_tracking_update",
            caller,
            self.track(caller, order_id, status, message),
        )
    }

    pub fn cancel_order(
        &self,
        caller: &Caller,
        order_id: OrderId,
        reason: Option<String>,
    ) -> ServiceResult<Order> {
        audit("cancel_order", caller, self.cancel(caller, order_id, reason))
    }

    /// Visible to its customer, any agency with a line in it, and admins.
    pub fn get_order(&self, caller: &Caller, order_id: OrderId) -> ServiceResult<Order> {
        let order = self.load(order_id)?.into_inner();
        let visible = match caller.role {
            Role::Admin => true,
            Role::Customer => order.customer() == caller.user_id,
            Role::Agency => order.involves_agency(caller.user_id),
        };
        if !visible {
            return audit(
                "get_order",
                caller,
                Err(DomainError::forbidden("order belongs to someone else").into()),
            );
        }
        Ok(order)
    }

    pub fn list_orders_for_customer(&self, customer: UserId) -> ServiceResult<Vec<Order>> {
        let mut orders = self.ctx.store().find_orders(&|o| o.customer() == customer)?;
        newest_first(&mut orders, |o| (o.created_at(), o.id_typed()));
        Ok(orders)
    }

    /// Whole orders with at least one line from the agency.
    pub fn list_orders_for_agency(&self, agency: UserId) -> ServiceResult<Vec<Order>> {
        let mut orders = self
            .ctx
            .store()
            .find_orders(&|o| o.involves_agency(agency))?;
        newest_first(&mut orders, |o| (o.created_at(), o.id_typed()));
        Ok(orders)
    }

    pub fn recent_orders_for_agency(&self, agency: UserId) -> ServiceResult<Vec<Order>> {
        let mut orders = self.list_orders_for_agency(agency)?;
        orders.truncate(self.ctx.config().recent_orders_limit);
        Ok(orders)
    }

    pub fn agency_order_stats(&self, agency: UserId) -> ServiceResult<AgencyOrderStats> {
        let orders = self.list_orders_for_agency(agency)?;
        let mut stats = AgencyOrderStats {
            total_orders: orders.len(),
            ..AgencyOrderStats::default()
        };
        for order in &orders {
            match order.status() {
                OrderStatus::Pending => stats.pending += 1,
                OrderStatus::Confirmed => stats.confirmed += 1,
                OrderStatus::Processing => stats.processing += 1,
                OrderStatus::Shipped => stats.shipped += 1,
                OrderStatus::Delivered => {
                    stats.delivered += 1;
                    stats.total_revenue = stats
                        .total_revenue
                        .saturating_add(order.revenue_for_agency(agency));
                }
                OrderStatus::Cancelled => stats.cancelled += 1,
            }
        }
        Ok(stats)
    }

    fn create(&self, caller: &Caller, request: PlaceOrderRequest) -> ServiceResult<Order> {
        self.ctx.authorize_write(caller, &[Role::Customer])?;
        self.place(
            caller,
            &request.items,
            &request.shipping_address,
            request.payment_method,
            None,
        )
    }

    fn checkout(
        &self,
        caller: &Caller,
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
    ) -> ServiceResult<Order> {
        self.ctx.authorize_write(caller, &[Role::Customer])?;
        let cart = self
            .ctx
            .store()
            .cart(caller.user_id)?
            .filter(|cart| !cart.is_empty())
            .ok_or_else(|| DomainError::invalid_request("cart is empty"))?;

        let lines: Vec<OrderLineRequest> = cart
            .items()
            .iter()
            .map(|line| OrderLineRequest {
                product_id: line.product,
                quantity: line.quantity,
            })
            .collect();

        self.place(
            caller,
            &lines,
            &shipping_address,
            payment_method,
            Some(Tracked::loaded(cart)),
        )
    }

    fn place(
        &self,
        caller: &Caller,
        lines: &[OrderLineRequest],
        shipping_address: &ShippingAddress,
        payment_method: PaymentMethod,
        cart: Option<Tracked<Cart>>,
    ) -> ServiceResult<Order> {
        if lines.is_empty() {
            return Err(DomainError::invalid_request("order must contain at least one item").into());
        }
        if lines.iter().any(|line| line.quantity == 0) {
            return Err(DomainError::invalid_request("quantity must be at least 1").into());
        }

        let now = Utc::now();
        let mut work = UnitOfWork::new();
        let mut products: HashMap<ProductId, Tracked<Product>> = HashMap::new();
        let mut touched: Vec<ProductId> = Vec::new();
        let mut items = Vec::with_capacity(lines.len());

        for line in lines {
            let product = match products.entry(line.product_id) {
                Entry::Occupied(entry) => {
                    let product = entry.into_mut();
                    // Repeated line: only what earlier lines left over is available.
                    let left = product.get().quantity();
                    if line.quantity > left {
                        return Err(DomainError::insufficient_stock(format!(
                            "'{}': requested {}, available {}",
                            product.get().title(),
                            line.quantity,
                            left
                        ))
                        .into());
                    }
                    product
                }
                Entry::Vacant(entry) => {
                    let loaded = self
                        .ctx
                        .store()
                        .product(line.product_id)?
                        .ok_or_else(|| DomainError::not_found("product"))?;
                    touched.push(line.product_id);
                    entry.insert(Tracked::loaded(loaded))
                }
            };

            items.push(snapshot(product.get(), line.quantity));
            work.execute(
                product,
                &ProductCommand::ReserveStock(ReserveStock {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    occurred_at: now,
                }),
            )?;
        }

        let config = self.ctx.config();
        let order_id = OrderId::new();
        let mut order = Tracked::fresh(Order::empty(order_id));
        work.execute(
            &mut order,
            &OrderCommand::PlaceOrder(PlaceOrder {
                order_id,
                order_number: ORDER_NUMBERS.next(now),
                customer: caller.user_id,
                customer_name: caller.name.clone(),
                customer_email: caller.email.clone(),
                items,
                shipping_address: shipping_address.clone(),
                payment_method,
                initial_status: config.initial_status.order_status(),
                estimated_delivery: now + Duration::days(config.estimated_delivery_days),
                occurred_at: now,
            }),
        )?;

        if let Some(mut cart) = cart {
            work.execute(
                &mut cart,
                &CartCommand::ClearCart(ClearCart {
                    customer: caller.user_id,
                    occurred_at: now,
                }),
            )?;
            work.put(&cart);
        }
        for id in &touched {
            if let Some(product) = products.get(id) {
                work.put(product);
            }
        }
        work.put(&order);

        self.ctx.commit(work)?;

        let order = order.into_inner();
        tracing::info!(
            order_id = %order_id,
            order_number = %order.order_number(),
            customer = %caller.user_id,
            items = order.items().len(),
            total_amount = order.total_amount(),
            "order placed"
        );
        Ok(order)
    }

    fn advance(&self, caller: &Caller, order_id: OrderId, status: &str) -> ServiceResult<Order> {
        self.ctx.authorize_write(caller, &[Role::Agency])?;
        let mut order = self.load(order_id)?;
        let from = order.get().status();

        let mut work = UnitOfWork::new();
        work.execute(
            &mut order,
            &OrderCommand::AdvanceStatus(AdvanceStatus {
                order_id,
                agency: caller.user_id,
                target: status.to_string(),
                track: self.ctx.config().auto_track_status_changes,
                occurred_at: Utc::now(),
            }),
        )?;
        work.put(&order);
        self.ctx.commit(work)?;

        let order = order.into_inner();
        tracing::info!(
            order_id = %order_id,
            order_number = %order.order_number(),
            agency = %caller.user_id,
            from = from.as_str(),
            to = order.status().as_str(),
            "order status updated"
        );
        Ok(order)
    }

    fn track(
        &self,
        caller: &Caller,
        order_id: OrderId,
        status: &str,
        message: &str,
    ) -> ServiceResult<Order> {
        self.ctx.authorize_write(caller, &[Role::Agency])?;
        let mut order = self.load(order_id)?;

        let mut work = UnitOfWork::new();
        work.execute(
            &mut order,
            &OrderCommand::AddTrackingUpdate(AddTrackingUpdate {
                order_id,
                agency: caller.user_id,
                status: status.to_string(),
                message: message.to_string(),
                occurred_at: Utc::now(),
            }),
        )?;
        work.put(&order);
        self.ctx.commit(work)?;

        tracing::info!(order_id = %order_id, agency = %caller.user_id, label = status, "tracking update added");
        Ok(order.into_inner())
    }

    fn cancel(
        &self,
        caller: &Caller,
        order_id: OrderId,
        reason: Option<String>,
    ) -> ServiceResult<Order> {
        self.ctx.authorize_write(caller, &[Role::Customer])?;
        let mut order = self.load(order_id)?;
        let now = Utc::now();

        let mut work = UnitOfWork::new();
        work.execute(
            &mut order,
            &OrderCommand::CancelOrder(CancelOrder {
                order_id,
                customer: caller.user_id,
                reason,
                occurred_at: now,
            }),
        )?;

        let mut products: HashMap<ProductId, Tracked<Product>> = HashMap::new();
        let mut touched: Vec<ProductId> = Vec::new();
        for item in order.get().items() {
            let product = match products.entry(item.product) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => match self.ctx.store().product(item.product)? {
                    Some(loaded) => {
                        touched.push(item.product);
                        entry.insert(Tracked::loaded(loaded))
                    }
                    None => {
                        tracing::warn!(
                            order_id = %order_id,
                            product_id = %item.product,
                            quantity = item.quantity,
                            "product no longer exists; stock not restored"
                        );
                        continue;
                    }
                },
            };
            work.execute(
                product,
                &ProductCommand::RestoreStock(RestoreStock {
                    product_id: item.product,
                    quantity: item.quantity,
                    occurred_at: now,
                }),
            )?;
        }

        for id in &touched {
            if let Some(product) = products.get(id) {
                work.put(product);
            }
        }
        work.put(&order);
        self.ctx.commit(work)?;

        let order = order.into_inner();
        tracing::info!(
            order_id = %order_id,
            order_number = %order.order_number(),
            customer = %caller.user_id,
            restored = touched.len(),
            "order cancelled"
        );
        Ok(order)
    }

    fn load(&self, order_id: OrderId) -> ServiceResult<Tracked<Order>> {
        self.ctx
            .store()
            .order(order_id)?
            .map(Tracked::loaded)
            .ok_or_else(|| DomainError::not_found("order").into())
    }
}

/// Line snapshot from the product's current listing.
fn snapshot(product: &Product, quantity: u32) -> OrderItem {
    OrderItem {
        product: product.id_typed(),
        product_title: product.title().to_string(),
        product_image: product.primary_image().to_string(),
        agency: product.agency(),
        agency_name: product.agency_name().to_string(),
        quantity,
        price: product.selling_price(),
        original_price: product.original_price(),
    }
}

/// Ownership and lifecycle refusals are worth a warning; everything else is
/// ordinary input validation.
fn audit<T>(operation: &'static str, caller: &Caller, result: ServiceResult<T>) -> ServiceResult<T> {
    if let Err(err @ ServiceError::Domain(DomainError::Forbidden(_) | DomainError::InvalidTransition(_))) =
        &result
    {
        tracing::warn!(
            operation,
            user_id = %caller.user_id,
            role = %caller.role,
            error = %err,
            "order operation refused"
        );
    }
    result
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use setu_catalog::{ApproveProduct, Category, Condition, ListProduct, ListingDetails, ProductStatus};
    use setu_events::InMemoryEventBus;

    use super::*;
    use crate::command_dispatcher::CommandDispatcher;
    use crate::config::EngineConfig;
    use crate::store::InMemoryMarketStore;

    type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
    type Engine = OrderEngine<Arc<InMemoryMarketStore>, Bus>;

    fn engine(config: EngineConfig) -> (Engine, Arc<InMemoryMarketStore>) {
        let store = Arc::new(InMemoryMarketStore::new());
        let ctx = ServiceContext::new(
            Arc::new(CommandDispatcher::new(store.clone(), Arc::new(InMemoryEventBus::new()))),
            Arc::new(config),
        );
        (OrderEngine::new(ctx), store)
    }

    fn seed_product(store: &InMemoryMarketStore, agency: UserId, quantity: u32) -> ProductId {
        let product_id = ProductId::new();
        let mut product = Tracked::fresh(Product::empty(product_id));
        let mut work = UnitOfWork::new();
        work.execute(
            &mut product,
            &ProductCommand::ListProduct(ListProduct {
                product_id,
                agency,
                agency_name: "Customs Office".to_string(),
                details: ListingDetails {
                    title: "Seized camera".to_string(),
                    description: "Mirrorless body".to_string(),
                    category: Category::Electronics,
                    original_price: 1000,
                    selling_price: 600,
                    quantity,
                    condition: Condition::Good,
                    images: vec!["cam.jpg".to_string()],
                },
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        work.execute(
            &mut product,
            &ProductCommand::ApproveProduct(ApproveProduct {
                product_id,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        work.put(&product);
        let (changes, _) = work.into_parts();
        store.commit(changes).unwrap();
        product_id
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Asha Rao".to_string(),
            phone: "9876543210".to_string(),
            address_line1: "12 MG Road".to_string(),
            address_line2: None,
            city: "Pune".to_string(),
            state: "MH".to_string(),
            pincode: "411001".to_string(),
        }
    }

    fn request(lines: &[(ProductId, u32)]) -> PlaceOrderRequest {
        PlaceOrderRequest {
            items: lines
                .iter()
                .map(|&(product_id, quantity)| OrderLineRequest { product_id, quantity })
                .collect(),
            shipping_address: address(),
            payment_method: PaymentMethod::Cod,
        }
    }

    fn customer() -> Caller {
        Caller::new(UserId::new(), Role::Customer, "Asha", "asha@example.com")
    }

    #[test]
    fn repeated_line_sees_what_earlier_lines_left() {
        let (engine, store) = engine(EngineConfig::default());
        let product = seed_product(&store, UserId::new(), 3);

        let err = engine
            .create_order(&customer(), request(&[(product, 2), (product, 2)]))
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::InsufficientStock(_))
        ));
        assert_eq!(store.product(product).unwrap().unwrap().quantity(), 3);

        let order = engine
            .create_order(&customer(), request(&[(product, 2), (product, 1)]))
            .unwrap();
        assert_eq!(order.items().len(), 2);
        let stored = store.product(product).unwrap().unwrap();
        assert_eq!(stored.quantity(), 0);
        assert_eq!(stored.status(), ProductStatus::Sold);
    }

    #[test]
    fn stock_is_checked_before_the_address() {
        let (engine, store) = engine(EngineConfig::default());
        let product = seed_product(&store, UserId::new(), 1);

        let mut req = request(&[(product, 5)]);
        req.shipping_address.phone = "123".to_string();
        assert!(matches!(
            engine.create_order(&customer(), req),
            Err(ServiceError::Domain(DomainError::InsufficientStock(_)))
        ));

        let mut req = request(&[(product, 1)]);
        req.shipping_address.phone = "123".to_string();
        assert!(matches!(
            engine.create_order(&customer(), req),
            Err(ServiceError::Domain(DomainError::InvalidAddress(_)))
        ));
    }

    #[test]
    fn only_customers_place_orders() {
        let (engine, store) = engine(EngineConfig::default());
        let product = seed_product(&store, UserId::new(), 1);
        let agency = Caller::new(UserId::new(), Role::Agency, "Customs", "c@example.com");

        assert!(matches!(
            engine.create_order(&agency, request(&[(product, 1)])),
            Err(ServiceError::Domain(DomainError::Forbidden(_)))
        ));
    }

    #[test]
    fn confirmed_policy_starts_orders_confirmed() {
        let config = EngineConfig {
            initial_status: crate::config::InitialOrderStatus::Confirmed,
            ..EngineConfig::default()
        };
        let (engine, store) = engine(config);
        let product = seed_product(&store, UserId::new(), 1);

        let order = engine
            .create_order(&customer(), request(&[(product, 1)]))
            .unwrap();
        assert_eq!(order.status(), OrderStatus::Confirmed);
        assert_eq!(order.tracking_updates()[0].status, "confirmed");
    }

    #[test]
    fn auto_tracking_appends_on_status_change() {
        let config = EngineConfig {
            auto_track_status_changes: true,
            ..EngineConfig::default()
        };
        let (engine, store) = engine(config);
        let agency_id = UserId::new();
        let product = seed_product(&store, agency_id, 1);
        let order = engine
            .create_order(&customer(), request(&[(product, 1)]))
            .unwrap();

        let agency = Caller::new(agency_id, Role::Agency, "Customs", "c@example.com");
        let shipped = engine
            .update_order_status(&agency, order.id_typed(), "shipped")
            .unwrap();
        let last = shipped.tracking_updates().last().unwrap();
        assert_eq!(last.status, "shipped");
        assert_eq!(last.message, "Order status updated to shipped");
    }

    #[test]
    fn recent_orders_respect_the_limit() {
        let config = EngineConfig {
            recent_orders_limit: 2,
            ..EngineConfig::default()
        };
        let (engine, store) = engine(config);
        let agency = UserId::new();
        let product = seed_product(&store, agency, 5);
        for _ in 0..3 {
            engine
                .create_order(&customer(), request(&[(product, 1)]))
                .unwrap();
        }

        assert_eq!(engine.list_orders_for_agency(agency).unwrap().len(), 3);
        assert_eq!(engine.recent_orders_for_agency(agency).unwrap().len(), 2);
    }
}
