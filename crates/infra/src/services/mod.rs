//! Application services: the operations the HTTP layer calls.
//!
//! Every service is generic over the store and the bus and shares one
//! [`CommandDispatcher`]. Callers are identified by a verified [`Caller`];
//! services re-check roles and ownership themselves.

pub mod agency;
pub mod cart;
pub mod catalog;
pub mod dashboard;
pub mod order_engine;
pub mod users;
pub mod wishlist;

use std::sync::Arc;

use serde_json::Value as JsonValue;

use setu_auth::{Caller, Role, require_role};
use setu_core::DomainError;
use setu_events::{EventBus, EventEnvelope};

use crate::command_dispatcher::{CommandDispatcher, UnitOfWork};
use crate::config::EngineConfig;
use crate::error::ServiceResult;
use crate::store::MarketStore;

pub use agency::{AgencyService, SendMessageRequest, VerificationStatus};
pub use cart::{CartItemView, CartProduct, CartService, CartView};
pub use catalog::CatalogService;
pub use dashboard::{
    ActivityCount, AdminDashboard, AgencyAnalytics, AgencyOverview, CategoryCount, Dashboards,
    MonthlySales, ProductOverview, UserCounts,
};
pub use order_engine::{AgencyOrderStats, OrderEngine, OrderLineRequest, PlaceOrderRequest};
pub use users::UserDirectory;
pub use wishlist::WishlistService;

/// What every service holds: the pipeline and the policies.
pub struct ServiceContext<S, B> {
    dispatcher: Arc<CommandDispatcher<S, B>>,
    config: Arc<EngineConfig>,
}

impl<S, B> Clone for ServiceContext<S, B> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S, B> ServiceContext<S, B> {
    pub fn new(dispatcher: Arc<CommandDispatcher<S, B>>, config: Arc<EngineConfig>) -> Self {
        Self { dispatcher, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        self.dispatcher.store()
    }

    pub fn dispatcher(&self) -> &CommandDispatcher<S, B> {
        &self.dispatcher
    }
}

impl<S, B> ServiceContext<S, B>
where
    S: MarketStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn commit(&self, work: UnitOfWork) -> ServiceResult<()> {
        self.dispatcher.commit(work).map(|_| ())
    }

    /// Role check plus, when enforced, the suspension check.
    ///
    /// Callers unknown to the directory count as active.
    pub fn authorize_write(&self, caller: &Caller, allowed: &[Role]) -> ServiceResult<()> {
        require_role(caller, allowed)?;
        if self.config.enforce_suspension {
            if let Some(user) = self.store().user(caller.user_id)? {
                if user.is_suspended() {
                    tracing::warn!(user_id = %caller.user_id, "suspended user attempted a write");
                    return Err(DomainError::forbidden("account is suspended").into());
                }
            }
        }
        Ok(())
    }
}

/// All services over one store, bus and policy set.
pub struct Marketplace<S, B> {
    pub orders: OrderEngine<S, B>,
    pub catalog: CatalogService<S, B>,
    pub cart: CartService<S, B>,
    pub wishlist: WishlistService<S, B>,
    pub agency: AgencyService<S, B>,
    pub users: UserDirectory<S, B>,
    pub dashboards: Dashboards<S, B>,
}

impl<S, B> Marketplace<S, B> {
    pub fn new(store: S, bus: B, config: EngineConfig) -> Self {
        let ctx = ServiceContext::new(
            Arc::new(CommandDispatcher::new(store, bus)),
            Arc::new(config),
        );
        Self {
            orders: OrderEngine::new(ctx.clone()),
            catalog: CatalogService::new(ctx.clone()),
            cart: CartService::new(ctx.clone()),
            wishlist: WishlistService::new(ctx.clone()),
            agency: AgencyService::new(ctx.clone()),
            users: UserDirectory::new(ctx.clone()),
            dashboards: Dashboards::new(ctx),
        }
    }
}

/// Newest first, with id as a stable tie-break.
pub(crate) fn newest_first<T, K: Ord>(items: &mut [T], key: impl Fn(&T) -> K) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}
