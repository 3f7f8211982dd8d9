//! Listing workflow: agencies list, admins moderate, everyone browses.

use chrono::Utc;
use serde_json::Value as JsonValue;

use setu_auth::{Caller, Role};
use setu_catalog::{
    ApproveProduct, DeleteListing, ListProduct, ListingChanges, ListingDetails, Product,
    ProductCommand, ProductFilter, ProductStatus, RejectProduct, UpdateListing,
};
use setu_core::{DomainError, ProductId, UserId};
use setu_events::{EventBus, EventEnvelope};

use super::{ServiceContext, newest_first};
use crate::command_dispatcher::{Tracked, UnitOfWork};
use crate::error::ServiceResult;
use crate::store::MarketStore;

pub struct CatalogService<S, B> {
    ctx: ServiceContext<S, B>,
}

impl<S, B> CatalogService<S, B> {
    pub fn new(ctx: ServiceContext<S, B>) -> Self {
        Self { ctx }
    }
}

impl<S, B> CatalogService<S, B>
where
    S: MarketStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// New listings wait for moderation in `pending`.
    pub fn list_product(&self, caller: &Caller, details: ListingDetails) -> ServiceResult<Product> {
        self.ctx.authorize_write(caller, &[Role::Agency])?;
        if self.ctx.config().require_verified_agency {
            let verified = self
                .ctx
                .store()
                .document_for_agency(caller.user_id)?
                .is_some_and(|doc| doc.is_approved());
            if !verified {
                return Err(DomainError::forbidden("agency is not verified").into());
            }
        }

        let product_id = ProductId::new();
        let mut product = Tracked::fresh(Product::empty(product_id));
        let mut work = UnitOfWork::new();
        work.execute(
            &mut product,
            &ProductCommand::ListProduct(ListProduct {
                product_id,
                agency: caller.user_id,
                agency_name: caller.name.clone(),
                details,
                occurred_at: Utc::now(),
            }),
        )?;
        work.put(&product);
        self.ctx.commit(work)?;

        tracing::info!(product_id = %product_id, agency = %caller.user_id, "product listed");
        Ok(product.into_inner())
    }

    pub fn update_listing(
        &self,
        caller: &Caller,
        product_id: ProductId,
        changes: ListingChanges,
    ) -> ServiceResult<Product> {
        self.ctx.authorize_write(caller, &[Role::Agency])?;
        self.run(
            product_id,
            ProductCommand::UpdateListing(UpdateListing {
                product_id,
                agency: caller.user_id,
                changes,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn delete_listing(&self, caller: &Caller, product_id: ProductId) -> ServiceResult<()> {
        self.ctx.authorize_write(caller, &[Role::Agency])?;
        let mut product = self.load(product_id)?;

        let mut work = UnitOfWork::new();
        work.execute(
            &mut product,
            &ProductCommand::DeleteListing(DeleteListing {
                product_id,
                agency: caller.user_id,
                occurred_at: Utc::now(),
            }),
        )?;
        work.delete(&product);
        self.ctx.commit(work)?;

        tracing::info!(product_id = %product_id, agency = %caller.user_id, "product deleted");
        Ok(())
    }

    pub fn approve_product(&self, caller: &Caller, product_id: ProductId) -> ServiceResult<Product> {
        self.ctx.authorize_write(caller, &[Role::Admin])?;
        self.run(
            product_id,
            ProductCommand::ApproveProduct(ApproveProduct {
                product_id,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn reject_product(
        &self,
        caller: &Caller,
        product_id: ProductId,
        reason: &str,
    ) -> ServiceResult<Product> {
        self.ctx.authorize_write(caller, &[Role::Admin])?;
        self.run(
            product_id,
            ProductCommand::RejectProduct(RejectProduct {
                product_id,
                reason: reason.to_string(),
                occurred_at: Utc::now(),
            }),
        )
    }

    /// Fetch a product and count the view.
    ///
    /// The counter sits outside the versioned document, so browsing never
    /// races stock reservations.
    pub fn get_product(&self, product_id: ProductId) -> ServiceResult<Product> {
        let product = self.load(product_id)?.into_inner();
        match self.ctx.store().record_view(product_id)? {
            Some(views) => Ok(product.with_views(views)),
            None => Err(DomainError::not_found("product").into()),
        }
    }

    /// Approved listings matching the filter, newest first.
    pub fn browse(&self, filter: &ProductFilter) -> ServiceResult<Vec<Product>> {
        self.sorted(&|p| filter.matches(p))
    }

    pub fn agency_products(
        &self,
        agency: UserId,
        status: Option<ProductStatus>,
    ) -> ServiceResult<Vec<Product>> {
        self.sorted(&|p| p.agency() == agency && status.is_none_or(|s| p.status() == s))
    }

    pub fn pending_products(&self) -> ServiceResult<Vec<Product>> {
        self.sorted(&|p| p.status() == ProductStatus::Pending)
    }

    pub fn all_products(&self, status: Option<ProductStatus>) -> ServiceResult<Vec<Product>> {
        self.sorted(&|p| status.is_none_or(|s| p.status() == s))
    }

    fn sorted(&self, filter: &dyn Fn(&Product) -> bool) -> ServiceResult<Vec<Product>> {
        let mut products = self.ctx.store().find_products(filter)?;
        newest_first(&mut products, |p| (p.created_at(), p.id_typed()));
        Ok(products)
    }

    fn run(&self, product_id: ProductId, command: ProductCommand) -> ServiceResult<Product> {
        let mut product = self.load(product_id)?;
        let mut work = UnitOfWork::new();
        work.execute(&mut product, &command)?;
        work.put(&product);
        self.ctx.commit(work)?;

        let product = product.into_inner();
        tracing::info!(
            product_id = %product_id,
            status = product.status().as_str(),
            "product updated"
        );
        Ok(product)
    }

    fn load(&self, product_id: ProductId) -> ServiceResult<Tracked<Product>> {
        self.ctx
            .store()
            .product(product_id)?
            .map(Tracked::loaded)
            .ok_or_else(|| DomainError::not_found("product").into())
    }
}
