use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use setu_core::{Aggregate, AggregateRoot, DomainError, ProductId, UserId};
use setu_events::Event;

/// Listing category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Electronics,
    Furniture,
    Clothing,
    Appliances,
    Toys,
    Vehicles,
    Others,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Electronics => "electronics",
            Category::Furniture => "furniture",
            Category::Clothing => "clothing",
            Category::Appliances => "appliances",
            Category::Toys => "toys",
            Category::Vehicles => "vehicles",
            Category::Others => "others",
        }
    }
}

impl FromStr for Category {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "electronics" => Ok(Category::Electronics),
            "furniture" => Ok(Category::Furniture),
            "clothing" => Ok(Category::Clothing),
            "appliances" => Ok(Category::Appliances),
            "toys" => Ok(Category::Toys),
            "vehicles" => Ok(Category::Vehicles),
            "others" => Ok(Category::Others),
            other => Err(DomainError::invalid_request(format!("unknown category '{other}'"))),
        }
    }
}

/// Physical condition of a seized item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    New,
    LikeNew,
    #[default]
    Good,
    Fair,
}

/// Listing lifecycle.
///
/// `pending -> approved | rejected` by an admin; `approved <-> sold` by the
/// order engine as stock runs out and comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Pending,
    Approved,
    Rejected,
    Sold,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Pending => "pending",
            ProductStatus::Approved => "approved",
            ProductStatus::Rejected => "rejected",
            ProductStatus::Sold => "sold",
        }
    }
}

impl FromStr for ProductStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ProductStatus::Pending),
            "approved" => Ok(ProductStatus::Approved),
            "rejected" => Ok(ProductStatus::Rejected),
            "sold" => Ok(ProductStatus::Sold),
            other => Err(DomainError::invalid_status(format!("unknown product status '{other}'"))),
        }
    }
}

/// Upper bound for a listing price, in the smallest currency unit.
///
/// Any price at or below this times any `u32` quantity fits in an `i64`.
pub const MAX_PRICE: u64 = 1_000_000_000;

/// Everything an agency supplies when listing an item.
///
/// Prices are in the smallest currency unit. `selling_price <= original_price`
/// is expected but deliberately not enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingDetails {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub original_price: u64,
    pub selling_price: u64,
    pub quantity: u32,
    #[serde(default)]
    pub condition: Condition,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Partial edit of a listing; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub original_price: Option<u64>,
    pub selling_price: Option<u64>,
    pub quantity: Option<u32>,
    pub condition: Option<Condition>,
    pub images: Option<Vec<String>>,
}

/// Aggregate root: Product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    id: ProductId,
    agency: UserId,
    agency_name: String,
    title: String,
    description: String,
    category: Category,
    original_price: u64,
    selling_price: u64,
    quantity: u32,
    condition: Condition,
    images: Vec<String>,
    status: ProductStatus,
    views: u64,
    rejection_reason: Option<String>,
    sold_at: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    version: u64,
    #[serde(skip)]
    created: bool,
}

impl Product {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            agency: UserId::from_uuid(Uuid::nil()),
            agency_name: String::new(),
            title: String::new(),
            description: String::new(),
            category: Category::Others,
            original_price: 0,
            selling_price: 0,
            quantity: 0,
            condition: Condition::default(),
            images: Vec::new(),
            status: ProductStatus::Pending,
            views: 0,
            rejection_reason: None,
            sold_at: None,
            created_at: None,
            updated_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn agency(&self) -> UserId {
        self.agency
    }

    pub fn agency_name(&self) -> &str {
        &self.agency_name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn original_price(&self) -> u64 {
        self.original_price
    }

    pub fn selling_price(&self) -> u64 {
        self.selling_price
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn condition(&self) -> Condition {
        self.condition
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    /// First image, or empty when the listing has none.
    pub fn primary_image(&self) -> &str {
        self.images.first().map(String::as_str).unwrap_or("")
    }

    pub fn status(&self) -> ProductStatus {
        self.status
    }

    /// Detail-page views. Not part of the versioned document; the store
    /// stamps the current count on every read.
    pub fn views(&self) -> u64 {
        self.views
    }

    pub fn with_views(mut self, views: u64) -> Self {
        self.views = views;
        self
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    pub fn sold_at(&self) -> Option<DateTime<Utc>> {
        self.sold_at
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn is_purchasable(&self) -> bool {
        self.status == ProductStatus::Approved
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListProduct {
    pub product_id: ProductId,
    pub agency: UserId,
    pub agency_name: String,
    pub details: ListingDetails,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateListing {
    pub product_id: ProductId,
    pub agency: UserId,
    pub changes: ListingChanges,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteListing {
    pub product_id: ProductId,
    pub agency: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveProduct {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectProduct {
    pub product_id: ProductId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Take `quantity` units out of stock for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveStock {
    pub product_id: ProductId,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Put `quantity` units back after a cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreStock {
    pub product_id: ProductId,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductCommand {
    ListProduct(ListProduct),
    UpdateListing(UpdateListing),
    DeleteListing(DeleteListing),
    ApproveProduct(ApproveProduct),
    RejectProduct(RejectProduct),
    ReserveStock(ReserveStock),
    RestoreStock(RestoreStock),
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductListed {
    pub product_id: ProductId,
    pub agency: UserId,
    pub agency_name: String,
    pub details: ListingDetails,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingUpdated {
    pub product_id: ProductId,
    pub details: ListingDetails,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingDeleted {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductApproved {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRejected {
    pub product_id: ProductId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReserved {
    pub product_id: ProductId,
    pub quantity: u32,
    pub remaining: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSoldOut {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRestored {
    pub product_id: ProductId,
    pub quantity: u32,
    pub remaining: u32,
    pub occurred_at: DateTime<Utc>,
}

/// A sold-out listing got stock back and is purchasable again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRelisted {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductEvent {
    ProductListed(ProductListed),
    ListingUpdated(ListingUpdated),
    ListingDeleted(ListingDeleted),
    ProductApproved(ProductApproved),
    ProductRejected(ProductRejected),
    StockReserved(StockReserved),
    ProductSoldOut(ProductSoldOut),
    StockRestored(StockRestored),
    ProductRelisted(ProductRelisted),
}

impl Event for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductListed(_) => "catalog.product.listed",
            ProductEvent::ListingUpdated(_) => "catalog.product.updated",
            ProductEvent::ListingDeleted(_) => "catalog.product.deleted",
            ProductEvent::ProductApproved(_) => "catalog.product.approved",
            ProductEvent::ProductRejected(_) => "catalog.product.rejected",
            ProductEvent::StockReserved(_) => "catalog.product.stock_reserved",
            ProductEvent::ProductSoldOut(_) => "catalog.product.sold_out",
            ProductEvent::StockRestored(_) => "catalog.product.stock_restored",
            ProductEvent::ProductRelisted(_) => "catalog.product.relisted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::ProductListed(e) => e.occurred_at,
            ProductEvent::ListingUpdated(e) => e.occurred_at,
            ProductEvent::ListingDeleted(e) => e.occurred_at,
            ProductEvent::ProductApproved(e) => e.occurred_at,
            ProductEvent::ProductRejected(e) => e.occurred_at,
            ProductEvent::StockReserved(e) => e.occurred_at,
            ProductEvent::ProductSoldOut(e) => e.occurred_at,
            ProductEvent::StockRestored(e) => e.occurred_at,
            ProductEvent::ProductRelisted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Product {
    type Command = ProductCommand;
    type Event = ProductEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProductEvent::ProductListed(e) => {
                self.id = e.product_id;
                self.agency = e.agency;
                self.agency_name = e.agency_name.clone();
                self.set_details(&e.details);
                self.status = ProductStatus::Pending;
                self.rejection_reason = None;
                self.sold_at = None;
                self.created_at = Some(e.occurred_at);
                self.updated_at = Some(e.occurred_at);
                self.created = true;
            }
            ProductEvent::ListingUpdated(e) => {
                self.set_details(&e.details);
                self.status = ProductStatus::Pending;
                self.rejection_reason = None;
                self.updated_at = Some(e.occurred_at);
            }
            ProductEvent::ListingDeleted(e) => {
                self.updated_at = Some(e.occurred_at);
            }
            ProductEvent::ProductApproved(e) => {
                self.status = ProductStatus::Approved;
                self.rejection_reason = None;
                self.updated_at = Some(e.occurred_at);
            }
            ProductEvent::ProductRejected(e) => {
                self.status = ProductStatus::Rejected;
                self.rejection_reason = Some(e.reason.clone());
                self.updated_at = Some(e.occurred_at);
            }
            ProductEvent::StockReserved(e) => {
                self.quantity = e.remaining;
                self.updated_at = Some(e.occurred_at);
            }
            ProductEvent::ProductSoldOut(e) => {
                self.status = ProductStatus::Sold;
                self.sold_at = Some(e.occurred_at);
            }
            ProductEvent::StockRestored(e) => {
                self.quantity = e.remaining;
                self.updated_at = Some(e.occurred_at);
            }
            ProductEvent::ProductRelisted(_) => {
                self.status = ProductStatus::Approved;
                self.sold_at = None;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProductCommand::ListProduct(cmd) => self.handle_list(cmd),
            ProductCommand::UpdateListing(cmd) => self.handle_update(cmd),
            ProductCommand::DeleteListing(cmd) => self.handle_delete(cmd),
            ProductCommand::ApproveProduct(cmd) => self.handle_approve(cmd),
            ProductCommand::RejectProduct(cmd) => self.handle_reject(cmd),
            ProductCommand::ReserveStock(cmd) => self.handle_reserve(cmd),
            ProductCommand::RestoreStock(cmd) => self.handle_restore(cmd),
        }
    }
}

impl Product {
    fn set_details(&mut self, details: &ListingDetails) {
        self.title = details.title.clone();
        self.description = details.description.clone();
        self.category = details.category;
        self.original_price = details.original_price;
        self.selling_price = details.selling_price;
        self.quantity = details.quantity;
        self.condition = details.condition;
        self.images = details.images.clone();
    }

    fn details(&self) -> ListingDetails {
        ListingDetails {
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category,
            original_price: self.original_price,
            selling_price: self.selling_price,
            quantity: self.quantity,
            condition: self.condition,
            images: self.images.clone(),
        }
    }

    fn ensure_exists(&self, product_id: ProductId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found("product"));
        }
        if self.id != product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(())
    }

    fn ensure_owner(&self, agency: UserId) -> Result<(), DomainError> {
        if self.agency != agency {
            return Err(DomainError::forbidden("listing belongs to another agency"));
        }
        Ok(())
    }

    fn validate_details(details: &ListingDetails) -> Result<ListingDetails, DomainError> {
        let title = details.title.trim();
        if title.is_empty() {
            return Err(DomainError::invalid_request("title is required"));
        }
        let description = details.description.trim();
        if description.is_empty() {
            return Err(DomainError::invalid_request("description is required"));
        }
        if details.original_price == 0 || details.selling_price == 0 {
            return Err(DomainError::invalid_request("prices must be positive"));
        }
        if details.original_price > MAX_PRICE || details.selling_price > MAX_PRICE {
            return Err(DomainError::invalid_request(format!(
                "prices must not exceed {MAX_PRICE}"
            )));
        }
        if details.quantity == 0 {
            return Err(DomainError::invalid_request("quantity must be at least 1"));
        }

        Ok(ListingDetails {
            title: title.to_string(),
            description: description.to_string(),
            images: details
                .images
                .iter()
                .map(|i| i.trim().to_string())
                .filter(|i| !i.is_empty())
                .collect(),
            ..details.clone()
        })
    }

    fn handle_list(&self, cmd: &ListProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("product already exists"));
        }

        let details = Self::validate_details(&cmd.details)?;

        Ok(vec![ProductEvent::ProductListed(ProductListed {
            product_id: cmd.product_id,
            agency: cmd.agency,
            agency_name: cmd.agency_name.clone(),
            details,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateListing) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_exists(cmd.product_id)?;
        self.ensure_owner(cmd.agency)?;

        if !matches!(self.status, ProductStatus::Pending | ProductStatus::Rejected) {
            return Err(DomainError::invalid_transition(format!(
                "cannot edit a {} listing",
                self.status.as_str()
            )));
        }

        let current = self.details();
        let c = &cmd.changes;
        let merged = ListingDetails {
            title: c.title.clone().unwrap_or(current.title),
            description: c.description.clone().unwrap_or(current.description),
            category: c.category.unwrap_or(current.category),
            original_price: c.original_price.unwrap_or(current.original_price),
            selling_price: c.selling_price.unwrap_or(current.selling_price),
            quantity: c.quantity.unwrap_or(current.quantity),
            condition: c.condition.unwrap_or(current.condition),
            images: c.images.clone().unwrap_or(current.images),
        };
        let details = Self::validate_details(&merged)?;

        Ok(vec![ProductEvent::ListingUpdated(ListingUpdated {
            product_id: cmd.product_id,
            details,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteListing) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_exists(cmd.product_id)?;
        self.ensure_owner(cmd.agency)?;

        if self.status == ProductStatus::Sold {
            return Err(DomainError::invalid_transition("sold listings cannot be deleted"));
        }

        Ok(vec![ProductEvent::ListingDeleted(ListingDeleted {
            product_id: cmd.product_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_approve(&self, cmd: &ApproveProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_exists(cmd.product_id)?;

        if self.status != ProductStatus::Pending {
            return Err(DomainError::invalid_transition(format!(
                "only pending listings can be approved (current: {})",
                self.status.as_str()
            )));
        }

        Ok(vec![ProductEvent::ProductApproved(ProductApproved {
            product_id: cmd.product_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject(&self, cmd: &RejectProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_exists(cmd.product_id)?;

        let reason = cmd.reason.trim();
        if reason.is_empty() {
            return Err(DomainError::invalid_request("rejection reason is required"));
        }
        if self.status == ProductStatus::Sold {
            return Err(DomainError::invalid_transition("sold listings cannot be rejected"));
        }

        Ok(vec![ProductEvent::ProductRejected(ProductRejected {
            product_id: cmd.product_id,
            reason: reason.to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reserve(&self, cmd: &ReserveStock) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_exists(cmd.product_id)?;

        if cmd.quantity == 0 {
            return Err(DomainError::invalid_request("quantity must be at least 1"));
        }
        if !self.is_purchasable() {
            return Err(DomainError::unavailable(format!(
                "'{}' is {}",
                self.title,
                self.status.as_str()
            )));
        }
        if cmd.quantity > self.quantity {
            return Err(DomainError::insufficient_stock(format!(
                "'{}': requested {}, available {}",
                self.title, cmd.quantity, self.quantity
            )));
        }

        let remaining = self.quantity - cmd.quantity;
        let mut events = vec![ProductEvent::StockReserved(StockReserved {
            product_id: cmd.product_id,
            quantity: cmd.quantity,
            remaining,
            occurred_at: cmd.occurred_at,
        })];
        if remaining == 0 {
            events.push(ProductEvent::ProductSoldOut(ProductSoldOut {
                product_id: cmd.product_id,
                occurred_at: cmd.occurred_at,
            }));
        }
        Ok(events)
    }

    fn handle_restore(&self, cmd: &RestoreStock) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_exists(cmd.product_id)?;

        if cmd.quantity == 0 {
            return Ok(vec![]);
        }

        let remaining = self
            .quantity
            .checked_add(cmd.quantity)
            .ok_or_else(|| DomainError::invalid_request("stock overflow"))?;

        let mut events = vec![ProductEvent::StockRestored(StockRestored {
            product_id: cmd.product_id,
            quantity: cmd.quantity,
            remaining,
            occurred_at: cmd.occurred_at,
        })];
        if self.status == ProductStatus::Sold {
            events.push(ProductEvent::ProductRelisted(ProductRelisted {
                product_id: cmd.product_id,
                occurred_at: cmd.occurred_at,
            }));
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn details(quantity: u32) -> ListingDetails {
        ListingDetails {
            title: "Seized laptop".to_string(),
            description: "14 inch, charger included".to_string(),
            category: Category::Electronics,
            original_price: 1000,
            selling_price: 600,
            quantity,
            condition: Condition::Good,
            images: vec!["a.jpg".to_string(), "b.jpg".to_string()],
        }
    }

    fn listed(agency: UserId, quantity: u32) -> Product {
        let product_id = ProductId::new();
        let mut product = Product::empty(product_id);
        product
            .execute(&ProductCommand::ListProduct(ListProduct {
                product_id,
                agency,
                agency_name: "Customs".to_string(),
                details: details(quantity),
                occurred_at: test_time(),
            }))
            .unwrap();
        product
    }

    fn approved(quantity: u32) -> Product {
        let mut product = listed(UserId::new(), quantity);
        let product_id = product.id_typed();
        product
            .execute(&ProductCommand::ApproveProduct(ApproveProduct {
                product_id,
                occurred_at: test_time(),
            }))
            .unwrap();
        product
    }

    fn reserve(product: &Product, quantity: u32) -> Result<Vec<ProductEvent>, DomainError> {
        product.handle(&ProductCommand::ReserveStock(ReserveStock {
            product_id: product.id_typed(),
            quantity,
            occurred_at: test_time(),
        }))
    }

    fn restore(product: &mut Product, quantity: u32) {
        let product_id = product.id_typed();
        product
            .execute(&ProductCommand::RestoreStock(RestoreStock {
                product_id,
                quantity,
                occurred_at: test_time(),
            }))
            .unwrap();
    }

    #[test]
    fn new_listing_is_pending() {
        let product = listed(UserId::new(), 3);
        assert_eq!(product.status(), ProductStatus::Pending);
        assert_eq!(product.quantity(), 3);
        assert_eq!(product.primary_image(), "a.jpg");
        assert_eq!(product.version(), 1);
    }

    #[test]
    fn listing_requires_positive_quantity() {
        let product_id = ProductId::new();
        let err = Product::empty(product_id)
            .handle(&ProductCommand::ListProduct(ListProduct {
                product_id,
                agency: UserId::new(),
                agency_name: "Customs".to_string(),
                details: details(0),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        match err {
            DomainError::InvalidRequest(_) => {}
            _ => panic!("Expected InvalidRequest"),
        }
    }

    #[test]
    fn approve_only_from_pending() {
        let product = approved(1);
        let err = product
            .handle(&ProductCommand::ApproveProduct(ApproveProduct {
                product_id: product.id_typed(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        match err {
            DomainError::InvalidTransition(_) => {}
            _ => panic!("Expected InvalidTransition"),
        }
    }

    #[test]
    fn reject_requires_reason_and_stores_it_trimmed() {
        let mut product = listed(UserId::new(), 1);
        let product_id = product.id_typed();

        let err = product
            .handle(&ProductCommand::RejectProduct(RejectProduct {
                product_id,
                reason: "   ".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        match err {
            DomainError::InvalidRequest(_) => {}
            _ => panic!("Expected InvalidRequest for blank reason"),
        }

        product
            .execute(&ProductCommand::RejectProduct(RejectProduct {
                product_id,
                reason: " blurry photos ".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap();
        assert_eq!(product.status(), ProductStatus::Rejected);
        assert_eq!(product.rejection_reason(), Some("blurry photos"));
    }

    #[test]
    fn update_by_owner_resets_to_pending() {
        let agency = UserId::new();
        let mut product = listed(agency, 2);
        let product_id = product.id_typed();
        product
            .execute(&ProductCommand::RejectProduct(RejectProduct {
                product_id,
                reason: "price too high".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap();

        product
            .execute(&ProductCommand::UpdateListing(UpdateListing {
                product_id,
                agency,
                changes: ListingChanges {
                    selling_price: Some(500),
                    ..Default::default()
                },
                occurred_at: test_time(),
            }))
            .unwrap();

        assert_eq!(product.status(), ProductStatus::Pending);
        assert_eq!(product.selling_price(), 500);
        assert_eq!(product.title(), "Seized laptop");
        assert_eq!(product.rejection_reason(), None);
    }

    #[test]
    fn update_by_other_agency_is_forbidden() {
        let product = listed(UserId::new(), 2);
        let err = product
            .handle(&ProductCommand::UpdateListing(UpdateListing {
                product_id: product.id_typed(),
                agency: UserId::new(),
                changes: ListingChanges::default(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        match err {
            DomainError::Forbidden(_) => {}
            _ => panic!("Expected Forbidden"),
        }
    }

    #[test]
    fn approved_listing_cannot_be_edited() {
        let product = approved(2);
        let err = product
            .handle(&ProductCommand::UpdateListing(UpdateListing {
                product_id: product.id_typed(),
                agency: product.agency(),
                changes: ListingChanges::default(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        match err {
            DomainError::InvalidTransition(_) => {}
            _ => panic!("Expected InvalidTransition"),
        }
    }

    #[test]
    fn reserving_last_unit_marks_sold() {
        let mut product = approved(1);
        let events = reserve(&product, 1).unwrap();
        assert_eq!(events.len(), 2);
        for e in &events {
            product.apply(e);
        }
        assert_eq!(product.quantity(), 0);
        assert_eq!(product.status(), ProductStatus::Sold);
        assert!(product.sold_at().is_some());
    }

    #[test]
    fn partial_reservation_keeps_approved() {
        let mut product = approved(5);
        for e in reserve(&product, 2).unwrap() {
            product.apply(&e);
        }
        assert_eq!(product.quantity(), 3);
        assert_eq!(product.status(), ProductStatus::Approved);
    }

    #[test]
    fn reserve_checks_status_then_stock() {
        let pending = listed(UserId::new(), 5);
        match reserve(&pending, 1).unwrap_err() {
            DomainError::Unavailable(_) => {}
            _ => panic!("Expected Unavailable"),
        }

        let product = approved(2);
        match reserve(&product, 3).unwrap_err() {
            DomainError::InsufficientStock(_) => {}
            _ => panic!("Expected InsufficientStock"),
        }
    }

    #[test]
    fn restore_relists_sold_product() {
        let mut product = approved(1);
        for e in reserve(&product, 1).unwrap() {
            product.apply(&e);
        }
        restore(&mut product, 1);
        assert_eq!(product.quantity(), 1);
        assert_eq!(product.status(), ProductStatus::Approved);
        assert_eq!(product.sold_at(), None);
    }

    #[test]
    fn sold_listing_cannot_be_deleted() {
        let mut product = approved(1);
        for e in reserve(&product, 1).unwrap() {
            product.apply(&e);
        }
        let err = product
            .handle(&ProductCommand::DeleteListing(DeleteListing {
                product_id: product.id_typed(),
                agency: product.agency(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        match err {
            DomainError::InvalidTransition(_) => {}
            _ => panic!("Expected InvalidTransition"),
        }
    }

    #[test]
    fn missing_product_is_not_found() {
        let product_id = ProductId::new();
        let err = Product::empty(product_id)
            .handle(&ProductCommand::ApproveProduct(ApproveProduct {
                product_id,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::not_found("product"));
    }

    #[test]
    fn listing_price_is_capped() {
        let product_id = ProductId::new();
        let mut over = details(1);
        over.selling_price = MAX_PRICE + 1;
        let err = Product::empty(product_id)
            .handle(&ProductCommand::ListProduct(ListProduct {
                product_id,
                agency: UserId::new(),
                agency_name: "Customs".to_string(),
                details: over,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        match err {
            DomainError::InvalidRequest(_) => {}
            _ => panic!("Expected InvalidRequest"),
        }

        let agency = UserId::new();
        let product = listed(agency, 1);
        let err = product
            .handle(&ProductCommand::UpdateListing(UpdateListing {
                product_id: product.id_typed(),
                agency,
                changes: ListingChanges {
                    original_price: Some(10_000_000_000),
                    ..Default::default()
                },
                occurred_at: test_time(),
            }))
            .unwrap_err();
        match err {
            DomainError::InvalidRequest(_) => {}
            _ => panic!("Expected InvalidRequest"),
        }
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let product = approved(4);
        let before = product.clone();
        let _ = reserve(&product, 2).unwrap();
        assert_eq!(product, before);
    }

    #[test]
    fn serializes_lowercase_enums() {
        let product = approved(1);
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["status"], "approved");
        assert_eq!(json["category"], "electronics");
        assert_eq!(json["condition"], "good");
        assert!(json.get("created").is_none());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: reserving then restoring the same amount is a no-op on the ledger.
            #[test]
            fn reserve_then_restore_conserves_stock(stock in 1u32..500, take in 1u32..500) {
                prop_assume!(take <= stock);
                let mut product = approved(stock);

                for e in reserve(&product, take).unwrap() {
                    product.apply(&e);
                }
                prop_assert_eq!(product.quantity(), stock - take);
                prop_assert_eq!(product.status() == ProductStatus::Sold, take == stock);

                restore(&mut product, take);
                prop_assert_eq!(product.quantity(), stock);
                prop_assert_eq!(product.status(), ProductStatus::Approved);
            }

            /// Property: a reservation larger than stock never emits events.
            #[test]
            fn over_reservation_is_rejected(stock in 1u32..100, extra in 1u32..100) {
                let product = approved(stock);
                let result = reserve(&product, stock + extra);
                prop_assert!(matches!(result, Err(DomainError::InsufficientStock(_))));
            }
        }
    }
}
