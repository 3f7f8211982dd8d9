use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use setu_core::{Aggregate, AggregateRoot, DomainError, OrderId, ProductId, UserId};
use setu_events::Event;

use crate::address::ShippingAddress;
use crate::pricing::{self, OrderTotals};

const PLACED_LABEL: &str = "Order Placed";
const PLACED_MESSAGE: &str = "Your order has been placed successfully";
const CONFIRMED_MESSAGE: &str = "Order has been confirmed and is being prepared for shipment";
const CANCELLED_LABEL: &str = "Cancelled";
const DEFAULT_CANCEL_REASON: &str = "Order cancelled by customer";

/// Fulfilment status.
///
/// Moves forward only: `pending < confirmed < processing < shipped < delivered`,
/// with `cancelled` reachable from anything that is not yet terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    fn rank(&self) -> u8 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Confirmed => 1,
            OrderStatus::Processing => 2,
            OrderStatus::Shipped => 3,
            OrderStatus::Delivered => 4,
            OrderStatus::Cancelled => u8::MAX,
        }
    }

    /// Parse a status an agency may move an order to.
    pub fn parse_agency_target(s: &str) -> Result<Self, DomainError> {
        match s.parse::<OrderStatus>()? {
            target @ (OrderStatus::Confirmed
            | OrderStatus::Processing
            | OrderStatus::Shipped
            | OrderStatus::Delivered) => Ok(target),
            other => Err(DomainError::invalid_status(format!(
                "agencies cannot set status '{}'",
                other.as_str()
            ))),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::invalid_status(format!("unknown order status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Cod,
    Online,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

/// Line snapshot taken at purchase time; later catalog edits never touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product: ProductId,
    pub product_title: String,
    pub product_image: String,
    pub agency: UserId,
    pub agency_name: String,
    pub quantity: u32,
    pub price: u64,
    pub original_price: u64,
}

impl OrderItem {
    pub fn line_total(&self) -> Option<u64> {
        pricing::line_total(self.price, self.quantity)
    }

    pub fn line_savings(&self) -> Option<i64> {
        pricing::line_savings(self.original_price, self.price, self.quantity)
    }
}

/// Free-text progress entry. `status` is a label, not an [`OrderStatus`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingUpdate {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate root: Order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    id: OrderId,
    order_number: String,
    customer: UserId,
    customer_name: String,
    customer_email: String,
    items: Vec<OrderItem>,
    shipping_address: ShippingAddress,
    total_amount: u64,
    total_savings: i64,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    order_status: OrderStatus,
    tracking_updates: Vec<TrackingUpdate>,
    estimated_delivery: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    cancellation_reason: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    version: u64,
    #[serde(skip)]
    created: bool,
}

impl Order {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: OrderId) -> Self {
        Self {
            id,
            order_number: String::new(),
            customer: UserId::from_uuid(Uuid::nil()),
            customer_name: String::new(),
            customer_email: String::new(),
            items: Vec::new(),
            shipping_address: ShippingAddress::default(),
            total_amount: 0,
            total_savings: 0,
            payment_method: PaymentMethod::Cod,
            payment_status: PaymentStatus::Pending,
            order_status: OrderStatus::Pending,
            tracking_updates: Vec::new(),
            estimated_delivery: None,
            delivered_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            created_at: None,
            updated_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn customer(&self) -> UserId {
        self.customer
    }

    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn shipping_address(&self) -> &ShippingAddress {
        &self.shipping_address
    }

    pub fn total_amount(&self) -> u64 {
        self.total_amount
    }

    pub fn total_savings(&self) -> i64 {
        self.total_savings
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn status(&self) -> OrderStatus {
        self.order_status
    }

    pub fn tracking_updates(&self) -> &[TrackingUpdate] {
        &self.tracking_updates
    }

    pub fn estimated_delivery(&self) -> Option<DateTime<Utc>> {
        self.estimated_delivery
    }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation_reason.as_deref()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    /// True when at least one line belongs to `agency`.
    pub fn involves_agency(&self, agency: UserId) -> bool {
        self.items.iter().any(|item| item.agency == agency)
    }

    /// Σ price × quantity over the lines sold by `agency`.
    pub fn revenue_for_agency(&self, agency: UserId) -> u64 {
        self.items
            .iter()
            .filter(|item| item.agency == agency)
            .filter_map(OrderItem::line_total)
            .fold(0, u64::saturating_add)
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

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

/// Record a fully validated purchase.
///
/// Stock has already been checked by the caller; the aggregate only guards its
/// own shape (non-empty lines, valid address, allowed initial status).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub order_id: OrderId,
    pub order_number: String,
    pub customer: UserId,
    pub customer_name: String,
    pub customer_email: String,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub initial_status: OrderStatus,
    pub estimated_delivery: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceStatus {
    pub order_id: OrderId,
    pub agency: UserId,
    /// Raw target as supplied by the agency.
    pub target: String,
    /// Also append a tracking entry describing the change.
    pub track: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddTrackingUpdate {
    pub order_id: OrderId,
    pub agency: UserId,
    pub status: String,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrder {
    pub order_id: OrderId,
    pub customer: UserId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCommand {
    PlaceOrder(PlaceOrder),
    AdvanceStatus(AdvanceStatus),
    AddTrackingUpdate(AddTrackingUpdate),
    CancelOrder(CancelOrder),
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order_id: OrderId,
    pub order_number: String,
    pub customer: UserId,
    pub customer_name: String,
    pub customer_email: String,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub totals: OrderTotals,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    pub estimated_delivery: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub order_id: OrderId,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingAppended {
    pub order_id: OrderId,
    pub update: TrackingUpdate,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelled {
    pub order_id: OrderId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    OrderPlaced(OrderPlaced),
    StatusChanged(StatusChanged),
    TrackingAppended(TrackingAppended),
    OrderCancelled(OrderCancelled),
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "orders.order.placed",
            OrderEvent::StatusChanged(_) => "orders.order.status_changed",
            OrderEvent::TrackingAppended(_) => "orders.order.tracking_appended",
            OrderEvent::OrderCancelled(_) => "orders.order.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderPlaced(e) => e.occurred_at,
            OrderEvent::StatusChanged(e) => e.occurred_at,
            OrderEvent::TrackingAppended(e) => e.occurred_at,
            OrderEvent::OrderCancelled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Order {
    type Command = OrderCommand;
    type Event = OrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::OrderPlaced(e) => {
                self.id = e.order_id;
                self.order_number = e.order_number.clone();
                self.customer = e.customer;
                self.customer_name = e.customer_name.clone();
                self.customer_email = e.customer_email.clone();
                self.items = e.items.clone();
                self.shipping_address = e.shipping_address.clone();
                self.total_amount = e.totals.total_amount;
                self.total_savings = e.totals.total_savings;
                self.payment_method = e.payment_method;
                self.payment_status = e.payment_status;
                self.order_status = e.order_status;
                self.estimated_delivery = Some(e.estimated_delivery);
                self.created_at = Some(e.occurred_at);
                self.updated_at = Some(e.occurred_at);
                self.created = true;
            }
            OrderEvent::StatusChanged(e) => {
                self.order_status = e.to;
                if e.to == OrderStatus::Delivered {
                    self.delivered_at = Some(e.occurred_at);
                    self.payment_status = PaymentStatus::Completed;
                }
                self.updated_at = Some(e.occurred_at);
            }
            OrderEvent::TrackingAppended(e) => {
                self.tracking_updates.push(e.update.clone());
                self.updated_at = Some(e.occurred_at);
            }
            OrderEvent::OrderCancelled(e) => {
                self.order_status = OrderStatus::Cancelled;
                self.cancelled_at = Some(e.occurred_at);
                self.cancellation_reason = Some(e.reason.clone());
                self.updated_at = Some(e.occurred_at);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::PlaceOrder(cmd) => self.handle_place(cmd),
            OrderCommand::AdvanceStatus(cmd) => self.handle_advance(cmd),
            OrderCommand::AddTrackingUpdate(cmd) => self.handle_tracking(cmd),
            OrderCommand::CancelOrder(cmd) => self.handle_cancel(cmd),
        }
    }
}

impl Order {
    fn ensure_exists(&self, order_id: OrderId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found("order"));
        }
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn ensure_agency_involved(&self, agency: UserId) -> Result<(), DomainError> {
        if !self.involves_agency(agency) {
            return Err(DomainError::forbidden("order has no items from this agency"));
        }
        Ok(())
    }

    fn tracking(&self, status: &str, message: &str, at: DateTime<Utc>) -> OrderEvent {
        OrderEvent::TrackingAppended(TrackingAppended {
            order_id: self.id,
            update: TrackingUpdate {
                status: status.to_string(),
                message: message.to_string(),
                timestamp: at,
            },
            occurred_at: at,
        })
    }

    fn handle_place(&self, cmd: &PlaceOrder) -> Result<Vec<OrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("order already exists"));
        }
        if cmd.items.is_empty() {
            return Err(DomainError::invalid_request("order must contain at least one item"));
        }
        if cmd.items.iter().any(|item| item.quantity == 0) {
            return Err(DomainError::invalid_request("quantity must be at least 1"));
        }
        if cmd.order_number.trim().is_empty() {
            return Err(DomainError::invalid_request("order number is required"));
        }
        let shipping_address = cmd.shipping_address.validated()?;

        let (label, message) = match cmd.initial_status {
            OrderStatus::Pending => (PLACED_LABEL, PLACED_MESSAGE),
            OrderStatus::Confirmed => (OrderStatus::Confirmed.as_str(), CONFIRMED_MESSAGE),
            other => {
                return Err(DomainError::invalid_status(format!(
                    "orders cannot start as '{}'",
                    other.as_str()
                )));
            }
        };

        let payment_status = match cmd.payment_method {
            PaymentMethod::Cod => PaymentStatus::Pending,
            PaymentMethod::Online => PaymentStatus::Completed,
        };

        let placed = OrderEvent::OrderPlaced(OrderPlaced {
            order_id: cmd.order_id,
            order_number: cmd.order_number.clone(),
            customer: cmd.customer,
            customer_name: cmd.customer_name.clone(),
            customer_email: cmd.customer_email.clone(),
            items: cmd.items.clone(),
            shipping_address,
            totals: OrderTotals::of(&cmd.items)?,
            payment_method: cmd.payment_method,
            payment_status,
            order_status: cmd.initial_status,
            estimated_delivery: cmd.estimated_delivery,
            occurred_at: cmd.occurred_at,
        });

        let tracking = OrderEvent::TrackingAppended(TrackingAppended {
            order_id: cmd.order_id,
            update: TrackingUpdate {
                status: label.to_string(),
                message: message.to_string(),
                timestamp: cmd.occurred_at,
            },
            occurred_at: cmd.occurred_at,
        });

        Ok(vec![placed, tracking])
    }

    fn handle_advance(&self, cmd: &AdvanceStatus) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_exists(cmd.order_id)?;
        self.ensure_agency_involved(cmd.agency)?;

        let target = OrderStatus::parse_agency_target(&cmd.target)?;
        let current = self.order_status;

        if current.is_terminal() {
            return Err(DomainError::invalid_transition(format!(
                "order is already {}",
                current.as_str()
            )));
        }
        if target.rank() <= current.rank() {
            return Err(DomainError::invalid_transition(format!(
                "cannot move from {} to {}",
                current.as_str(),
                target.as_str()
            )));
        }

        let mut events = vec![OrderEvent::StatusChanged(StatusChanged {
            order_id: cmd.order_id,
            from: current,
            to: target,
            occurred_at: cmd.occurred_at,
        })];
        if cmd.track {
            events.push(self.tracking(
                target.as_str(),
                &format!("Order status updated to {}", target.as_str()),
                cmd.occurred_at,
            ));
        }
        Ok(events)
    }

    fn handle_tracking(&self, cmd: &AddTrackingUpdate) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_exists(cmd.order_id)?;
        self.ensure_agency_involved(cmd.agency)?;

        let label = cmd.status.trim();
        if label.is_empty() {
            return Err(DomainError::invalid_request("tracking status is required"));
        }

        Ok(vec![self.tracking(label, cmd.message.trim(), cmd.occurred_at)])
    }

    fn handle_cancel(&self, cmd: &CancelOrder) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_exists(cmd.order_id)?;

        if self.customer != cmd.customer {
            return Err(DomainError::forbidden("order belongs to another customer"));
        }
        if self.order_status.is_terminal() {
            return Err(DomainError::invalid_transition(format!(
                "cannot cancel a {} order",
                self.order_status.as_str()
            )));
        }

        let reason = cmd
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_CANCEL_REASON)
            .to_string();

        Ok(vec![
            OrderEvent::OrderCancelled(OrderCancelled {
                order_id: cmd.order_id,
                reason: reason.clone(),
                occurred_at: cmd.occurred_at,
            }),
            self.tracking(CANCELLED_LABEL, &reason, cmd.occurred_at),
        ])
    }
}
