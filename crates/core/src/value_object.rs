//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values. Order
/// item snapshots, shipping addresses and tracking entries are value objects:
/// once written into an order they are never edited in place.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct TrackingUpdate { status: String, message: String }
///
/// impl ValueObject for TrackingUpdate {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
