//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Deterministic business failures only. Every operation validates before it
/// mutates anything, so any of these means "nothing happened".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed input (empty item list, zero quantity, blank field).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Shipping address failed validation.
    #[error("invalid shipping address: {0}")]
    InvalidAddress(String),

    /// The named entity does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Product exists but is not purchasable (not approved).
    #[error("product unavailable: {0}")]
    Unavailable(String),

    /// Requested quantity exceeds remaining stock.
    #[error("insufficient stock: {0}")]
    InsufficientStock(String),

    /// Caller lacks ownership or role for the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Unrecognized status value.
    #[error("invalid status: {0}")]
    InvalidStatus(String),

    /// Operation not allowed from the current lifecycle state.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// Stale version or uniqueness clash.
    #[error("conflict: {0}")]
    Conflict(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A command was routed to the wrong aggregate instance.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::InvalidAddress(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn insufficient_stock(msg: impl Into<String>) -> Self {
        Self::InsufficientStock(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn invalid_status(msg: impl Into<String>) -> Self {
        Self::InvalidStatus(msg.into())
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    /// Stable machine-readable code, used by transports.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::InvalidRequest(_) => "invalid_request",
            DomainError::InvalidAddress(_) => "invalid_address",
            DomainError::NotFound(_) => "not_found",
            DomainError::Unavailable(_) => "unavailable",
            DomainError::InsufficientStock(_) => "insufficient_stock",
            DomainError::Forbidden(_) => "forbidden",
            DomainError::InvalidStatus(_) => "invalid_status",
            DomainError::InvalidTransition(_) => "invalid_transition",
            DomainError::Conflict(_) => "conflict",
            DomainError::InvalidId(_) => "invalid_id",
            DomainError::InvariantViolation(_) => "invariant_violation",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_entity() {
        let err = DomainError::not_found("product");
        assert_eq!(err.to_string(), "product not found");
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn codes_are_distinct_per_kind() {
        let errs = [
            DomainError::invalid_request("x"),
            DomainError::invalid_address("x"),
            DomainError::not_found("x"),
            DomainError::unavailable("x"),
            DomainError::insufficient_stock("x"),
            DomainError::forbidden("x"),
            DomainError::invalid_status("x"),
            DomainError::invalid_transition("x"),
            DomainError::conflict("x"),
            DomainError::invalid_id("x"),
            DomainError::invariant("x"),
        ];
        let mut codes: Vec<_> = errs.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errs.len());
    }
}
