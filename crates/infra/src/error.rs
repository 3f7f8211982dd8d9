use thiserror::Error;

use setu_auth::AuthzError;
use setu_core::DomainError;

use crate::store::StoreError;

/// What every service operation can fail with.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Deterministic business failure; nothing was written.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The store refused or failed the commit; nothing was written.
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("event serialization failed: {0}")]
    Serialize(String),

    /// The commit succeeded but publishing its events did not.
    #[error("event publication failed: {0}")]
    Publish(String),
}

impl From<AuthzError> for ServiceError {
    fn from(value: AuthzError) -> Self {
        ServiceError::Domain(value.into())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(value: serde_json::Error) -> Self {
        ServiceError::Serialize(value.to_string())
    }
}

impl ServiceError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Domain(e) => e.code(),
            ServiceError::Store(StoreError::Conflict(_)) => "conflict",
            ServiceError::Store(StoreError::Duplicate(_)) => "duplicate",
            ServiceError::Store(_) => "store_error",
            ServiceError::Serialize(_) => "serialization_error",
            ServiceError::Publish(_) => "publish_error",
        }
    }

    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            ServiceError::Domain(e) => Some(e),
            _ => None,
        }
    }

    /// True for optimistic-concurrency and uniqueness refusals.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            ServiceError::Domain(DomainError::Conflict(_))
                | ServiceError::Store(StoreError::Conflict(_) | StoreError::Duplicate(_))
        )
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
