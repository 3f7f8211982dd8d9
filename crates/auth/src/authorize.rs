use thiserror::Error;

use setu_core::{DomainError, UserId};

use crate::{JwtClaims, Role};

/// The authenticated identity an operation runs on behalf of.
///
/// Built once per request from verified claims and passed explicitly into every
/// service call; nothing looks identity up from ambient state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    pub role: Role,
    pub name: String,
    pub email: String,
}

impl Caller {
    pub fn new(user_id: UserId, role: Role, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id,
            role,
            name: name.into(),
            email: email.into(),
        }
    }

    pub fn from_claims(claims: &JwtClaims) -> Self {
        Self::new(claims.sub, claims.role, claims.name.clone(), claims.email.clone())
    }

    pub fn is(&self, role: Role) -> bool {
        self.role == role
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("role '{actual}' is not allowed (requires one of {allowed:?})")]
    RoleNotAllowed { actual: Role, allowed: Vec<Role> },
}

impl From<AuthzError> for DomainError {
    fn from(value: AuthzError) -> Self {
        DomainError::forbidden(value.to_string())
    }
}

/// Coarse role allow-list check.
///
/// - No IO
/// - No panics
/// - Ownership checks are the services' job, not this one's
pub fn require_role(caller: &Caller, allowed: &[Role]) -> Result<(), AuthzError> {
    if allowed.contains(&caller.role) {
        Ok(())
    } else {
        Err(AuthzError::RoleNotAllowed {
            actual: caller.role,
            allowed: allowed.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(role: Role) -> Caller {
        Caller::new(UserId::new(), role, "Test", "test@example.com")
    }

    #[test]
    fn allowed_role_passes() {
        assert!(require_role(&caller(Role::Agency), &[Role::Agency, Role::Admin]).is_ok());
    }

    #[test]
    fn other_role_is_forbidden() {
        let err = require_role(&caller(Role::Customer), &[Role::Agency]).unwrap_err();
        match DomainError::from(err) {
            DomainError::Forbidden(msg) => assert!(msg.contains("customer")),
            _ => panic!("Expected Forbidden"),
        }
    }
}
