//! `setu-auth`: authentication/authorization boundary.
//!
//! Token verification, the caller identity every operation receives, coarse
//! role guards, and the user account aggregate. Decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod roles;
pub mod user;

pub use authorize::{AuthzError, Caller, require_role};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use roles::Role;
pub use user::{
    ReactivateUser, RegisterUser, SuspendUser, User, UserCommand, UserEvent, UserReactivated,
    UserRegistered, UserStatus, UserSuspended,
};
