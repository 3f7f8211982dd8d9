//! Bearer token verification.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use crate::claims::{JwtClaims, TokenValidationError, validate_claims};

/// Verifies a compact JWT and returns its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError>;
}

/// HS256 shared-secret validator.
///
/// Expiry is checked against our own `issued_at`/`expires_at` claims, so the
/// registered `exp` claim is not required.
pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: Vec<u8>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::new();

        Self {
            key: DecodingKey::from_secret(&secret),
            validation,
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError> {
        let data = decode::<JwtClaims>(token, &self.key, &self.validation)
            .map_err(|e| TokenValidationError::Invalid(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use setu_core::UserId;

    fn mint(secret: &str, claims: &JwtClaims) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn claims(ttl_minutes: i64) -> JwtClaims {
        let now = Utc::now();
        JwtClaims {
            sub: UserId::new(),
            role: Role::Agency,
            name: "Customs Dept".to_string(),
            email: "customs@gov.example".to_string(),
            issued_at: now - Duration::minutes(1),
            expires_at: now + Duration::minutes(ttl_minutes),
        }
    }

    #[test]
    fn valid_token_round_trips_claims() {
        let c = claims(10);
        let validator = Hs256JwtValidator::new(b"s3cret".to_vec());
        let decoded = validator.validate(&mint("s3cret", &c), Utc::now()).unwrap();
        assert_eq!(decoded, c);
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let validator = Hs256JwtValidator::new(b"s3cret".to_vec());
        match validator.validate(&mint("other", &claims(10)), Utc::now()) {
            Err(TokenValidationError::Invalid(_)) => {}
            other => panic!("Expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn expired_token_is_rejected() {
        let c = claims(10);
        let validator = Hs256JwtValidator::new(b"s3cret".to_vec());
        let later = c.expires_at + Duration::seconds(1);
        assert_eq!(
            validator.validate(&mint("s3cret", &c), later),
            Err(TokenValidationError::Expired)
        );
    }

    #[test]
    fn garbage_is_invalid() {
        let validator = Hs256JwtValidator::new(b"s3cret".to_vec());
        assert!(matches!(
            validator.validate("not.a.jwt", Utc::now()),
            Err(TokenValidationError::Invalid(_))
        ));
    }
}
