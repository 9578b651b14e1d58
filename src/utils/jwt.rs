// src/utils/jwt.rs

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Claims the API puts in its bearer tokens.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - the user id.
    #[serde(default, alias = "id")]
    pub sub: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

impl Claims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp as i64, 0)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_none_or(|exp| exp <= now)
    }
}

/// Reads the claims of a token without verifying its signature.
///
/// The client never holds the signing secret; the API stays the authority on validity.
/// This is only used to drop sessions whose token has visibly expired.
pub fn peek_claims(token: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| AppError::AuthError(format!("Malformed token: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn token(exp: i64) -> String {
        let claims = Claims {
            sub: Some("42".to_string()),
            role: Some("student".to_string()),
            exp: exp as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"server_only_secret"),
        )
        .unwrap()
    }

    #[test]
    fn reads_claims_signed_with_unknown_secret() {
        let exp = Utc::now().timestamp() + 3600;
        let claims = peek_claims(&token(exp)).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("42"));
        assert!(!claims.is_expired(Utc::now()));
    }

    #[test]
    fn detects_expired_token() {
        let exp = Utc::now().timestamp() - 10;
        let claims = peek_claims(&token(exp)).unwrap();
        assert!(claims.is_expired(Utc::now()));
    }

    #[test]
    fn rejects_garbage() {
        assert!(peek_claims("not.a.jwt").is_err());
    }
}
