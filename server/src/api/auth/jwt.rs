//! JWT access token handling

use std::fmt;

use anyhow::{Result, anyhow};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::core::constants::TOKEN_TTL_HOURS;

/// JWT validation error
#[derive(Debug)]
pub enum JwtError {
    /// Token has expired
    Expired,
    /// Token signature is invalid
    InvalidSignature,
    /// Other validation error
    Invalid(String),
}

impl fmt::Display for JwtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expired => write!(f, "Token has expired"),
            Self::InvalidSignature => write!(f, "Invalid token signature"),
            Self::Invalid(msg) => write!(f, "Invalid token: {}", msg),
        }
    }
}

impl std::error::Error for JwtError {}

/// JWT claims: the user's identity at login time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: String,
    pub email: String,
    pub role: String,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(id: &str, email: &str, role: &str, name: &str) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(TOKEN_TTL_HOURS);

        Self {
            id: id.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            name: name.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        }
    }
}

/// Sign claims with HS256
pub fn create_token(signing_key: &[u8], claims: &Claims) -> Result<String> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(signing_key),
    )
    .map_err(|e| anyhow!("Failed to create JWT: {}", e))
}

/// Validate and decode a token
pub fn validate_token(token: &str, signing_key: &[u8]) -> Result<Claims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.required_spec_claims = ["exp"].into_iter().map(String::from).collect();

    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(signing_key), &validation)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
            jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidSignature,
            _ => JwtError::Invalid(e.to_string()),
        })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> Vec<u8> {
        vec![7u8; 32]
    }

    fn claims() -> Claims {
        Claims::new("user-abc", "qa@example.com", "QA", "Quinn")
    }

    #[test]
    fn test_create_and_validate() {
        let key = test_key();
        let token = create_token(&key, &claims()).unwrap();
        let decoded = validate_token(&token, &key).unwrap();
        assert_eq!(decoded.id, "user-abc");
        assert_eq!(decoded.email, "qa@example.com");
        assert_eq!(decoded.role, "QA");
        assert_eq!(decoded.name, "Quinn");
    }

    #[test]
    fn test_expiry_is_24_hours() {
        let c = claims();
        assert_eq!(c.exp - c.iat, 24 * 3600);
    }

    #[test]
    fn test_invalid_signature() {
        let token = create_token(&[0u8; 32], &claims()).unwrap();
        assert!(matches!(
            validate_token(&token, &[1u8; 32]),
            Err(JwtError::InvalidSignature)
        ));
    }

    #[test]
    fn test_expired_token() {
        let mut c = claims();
        c.iat -= 48 * 3600;
        c.exp = Utc::now().timestamp() - 3600;
        let token = create_token(&test_key(), &c).unwrap();
        assert!(matches!(
            validate_token(&token, &test_key()),
            Err(JwtError::Expired)
        ));
    }

    #[test]
    fn test_garbage_token() {
        assert!(matches!(
            validate_token("not.a.jwt", &test_key()),
            Err(JwtError::Invalid(_))
        ));
    }
}
