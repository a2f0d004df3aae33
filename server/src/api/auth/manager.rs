//! Authentication manager

use anyhow::{Result, bail};

use super::jwt::{Claims, JwtError, create_token, validate_token};
use crate::core::config::AuthConfig;
use crate::core::constants::{ENV_JWT_SECRET, MIN_JWT_SECRET_LEN};
use crate::data::types::UserRow;
use crate::utils::crypto;

/// Holds the token signing key
pub struct AuthManager {
    signing_key: Vec<u8>,
}

impl std::fmt::Debug for AuthManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthManager").finish_non_exhaustive()
    }
}

impl AuthManager {
    /// Initialize from configuration
    ///
    /// Without a configured secret a random key is generated, so tokens do not
    /// survive a restart. Production requires a configured secret.
    pub fn init(config: &AuthConfig, production: bool) -> Result<Self> {
        let signing_key = match config.jwt_secret.as_deref().filter(|s| !s.is_empty()) {
            Some(secret) if secret.len() < MIN_JWT_SECRET_LEN && production => {
                bail!("{} must be at least {} bytes", ENV_JWT_SECRET, MIN_JWT_SECRET_LEN);
            }
            Some(secret) => {
                if secret.len() < MIN_JWT_SECRET_LEN {
                    tracing::warn!(
                        min_len = MIN_JWT_SECRET_LEN,
                        "{} is shorter than recommended",
                        ENV_JWT_SECRET
                    );
                }
                secret.as_bytes().to_vec()
            }
            None if production => bail!("{} is required in production", ENV_JWT_SECRET),
            None => {
                tracing::warn!(
                    "{} not set; using a random signing key, tokens will not survive a restart",
                    ENV_JWT_SECRET
                );
                crypto::generate_key(32)
            }
        };

        tracing::debug!("Authentication manager initialized");
        Ok(Self { signing_key })
    }

    /// Issue a token for a user
    pub fn issue_token(&self, user: &UserRow) -> Result<String> {
        let claims = Claims::new(&user.id, &user.email, &user.role, &user.name);
        create_token(&self.signing_key, &claims)
    }

    /// Validate a bearer token
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        validate_token(token, &self.signing_key)
    }

    #[cfg(test)]
    pub fn for_test() -> Self {
        Self {
            signing_key: vec![42u8; 32],
        }
    }

    #[cfg(test)]
    pub fn token_for(&self, id: &str, role: &str) -> String {
        let claims = Claims::new(id, &format!("{}@example.com", id), role, id);
        create_token(&self.signing_key, &claims).unwrap()
    }

    #[cfg(test)]
    pub fn expired_token_for(&self, id: &str, role: &str) -> String {
        let mut claims = Claims::new(id, &format!("{}@example.com", id), role, id);
        claims.exp = chrono::Utc::now().timestamp() - 3600;
        create_token(&self.signing_key, &claims).unwrap()
    }
}
