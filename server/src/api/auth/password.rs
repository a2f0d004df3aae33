//! Password hashing and the login credential check
//!
//! bcrypt runs on the blocking pool so it never stalls the async workers.

use thiserror::Error;

use crate::core::constants::BCRYPT_COST;
use crate::data::types::{UserRow, UserStatus};

#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Password hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Hash a password with bcrypt
pub async fn hash_password(password: &str) -> Result<String, PasswordError> {
    let password = password.to_string();
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST)).await??;
    Ok(hash)
}

/// Compare a password against a stored hash; a malformed hash never matches
pub async fn verify_password(password: &str, hash: &str) -> bool {
    let password = password.to_string();
    let hash = hash.to_string();
    match tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await {
        Ok(Ok(matches)) => matches,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Stored password hash could not be verified");
            false
        }
        Err(e) => {
            tracing::error!(error = %e, "Password verification task failed");
            false
        }
    }
}

/// Outcome of a rejected login
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginRejection {
    /// Unknown email or wrong password; deliberately indistinguishable
    InvalidCredentials,
    /// Correct credentials for an account that is not Active
    Inactive,
}

/// Decide a login attempt from the looked-up user and the password check
pub fn check_login(user: Option<&UserRow>, password_matches: bool) -> Result<(), LoginRejection> {
    let Some(user) = user else {
        return Err(LoginRejection::InvalidCredentials);
    };
    if !password_matches {
        return Err(LoginRejection::InvalidCredentials);
    }
    if user.status != UserStatus::Active.as_str() {
        return Err(LoginRejection::Inactive);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(status: &str) -> UserRow {
        UserRow {
            id: "user-1".to_string(),
            name: "Dana".to_string(),
            email: "dana@example.com".to_string(),
            password: String::new(),
            role: "Developer".to_string(),
            status: status.to_string(),
            avatar: None,
            last_active: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hash = hash_password("hunter22").await.unwrap();
        assert!(hash.starts_with("$2"));
        assert!(verify_password("hunter22", &hash).await);
        assert!(!verify_password("hunter23", &hash).await);
    }

    #[tokio::test]
    async fn test_verify_malformed_hash_is_false() {
        assert!(!verify_password("anything", "not-a-bcrypt-hash").await);
    }

    #[test]
    fn test_unknown_user_and_wrong_password_look_the_same() {
        let active = user("Active");
        assert_eq!(
            check_login(None, false),
            Err(LoginRejection::InvalidCredentials)
        );
        assert_eq!(
            check_login(Some(&active), false),
            Err(LoginRejection::InvalidCredentials)
        );
    }

    #[test]
    fn test_inactive_user_rejected_after_password_check() {
        let inactive = user("Inactive");
        assert_eq!(
            check_login(Some(&inactive), true),
            Err(LoginRejection::Inactive)
        );
        assert_eq!(
            check_login(Some(&inactive), false),
            Err(LoginRejection::InvalidCredentials)
        );
    }

    #[test]
    fn test_active_user_with_password_passes() {
        assert_eq!(check_login(Some(&user("Active")), true), Ok(()));
    }
}
