//! Password hashing and verification, plus generation of reset tokens.
//!
//! Hashing is CPU-bound; handlers go through [`hash_password`] and [`verify_password`], which run
//! Argon2 on the blocking thread pool.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::{Engine as _, engine::general_purpose};
use rand::prelude::RngExt;
use rand::rng;

use crate::{config::PasswordConfig, errors::Error};

/// Argon2 hashing parameters.
#[derive(Debug, Clone, Copy)]
pub struct Argon2Params {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Argon2Params {
    /// Create Argon2 instance with these parameters.
    fn to_argon2(self) -> Result<Argon2<'static>, Error> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None).map_err(|e| Error::Internal {
            operation: format!("create argon2 params: {e}"),
        })?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl From<&PasswordConfig> for Argon2Params {
    fn from(config: &PasswordConfig) -> Self {
        Self {
            memory_kib: config.argon2_memory_kib,
            iterations: config.argon2_iterations,
            parallelism: config.argon2_parallelism,
        }
    }
}

/// Argon2id PHC string for `password`, salted freshly on every call. Blocks; see [`hash_password`].
pub fn hash_with_params(password: &str, params: Argon2Params) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = params
        .to_argon2()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::Internal {
            operation: format!("hash password: {e}"),
        })?;

    Ok(hash.to_string())
}

/// Check `password` against a stored PHC string. The cost parameters are read from the hash, so
/// accounts hashed under an older configuration keep working.
fn verify_with_hash(password: &str, hash: &str) -> Result<bool, Error> {
    let parsed = PasswordHash::new(hash).map_err(|e| Error::Internal {
        operation: format!("parse password hash: {e}"),
    })?;

    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

/// Hash a password with the configured cost, off the async runtime.
pub async fn hash_password(config: &PasswordConfig, password: &str) -> Result<String, Error> {
    let params = Argon2Params::from(config);
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hash_with_params(&password, params))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password hashing task: {e}"),
        })?
}

/// Verify a password against a stored hash, off the async runtime.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, Error> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || verify_with_hash(&password, &hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })?
}

/// Generate a secure random token for password reset
pub fn generate_reset_token() -> String {
    // Generate 32 bytes (256 bits) of cryptographically secure random data
    let mut token_bytes = [0u8; 32];
    rng().fill(&mut token_bytes);

    // Encode as base64url without padding
    general_purpose::URL_SAFE_NO_PAD.encode(token_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHEAP: Argon2Params = Argon2Params {
        memory_kib: 128,
        iterations: 1,
        parallelism: 1,
    };

    #[test]
    fn test_hash_is_salted_and_verifies() {
        let first = hash_with_params("manager_0812", CHEAP).unwrap();
        let second = hash_with_params("manager_0812", CHEAP).unwrap();

        assert_ne!(first, second);
        assert!(first.starts_with("$argon2id$"));
        for hash in [&first, &second] {
            assert!(verify_with_hash("manager_0812", hash).unwrap());
            assert!(!verify_with_hash("manager_0813", hash).unwrap());
        }
    }

    #[tokio::test]
    async fn test_hash_password_uses_configured_cost() {
        let config = PasswordConfig {
            argon2_memory_kib: 128,
            argon2_iterations: 1,
            ..Default::default()
        };

        let hash = hash_password(&config, "newpass123").await.unwrap();
        assert!(hash.contains("m=128,t=1,p=1"));
        assert!(verify_password("newpass123", &hash).await.unwrap());
        assert!(!verify_password("newpass124", &hash).await.unwrap());
    }

    #[test]
    fn test_invalid_cost_is_an_error() {
        let params = Argon2Params {
            memory_kib: 0,
            ..CHEAP
        };
        assert!(hash_with_params("anything", params).is_err());
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        assert!(verify_with_hash("anything", "not-a-phc-string").is_err());
    }

    #[test]
    fn test_reset_tokens_are_url_safe_and_unique() {
        let tokens: Vec<String> = (0..8).map(|_| generate_reset_token()).collect();

        for token in &tokens {
            // 32 random bytes, base64url without padding
            assert_eq!(token.len(), 43);
            assert!(token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        }
        let mut unique = tokens.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), tokens.len());
    }
}
