//! Credential hasher: argon2id verifiers for account passwords.

use crate::config::PasswordConfig;
use crate::error::AuthError;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};

/// Argon2id password hasher.
///
/// Hashing is intentionally slow. Use the `*_blocking` async wrappers from request
/// handlers so the work runs on the blocking pool.
#[derive(Debug, Clone)]
pub struct PasswordService {
    /// Argon2 hasher configuration.
    argon2: Argon2<'static>,
}

impl PasswordService {
    /// Create a new password service with default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    /// Create a new password service with custom parameters.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Hashing`] if argon2 rejects the parameters.
    pub fn with_params(
        memory_cost: u32,
        time_cost: u32,
        parallelism: u32,
        output_len: Option<usize>,
    ) -> Result<Self, AuthError> {
        let params = Params::new(memory_cost, time_cost, parallelism, output_len)
            .map_err(|e| AuthError::Hashing(format!("invalid argon2 parameters: {e}")))?;
        let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);
        Ok(Self { argon2 })
    }

    /// Build from the `[password]` config section.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Hashing`] if argon2 rejects the parameters.
    pub fn from_config(config: &PasswordConfig) -> Result<Self, AuthError> {
        Self::with_params(
            config.memory_cost,
            config.time_cost,
            config.parallelism,
            Some(config.hash_length),
        )
    }

    /// Hash a secret into a salted PHC verifier string.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Hashing`] for an empty secret or an argon2 failure.
    pub fn hash(&self, secret: &str) -> Result<String, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::Hashing("password cannot be empty".to_string()));
        }

        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Hashing(format!("failed to hash password: {e}")))
    }

    /// Check a secret against a stored verifier.
    ///
    /// Fails closed: an empty secret or a verifier that does not parse is `false`.
    #[must_use]
    pub fn verify(&self, secret: &str, verifier: &str) -> bool {
        if secret.is_empty() {
            return false;
        }

        let Ok(parsed_hash) = PasswordHash::new(verifier) else {
            return false;
        };

        // Constant-time comparison inside argon2
        self.argon2
            .verify_password(secret.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// [`Self::hash`] on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Hashing`] if hashing fails or the blocking task panics.
    pub async fn hash_blocking(&self, secret: String) -> Result<String, AuthError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(|e| AuthError::Hashing(format!("hashing task failed: {e}")))?
    }

    /// [`Self::verify`] on the blocking thread pool. A panicked task is `false`.
    pub async fn verify_blocking(&self, secret: String, verifier: String) -> bool {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&secret, &verifier))
            .await
            .unwrap_or(false)
    }
}

impl Default for PasswordService {
    fn default() -> Self {
        Self::new()
    }
}
