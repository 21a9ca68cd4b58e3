//! Password hashing and verification.
//!
//! Uses Argon2id with a configurable work factor.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};
use once_cell::sync::OnceCell;

use crate::config::PasswordConfig;
use crate::error::AuthError;

/// Argon2id hasher with a fixed work factor.
#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
    /// Digest checked when the account does not exist, so both login failure
    /// paths do the same amount of work.
    dummy: OnceCell<String>,
}

impl PasswordHasher {
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, AuthError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| AuthError::Hashing(format!("invalid Argon2 parameters: {e}")))?;
        Ok(Self {
            params,
            dummy: OnceCell::new(),
        })
    }

    pub fn from_config(config: &PasswordConfig) -> Result<Self, AuthError> {
        Self::new(config.memory_kib, config.iterations, config.parallelism)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password, returning the PHC-formatted string suitable for storage.
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::Hashing(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Verify a password against a stored hash.
    ///
    /// Unparsable or empty digests verify as false.
    pub fn verify(&self, hash: &str, password: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(hash) else {
            return false;
        };
        self.argon2()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Spend one verification's worth of work against a throwaway digest.
    pub fn verify_dummy(&self, password: &str) {
        let dummy = self
            .dummy
            .get_or_try_init(|| self.hash("dummy-password-for-timing"));
        if let Ok(dummy) = dummy {
            let _ = self.verify(dummy, password);
        }
    }
}
