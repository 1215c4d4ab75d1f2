//! Password hashing with Argon2id

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::warn;

use crate::error::AuthError;

/// Longest accepted plaintext, in bytes
///
/// Argon2 itself accepts inputs up to 2^32 bytes; the ceiling keeps a
/// single request from burning CPU on megabyte-sized passwords.
pub const MAX_PASSWORD_BYTES: usize = 256;

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingParams {
    /// Memory cost in KiB
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingParams {
    /// 64 MiB, 3 passes, 4 lanes: roughly 100ms per hash on current hardware
    fn default() -> Self {
        Self {
            memory_kib: 65536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

/// Hashes and verifies user credentials
///
/// The produced PHC string embeds algorithm, version, cost and salt, so
/// verification reads everything it needs from the stored hash and keeps
/// working after the configured cost changes.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl CredentialHasher {
    pub fn new(params: HashingParams) -> Result<Self, AuthError> {
        let params = Params::new(params.memory_kib, params.iterations, params.parallelism, None)
            .map_err(|e| AuthError::PasswordHash(e.to_string()))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a plaintext password with a fresh random salt
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        check_length(password)?;

        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::PasswordHash(e.to_string()))
    }

    /// Verify a plaintext password against a stored hash
    ///
    /// Returns `Ok(false)` on mismatch and `CredentialFormat` when the stored
    /// hash cannot be parsed. The digest comparison is constant-time.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        if password.len() > MAX_PASSWORD_BYTES {
            return Ok(false);
        }

        let parsed = PasswordHash::new(hash).map_err(|e| {
            warn!("Stored credential failed to parse: {}", e);
            AuthError::CredentialFormat(e.to_string())
        })?;

        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::CredentialFormat(e.to_string())),
        }
    }

    /// Hash on the blocking pool so request tasks are not stalled
    pub async fn hash_blocking(&self, password: String) -> Result<String, AuthError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::PasswordHash(format!("Task join error: {}", e)))?
    }

    /// Verify on the blocking pool so request tasks are not stalled
    pub async fn verify_blocking(&self, password: String, hash: String) -> Result<bool, AuthError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::PasswordHash(format!("Task join error: {}", e)))?
    }
}

fn check_length(password: &str) -> Result<(), AuthError> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AuthError::Validation(format!(
            "Password exceeds maximum length of {} bytes",
            MAX_PASSWORD_BYTES
        )));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_hasher() -> CredentialHasher {
    CredentialHasher::new(HashingParams {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    })
    .unwrap()
}
