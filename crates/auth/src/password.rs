//! Password hashing (Argon2id, salted, PHC string format).

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("password must not be empty")]
    Empty,

    #[error("password does not match")]
    Mismatch,

    #[error("stored password hash is unreadable")]
    CorruptHash,

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// Argon2id cost parameters used when hashing new passwords.
///
/// Verification always uses the parameters recorded inside the stored hash, so
/// raising the cost only affects passwords hashed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    pub memory_kib: u32,
    pub iterations: u32,
}

impl HashCost {
    /// Server-side default, tuned to take well over 100ms per hash.
    pub const fn standard() -> Self {
        Self {
            memory_kib: 64 * 1024,
            iterations: 3,
        }
    }

    /// Minimal cost for tests.
    pub const fn fast() -> Self {
        Self {
            memory_kib: 64,
            iterations: 1,
        }
    }

    fn hasher(&self) -> Result<Argon2<'static>, PasswordError> {
        let params = Params::new(self.memory_kib, self.iterations, 1, None)
            .map_err(|e| PasswordError::Hashing(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl Default for HashCost {
    fn default() -> Self {
        Self::standard()
    }
}

pub fn hash_password(raw: &str, cost: HashCost) -> Result<String, PasswordError> {
    if raw.is_empty() {
        return Err(PasswordError::Empty);
    }

    let salt = SaltString::generate(&mut OsRng);
    cost.hasher()?
        .hash_password(raw.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hashing(e.to_string()))
}

/// Verify `raw` against a stored PHC hash. The digest comparison is constant-time.
pub fn verify_password(raw: &str, stored: &str) -> Result<(), PasswordError> {
    let parsed = PasswordHash::new(stored).map_err(|_| PasswordError::CorruptHash)?;
    Argon2::default()
        .verify_password(raw.as_bytes(), &parsed)
        .map_err(|e| match e {
            argon2::password_hash::Error::Password => PasswordError::Mismatch,
            other => PasswordError::Hashing(other.to_string()),
        })
}
