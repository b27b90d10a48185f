//! Password hashing and credential verification.
//!
//! Argon2id with PHC-format hash strings. The salt and cost parameters travel
//! inside the stored hash, so verification does not depend on the hasher's
//! current configuration.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

/// One-way password hashing used by the credential verifier.
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext password with a fresh random salt.
    fn hash(&self, plaintext: &str) -> Result<String, PasswordError>;

    /// Check a plaintext password against a stored hash.
    /// A mismatch or an unparseable hash is `false`, never an error.
    fn verify(&self, plaintext: &str, stored_hash: &str) -> bool;
}

#[derive(Debug)]
pub enum PasswordError {
    /// Hashing failed (bad parameters or RNG failure)
    Hashing(argon2::password_hash::Error),
    /// Cost parameters were rejected by argon2
    InvalidParams(argon2::Error),
}

impl std::fmt::Display for PasswordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PasswordError::Hashing(e) => write!(f, "Failed to hash password: {}", e),
            PasswordError::InvalidParams(e) => write!(f, "Invalid argon2 parameters: {}", e),
        }
    }
}

impl std::error::Error for PasswordError {}

/// Argon2id password hasher.
#[derive(Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    /// Hasher with the argon2 crate's recommended defaults.
    pub fn new() -> Self {
        Self {
            params: Params::default(),
        }
    }

    /// Hasher with explicit memory (KiB) and iteration costs.
    pub fn with_cost(m_cost: u32, t_cost: u32) -> Result<Self, PasswordError> {
        let params = Params::new(m_cost, t_cost, 1, None).map_err(PasswordError::InvalidParams)?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(PasswordError::Hashing)?;
        Ok(hash.to_string())
    }

    fn verify(&self, plaintext: &str, stored_hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored_hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}
