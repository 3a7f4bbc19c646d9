//! Credential primitive: salted, deliberately expensive password hashing.
//!
//! # Invariants
//! - Only the salt and the digest leave this module; the password never does.
//! - Digest comparison is constant-time.

use crate::repo::{RepoError, RepoResult};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{Output, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHasher, Version};

/// One-way salted hash used by the identity service.
pub trait CredentialHasher {
    /// Generates a fresh random salt.
    fn generate_salt(&self) -> String;
    /// Computes the digest stored for `password` under `salt`.
    fn digest(&self, password: &str, salt: &str) -> RepoResult<String>;
    /// Recomputes the digest and compares it with the stored one.
    fn verify(&self, password: &str, salt: &str, digest: &str) -> RepoResult<bool>;
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for CredentialCost {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// Argon2id hasher with B64 salts and digests.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher {
    cost: CredentialCost,
}

impl Argon2Hasher {
    pub fn new(cost: CredentialCost) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> CredentialCost {
        self.cost
    }

    fn compute(&self, password: &str, salt: &str) -> RepoResult<Output> {
        let params = Params::new(
            self.cost.memory_kib,
            self.cost.iterations,
            self.cost.parallelism,
            None,
        )
        .map_err(credential_error)?;
        let salt = SaltString::from_b64(salt).map_err(credential_error)?;
        let hash = Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password(password.as_bytes(), &salt)
            .map_err(credential_error)?;
        hash.hash
            .ok_or_else(|| RepoError::Credential("argon2 returned no hash output".to_string()))
    }
}

impl CredentialHasher for Argon2Hasher {
    fn generate_salt(&self) -> String {
        SaltString::generate(&mut OsRng).as_str().to_string()
    }

    fn digest(&self, password: &str, salt: &str) -> RepoResult<String> {
        Ok(self.compute(password, salt)?.to_string())
    }

    fn verify(&self, password: &str, salt: &str, digest: &str) -> RepoResult<bool> {
        let expected = Output::b64_decode(digest).map_err(credential_error)?;
        Ok(self.compute(password, salt)? == expected)
    }
}

fn credential_error(err: impl std::fmt::Display) -> RepoError {
    RepoError::Credential(err.to_string())
}
