//! User records and password hashing.
//!
//! The `password` field of a user document holds an Argon2id PHC string
//! (`$argon2id$v=19$...`). Records written before hashing was introduced hold
//! the plaintext password; those still verify and are flagged for rehashing.
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use serde::{Deserialize, Serialize};

use crate::{PrepaseError, Result};

/// Body of a `users/{username}` document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub password: String,
}

/// Outcome of checking a password against a stored record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordCheck {
    Mismatch,
    Match,
    /// Matched a plaintext legacy record that should be rehashed
    MatchLegacy,
}

impl UserRecord {
    /// Builds a record holding a fresh hash of `password`
    pub fn with_password(password: &str) -> Result<Self> {
        Ok(Self {
            password: hash_password(password)?,
        })
    }

    pub fn is_hashed(&self) -> bool {
        self.password.starts_with("$argon2")
    }

    pub fn check(&self, password: &str) -> Result<PasswordCheck> {
        if !self.is_hashed() {
            return Ok(if self.password == password {
                PasswordCheck::MatchLegacy
            } else {
                PasswordCheck::Mismatch
            });
        }
        Ok(if verify_password(password, &self.password)? {
            PasswordCheck::Match
        } else {
            PasswordCheck::Mismatch
        })
    }
}

/// Hash a password using Argon2id. Returns a PHC-format string.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PrepaseError::PasswordHash {
            message: e.to_string(),
        })?;
    Ok(hash.to_string())
}

/// Verify a password against a PHC-format hash string.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| PrepaseError::PasswordHash {
        message: format!("Invalid password hash: {}", e),
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
