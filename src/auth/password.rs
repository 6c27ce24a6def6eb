//! Argon2 password hashing.

use std::sync::OnceLock;

use argon2::password_hash::rand_core::OsRng;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::errors::ServiceError;

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// PHC string with a fresh random salt
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::HashError(e.to_string()))
}

/// False for a wrong password and for an unparseable stored hash.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

/// Runs a full Argon2 verification against a throwaway hash. Always false.
///
/// Used for unknown accounts so they take as long to reject as a wrong password.
pub fn verify_against_dummy(password: &str) -> bool {
    let dummy = DUMMY_HASH.get_or_init(|| hash_password("shiptrack-unknown-account").ok());
    match dummy {
        Some(hash) => {
            let _ = verify_password(password, hash);
            false
        }
        None => false,
    }
}
