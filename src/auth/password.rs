//! Password hashing and verification using Argon2
//!
//! Uses argon2id with the crate's default parameters. Stored credentials
//! are PHC strings, so salt and parameters travel with the hash.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::types::ScribeError;

/// Shortest password accepted at registration, change and reset
pub const MIN_PASSWORD_LEN: usize = 8;

/// Hash a password using Argon2id
pub fn hash_password(password: &str) -> Result<String, ScribeError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ScribeError::Auth(format!("Failed to hash password: {e}")))
}

/// Verify a password against a stored hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, ScribeError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| ScribeError::Auth(format!("Invalid password hash format: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Reject passwords shorter than [`MIN_PASSWORD_LEN`]
pub fn check_password_strength(password: &str) -> Result<(), ScribeError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ScribeError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}
