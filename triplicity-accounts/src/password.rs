//! Password hashing with Argon2id, stored in PHC string format.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::error::{AccountError, AccountResult};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Hash a password.
pub fn hash_password(password: &str) -> AccountResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AccountError::Hashing(e.to_string()))
}

/// Verify a password against a stored PHC hash.
pub fn verify_password(password: &str, stored_hash: &str) -> AccountResult<bool> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| AccountError::Hashing(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Validate password strength.
pub fn validate_password(password: &str) -> AccountResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AccountError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(AccountError::Validation(
            "Password cannot be entirely numeric".to_string(),
        ));
    }
    Ok(())
}
