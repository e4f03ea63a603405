//! Credential hashing
//!
//! Profiles store an argon2id hash in PHC string form; the salt and cost
//! parameters travel inside the hash, so verification needs no other state.
//! A mismatched password is an ordinary `false` — only an unparseable stored
//! hash is an error, since that means the profile document is corrupt.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::types::{EngineError, Result};

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| EngineError::unavailable(format!("failed to hash password: {e}")))
}

/// Check a password against the hash stored on a profile
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| EngineError::unavailable(format!("stored password hash is invalid: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let hash = hash_password("weave-with-care").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("weave-with-care", &hash).unwrap());
        assert!(!verify_password("weave-with-cars", &hash).unwrap());
    }

    #[test]
    fn test_salts_are_unique_per_hash() {
        let first = hash_password("same-input").unwrap();
        let second = hash_password("same-input").unwrap();
        assert_ne!(first, second);
        assert!(verify_password("same-input", &second).unwrap());
    }

    #[test]
    fn test_corrupt_stored_hash_is_an_error_not_a_mismatch() {
        let err = verify_password("anything", "plaintext-oops").unwrap_err();
        assert!(matches!(err, EngineError::Unavailable(_)));
    }
}
