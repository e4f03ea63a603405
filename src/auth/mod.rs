//! Credential handling
//!
//! Password hashing with Argon2. Session issuance lives outside the engine;
//! callers pass an already-resolved actor id into every operation.

pub mod password;

pub use password::{hash_password, verify_password};
