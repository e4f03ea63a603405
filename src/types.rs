//! Error taxonomy for the engagement engine
//!
//! Every storage fault is converted to the nearest taxonomy kind at the
//! db boundary; callers never see raw driver errors.

use thiserror::Error;

/// Engine-wide error type
#[derive(Debug, Error)]
pub enum EngineError {
    /// Missing or malformed required input (missing target id, empty search
    /// query, sort key foreign to the content kind). Never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The referenced item does not exist, or exists but is not owned by the
    /// acting profile. The two cases are deliberately indistinguishable.
    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness rule was violated (duplicate handle/email, duplicate
    /// collection name for the same owner, duplicate edge insert).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The storage engine failed unexpectedly. Safe for the caller to retry.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl EngineError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Whether a caller may retry the failed operation verbatim.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    /// Whether this is a uniqueness violation
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Classify a driver error, separating uniqueness violations from faults.
///
/// Duplicate key errors (code 11000) surface as [`EngineError::Conflict`] so
/// the toggle engine can resolve concurrent duplicate inserts; everything
/// else is an [`EngineError::Unavailable`].
impl From<mongodb::error::Error> for EngineError {
    fn from(err: mongodb::error::Error) -> Self {
        if is_duplicate_key(&err) {
            EngineError::Conflict(format!("duplicate key: {}", err))
        } else {
            EngineError::Unavailable(err.to_string())
        }
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};

    match *err.kind {
        ErrorKind::Write(WriteFailure::WriteError(ref write_error)) => write_error.code == 11000,
        ErrorKind::Command(ref command_error) => command_error.code == 11000,
        _ => false,
    }
}

/// Result alias used throughout the engine
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unavailable_is_retryable() {
        assert!(EngineError::unavailable("socket reset").is_retryable());
        assert!(!EngineError::invalid("missing id").is_retryable());
        assert!(!EngineError::not_found("web").is_retryable());
        assert!(!EngineError::conflict("name taken").is_retryable());
    }

    #[test]
    fn test_display_includes_context() {
        let err = EngineError::not_found("web 64f0");
        assert_eq!(err.to_string(), "not found: web 64f0");
    }
}
