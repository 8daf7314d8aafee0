use thiserror::Error;

/// Errors produced by value and hash operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    #[error("invalid hash {value:?}: {reason}")]
    InvalidHash { value: String, reason: String },

    #[error("invalid wire name {0:?}")]
    InvalidWireName(String),

    #[error("unknown type hint {0:?}")]
    UnknownHint(String),

    #[error("float {0} cannot be normalized")]
    FloatNormalization(String),
}

/// Result alias for type operations.
pub type TypeResult<T> = Result<T, TypeError>;
