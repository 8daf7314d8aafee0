use strand_object::ObjectError;

/// Errors from key handling and signing.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("object is not signed")]
    Unsigned,

    #[error("unsupported signature algorithm {0}")]
    UnsupportedAlgorithm(String),

    #[error("object error: {0}")]
    Object(#[from] ObjectError),
}

/// Result alias for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
