use strand_types::TypeError;

/// Errors from object encoding and decoding.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ObjectError {
    #[error("type error: {0}")]
    Type(#[from] TypeError),

    /// The object's declared type is not the one the destination expects.
    #[error("object type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("missing field {0}")]
    MissingField(String),

    /// The object does not structurally match the destination schema.
    #[error("decode error: {0}")]
    Decode(String),
}

/// Result alias for object operations.
pub type ObjectResult<T> = Result<T, ObjectError>;
