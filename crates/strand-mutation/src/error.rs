use strand_object::ObjectError;

/// Errors from applying or decoding mutations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MutationError {
    /// The cursor cannot be resolved against the object's shape.
    #[error("cannot resolve cursor {0:?}")]
    ParsingCursor(String),

    /// The cursor resolved but the operation does not fit the value there.
    #[error("cannot apply operation: {0}")]
    ApplyingOperation(String),

    #[error("operation {0} is not implemented")]
    NotImplemented(String),

    #[error("object error: {0}")]
    Object(#[from] ObjectError),
}

/// Result alias for mutation operations.
pub type MutationResult<T> = Result<T, MutationError>;
