use strand_crypto::CryptoError;
use strand_dag::DagError;
use strand_mutation::MutationError;
use strand_object::ObjectError;
use strand_types::Hash;

/// Errors from aggregation.
#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("dag error: {0}")]
    Dag(#[from] DagError),

    #[error("mutation error: {0}")]
    Mutation(#[from] MutationError),

    /// The graph holds mutations but no root object.
    #[error("graph {0} has no root object")]
    MissingRoot(Hash),

    /// The graph holds more than one non-mutation object.
    #[error("graph {0} has more than one root object")]
    MultipleRoots(Hash),

    #[error("object error: {0}")]
    Object(#[from] ObjectError),

    #[error("signing failed: {0}")]
    Crypto(#[from] CryptoError),
}

/// Result alias for aggregate operations.
pub type AggregateResult<T> = Result<T, AggregateError>;
