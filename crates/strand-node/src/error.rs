use strand_aggregate::AggregateError;
use strand_dag::{DagError, ExchangeError};
use strand_object::ObjectError;
use strand_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("dag error: {0}")]
    Dag(#[from] DagError),

    #[error("aggregate error: {0}")]
    Aggregate(#[from] AggregateError),

    #[error("discovery failed: {0}")]
    Discovery(#[from] ExchangeError),

    #[error("object error: {0}")]
    Object(#[from] ObjectError),

    #[error("signing failed: {0}")]
    Crypto(#[from] strand_crypto::CryptoError),
}

pub type NodeResult<T> = Result<T, NodeError>;
