//! Error types for graph management and peer exchange.

use strand_object::{ObjectError, PeerAddress};
use strand_store::StoreError;
use strand_types::Hash;

/// Errors from the exchange layer.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    /// No peer is reachable at the address.
    #[error("peer unreachable: {0}")]
    Unreachable(PeerAddress),

    /// The exchange has shut down.
    #[error("exchange closed")]
    Closed,

    /// A registered handler rejected an envelope.
    #[error("handler failed: {0}")]
    Handler(String),

    #[error("object error: {0}")]
    Object(#[from] ObjectError),
}

/// Convenience alias for exchange results.
pub type ExchangeResult<T> = Result<T, ExchangeError>;

/// Errors that can occur during DAG operations.
#[derive(Debug, thiserror::Error)]
pub enum DagError {
    /// Some object in the graph references a parent that is not stored.
    ///
    /// Stored objects are kept; a sync can complete the graph later.
    #[error("incomplete graph at {0}")]
    IncompleteGraph(Hash),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("operation cancelled")]
    Cancelled,

    #[error("operation timed out")]
    Timeout,

    /// A graph request without a usable root selector.
    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    #[error("object error: {0}")]
    Object(#[from] ObjectError),
}

/// Convenience alias for DAG results.
pub type DagResult<T> = Result<T, DagError>;
