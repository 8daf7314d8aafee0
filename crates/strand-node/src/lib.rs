//! Embeddable Strand peer.
//!
//! [`Node`] wires a graph store, a [`DagManager`](strand_dag::DagManager)
//! and an aggregate [`Manager`](strand_aggregate::Manager) together from a
//! [`NodeConfig`]. This is the main entry point for applications embedding
//! Strand.

pub mod config;
pub mod error;
pub mod node;

pub use config::NodeConfig;
pub use error::{NodeError, NodeResult};
pub use node::Node;

// Re-export key types
pub use strand_aggregate::{AggregateObject, OnMutationError};
pub use strand_crypto::KeyPair;
pub use strand_mutation::{Cursor, Operation};
pub use strand_object::{Object, PeerAddress, PublicKey};
pub use strand_types::{Hash, Map, Value};

use tracing_subscriber::EnvFilter;

/// Install a global `fmt` subscriber.
///
/// `RUST_LOG` takes precedence over `filter`. Fails if a global subscriber
/// is already installed.
pub fn init_tracing(filter: &str) -> NodeResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(filter).map_err(|e| NodeError::Config(e.to_string()))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| NodeError::Config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    // The only test in this crate that installs a global subscriber.
    #[test]
    fn init_tracing_installs_once() {
        assert!(init_tracing("strand=debug").is_ok());
        tracing::info!("subscriber installed");
        assert!(matches!(init_tracing("info"), Err(NodeError::Config(_))));
    }
}
