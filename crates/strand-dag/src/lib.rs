//! Object graphs: completeness, publication, and peer synchronization.
//!
//! [`DagManager`] sits on top of a [`GraphStore`](strand_store::GraphStore).
//! It only publishes objects whose whole graph is locally present, and its
//! sync protocol fetches missing graph members from peers over an
//! [`Exchange`].
//!
//! # Sync protocol
//!
//! 1. Send an [`ObjectGraphRequest`] to every candidate peer concurrently.
//! 2. Collect the [`ObjectGraphResponse`] hash inventories.
//! 3. Fetch each unknown hash from the peer that reported it, one at a
//!    time, keeping only responses that hash to what was asked for.
//! 4. Return the local graph for the requested root.
//!
//! The network is abstracted behind [`Exchange`], [`Discovery`] and
//! [`LocalInfo`]; [`memory`] provides in-process implementations.

pub mod broadcast;
pub mod config;
pub mod error;
pub mod exchange;
pub mod manager;
pub mod memory;
pub mod payload;

pub use broadcast::{Broadcaster, Subscription};
pub use config::DagConfig;
pub use error::{DagError, DagResult, ExchangeError, ExchangeResult};
pub use exchange::{Discovery, Envelope, EnvelopeHandler, Exchange, LocalInfo, Registration, SendOptions};
pub use manager::{DagManager, GraphState, GraphUpdate};
pub use memory::{InMemoryLocalInfo, MemoryExchange, MemoryNetwork, StaticDiscovery};
pub use payload::{ObjectGraphRequest, ObjectGraphResponse, ObjectRequest};
