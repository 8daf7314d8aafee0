//! Object graph storage for Strand.
//!
//! Objects are stored keyed by their own hash and, redundantly, under
//! `"<root>.<hash>"` so a whole stream can be scanned from any member.
//! Stored objects are never rewritten or deleted.
//!
//! # Storage Backends
//!
//! All backends implement the [`GraphStore`] trait:
//!
//! - [`InMemoryGraphStore`] -- ordered in-memory index with snapshot
//!   persistence (`save` / `open`)
//!
//! The graph helpers in [`graph`] ([`topological_sort`], [`is_complete`],
//! [`missing_parents`], [`tails_of`]) work on plain object sets and are
//! shared with the DAG layer.

pub mod error;
pub mod graph;
pub mod memory;
pub mod snapshot;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use graph::{is_complete, missing_parents, stream_root, tails_of, topological_sort};
pub use memory::InMemoryGraphStore;
pub use traits::GraphStore;
