//! Aggregates: the materialized view of a stream.
//!
//! An aggregate is a stream's root object with every mutation in the
//! stream folded into it, in graph order. [`Aggregator`] does the folding;
//! [`Manager`] reads graphs through the DAG manager, appends new mutations,
//! and republishes the aggregate whenever a stream changes.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod manager;

pub use aggregator::{AggregateObject, Aggregator};
pub use config::{AggregateConfig, OnMutationError};
pub use error::{AggregateError, AggregateResult};
pub use manager::Manager;
