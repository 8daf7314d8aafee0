//! The mutation language.
//!
//! A [`Mutation`] is an object carrying an ordered list of [`Operation`]s,
//! each addressing a location in an object's data map through a dot-path
//! [`Cursor`]. Applying a mutation never touches metadata.

pub mod cursor;
pub mod error;
pub mod mutation;
pub mod operation;

pub use cursor::Cursor;
pub use error::{MutationError, MutationResult};
pub use mutation::{is_mutation, Mutation};
pub use operation::{OpKind, Operation};
