//! Objects: the named, typed, hashable unit of data in Strand.
//!
//! An [`Object`] is a type tag, a [`Metadata`] block (owner, parents, policy,
//! stream) and a data [`Map`](strand_types::Map). Its identity is the
//! canonical hash of its map form, so objects are immutable by construction:
//! changing anything yields a different object.
//!
//! Concrete payload types convert to and from objects through the
//! hand-written [`ToObject`] / [`FromObject`] pair, checked against a
//! [`FieldSpec`] table.

pub mod codec;
pub mod error;
pub mod identity;
pub mod object;

pub use codec::{DataReader, FieldSpec, FromObject, ToObject, Typed};
pub use error::{ObjectError, ObjectResult};
pub use identity::{PeerAddress, PublicKey};
pub use object::{string_list, Metadata, Object, Policy, PolicyEffect, Signature};
