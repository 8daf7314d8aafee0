//! Foundation types for Strand.
//!
//! Every other Strand crate depends on `strand-types`. It defines the closed
//! set of typed values that objects are made of and the canonical,
//! order-independent hash used to name them.
//!
//! # Key Types
//!
//! - [`Value`]: tagged variant (`Bool`, `String`, `Int`, `Float`, `Bytes`, `Map`, `List`)
//! - [`Map`]: insertion-ordered `string -> Value` association
//! - [`TypeHint`]: single-character hint carried in wire key names (`"name:s"`)
//! - [`Digest`]: raw 32-byte canonical digest
//! - [`Hash`]: printable content identifier, `"oh1." + base58(digest)`

pub mod error;
pub mod hash;
pub mod json;
pub mod value;

pub use error::{TypeError, TypeResult};
pub use hash::{hash_value, normalize_float, Digest, Hash, HASH_PREFIX};
pub use value::{is_private_key, split_wire_name, wire_name, Map, TypeHint, Value};
