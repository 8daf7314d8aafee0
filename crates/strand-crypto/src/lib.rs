//! Key material and object signing for Strand.
//!
//! The core only relies on the [`Signer`] contract: signing mutates an
//! object's signature metadata and never changes its hash. [`Ed25519Signer`]
//! is the stock implementation. All crypto wraps `ed25519-dalek`.

pub mod error;
pub mod keys;
pub mod signer;

pub use error::{CryptoError, CryptoResult};
pub use keys::KeyPair;
pub use signer::{Ed25519Signer, Signer};
