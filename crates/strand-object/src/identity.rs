use std::fmt;

use serde::{Deserialize, Serialize};

/// A peer's public key in its printable form (`"ed25519.<base58>"`).
///
/// The object layer treats keys as opaque strings; producing and checking
/// them is the signer's business.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicKey(String);

impl PublicKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The address this key is reachable at.
    pub fn address(&self) -> PeerAddress {
        PeerAddress::for_key(self)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.0)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Address of a peer on the exchange.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerAddress(String);

impl PeerAddress {
    const KEY_SCHEME: &'static str = "peer:";

    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// `peer:<key>` address for a public key.
    pub fn for_key(key: &PublicKey) -> Self {
        Self(format!("{}{}", Self::KEY_SCHEME, key.as_str()))
    }

    /// The public key for `peer:` addresses.
    pub fn public_key(&self) -> Option<PublicKey> {
        self.0
            .strip_prefix(Self::KEY_SCHEME)
            .map(PublicKey::new)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerAddress({})", self.0)
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
