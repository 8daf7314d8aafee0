use ed25519_dalek::{Signer as _, Verifier as _};
use strand_object::PublicKey;

use crate::error::{CryptoError, CryptoResult};

/// Printable prefix of Ed25519 public keys.
pub const ED25519_PREFIX: &str = "ed25519.";

/// An Ed25519 key pair (private).
pub struct KeyPair(ed25519_dalek::SigningKey);

impl KeyPair {
    /// Generate a new random key pair.
    pub fn generate() -> Self {
        let mut csprng = rand::thread_rng();
        Self(ed25519_dalek::SigningKey::generate(&mut csprng))
    }

    /// Create from a raw 32-byte secret.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(&seed))
    }

    /// The printable public key (`"ed25519.<base58>"`).
    pub fn public_key(&self) -> PublicKey {
        encode_public_key(&self.0.verifying_key())
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.0.sign(message).to_bytes()
    }

    /// Raw secret bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyPair({}, <redacted>)", self.public_key())
    }
}

fn encode_public_key(key: &ed25519_dalek::VerifyingKey) -> PublicKey {
    PublicKey::new(format!(
        "{ED25519_PREFIX}{}",
        bs58::encode(key.to_bytes()).into_string()
    ))
}

/// Parse a printable public key back into a verifying key.
pub(crate) fn decode_public_key(key: &PublicKey) -> CryptoResult<ed25519_dalek::VerifyingKey> {
    let encoded = key
        .as_str()
        .strip_prefix(ED25519_PREFIX)
        .ok_or_else(|| CryptoError::InvalidKey(format!("{key} is not an ed25519 key")))?;
    let bytes: [u8; 32] = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?
        .try_into()
        .map_err(|_| CryptoError::InvalidKey(format!("{key} has the wrong length")))?;
    ed25519_dalek::VerifyingKey::from_bytes(&bytes)
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))
}

/// Verify a raw signature made by `key`.
pub(crate) fn verify_raw(key: &PublicKey, message: &[u8], signature: &[u8]) -> CryptoResult<()> {
    let verifying = decode_public_key(key)?;
    let sig_bytes: [u8; 64] = signature
        .try_into()
        .map_err(|_| CryptoError::InvalidSignature)?;
    verifying
        .verify(message, &ed25519_dalek::Signature::from_bytes(&sig_bytes))
        .map_err(|_| CryptoError::InvalidSignature)
}

/// Short hex fingerprint of a signature, for logs.
pub(crate) fn fingerprint(signature: &[u8]) -> String {
    hex::encode(&signature[..signature.len().min(8)])
}
