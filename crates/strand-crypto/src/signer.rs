use strand_object::{Object, ObjectError, Signature};
use tracing::debug;

use crate::error::{CryptoError, CryptoResult};
use crate::keys::{fingerprint, verify_raw, KeyPair};

/// Signature algorithm name stored in object metadata.
pub const ED25519_ALG: &str = "ed25519";

/// Capability to sign objects.
///
/// Signing writes the signature metadata in place. Because the signature is
/// kept under a private key, the object's hash is unchanged.
pub trait Signer: Send + Sync {
    fn sign(&self, object: &mut Object, key: &KeyPair) -> CryptoResult<()>;
}

/// Signs the canonical digest of an object with Ed25519.
#[derive(Clone, Copy, Debug, Default)]
pub struct Ed25519Signer;

impl Ed25519Signer {
    /// Check an object's signature against its current content.
    pub fn verify(object: &Object) -> CryptoResult<()> {
        let signature = object
            .metadata
            .signature
            .as_ref()
            .ok_or(CryptoError::Unsigned)?;
        if signature.alg != ED25519_ALG {
            return Err(CryptoError::UnsupportedAlgorithm(signature.alg.clone()));
        }
        let digest = object.hash()?.digest().map_err(ObjectError::from)?;
        verify_raw(&signature.signer, digest.as_bytes(), &signature.x)
    }
}

impl Signer for Ed25519Signer {
    fn sign(&self, object: &mut Object, key: &KeyPair) -> CryptoResult<()> {
        let digest = object.hash()?.digest().map_err(ObjectError::from)?;
        let x = key.sign(digest.as_bytes()).to_vec();
        debug!(signer = %key.public_key(), sig = %fingerprint(&x), "signed object");
        object.metadata.signature = Some(Signature {
            signer: key.public_key(),
            alg: ED25519_ALG.to_string(),
            x,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_object::Metadata;
    use strand_types::Map;

    fn object(owner: &KeyPair) -> Object {
        Object::new("test/signed")
            .with_metadata(Metadata {
                owner: Some(owner.public_key()),
                ..Metadata::default()
            })
            .with_data(Map::new().with("foo", "bar"))
    }

    #[test]
    fn sign_and_verify() {
        let key = KeyPair::generate();
        let mut obj = object(&key);
        Ed25519Signer.sign(&mut obj, &key).unwrap();
        assert!(Ed25519Signer::verify(&obj).is_ok());
        assert_eq!(
            obj.metadata.signature.as_ref().unwrap().signer,
            key.public_key()
        );
    }

    #[test]
    fn signing_keeps_hash() {
        let key = KeyPair::generate();
        let mut obj = object(&key);
        let before = obj.hash().unwrap();
        Ed25519Signer.sign(&mut obj, &key).unwrap();
        assert_eq!(obj.hash().unwrap(), before);
    }

    #[test]
    fn ownerless_object_signs_and_verifies() {
        let key = KeyPair::generate();
        let mut obj = Object::new("test/root").with_data(Map::new().with("foo", "bar"));
        let before = obj.hash().unwrap();
        Ed25519Signer.sign(&mut obj, &key).unwrap();
        assert_eq!(obj.hash().unwrap(), before);
        assert!(Ed25519Signer::verify(&obj).is_ok());

        let decoded = Object::from_map(&obj.to_map()).unwrap();
        assert!(Ed25519Signer::verify(&decoded).is_ok());
    }

    #[test]
    fn tampering_breaks_signature() {
        let key = KeyPair::generate();
        let mut obj = object(&key);
        Ed25519Signer.sign(&mut obj, &key).unwrap();
        obj.data.insert("foo", "baz");
        assert_eq!(Ed25519Signer::verify(&obj), Err(CryptoError::InvalidSignature));
    }

    #[test]
    fn unsigned_object_fails_verification() {
        let key = KeyPair::generate();
        assert_eq!(Ed25519Signer::verify(&object(&key)), Err(CryptoError::Unsigned));
    }

    #[test]
    fn unknown_algorithm_is_rejected() {
        let key = KeyPair::generate();
        let mut obj = object(&key);
        Ed25519Signer.sign(&mut obj, &key).unwrap();
        if let Some(sig) = obj.metadata.signature.as_mut() {
            sig.alg = "rsa".into();
        }
        assert!(matches!(
            Ed25519Signer::verify(&obj),
            Err(CryptoError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn signer_is_object_safe() {
        let signer: Box<dyn Signer> = Box::new(Ed25519Signer);
        let key = KeyPair::generate();
        let mut obj = object(&key);
        signer.sign(&mut obj, &key).unwrap();
        assert!(Ed25519Signer::verify(&obj).is_ok());
    }
}
