//! Canonical, order-independent hashing of typed values.
//!
//! Primitives hash `domain || raw bytes` through SHA-256. Composite values
//! hash the digests of their children, never their serialized bytes:
//!
//! - map: non-private wire keys sorted, `digest(key) || digest(value)` per
//!   entry, under domain `o`
//! - list: child digests in order, under domain `a`
//!
//! Floats go through a sign/exponent/mantissa text form so that both zeroes,
//! `NaN` and the infinities hash the same on every platform.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::error::{TypeError, TypeResult};
use crate::value::{is_private_key, Map, Value};

/// Prefix of every printable hash.
pub const HASH_PREFIX: &str = "oh1.";

const DOMAIN_BOOL: u8 = b'b';
const DOMAIN_STRING: u8 = b's';
const DOMAIN_INT: u8 = b'i';
const DOMAIN_FLOAT: u8 = b'f';
const DOMAIN_BYTES: u8 = b'd';
const DOMAIN_MAP: u8 = b'o';
const DOMAIN_LIST: u8 = b'a';

/// Bound on the normalized float text; a finite double never gets close.
const MAX_FLOAT_FORM: usize = 1000;

/// Raw 32-byte canonical digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Digest([u8; 32]);

impl Digest {
    /// Digest of `domain || data`.
    pub fn of(domain: u8, data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update([domain]);
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The printable hash for this digest.
    pub fn to_hash(&self) -> Hash {
        Hash(format!("{HASH_PREFIX}{}", bs58::encode(self.0).into_string()))
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hash().short())
    }
}

/// Printable content identifier: `"oh1." + base58(digest)`.
///
/// Hashes are the primary key of every store, so the string form is kept
/// as-is and only validated on parse.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Hash(String);

impl Hash {
    /// Parse and validate a printable hash.
    pub fn parse(value: &str) -> TypeResult<Self> {
        let encoded = value
            .strip_prefix(HASH_PREFIX)
            .ok_or_else(|| TypeError::InvalidHash {
                value: value.to_string(),
                reason: format!("missing {HASH_PREFIX} prefix"),
            })?;
        let bytes = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| TypeError::InvalidHash {
                value: value.to_string(),
                reason: e.to_string(),
            })?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidHash {
                value: value.to_string(),
                reason: format!("expected 32 bytes, got {}", bytes.len()),
            });
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The raw digest behind this hash.
    pub fn digest(&self) -> TypeResult<Digest> {
        let encoded = &self.0[HASH_PREFIX.len()..];
        let bytes = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| TypeError::InvalidHash {
                value: self.0.clone(),
                reason: e.to_string(),
            })?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| TypeError::InvalidHash {
            value: self.0.clone(),
            reason: "wrong digest length".into(),
        })?;
        Ok(Digest(arr))
    }

    /// Short form for logs (first 8 characters after the prefix).
    pub fn short(&self) -> &str {
        let body = &self.0[HASH_PREFIX.len()..];
        &body[..body.len().min(8)]
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.short())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Hash {
    type Error = TypeError;

    fn try_from(value: String) -> TypeResult<Self> {
        Self::parse(&value)
    }
}

impl From<Hash> for String {
    fn from(hash: Hash) -> Self {
        hash.0
    }
}

impl std::str::FromStr for Hash {
    type Err = TypeError;

    fn from_str(s: &str) -> TypeResult<Self> {
        Self::parse(s)
    }
}

impl Value {
    /// Canonical digest of this value.
    pub fn digest(&self) -> TypeResult<Digest> {
        match self {
            Self::Bool(b) => Ok(Digest::of(DOMAIN_BOOL, &[u8::from(*b)])),
            Self::String(s) => Ok(Digest::of(DOMAIN_STRING, s.as_bytes())),
            Self::Int(i) => Ok(Digest::of(DOMAIN_INT, i.to_string().as_bytes())),
            Self::Float(f) => Ok(Digest::of(DOMAIN_FLOAT, normalize_float(*f)?.as_bytes())),
            Self::Bytes(b) => Ok(Digest::of(DOMAIN_BYTES, b)),
            Self::Map(m) => m.digest(),
            Self::List(items) => {
                let mut buf = Vec::with_capacity(items.len() * 32);
                for item in items {
                    buf.extend_from_slice(item.digest()?.as_bytes());
                }
                Ok(Digest::of(DOMAIN_LIST, &buf))
            }
        }
    }

    /// Canonical printable hash of this value.
    pub fn hash(&self) -> TypeResult<Hash> {
        Ok(self.digest()?.to_hash())
    }
}

impl Map {
    /// Canonical digest of the map's public entries.
    ///
    /// Insertion order does not affect the result.
    pub fn digest(&self) -> TypeResult<Digest> {
        let mut entries: Vec<(String, &Value)> = self
            .wire_entries()
            .filter(|(key, _)| !is_private_key(key))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut buf = Vec::with_capacity(entries.len() * 64);
        for (key, value) in entries {
            buf.extend_from_slice(Digest::of(DOMAIN_STRING, key.as_bytes()).as_bytes());
            buf.extend_from_slice(value.digest()?.as_bytes());
        }
        Ok(Digest::of(DOMAIN_MAP, &buf))
    }

    pub fn hash(&self) -> TypeResult<Hash> {
        Ok(self.digest()?.to_hash())
    }
}

/// Canonical printable hash of a value.
pub fn hash_value(value: &Value) -> TypeResult<Hash> {
    value.hash()
}

/// Portable text form of a float: `<sign><exponent>:<binary mantissa>`.
///
/// `+0` and `-0` both become `+0:`; non-finite values use fixed names.
pub fn normalize_float(value: f64) -> TypeResult<String> {
    if value.is_nan() {
        return Ok("NaN".into());
    }
    if value.is_infinite() {
        return Ok(if value > 0.0 { "Infinity" } else { "-Infinity" }.into());
    }
    if value == 0.0 {
        return Ok("+0:".into());
    }

    let mut out = String::new();
    let mut f = value;
    if f < 0.0 {
        out.push('-');
        f = -f;
    } else {
        out.push('+');
    }

    let mut exponent: i32 = 0;
    while f > 1.0 {
        f /= 2.0;
        exponent += 1;
    }
    while f <= 0.5 {
        f *= 2.0;
        exponent -= 1;
    }
    out.push_str(&exponent.to_string());
    out.push(':');

    while f != 0.0 {
        if f >= 1.0 {
            out.push('1');
            f -= 1.0;
        } else {
            out.push('0');
        }
        if out.len() >= MAX_FLOAT_FORM {
            return Err(TypeError::FloatNormalization(value.to_string()));
        }
        f *= 2.0;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn hash_has_prefix_and_parses() {
        let hash = Value::from("hello").hash().unwrap();
        assert!(hash.as_str().starts_with(HASH_PREFIX));
        let parsed = Hash::parse(hash.as_str()).unwrap();
        assert_eq!(parsed, hash);
        assert_eq!(parsed.digest().unwrap(), Value::from("hello").digest().unwrap());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Hash::parse("nope").is_err());
        assert!(Hash::parse("oh1.0OIl").is_err());
        assert!(Hash::parse("oh1.abc").is_err());
    }

    #[test]
    fn primitive_domains_do_not_collide() {
        let s = Value::from("1").digest().unwrap();
        let i = Value::from(1i64).digest().unwrap();
        let f = Value::from(1.0).digest().unwrap();
        let d = Value::from(b"1".to_vec()).digest().unwrap();
        assert_ne!(s, i);
        assert_ne!(i, f);
        assert_ne!(s, d);
    }

    #[test]
    fn bool_hash_is_stable() {
        assert_eq!(
            Value::from(true).digest().unwrap(),
            Digest::of(b'b', &[1])
        );
        assert_ne!(
            Value::from(true).digest().unwrap(),
            Value::from(false).digest().unwrap()
        );
    }

    #[test]
    fn map_hash_ignores_key_order() {
        let a = Map::new().with("foo", "bar").with("n", 1i64);
        let b = Map::new().with("n", 1i64).with("foo", "bar");
        assert_eq!(a.hash().unwrap(), b.hash().unwrap());
    }

    #[test]
    fn map_hash_ignores_private_keys() {
        let a = Map::new().with("foo", "bar");
        let b = Map::new().with("foo", "bar").with("_local", "secret");
        assert_eq!(a.hash().unwrap(), b.hash().unwrap());
    }

    #[test]
    fn map_hash_depends_on_value_kind() {
        let a = Map::new().with("n", 1i64);
        let b = Map::new().with("n", "1");
        assert_ne!(a.hash().unwrap(), b.hash().unwrap());
    }

    #[test]
    fn list_hash_depends_on_order() {
        let a = Value::List(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::List(vec![Value::Int(2), Value::Int(1)]);
        assert_ne!(a.hash().unwrap(), b.hash().unwrap());
    }

    #[test]
    fn empty_composites_hash() {
        let empty_map = Value::Map(Map::new()).hash().unwrap();
        let empty_list = Value::List(vec![]).hash().unwrap();
        assert_ne!(empty_map, empty_list);
        assert_eq!(empty_map, Map::new().hash().unwrap());
    }

    #[test]
    fn composite_hash_is_built_from_child_digests() {
        let child = Value::from("x");
        let list = Value::List(vec![child.clone()]);
        let expected = Digest::of(b'a', child.digest().unwrap().as_bytes());
        assert_eq!(list.digest().unwrap(), expected);
    }

    #[test]
    fn float_normal_form() {
        assert_eq!(normalize_float(0.0).unwrap(), "+0:");
        assert_eq!(normalize_float(-0.0).unwrap(), "+0:");
        assert_eq!(normalize_float(1.0).unwrap(), "+0:1");
        assert_eq!(normalize_float(0.5).unwrap(), "+-1:1");
        assert_eq!(normalize_float(2.0).unwrap(), "+1:1");
        assert_eq!(normalize_float(1.5).unwrap(), "+1:011");
        assert_eq!(normalize_float(-1.5).unwrap(), "-1:011");
        assert_eq!(normalize_float(f64::NAN).unwrap(), "NaN");
        assert_eq!(normalize_float(f64::INFINITY).unwrap(), "Infinity");
        assert_eq!(normalize_float(f64::NEG_INFINITY).unwrap(), "-Infinity");
    }

    #[test]
    fn signed_zeroes_hash_equal() {
        assert_eq!(
            Value::from(0.0).hash().unwrap(),
            Value::from(-0.0).hash().unwrap()
        );
    }

    #[test]
    fn extreme_floats_normalize() {
        assert!(normalize_float(f64::MAX).is_ok());
        assert!(normalize_float(f64::MIN_POSITIVE).is_ok());
        assert!(normalize_float(5e-324).is_ok());
    }

    #[test]
    fn serde_as_string() {
        let hash = Value::from("serde").hash().unwrap();
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{hash}\""));
        let back: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
        assert!(serde_json::from_str::<Hash>("\"bogus\"").is_err());
    }

    #[test]
    fn short_is_8_chars() {
        let hash = Value::from("short").hash().unwrap();
        assert_eq!(hash.short().len(), 8);
    }

    proptest! {
        #[test]
        fn map_hash_independent_of_insertion_order(
            entries in proptest::collection::btree_map("[a-z]{1,6}", any::<i64>(), 0..12)
        ) {
            let forward: Map = entries.iter().map(|(k, v)| (k.clone(), *v)).collect();
            let backward: Map = entries.iter().rev().map(|(k, v)| (k.clone(), *v)).collect();
            prop_assert_eq!(forward.hash().unwrap(), backward.hash().unwrap());
        }

        #[test]
        fn float_hash_is_deterministic(f in any::<f64>()) {
            let a = Value::Float(f).hash().unwrap();
            let b = Value::Float(f).hash().unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
