//! Digest hashing
//!
//! The canonical digest is 40 bytes wide, conceptually five 64-bit limbs.
//! Every "thing to be signed" in the wallet (spend digests, transaction ids,
//! note names) uses this width.

use blake2::digest::{Update, VariableOutput};
use blake2::Blake2bVar;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::{ErrorCode, WalletError, WalletResult};
use crate::types::DIGEST_LEN;

/// A 40-byte digest (five 64-bit limbs)
///
/// Serializes as a hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest(pub [u8; DIGEST_LEN]);

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let bytes = hex::decode(&encoded).map_err(D::Error::custom)?;
        Digest::from_slice(&bytes).map_err(|e| D::Error::custom(e.message))
    }
}

impl Digest {
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// View the digest as five little-endian 64-bit limbs
    pub fn limbs(&self) -> [u64; 5] {
        let mut limbs = [0u64; 5];
        for (i, limb) in limbs.iter_mut().enumerate() {
            let mut chunk = [0u8; 8];
            chunk.copy_from_slice(&self.0[i * 8..(i + 1) * 8]);
            *limb = u64::from_le_bytes(chunk);
        }
        limbs
    }

    /// Parse a digest from a byte slice, rejecting any other length
    pub fn from_slice(bytes: &[u8]) -> WalletResult<Self> {
        if bytes.len() != DIGEST_LEN {
            return Err(WalletError::new(
                ErrorCode::InvalidDigest,
                format!("Digest must be {} bytes, got {}", DIGEST_LEN, bytes.len()),
            ));
        }
        let mut out = [0u8; DIGEST_LEN];
        out.copy_from_slice(bytes);
        Ok(Self(out))
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", hex::encode(self.0))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Compute the 40-byte digest of arbitrary data
pub fn digest(data: &[u8]) -> Digest {
    let mut hasher = Blake2bVar::new(DIGEST_LEN).expect("40 is a valid Blake2b output size");
    hasher.update(data);
    let mut out = [0u8; DIGEST_LEN];
    hasher
        .finalize_variable(&mut out)
        .expect("output buffer matches requested size");
    Digest(out)
}

/// Digest several byte slices as one message with length framing
///
/// Length prefixes keep `digest_parts(&[a, b])` distinct from
/// `digest_parts(&[ab])` so composed digests cannot be extended.
pub fn digest_parts(parts: &[&[u8]]) -> Digest {
    let mut hasher = Blake2bVar::new(DIGEST_LEN).expect("40 is a valid Blake2b output size");
    for part in parts {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    let mut out = [0u8; DIGEST_LEN];
    hasher
        .finalize_variable(&mut out)
        .expect("output buffer matches requested size");
    Digest(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_deterministic() {
        assert_eq!(digest(b"nockchain"), digest(b"nockchain"));
        assert_ne!(digest(b"nockchain"), digest(b"nockchaim"));
    }

    #[test]
    fn test_digest_width() {
        assert_eq!(digest(b"").as_bytes().len(), 40);
        assert_eq!(digest(b"x").limbs().len(), 5);
    }

    #[test]
    fn test_digest_parts_framing() {
        // Concatenation must not collide with split inputs
        assert_ne!(digest_parts(&[b"ab", b"c"]), digest_parts(&[b"a", b"bc"]));
    }

    #[test]
    fn test_from_slice_rejects_wrong_length() {
        let err = Digest::from_slice(&[0u8; 32]).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidDigest);
    }
}
