//! Digest signing
//!
//! Schnorr signatures over the Ristretto group. Signing always operates on a
//! 40-byte digest, never on raw data. Signatures serialize to the wallet's
//! compact `{"chal": ..., "sig": ...}` text form.
//!
//! A public key is 97 bytes: a tag byte, the compressed 32-byte group
//! element, and a 64-byte SHA-512 expansion of that element. The expansion is
//! recomputed on parse, so every accepted public key is canonical.
//!
//! SECURITY: private scalars and nonces are zeroized when dropped.

use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha512};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::crypto::hash::Digest;
use crate::error::{ErrorCode, WalletError, WalletResult};
use crate::types::{PRIVATE_KEY_LEN, PUBLIC_KEY_LEN};

/// Tag byte marking a well-formed public key
const PUBLIC_KEY_TAG: u8 = 0x02;

/// Domain separator for the deterministic signing nonce
const NONCE_DOMAIN: &[u8] = b"nbx-schnorr-nonce-v1";

/// Domain separator for the challenge hash
const CHALLENGE_DOMAIN: &[u8] = b"nbx-schnorr-chal-v1";

/// A 32-byte private signing key
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey([u8; PRIVATE_KEY_LEN]);

impl PrivateKey {
    pub fn from_bytes(bytes: &[u8]) -> WalletResult<Self> {
        if bytes.len() != PRIVATE_KEY_LEN {
            return Err(WalletError::new(
                ErrorCode::InvalidPrivateKey,
                format!(
                    "Private key must be {} bytes, got {}",
                    PRIVATE_KEY_LEN,
                    bytes.len()
                ),
            ));
        }
        let mut out = [0u8; PRIVATE_KEY_LEN];
        out.copy_from_slice(bytes);
        Ok(Self(out))
    }

    pub fn as_bytes(&self) -> &[u8; PRIVATE_KEY_LEN] {
        &self.0
    }

    fn scalar(&self) -> Scalar {
        Scalar::from_bytes_mod_order(self.0)
    }

    /// Derive the matching 97-byte public key
    pub fn public_key(&self) -> PublicKey {
        let point = RistrettoPoint::mul_base(&self.scalar());
        PublicKey::from_point(&point)
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrivateKey(****)")
    }
}

/// A 97-byte public key
///
/// Serializes as its base58 text form (the same encoding v0 addresses use).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKey([u8; PUBLIC_KEY_LEN]);

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&bs58::encode(&self.0).into_string())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let bytes = bs58::decode(&encoded)
            .into_vec()
            .map_err(D::Error::custom)?;
        PublicKey::from_bytes(&bytes).map_err(|e| D::Error::custom(e.message))
    }
}

impl PublicKey {
    fn from_point(point: &RistrettoPoint) -> Self {
        let compressed = point.compress().to_bytes();
        let mut bytes = [0u8; PUBLIC_KEY_LEN];
        bytes[0] = PUBLIC_KEY_TAG;
        bytes[1..33].copy_from_slice(&compressed);
        bytes[33..].copy_from_slice(&expansion(&compressed));
        Self(bytes)
    }

    /// Parse a public key, rejecting wrong lengths and non-canonical encodings
    pub fn from_bytes(bytes: &[u8]) -> WalletResult<Self> {
        if bytes.len() != PUBLIC_KEY_LEN {
            return Err(WalletError::new(
                ErrorCode::InvalidPublicKey,
                format!(
                    "Public key must be {} bytes, got {}",
                    PUBLIC_KEY_LEN,
                    bytes.len()
                ),
            ));
        }
        if bytes[0] != PUBLIC_KEY_TAG {
            return Err(WalletError::new(
                ErrorCode::InvalidPublicKey,
                "Unknown public key tag",
            ));
        }
        let mut compressed = [0u8; 32];
        compressed.copy_from_slice(&bytes[1..33]);
        if bytes[33..] != expansion(&compressed) {
            return Err(WalletError::new(
                ErrorCode::InvalidPublicKey,
                "Public key expansion mismatch",
            ));
        }
        let mut out = [0u8; PUBLIC_KEY_LEN];
        out.copy_from_slice(bytes);
        // Ensure the embedded element actually decodes to a group point
        decompress(&compressed)?;
        Ok(Self(out))
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.0
    }

    fn point(&self) -> WalletResult<RistrettoPoint> {
        let mut compressed = [0u8; 32];
        compressed.copy_from_slice(&self.0[1..33]);
        decompress(&compressed)
    }
}

fn expansion(compressed: &[u8; 32]) -> [u8; 64] {
    let mut hasher = Sha512::new();
    hasher.update([PUBLIC_KEY_TAG]);
    hasher.update(compressed);
    hasher.finalize().into()
}

fn decompress(compressed: &[u8; 32]) -> WalletResult<RistrettoPoint> {
    CompressedRistretto::from_slice(compressed)
        .ok()
        .and_then(|c| c.decompress())
        .ok_or_else(|| {
            WalletError::new(ErrorCode::InvalidPublicKey, "Point decompression failed")
        })
}

/// A Schnorr signature: challenge plus response scalar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    chal: [u8; 32],
    sig: [u8; 32],
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let text = SignatureText {
            chal: bs58::encode(self.chal).into_string(),
            sig: bs58::encode(self.sig).into_string(),
        };
        text.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = SignatureText::deserialize(deserializer)?;
        Ok(Self {
            chal: decode_scalar_bytes(&text.chal).map_err(|e| D::Error::custom(e.message))?,
            sig: decode_scalar_bytes(&text.sig).map_err(|e| D::Error::custom(e.message))?,
        })
    }
}

#[derive(Serialize, Deserialize)]
struct SignatureText {
    chal: String,
    sig: String,
}

impl Signature {
    /// Serialize to the compact `{"chal": ..., "sig": ...}` text form
    pub fn to_json(&self) -> String {
        let text = SignatureText {
            chal: bs58::encode(self.chal).into_string(),
            sig: bs58::encode(self.sig).into_string(),
        };
        serde_json::to_string(&text).expect("signature text form always serializes")
    }

    /// Parse the compact text form, rejecting malformed encodings
    pub fn from_json(json: &str) -> WalletResult<Self> {
        let text: SignatureText = serde_json::from_str(json).map_err(|e| {
            WalletError::new(ErrorCode::InvalidSignature, format!("Bad signature JSON: {}", e))
        })?;
        Ok(Self {
            chal: decode_scalar_bytes(&text.chal)?,
            sig: decode_scalar_bytes(&text.sig)?,
        })
    }

    pub fn to_bytes(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.chal);
        out[32..].copy_from_slice(&self.sig);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> WalletResult<Self> {
        if bytes.len() != 64 {
            return Err(WalletError::new(
                ErrorCode::InvalidSignature,
                format!("Signature must be 64 bytes, got {}", bytes.len()),
            ));
        }
        let mut chal = [0u8; 32];
        let mut sig = [0u8; 32];
        chal.copy_from_slice(&bytes[..32]);
        sig.copy_from_slice(&bytes[32..]);
        Ok(Self { chal, sig })
    }
}

fn decode_scalar_bytes(encoded: &str) -> WalletResult<[u8; 32]> {
    let bytes = bs58::decode(encoded).into_vec().map_err(|e| {
        WalletError::new(ErrorCode::InvalidSignature, format!("Bad signature encoding: {}", e))
    })?;
    if bytes.len() != 32 {
        return Err(WalletError::new(
            ErrorCode::InvalidSignature,
            format!("Signature scalar must be 32 bytes, got {}", bytes.len()),
        ));
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Sign a 40-byte digest with a private key
///
/// The nonce is derived deterministically from the key and digest, so
/// identical inputs always produce identical signatures.
pub fn sign_digest(private_key: &PrivateKey, digest: &Digest) -> WalletResult<Signature> {
    let x = Zeroizing::new(private_key.scalar());
    let public = private_key.public_key();

    let mut nonce_hasher = Sha512::new();
    nonce_hasher.update(NONCE_DOMAIN);
    nonce_hasher.update(private_key.as_bytes());
    nonce_hasher.update(digest.as_bytes());
    let wide: [u8; 64] = nonce_hasher.finalize().into();
    let r = Zeroizing::new(Scalar::from_bytes_mod_order_wide(&wide));

    let commitment = RistrettoPoint::mul_base(&r);
    let chal = challenge(&commitment, &public, digest);
    let s = *r + chal * *x;

    Ok(Signature {
        chal: chal.to_bytes(),
        sig: s.to_bytes(),
    })
}

/// Verify a signature against a digest and public key
///
/// Returns `Ok(false)` for a well-formed but incorrect signature; malformed
/// keys or signatures surface as errors.
pub fn verify_signature(
    public_key: &PublicKey,
    digest: &Digest,
    signature: &Signature,
) -> WalletResult<bool> {
    let point = public_key.point()?;

    let chal = match Option::<Scalar>::from(Scalar::from_canonical_bytes(signature.chal)) {
        Some(c) => c,
        None => return Ok(false),
    };
    let s = match Option::<Scalar>::from(Scalar::from_canonical_bytes(signature.sig)) {
        Some(s) => s,
        None => return Ok(false),
    };

    // R' = s*B - chal*A; the signature is valid iff H(R' || A || digest) == chal
    let commitment = RistrettoPoint::mul_base(&s) - point * chal;
    Ok(challenge(&commitment, public_key, digest) == chal)
}

fn challenge(commitment: &RistrettoPoint, public_key: &PublicKey, digest: &Digest) -> Scalar {
    let mut hasher = Sha512::new();
    hasher.update(CHALLENGE_DOMAIN);
    hasher.update(commitment.compress().as_bytes());
    hasher.update(public_key.as_bytes());
    hasher.update(digest.as_bytes());
    let wide: [u8; 64] = hasher.finalize().into();
    Scalar::from_bytes_mod_order_wide(&wide)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash::digest as hash;

    fn test_key() -> PrivateKey {
        PrivateKey::from_bytes(&[7u8; 32]).unwrap()
    }

    #[test]
    fn test_sign_and_verify() {
        let key = test_key();
        let public = key.public_key();
        let d = hash(b"spend data");

        let sig = sign_digest(&key, &d).unwrap();
        assert!(verify_signature(&public, &d, &sig).unwrap());
    }

    #[test]
    fn test_wrong_digest_fails() {
        let key = test_key();
        let sig = sign_digest(&key, &hash(b"one")).unwrap();
        assert!(!verify_signature(&key.public_key(), &hash(b"two"), &sig).unwrap());
    }

    #[test]
    fn test_wrong_public_key_fails() {
        let key = test_key();
        let other = PrivateKey::from_bytes(&[9u8; 32]).unwrap().public_key();
        let d = hash(b"spend data");
        let sig = sign_digest(&key, &d).unwrap();
        assert!(!verify_signature(&other, &d, &sig).unwrap());
    }

    #[test]
    fn test_bit_flip_fails() {
        let key = test_key();
        let d = hash(b"spend data");
        let sig = sign_digest(&key, &d).unwrap();

        let mut bytes = sig.to_bytes();
        bytes[40] ^= 0x01;
        let flipped = Signature::from_bytes(&bytes).unwrap();
        assert!(!verify_signature(&key.public_key(), &d, &flipped).unwrap());
    }

    #[test]
    fn test_signing_is_deterministic() {
        let key = test_key();
        let d = hash(b"same input");
        assert_eq!(sign_digest(&key, &d).unwrap(), sign_digest(&key, &d).unwrap());
    }

    #[test]
    fn test_signature_json_roundtrip() {
        let key = test_key();
        let d = hash(b"spend data");
        let sig = sign_digest(&key, &d).unwrap();

        let json = sig.to_json();
        assert!(json.contains("chal"));
        assert_eq!(Signature::from_json(&json).unwrap(), sig);
    }

    #[test]
    fn test_public_key_length_checks() {
        let err = PublicKey::from_bytes(&[0u8; 32]).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidPublicKey);

        let err = PrivateKey::from_bytes(&[0u8; 31]).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidPrivateKey);
    }

    #[test]
    fn test_public_key_roundtrip() {
        let public = test_key().public_key();
        let parsed = PublicKey::from_bytes(public.as_bytes()).unwrap();
        assert_eq!(parsed, public);
    }

    #[test]
    fn test_tampered_expansion_rejected() {
        let mut bytes = *test_key().public_key().as_bytes();
        bytes[96] ^= 0xff;
        assert!(PublicKey::from_bytes(&bytes).is_err());
    }
}
