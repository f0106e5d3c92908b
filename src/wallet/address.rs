//! Address codec
//!
//! Two address versions are in circulation:
//!
//! - v0: base58 of the raw 97-byte public key. The fixed tag byte pins the
//!   encoding to exactly 132 characters, and decoding recovers the key.
//! - v1: base58 of the 40-byte digest of the public key. Shorter, one-way,
//!   used for display and verification only.

use crate::crypto::hash::digest;
use crate::crypto::sign::PublicKey;
use crate::error::{WalletError, WalletResult};
use crate::types::{ADDRESS_V0_LEN, PUBLIC_KEY_LEN};

/// v1 addresses encode 320 bits, which lands on 54 or 55 base58 characters
pub const ADDRESS_V1_MIN_LEN: usize = 54;
pub const ADDRESS_V1_MAX_LEN: usize = 55;

/// Supported address encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressVersion {
    /// Raw public key, reversible
    V0,
    /// Hashed public key, one-way
    V1,
}

/// Encode a public key as an address
pub fn public_key_to_address(public_key: &PublicKey, version: AddressVersion) -> String {
    match version {
        AddressVersion::V0 => bs58::encode(public_key.as_bytes()).into_string(),
        AddressVersion::V1 => bs58::encode(digest(public_key.as_bytes()).as_bytes()).into_string(),
    }
}

/// Decode a v0 address back to its public key
///
/// v1 addresses are hashes and cannot be inverted; they are rejected along
/// with everything else that is not a well-formed v0 address.
pub fn address_to_public_key(address: &str) -> WalletResult<PublicKey> {
    let trimmed = address.trim();
    if trimmed.len() != ADDRESS_V0_LEN {
        return Err(WalletError::bad_address(format!(
            "Address must be {} characters, got {}",
            ADDRESS_V0_LEN,
            trimmed.len()
        )));
    }

    let bytes = bs58::decode(trimmed).into_vec()?;
    if bytes.len() != PUBLIC_KEY_LEN {
        return Err(WalletError::bad_address(format!(
            "Decoded public key has invalid length: {}, expected {}",
            bytes.len(),
            PUBLIC_KEY_LEN
        )));
    }

    PublicKey::from_bytes(&bytes)
        .map_err(|e| WalletError::bad_address(e.message))
}

/// Classify an address string by version, if it matches either encoding
pub fn classify(address: &str) -> Option<AddressVersion> {
    let trimmed = address.trim();
    if trimmed.is_empty() || !is_base58(trimmed) {
        return None;
    }
    match trimmed.len() {
        ADDRESS_V0_LEN => Some(AddressVersion::V0),
        ADDRESS_V1_MIN_LEN..=ADDRESS_V1_MAX_LEN => Some(AddressVersion::V1),
        _ => None,
    }
}

/// Check whether a string is a well-formed address of either version
pub fn is_valid_address(address: &str) -> bool {
    classify(address).is_some()
}

fn is_base58(s: &str) -> bool {
    // Bitcoin base58 alphabet: no 0, O, I, or l
    s.chars().all(|c| {
        c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l')
    })
}
