//! Hierarchical key derivation
//!
//! SLIP-10-style hardened derivation: HMAC-SHA512 over the parent chain code
//! splits into child key material and child chain code. The same
//! (parent, index) pair always yields a bit-identical child, which is what
//! lets account switching reproduce the same address across sessions.
//!
//! SECURITY: private key material is zeroized on drop.

use hmac::{Hmac, Mac};
use sha2::Sha512;
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::sign::{PrivateKey, PublicKey};
use crate::error::{ErrorCode, WalletError, WalletResult};
use crate::types::{CHAIN_CODE_LEN, PRIVATE_KEY_LEN};

type HmacSha512 = Hmac<Sha512>;

/// Domain key for master derivation from seed bytes
const MASTER_HMAC_KEY: &[u8] = b"Nockchain seed";

/// Hardened index offset; all child derivation here is hardened
const HARDENED_OFFSET: u32 = 0x8000_0000;

/// A node in the hierarchical key tree
///
/// Public-only nodes (no private material) can encode addresses but cannot
/// derive children, since derivation is hardened.
pub struct ExtendedKey {
    private_key: Option<Zeroizing<[u8; PRIVATE_KEY_LEN]>>,
    public_key: PublicKey,
    chain_code: [u8; CHAIN_CODE_LEN],
}

impl ExtendedKey {
    /// Derive the master key from seed bytes
    pub fn from_seed(seed: &[u8]) -> WalletResult<Self> {
        if seed.is_empty() || seed.len() > 64 {
            return Err(WalletError::invalid_input(format!(
                "Seed must be 1..=64 bytes, got {}",
                seed.len()
            )));
        }

        let mut mac = HmacSha512::new_from_slice(MASTER_HMAC_KEY)
            .map_err(|e| WalletError::crypto_error(format!("HMAC init failed: {}", e)))?;
        mac.update(seed);
        let output: Zeroizing<[u8; 64]> = Zeroizing::new(mac.finalize().into_bytes().into());

        Ok(Self::from_split(output.as_ref()))
    }

    /// Derive a hardened child at the given index
    pub fn derive_child(&self, index: u32) -> WalletResult<Self> {
        if index >= HARDENED_OFFSET {
            return Err(WalletError::invalid_input(format!(
                "Derivation index {} out of range",
                index
            )));
        }
        let private = self.private_key.as_ref().ok_or_else(|| {
            WalletError::new(
                ErrorCode::CryptoError,
                "Cannot derive a child from a public-only key",
            )
        })?;

        let mut mac = HmacSha512::new_from_slice(&self.chain_code)
            .map_err(|e| WalletError::crypto_error(format!("HMAC init failed: {}", e)))?;
        mac.update(&[0u8]);
        mac.update(private.as_ref());
        mac.update(&(index | HARDENED_OFFSET).to_be_bytes());
        let output: Zeroizing<[u8; 64]> = Zeroizing::new(mac.finalize().into_bytes().into());

        Ok(Self::from_split(output.as_ref()))
    }

    fn from_split(output: &[u8]) -> Self {
        let mut key_bytes = Zeroizing::new([0u8; PRIVATE_KEY_LEN]);
        key_bytes.copy_from_slice(&output[..PRIVATE_KEY_LEN]);
        let mut chain_code = [0u8; CHAIN_CODE_LEN];
        chain_code.copy_from_slice(&output[PRIVATE_KEY_LEN..]);

        let private = PrivateKey::from_bytes(key_bytes.as_ref())
            .expect("split output is exactly 32 bytes");
        let public_key = private.public_key();

        Self {
            private_key: Some(key_bytes),
            public_key,
            chain_code,
        }
    }

    /// The private key, if this node carries one
    pub fn private_key(&self) -> Option<PrivateKey> {
        self.private_key
            .as_ref()
            .map(|bytes| PrivateKey::from_bytes(bytes.as_ref()).expect("stored key is 32 bytes"))
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn chain_code(&self) -> &[u8; CHAIN_CODE_LEN] {
        &self.chain_code
    }

    /// Strip private material, leaving a public-only node
    pub fn neutered(&self) -> Self {
        Self {
            private_key: None,
            public_key: self.public_key,
            chain_code: self.chain_code,
        }
    }
}

impl Drop for ExtendedKey {
    fn drop(&mut self) {
        self.chain_code.zeroize();
        // private_key is Zeroizing and wipes itself
    }
}

impl std::fmt::Debug for ExtendedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtendedKey")
            .field("has_private", &self.private_key.is_some())
            .field("public_key", &hex::encode(&self.public_key.as_bytes()[..8]))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_master_derivation_is_deterministic() {
        let a = ExtendedKey::from_seed(&[1u8; 32]).unwrap();
        let b = ExtendedKey::from_seed(&[1u8; 32]).unwrap();

        assert_eq!(a.public_key().as_bytes(), b.public_key().as_bytes());
        assert_eq!(a.chain_code(), b.chain_code());
    }

    #[test]
    fn test_child_derivation_is_deterministic() {
        let master = ExtendedKey::from_seed(&[2u8; 32]).unwrap();

        let a = master.derive_child(5).unwrap();
        let b = master.derive_child(5).unwrap();
        assert_eq!(a.public_key().as_bytes(), b.public_key().as_bytes());

        let c = master.derive_child(6).unwrap();
        assert_ne!(a.public_key().as_bytes(), c.public_key().as_bytes());
    }

    #[test]
    fn test_seed_length_checks() {
        assert!(ExtendedKey::from_seed(&[]).is_err());
        assert!(ExtendedKey::from_seed(&[0u8; 65]).is_err());
        assert!(ExtendedKey::from_seed(&[0u8; 64]).is_ok());
    }

    #[test]
    fn test_index_out_of_range() {
        let master = ExtendedKey::from_seed(&[3u8; 32]).unwrap();
        assert!(master.derive_child(0x8000_0000).is_err());
    }

    #[test]
    fn test_public_only_node_cannot_derive() {
        let master = ExtendedKey::from_seed(&[4u8; 32]).unwrap();
        let neutered = master.neutered();

        assert!(neutered.private_key().is_none());
        let err = neutered.derive_child(0).unwrap_err();
        assert_eq!(err.code, ErrorCode::CryptoError);
    }
}
