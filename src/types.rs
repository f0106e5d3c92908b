//! Shared types and byte-length constants
//!
//! Fixed sizes for keys, digests, and addresses used across the crate.

use serde::{Deserialize, Serialize};

/// Private key length in bytes
pub const PRIVATE_KEY_LEN: usize = 32;

/// Public key length in bytes (tag byte + point + expansion)
pub const PUBLIC_KEY_LEN: usize = 97;

/// Chain code length in bytes
pub const CHAIN_CODE_LEN: usize = 32;

/// Digest length in bytes (five 64-bit limbs)
pub const DIGEST_LEN: usize = 40;

/// A v0 address is the base58 encoding of a 97-byte public key
pub const ADDRESS_V0_LEN: usize = 132;

/// Number of words in a recovery phrase (256 bits of entropy)
pub const MNEMONIC_WORD_COUNT: usize = 24;

/// Minimum password length accepted at vault setup
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Default auto-lock timeout in minutes
pub const DEFAULT_AUTO_LOCK_MINUTES: u64 = 15;

/// Longest accepted auto-lock timeout (24 hours)
pub const MAX_AUTO_LOCK_MINUTES: u64 = 1440;

/// A wallet account derived from the vault mnemonic
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    /// User-visible account name
    pub name: String,
    /// v0 address of the account's public key
    pub address: String,
    /// Child derivation index under the master key
    pub index: u32,
}

/// Snapshot of vault state handed across the boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletState {
    pub locked: bool,
    pub address: Option<String>,
    pub accounts: Vec<Account>,
    pub current_account: Option<Account>,
}

/// Plain JSON keyfile for backup/restore
///
/// Serialization shape only; reading and writing files is the
/// embedder's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keyfile {
    pub version: String,
    pub mnemonic: String,
    pub created: String,
}

impl Keyfile {
    pub const CURRENT_VERSION: &'static str = "1";

    /// Wrap a mnemonic in the current keyfile format
    pub fn export(mnemonic: &str) -> Self {
        Self {
            version: Self::CURRENT_VERSION.to_string(),
            mnemonic: mnemonic.to_string(),
            created: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Extract the mnemonic, validating the keyfile format
    pub fn import(&self) -> crate::error::WalletResult<String> {
        if self.version.is_empty() {
            return Err(crate::error::WalletError::invalid_input(
                "Invalid keyfile format: missing version",
            ));
        }
        if self.version != Self::CURRENT_VERSION {
            return Err(crate::error::WalletError::invalid_input(
                "Unsupported keyfile version",
            ));
        }
        if self.mnemonic.is_empty() {
            return Err(crate::error::WalletError::invalid_input(
                "Invalid keyfile format: missing mnemonic",
            ));
        }
        Ok(self.mnemonic.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyfile_roundtrip() {
        let keyfile = Keyfile::export("abandon abandon about");
        assert_eq!(keyfile.import().unwrap(), "abandon abandon about");
    }

    #[test]
    fn test_keyfile_rejects_unknown_version() {
        let keyfile = Keyfile {
            version: "2".to_string(),
            mnemonic: "word".to_string(),
            created: String::new(),
        };
        assert!(keyfile.import().is_err());
    }
}
