//! Key-value storage boundary
//!
//! The embedder supplies durable storage (the extension's storage area). The
//! core only defines the interface and the key names; record shapes are
//! serde-serialized JSON strings.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{WalletError, WalletResult};

/// Encrypted vault blob (ciphertext + nonce + KDF salt)
pub const KEY_ENCRYPTED_VAULT: &str = "enc";

/// Serialized account list
pub const KEY_ACCOUNTS: &str = "accounts";

/// Index of the currently selected account
pub const KEY_CURRENT_ACCOUNT_INDEX: &str = "currentAccountIndex";

/// Auto-lock timeout in minutes
pub const KEY_AUTO_LOCK_MINUTES: &str = "autoLockMinutes";

/// Hardware authenticator configuration
pub const KEY_HW_CONFIG: &str = "hw_wallet_config";

/// Vault key wrapped under the hardware PRF-derived key
pub const KEY_HW_WRAPPED_KEY: &str = "hw_wrapped_key";

/// Durable key-value storage supplied by the embedder
pub trait KeyValueStorage: Send {
    fn get(&self, key: &str) -> WalletResult<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> WalletResult<()>;
    fn remove(&mut self, key: &str) -> WalletResult<()>;
}

/// In-memory storage, used by tests and as a default backing store
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> WalletResult<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| WalletError::internal("Storage lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> WalletResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| WalletError::internal("Storage lock poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> WalletResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| WalletError::internal("Storage lock poisoned"))?;
        entries.remove(key);
        Ok(())
    }
}
