//! Vault: the custody orchestrator
//!
//! Owns the encrypted mnemonic, the account list, the hardware
//! configuration, and the auto-lock timer. States: no vault yet, unlocked,
//! locked. Every mutating operation takes the one internal mutex, so
//! concurrent callers serialize.
//!
//! Unlock is deliberately oracle-free: whichever factor fails (password,
//! authenticator, wrapped-key unwrap), callers see the same `BadPassword`.
//!
//! SECURITY: the decrypted mnemonic lives only in memory as a
//! `SecretString`; every transition to locked wipes it and any cached
//! hardware key material.

use argon2::Argon2;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::crypto::hash::digest;
use crate::crypto::sign::{sign_digest, PrivateKey, Signature};
use crate::error::{WalletError, WalletResult};
use crate::hardware::authenticator::Authenticator;
use crate::hardware::manager::{HardwareCredential, HardwareManager, SecurityMode};
use crate::hardware::prf::{derive_key_from_prf, unwrap_key, wrap_key};
use crate::storage::{
    KeyValueStorage, KEY_ACCOUNTS, KEY_AUTO_LOCK_MINUTES, KEY_CURRENT_ACCOUNT_INDEX,
    KEY_ENCRYPTED_VAULT,
};
use crate::tx::builder::{build_transaction, ConstructedTransaction, PaymentOutput, TransactionParams};
use crate::tx::model::Note;
use crate::types::{
    Account, WalletState, DEFAULT_AUTO_LOCK_MINUTES, MAX_AUTO_LOCK_MINUTES, MIN_PASSWORD_LENGTH,
};
use crate::wallet::address::{public_key_to_address, AddressVersion};
use crate::wallet::derivation::ExtendedKey;
use crate::wallet::keygen::{generate_mnemonic, master_key_from_mnemonic, validate_mnemonic};

/// Argon2id salt width
const SALT_LEN: usize = 16;

/// Proof of a completed authenticator ceremony, produced by
/// [`Vault::verify_hardware`] and consumed by [`Vault::unlock`]
#[derive(Debug)]
pub enum HardwareProof {
    /// Possession was demonstrated; no key material involved
    Presence,
    /// The PRF-derived wrapping key obtained from the authenticator
    WrappingKey(Zeroizing<[u8; 32]>),
}

/// Encrypted vault record persisted under the `enc` storage key
#[derive(Serialize, Deserialize)]
struct EncryptedVault {
    /// AES-256-GCM ciphertext, base64
    ct: String,
    /// 96-bit nonce, base64
    nonce: String,
    /// Argon2id salt, base64
    salt: String,
}

struct Session {
    mnemonic: SecretString,
    /// The AES key the encrypted record decrypts under; cached so a PRF
    /// wrapping key obtained later can wrap it without re-asking for the
    /// password
    vault_key: Zeroizing<[u8; 32]>,
}

struct VaultInner {
    storage: Box<dyn KeyValueStorage>,
    hardware: HardwareManager,
    session: Option<Session>,
    last_activity: Instant,
}

/// The wallet's custody core
pub struct Vault {
    inner: Mutex<VaultInner>,
}

impl Vault {
    /// Open a vault over the given storage, loading any persisted state
    pub fn new(storage: Box<dyn KeyValueStorage>) -> WalletResult<Self> {
        let hardware = HardwareManager::load(storage.as_ref())?;
        Ok(Self {
            inner: Mutex::new(VaultInner {
                storage,
                hardware,
                session: None,
                last_activity: Instant::now(),
            }),
        })
    }

    fn lock_inner(&self) -> WalletResult<std::sync::MutexGuard<'_, VaultInner>> {
        self.inner
            .lock()
            .map_err(|_| WalletError::internal("Vault lock poisoned"))
    }

    // === Lifecycle ===

    /// Create a fresh vault with a newly generated 24-word mnemonic
    pub fn setup(&self, password: &str) -> WalletResult<WalletState> {
        let mnemonic = generate_mnemonic()?;
        self.setup_with(password, &mnemonic)
    }

    /// Create a vault from an imported recovery phrase
    pub fn setup_from_mnemonic(&self, password: &str, phrase: &str) -> WalletResult<WalletState> {
        if !validate_mnemonic(phrase) {
            return Err(WalletError::invalid_mnemonic(
                "Recovery phrase failed word-list or checksum validation",
            ));
        }
        self.setup_with(password, phrase)
    }

    fn setup_with(&self, password: &str, mnemonic: &str) -> WalletResult<WalletState> {
        if password.len() < MIN_PASSWORD_LENGTH {
            return Err(WalletError::invalid_input(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        let mut inner = self.lock_inner()?;
        if inner.storage.get(KEY_ENCRYPTED_VAULT)?.is_some() {
            return Err(WalletError::invalid_input("A vault already exists"));
        }

        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let key = derive_password_key(password, &salt)?;

        let blob = wrap_key(&key, mnemonic.as_bytes())?;
        let record = EncryptedVault {
            nonce: STANDARD.encode(&blob[..12]),
            ct: STANDARD.encode(&blob[12..]),
            salt: STANDARD.encode(salt),
        };
        inner
            .storage
            .set(KEY_ENCRYPTED_VAULT, &serde_json::to_string(&record)?)?;

        // First account at derivation index 0
        let account = derive_account(mnemonic, 0, "Account 1")?;
        inner.persist_accounts(&[account])?;
        inner
            .storage
            .set(KEY_CURRENT_ACCOUNT_INDEX, "0")?;

        inner.session = Some(Session {
            mnemonic: SecretString::from(mnemonic.to_string()),
            vault_key: key,
        });
        inner.last_activity = Instant::now();
        inner.state()
    }

    /// Unlock the vault with a password and, when hardware protection is
    /// active, a completed authenticator ceremony
    pub fn unlock(&self, password: &str, proof: Option<HardwareProof>) -> WalletResult<WalletState> {
        let mut inner = self.lock_inner()?;
        let (mnemonic, key) = inner.verify_factors(password, proof.as_ref())?;

        inner.session = Some(Session {
            mnemonic: SecretString::from(mnemonic),
            vault_key: key,
        });
        inner.last_activity = Instant::now();
        inner.state()
    }

    /// Lock the vault, wiping the cached mnemonic. Idempotent.
    pub fn lock(&self) -> WalletResult<WalletState> {
        let mut inner = self.lock_inner()?;
        inner.session = None;
        inner.state()
    }

    /// Destroy the vault entirely, returning to the no-vault state
    ///
    /// Requires the current password (and hardware proof when active) so a
    /// passerby cannot wipe an unattended wallet.
    pub fn reset(&self, password: &str, proof: Option<HardwareProof>) -> WalletResult<()> {
        let mut inner = self.lock_inner()?;
        inner.verify_factors(password, proof.as_ref())?;

        inner.session = None;
        inner.storage.remove(KEY_ENCRYPTED_VAULT)?;
        inner.storage.remove(KEY_ACCOUNTS)?;
        inner.storage.remove(KEY_CURRENT_ACCOUNT_INDEX)?;
        inner.storage.remove(KEY_AUTO_LOCK_MINUTES)?;
        let VaultInner {
            storage, hardware, ..
        } = &mut *inner;
        hardware.disable(storage.as_mut())
    }

    /// Reveal the recovery phrase, re-verifying every factor even when the
    /// vault is already unlocked
    pub fn get_mnemonic(
        &self,
        password: &str,
        proof: Option<HardwareProof>,
    ) -> WalletResult<Zeroizing<String>> {
        let mut inner = self.lock_inner()?;
        let (mnemonic, _) = inner.verify_factors(password, proof.as_ref())?;
        inner.last_activity = Instant::now();
        Ok(Zeroizing::new(mnemonic))
    }

    /// Current state snapshot for the UI
    pub fn state(&self) -> WalletResult<WalletState> {
        self.lock_inner()?.state()
    }

    // === Accounts ===

    /// Derive the next account and make it current
    pub fn create_account(&self, name: Option<&str>) -> WalletResult<Account> {
        let mut inner = self.lock_inner()?;
        let session = inner.session.as_ref().ok_or_else(WalletError::locked)?;

        let mut accounts = inner.load_accounts()?;
        let index = accounts.iter().map(|a| a.index + 1).max().unwrap_or(0);
        let default_name = format!("Account {}", index + 1);
        let account = derive_account(
            session.mnemonic.expose_secret(),
            index,
            name.unwrap_or(&default_name),
        )?;

        accounts.push(account.clone());
        inner.persist_accounts(&accounts)?;
        inner
            .storage
            .set(KEY_CURRENT_ACCOUNT_INDEX, &index.to_string())?;
        inner.last_activity = Instant::now();
        Ok(account)
    }

    /// Switch the current account by derivation index
    pub fn switch_account(&self, index: u32) -> WalletResult<Account> {
        let mut inner = self.lock_inner()?;
        if inner.session.is_none() {
            return Err(WalletError::locked());
        }

        let accounts = inner.load_accounts()?;
        let account = accounts
            .iter()
            .find(|a| a.index == index)
            .cloned()
            .ok_or_else(|| WalletError::invalid_account_index(index as usize))?;

        inner
            .storage
            .set(KEY_CURRENT_ACCOUNT_INDEX, &index.to_string())?;
        inner.last_activity = Instant::now();
        Ok(account)
    }

    /// Rename an account by derivation index
    pub fn rename_account(&self, index: u32, name: &str) -> WalletResult<Account> {
        let mut inner = self.lock_inner()?;
        if inner.session.is_none() {
            return Err(WalletError::locked());
        }
        if name.trim().is_empty() {
            return Err(WalletError::invalid_input("Account name cannot be empty"));
        }

        let mut accounts = inner.load_accounts()?;
        let account = accounts
            .iter_mut()
            .find(|a| a.index == index)
            .ok_or_else(|| WalletError::invalid_account_index(index as usize))?;
        account.name = name.trim().to_string();
        let renamed = account.clone();

        inner.persist_accounts(&accounts)?;
        inner.last_activity = Instant::now();
        Ok(renamed)
    }

    /// All known accounts
    pub fn accounts(&self) -> WalletResult<Vec<Account>> {
        self.lock_inner()?.load_accounts()
    }

    // === Signing ===

    /// Sign arbitrary message bytes with the current account's key
    ///
    /// The message is digested first; raw data is never signed directly.
    pub fn sign_message(&self, message: &[u8]) -> WalletResult<Signature> {
        let inner = self.lock_inner()?;
        let key = inner.current_private_key()?;
        sign_digest(&key, &digest(message))
    }

    /// Build and sign a transaction spending the given notes
    pub fn send_transaction(
        &self,
        notes: Vec<Note>,
        outputs: Vec<PaymentOutput>,
        fee: u64,
    ) -> WalletResult<ConstructedTransaction> {
        let inner = self.lock_inner()?;
        let key = inner.current_private_key()?;
        let public = key.public_key();

        build_transaction(&TransactionParams {
            notes,
            outputs,
            fee,
            private_key: key.as_bytes(),
            public_key: public.as_bytes(),
        })
    }

    // === Hardware protection ===

    /// Run an authenticator ceremony and package the result for unlock
    pub fn verify_hardware(
        &self,
        authenticator: &mut dyn Authenticator,
    ) -> WalletResult<HardwareProof> {
        let inner = self.lock_inner()?;
        Ok(match inner.hardware.verify(authenticator, None)? {
            Some(key) => HardwareProof::WrappingKey(key),
            None => HardwareProof::Presence,
        })
    }

    /// Register an authenticator, activating hardware protection
    ///
    /// With a PRF-capable device the password-derived vault key gets wrapped
    /// under the PRF key, and future unlocks require both factors.
    pub fn enable_hardware(
        &self,
        password: &str,
        authenticator: &mut dyn Authenticator,
        name: &str,
    ) -> WalletResult<SecurityMode> {
        let mut inner = self.lock_inner()?;

        let record = inner.load_encrypted()?;
        let salt = decode_b64(&record.salt)?;
        let key = derive_password_key(password, &salt)?;
        // Wrong password must surface before any device interaction
        decrypt_record(&record, &key)?;

        let VaultInner {
            storage, hardware, ..
        } = &mut *inner;
        if let Some(wrapping) = hardware.register_credential(authenticator, name, storage.as_mut())?
        {
            hardware.store_wrapped_key(storage.as_mut(), &wrapping, &key[..])?;
        }
        Ok(inner.hardware.security_mode())
    }

    /// Unlock from a raw PRF output, no password involved
    ///
    /// The persisted wrapped vault key stands in for the password factor:
    /// unwrapping it with the PRF-derived key yields the key the encrypted
    /// record decrypts under. Failures collapse to `BadPassword`, same as
    /// the password path.
    pub fn unlock_with_hardware(&self, prf_output: &[u8; 32]) -> WalletResult<WalletState> {
        let mut inner = self.lock_inner()?;
        let record = inner.load_encrypted()?;

        let wrapping = derive_key_from_prf(prf_output);
        let stored = inner
            .hardware
            .load_wrapped_key(inner.storage.as_ref(), &wrapping)
            .map_err(|_| WalletError::bad_password())?;
        if stored.len() != 32 {
            return Err(WalletError::bad_password());
        }
        let mut key = Zeroizing::new([0u8; 32]);
        key.copy_from_slice(&stored);
        let mnemonic = decrypt_record(&record, &key)?;

        inner.session = Some(Session {
            mnemonic: SecretString::from(mnemonic),
            vault_key: key,
        });
        inner.last_activity = Instant::now();
        inner.state()
    }

    /// Wrap the session vault key under a PRF-derived key and persist it
    ///
    /// Requires an unlocked vault; the extension calls this right after an
    /// external registration ceremony hands it the device's PRF output.
    pub fn enable_vault_encryption(&self, prf_output: &[u8; 32]) -> WalletResult<()> {
        let mut inner = self.lock_inner()?;
        let wrapping = derive_key_from_prf(prf_output);
        let VaultInner {
            storage,
            hardware,
            session,
            ..
        } = &mut *inner;
        let session = session.as_ref().ok_or_else(WalletError::locked)?;
        hardware.store_wrapped_key(storage.as_mut(), &wrapping, &session.vault_key[..])
    }

    /// Store a credential record produced by an external registration
    /// ceremony, activating hardware protection
    pub fn save_hardware_credential(&self, credential: HardwareCredential) -> WalletResult<()> {
        let mut inner = self.lock_inner()?;
        let VaultInner {
            storage, hardware, ..
        } = &mut *inner;
        hardware.save_credential(credential, storage.as_mut())
    }

    /// Remove a registered credential by id
    ///
    /// Dropping the last credential turns hardware protection off.
    pub fn remove_hardware_credential(&self, credential_id: &str) -> WalletResult<()> {
        let mut inner = self.lock_inner()?;
        let VaultInner {
            storage, hardware, ..
        } = &mut *inner;
        hardware.remove_credential(credential_id, storage.as_mut())
    }

    /// The registered hardware credentials
    pub fn hardware_credentials(&self) -> WalletResult<Vec<HardwareCredential>> {
        Ok(self.lock_inner()?.hardware.config().credentials.clone())
    }

    /// Drop hardware protection, returning to password-only unlock
    pub fn disable_hardware(&self, password: &str) -> WalletResult<()> {
        let mut inner = self.lock_inner()?;

        let record = inner.load_encrypted()?;
        let salt = decode_b64(&record.salt)?;
        let key = derive_password_key(password, &salt)?;
        decrypt_record(&record, &key)?;

        let VaultInner {
            storage, hardware, ..
        } = &mut *inner;
        hardware.disable(storage.as_mut())
    }

    /// The protection level currently configured
    pub fn security_mode(&self) -> WalletResult<SecurityMode> {
        Ok(self.lock_inner()?.hardware.security_mode())
    }

    // === Auto-lock ===

    /// Change the inactivity timeout, in minutes
    pub fn set_auto_lock_minutes(&self, minutes: u64) -> WalletResult<()> {
        if minutes == 0 || minutes > MAX_AUTO_LOCK_MINUTES {
            return Err(WalletError::invalid_input(format!(
                "Auto-lock timeout must be between 1 and {} minutes",
                MAX_AUTO_LOCK_MINUTES
            )));
        }
        let mut inner = self.lock_inner()?;
        inner
            .storage
            .set(KEY_AUTO_LOCK_MINUTES, &minutes.to_string())?;
        inner.last_activity = Instant::now();
        Ok(())
    }

    pub fn auto_lock_minutes(&self) -> WalletResult<u64> {
        self.lock_inner()?.auto_lock_minutes()
    }

    /// Mark user activity, pushing the auto-lock deadline out
    pub fn record_activity(&self) -> WalletResult<()> {
        self.lock_inner()?.last_activity = Instant::now();
        Ok(())
    }

    /// Lock if the inactivity timeout has passed. Safe to call on a timer.
    pub fn check_auto_lock(&self) -> WalletResult<bool> {
        let mut inner = self.lock_inner()?;
        if inner.session.is_none() {
            return Ok(false);
        }
        // Storage contents are untrusted; a corrupt value must not overflow
        let deadline = Duration::from_secs(inner.auto_lock_minutes()?.saturating_mul(60));
        if inner.last_activity.elapsed() >= deadline {
            inner.session = None;
            return Ok(true);
        }
        Ok(false)
    }
}

impl VaultInner {
    fn state(&self) -> WalletResult<WalletState> {
        let accounts = self.load_accounts()?;
        let current = self.current_account(&accounts)?;
        Ok(WalletState {
            locked: self.session.is_none(),
            address: current.as_ref().map(|a| a.address.clone()),
            accounts,
            current_account: current,
        })
    }

    fn load_encrypted(&self) -> WalletResult<EncryptedVault> {
        let json = self
            .storage
            .get(KEY_ENCRYPTED_VAULT)?
            .ok_or_else(WalletError::no_vault)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Check password and hardware proof together; every failure collapses
    /// to the same `BadPassword` so callers learn nothing about which
    /// factor was wrong. Returns the decrypted mnemonic and the vault key.
    fn verify_factors(
        &mut self,
        password: &str,
        proof: Option<&HardwareProof>,
    ) -> WalletResult<(String, Zeroizing<[u8; 32]>)> {
        let record = self.load_encrypted()?;
        let salt = decode_b64(&record.salt)?;
        let key = derive_password_key(password, &salt)?;

        match self.hardware.security_mode() {
            SecurityMode::Disabled => {}
            SecurityMode::Webauthn2fa => {
                if proof.is_none() {
                    return Err(WalletError::hardware_required());
                }
            }
            SecurityMode::PrfKeyWrapping => {
                let wrapping = match proof {
                    Some(HardwareProof::WrappingKey(k)) => k,
                    _ => return Err(WalletError::hardware_required()),
                };
                let stored = self
                    .hardware
                    .load_wrapped_key(self.storage.as_ref(), wrapping)
                    .map_err(|_| WalletError::bad_password())?;
                if !bool::from(stored.as_slice().ct_eq(&key[..])) {
                    return Err(WalletError::bad_password());
                }
            }
        }

        let mnemonic = decrypt_record(&record, &key)?;
        Ok((mnemonic, key))
    }

    fn current_private_key(&self) -> WalletResult<PrivateKey> {
        let session = self.session.as_ref().ok_or_else(WalletError::locked)?;
        let index = self.current_index()?;
        let master = master_key_from_mnemonic(session.mnemonic.expose_secret(), "")?;
        let child = master.derive_child(index)?;
        child
            .private_key()
            .ok_or_else(|| WalletError::internal("Derived node is missing private material"))
    }

    fn load_accounts(&self) -> WalletResult<Vec<Account>> {
        match self.storage.get(KEY_ACCOUNTS)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    fn persist_accounts(&mut self, accounts: &[Account]) -> WalletResult<()> {
        self.storage
            .set(KEY_ACCOUNTS, &serde_json::to_string(accounts)?)
    }

    fn current_index(&self) -> WalletResult<u32> {
        match self.storage.get(KEY_CURRENT_ACCOUNT_INDEX)? {
            Some(raw) => raw
                .parse()
                .map_err(|_| WalletError::internal("Corrupt account index")),
            None => Ok(0),
        }
    }

    fn current_account(&self, accounts: &[Account]) -> WalletResult<Option<Account>> {
        let index = self.current_index()?;
        Ok(accounts.iter().find(|a| a.index == index).cloned())
    }

    fn auto_lock_minutes(&self) -> WalletResult<u64> {
        match self.storage.get(KEY_AUTO_LOCK_MINUTES)? {
            Some(raw) => raw
                .parse()
                .map_err(|_| WalletError::internal("Corrupt auto-lock setting")),
            None => Ok(DEFAULT_AUTO_LOCK_MINUTES),
        }
    }
}

fn derive_password_key(password: &str, salt: &[u8]) -> WalletResult<Zeroizing<[u8; 32]>> {
    let mut key = Zeroizing::new([0u8; 32]);
    Argon2::default()
        .hash_password_into(password.as_bytes(), salt, key.as_mut())
        .map_err(|e| WalletError::crypto_error(format!("Password KDF failed: {}", e)))?;
    Ok(key)
}

/// Decrypt the persisted record; any failure reads as a wrong password
fn decrypt_record(record: &EncryptedVault, key: &[u8; 32]) -> WalletResult<String> {
    let nonce = decode_b64(&record.nonce)?;
    let ct = decode_b64(&record.ct)?;
    let mut blob = Vec::with_capacity(nonce.len() + ct.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ct);

    let plaintext = unwrap_key(key, &blob).map_err(|_| WalletError::bad_password())?;
    String::from_utf8(plaintext.to_vec()).map_err(|_| WalletError::bad_password())
}

fn decode_b64(encoded: &str) -> WalletResult<Vec<u8>> {
    STANDARD
        .decode(encoded)
        .map_err(|_| WalletError::internal("Corrupt vault record encoding"))
}

fn derive_account(mnemonic: &str, index: u32, name: &str) -> WalletResult<Account> {
    let master = master_key_from_mnemonic(mnemonic, "")?;
    let child: ExtendedKey = master.derive_child(index)?;
    Ok(Account {
        name: name.to_string(),
        address: public_key_to_address(child.public_key(), AddressVersion::V0),
        index,
    })
}
