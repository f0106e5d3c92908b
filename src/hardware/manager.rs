//! Hardware credential management
//!
//! Tracks registered credentials, decides the active security mode, and
//! drives the registration/verification ceremonies against an
//! [`Authenticator`]. The wrapped vault key is persisted as base64; the
//! wrapping key itself never is.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use zeroize::Zeroizing;

use crate::error::{WalletError, WalletResult};
use crate::hardware::authenticator::Authenticator;
use crate::hardware::prf::{derive_key_from_prf, unwrap_key, wrap_key};
use crate::storage::{KeyValueStorage, KEY_HW_CONFIG, KEY_HW_WRAPPED_KEY};

/// PRF evaluation input handed to the authenticator; fixed so every
/// assertion of the same credential reproduces the same output
const PRF_EVAL_SALT: &[u8] = b"nbx-hw-prf-salt-v1";

/// How long to wait for a user-presence touch
const AUTHENTICATOR_TIMEOUT: Duration = Duration::from_secs(60);

/// One registered authenticator credential
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareCredential {
    /// Opaque credential id, base64url text
    pub credential_id: String,
    /// User-visible label
    pub name: String,
    /// RFC 3339 registration timestamp
    pub registered_at: String,
    /// Whether the credential supports PRF evaluation
    pub prf_supported: bool,
    /// Transports the credential is reachable over
    pub transports: Vec<String>,
}

/// Persisted hardware configuration
///
/// Invariant: `enabled` implies at least one credential.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HardwareConfig {
    pub enabled: bool,
    pub credentials: Vec<HardwareCredential>,
}

/// The protection level the current configuration provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityMode {
    /// Password only
    Disabled,
    /// Possession check at unlock, no key material involvement
    Webauthn2fa,
    /// Vault key wrapped under a PRF-derived AES key
    PrfKeyWrapping,
}

/// Orchestrates credentials, ceremonies, and the wrapped vault key
#[derive(Debug, Default)]
pub struct HardwareManager {
    config: HardwareConfig,
}

impl HardwareManager {
    /// Load configuration from storage, defaulting to disabled
    pub fn load(storage: &dyn KeyValueStorage) -> WalletResult<Self> {
        let config = match storage.get(KEY_HW_CONFIG)? {
            Some(json) => serde_json::from_str(&json)?,
            None => HardwareConfig::default(),
        };
        Ok(Self { config })
    }

    fn persist(&self, storage: &mut dyn KeyValueStorage) -> WalletResult<()> {
        let json = serde_json::to_string(&self.config)?;
        storage.set(KEY_HW_CONFIG, &json)
    }

    pub fn config(&self) -> &HardwareConfig {
        &self.config
    }

    /// The protection level the stored credentials provide
    pub fn security_mode(&self) -> SecurityMode {
        if !self.config.enabled || self.config.credentials.is_empty() {
            return SecurityMode::Disabled;
        }
        if self.config.credentials.iter().any(|c| c.prf_supported) {
            SecurityMode::PrfKeyWrapping
        } else {
            SecurityMode::Webauthn2fa
        }
    }

    /// Register a new credential and return its PRF-derived wrapping key,
    /// when the device supports PRF.
    ///
    /// Two-phase retrieval: some devices report PRF support at registration
    /// but only evaluate on assertion, so a missing output triggers one
    /// follow-up assertion before giving up.
    pub fn register_credential(
        &mut self,
        authenticator: &mut dyn Authenticator,
        name: &str,
        storage: &mut dyn KeyValueStorage,
    ) -> WalletResult<Option<Zeroizing<[u8; 32]>>> {
        let challenge = fresh_challenge();
        let registration =
            authenticator.register(&challenge, PRF_EVAL_SALT, AUTHENTICATOR_TIMEOUT)?;

        let prf_output = match (registration.prf_supported, registration.prf_output) {
            (true, Some(output)) => Some(output),
            (true, None) => {
                // Phase two: evaluate PRF via a follow-up assertion
                let follow_up = authenticator.assert(
                    &registration.credential_id,
                    &fresh_challenge(),
                    PRF_EVAL_SALT,
                    AUTHENTICATOR_TIMEOUT,
                )?;
                follow_up.prf_output
            }
            (false, _) => None,
        };

        self.config.credentials.push(HardwareCredential {
            credential_id: registration.credential_id,
            name: name.to_string(),
            registered_at: chrono::Utc::now().to_rfc3339(),
            prf_supported: registration.prf_supported && prf_output.is_some(),
            transports: registration.transports,
        });
        self.config.enabled = true;
        self.persist(storage)?;

        Ok(prf_output.map(|output| derive_key_from_prf(&output)))
    }

    /// Store a credential whose ceremony ran outside the core
    ///
    /// The extension UI performs the WebAuthn registration itself and hands
    /// the resulting record across the boundary.
    pub fn save_credential(
        &mut self,
        credential: HardwareCredential,
        storage: &mut dyn KeyValueStorage,
    ) -> WalletResult<()> {
        self.config
            .credentials
            .retain(|c| c.credential_id != credential.credential_id);
        self.config.credentials.push(credential);
        self.config.enabled = true;
        self.persist(storage)
    }

    /// Remove one credential by id
    ///
    /// Removing the last credential disables hardware protection; removing
    /// the last PRF-capable one also discards the wrapped vault key, since
    /// nothing can unwrap it anymore.
    pub fn remove_credential(
        &mut self,
        credential_id: &str,
        storage: &mut dyn KeyValueStorage,
    ) -> WalletResult<()> {
        let before = self.config.credentials.len();
        self.config
            .credentials
            .retain(|c| c.credential_id != credential_id);
        if self.config.credentials.len() == before {
            return Err(WalletError::invalid_input("Unknown credential id"));
        }

        if self.config.credentials.is_empty() {
            self.config.enabled = false;
        }
        self.persist(storage)?;

        if !self.config.credentials.iter().any(|c| c.prf_supported) {
            storage.remove(KEY_HW_WRAPPED_KEY)?;
        }
        Ok(())
    }

    /// Run a possession check against a registered credential
    ///
    /// Returns the PRF-derived wrapping key when the credential evaluates
    /// PRF, `None` for plain second-factor credentials.
    pub fn verify(
        &self,
        authenticator: &mut dyn Authenticator,
        credential_id: Option<&str>,
    ) -> WalletResult<Option<Zeroizing<[u8; 32]>>> {
        let credential = match credential_id {
            Some(id) => self
                .config
                .credentials
                .iter()
                .find(|c| c.credential_id == id),
            None => self.config.credentials.first(),
        }
        .ok_or_else(|| WalletError::hardware_verification_failed("No registered credential"))?;

        let assertion = authenticator.assert(
            &credential.credential_id,
            &fresh_challenge(),
            PRF_EVAL_SALT,
            AUTHENTICATOR_TIMEOUT,
        )?;

        Ok(assertion
            .prf_output
            .map(|output| derive_key_from_prf(&output)))
    }

    /// Persist the vault key wrapped under a PRF-derived key
    pub fn store_wrapped_key(
        &self,
        storage: &mut dyn KeyValueStorage,
        wrapping_key: &[u8; 32],
        vault_key: &[u8],
    ) -> WalletResult<()> {
        let blob = wrap_key(wrapping_key, vault_key)?;
        storage.set(KEY_HW_WRAPPED_KEY, &STANDARD.encode(blob))
    }

    /// Load and unwrap the persisted vault key
    pub fn load_wrapped_key(
        &self,
        storage: &dyn KeyValueStorage,
        wrapping_key: &[u8; 32],
    ) -> WalletResult<Zeroizing<Vec<u8>>> {
        let encoded = storage
            .get(KEY_HW_WRAPPED_KEY)?
            .ok_or_else(|| WalletError::hardware_verification_failed("No wrapped key stored"))?;
        let blob = STANDARD
            .decode(&encoded)
            .map_err(|_| WalletError::decryption_failed())?;
        unwrap_key(wrapping_key, &blob)
    }

    /// Drop all credentials and wrapped key material, returning the vault
    /// to password-only protection. Caller verifies the password first.
    pub fn disable(&mut self, storage: &mut dyn KeyValueStorage) -> WalletResult<()> {
        self.config.enabled = false;
        self.config.credentials.clear();
        self.persist(storage)?;
        storage.remove(KEY_HW_WRAPPED_KEY)
    }
}

fn fresh_challenge() -> [u8; 32] {
    let mut challenge = [0u8; 32];
    OsRng.fill_bytes(&mut challenge);
    challenge
}
