//! Authenticator device abstraction
//!
//! The physical device sits outside the core; this trait is the seam. Calls
//! block until the user touches the key, cancels, or the timeout passes.

use std::collections::HashMap;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

use crate::error::{WalletError, WalletResult};

/// Outcome of registering a new credential on the device
#[derive(Debug, Clone)]
pub struct RegistrationResult {
    /// Opaque credential id, base64url text
    pub credential_id: String,
    /// Whether the device advertises PRF support
    pub prf_supported: bool,
    /// PRF output, when the device evaluates it during registration.
    /// Some devices report support but defer evaluation to the first
    /// assertion; callers must handle `None` with `prf_supported` true.
    pub prf_output: Option<[u8; 32]>,
    /// Transports the credential is reachable over ("usb", "nfc", ...)
    pub transports: Vec<String>,
}

/// Outcome of asserting an existing credential
#[derive(Debug, Clone)]
pub struct AssertionResult {
    pub credential_id: String,
    pub prf_output: Option<[u8; 32]>,
}

/// A WebAuthn-style authenticator
///
/// Both operations present a fresh challenge to the device and block for
/// user presence. Failure modes: user cancellation or device error maps to
/// `HardwareVerificationFailed`, expiry to `Timeout`.
pub trait Authenticator: Send {
    fn register(
        &mut self,
        challenge: &[u8; 32],
        prf_salt: &[u8],
        timeout: Duration,
    ) -> WalletResult<RegistrationResult>;

    fn assert(
        &mut self,
        credential_id: &str,
        challenge: &[u8; 32],
        prf_salt: &[u8],
        timeout: Duration,
    ) -> WalletResult<AssertionResult>;
}

/// Software authenticator backed by an in-memory HMAC secret
///
/// Stands in for a physical key in tests and development. Each registered
/// credential gets its own secret, so PRF outputs differ per credential and
/// per salt, like real hardware.
pub struct SoftwareAuthenticator {
    credentials: HashMap<String, [u8; 32]>,
    prf_supported: bool,
    prf_at_registration: bool,
    fail_next: bool,
}

impl SoftwareAuthenticator {
    pub fn new() -> Self {
        Self {
            credentials: HashMap::new(),
            prf_supported: true,
            prf_at_registration: true,
            fail_next: false,
        }
    }

    /// A device without PRF support (second-factor only)
    pub fn without_prf() -> Self {
        Self {
            prf_supported: false,
            ..Self::new()
        }
    }

    /// A device that reports PRF support but only evaluates on assertion
    pub fn with_deferred_prf() -> Self {
        Self {
            prf_at_registration: false,
            ..Self::new()
        }
    }

    /// Make the next operation fail as if the user cancelled
    pub fn fail_next(&mut self) {
        self.fail_next = true;
    }

    fn prf(&self, secret: &[u8; 32], salt: &[u8]) -> [u8; 32] {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret)
            .expect("HMAC accepts any key length");
        mac.update(salt);
        mac.finalize().into_bytes().into()
    }

    fn check_cancelled(&mut self) -> WalletResult<()> {
        if self.fail_next {
            self.fail_next = false;
            return Err(WalletError::hardware_verification_failed(
                "User cancelled the authenticator prompt",
            ));
        }
        Ok(())
    }
}

impl Default for SoftwareAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

impl Authenticator for SoftwareAuthenticator {
    fn register(
        &mut self,
        _challenge: &[u8; 32],
        prf_salt: &[u8],
        _timeout: Duration,
    ) -> WalletResult<RegistrationResult> {
        self.check_cancelled()?;

        let mut secret = [0u8; 32];
        OsRng.fill_bytes(&mut secret);
        let mut raw_id = [0u8; 16];
        OsRng.fill_bytes(&mut raw_id);
        let credential_id = URL_SAFE_NO_PAD.encode(raw_id);

        let prf_output = (self.prf_supported && self.prf_at_registration)
            .then(|| self.prf(&secret, prf_salt));
        self.credentials.insert(credential_id.clone(), secret);

        Ok(RegistrationResult {
            credential_id,
            prf_supported: self.prf_supported,
            prf_output,
            transports: vec!["usb".to_string()],
        })
    }

    fn assert(
        &mut self,
        credential_id: &str,
        _challenge: &[u8; 32],
        prf_salt: &[u8],
        _timeout: Duration,
    ) -> WalletResult<AssertionResult> {
        self.check_cancelled()?;

        let secret = self.credentials.get(credential_id).ok_or_else(|| {
            WalletError::hardware_verification_failed("Unknown credential")
        })?;
        let prf_output = self.prf_supported.then(|| self.prf(secret, prf_salt));

        Ok(AssertionResult {
            credential_id: credential_id.to_string(),
            prf_output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(60);

    #[test]
    fn test_register_then_assert_same_prf() {
        let mut auth = SoftwareAuthenticator::new();
        let reg = auth.register(&[1u8; 32], b"salt", TIMEOUT).unwrap();
        assert!(reg.prf_supported);
        let at_registration = reg.prf_output.unwrap();

        let assertion = auth
            .assert(&reg.credential_id, &[2u8; 32], b"salt", TIMEOUT)
            .unwrap();
        assert_eq!(assertion.prf_output.unwrap(), at_registration);
    }

    #[test]
    fn test_prf_differs_per_salt() {
        let mut auth = SoftwareAuthenticator::new();
        let reg = auth.register(&[1u8; 32], b"salt-a", TIMEOUT).unwrap();

        let other = auth
            .assert(&reg.credential_id, &[2u8; 32], b"salt-b", TIMEOUT)
            .unwrap();
        assert_ne!(reg.prf_output.unwrap(), other.prf_output.unwrap());
    }

    #[test]
    fn test_deferred_prf_registration_returns_none() {
        let mut auth = SoftwareAuthenticator::with_deferred_prf();
        let reg = auth.register(&[1u8; 32], b"salt", TIMEOUT).unwrap();
        assert!(reg.prf_supported);
        assert!(reg.prf_output.is_none());

        let assertion = auth
            .assert(&reg.credential_id, &[2u8; 32], b"salt", TIMEOUT)
            .unwrap();
        assert!(assertion.prf_output.is_some());
    }

    #[test]
    fn test_unknown_credential_rejected() {
        let mut auth = SoftwareAuthenticator::new();
        assert!(auth.assert("missing", &[0u8; 32], b"salt", TIMEOUT).is_err());
    }

    #[test]
    fn test_cancellation() {
        let mut auth = SoftwareAuthenticator::new();
        auth.fail_next();
        assert!(auth.register(&[0u8; 32], b"salt", TIMEOUT).is_err());
        // Next operation succeeds again
        assert!(auth.register(&[0u8; 32], b"salt", TIMEOUT).is_ok());
    }
}
