//! PRF key derivation and key wrapping
//!
//! Turns a raw authenticator PRF output into an AES-256 key via HKDF-SHA256
//! and wraps/unwraps the vault key under it with AES-256-GCM. The derived
//! key lives only in memory; only the wrapped ciphertext is persisted.
//!
//! SECURITY: derived keys are zeroized on drop; unwrap fails closed.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{WalletError, WalletResult};

/// HKDF salt, fixed across versions so the same PRF output always derives
/// the same key
const HKDF_SALT: &[u8] = b"iris-wallet-aes-key-v1";

/// HKDF info string binding the key to its purpose
const HKDF_INFO: &[u8] = b"seed-encryption";

/// AES-GCM nonce width in bytes
const NONCE_LEN: usize = 12;

/// Derive a 256-bit AES key from an authenticator PRF output
pub fn derive_key_from_prf(prf_output: &[u8; 32]) -> Zeroizing<[u8; 32]> {
    let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), prf_output);
    let mut key = Zeroizing::new([0u8; 32]);
    hk.expand(HKDF_INFO, key.as_mut())
        .expect("32 bytes is a valid HKDF-SHA256 output length");
    key
}

/// Encrypt key material under a wrapping key
///
/// Output layout: 12-byte random nonce followed by the GCM ciphertext.
pub fn wrap_key(wrapping_key: &[u8; 32], plaintext: &[u8]) -> WalletResult<Vec<u8>> {
    let cipher = Aes256Gcm::new(wrapping_key.into());

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| WalletError::crypto_error("Key wrapping failed"))?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt key material wrapped by [`wrap_key`]
///
/// Any tampering with the nonce or ciphertext, or a wrong wrapping key,
/// fails the GCM tag check and surfaces as `DecryptionFailed`.
pub fn unwrap_key(wrapping_key: &[u8; 32], blob: &[u8]) -> WalletResult<Zeroizing<Vec<u8>>> {
    if blob.len() <= NONCE_LEN {
        return Err(WalletError::decryption_failed());
    }
    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);

    let cipher = Aes256Gcm::new(wrapping_key.into());
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| WalletError::decryption_failed())?;

    Ok(Zeroizing::new(plaintext))
}
