//! Mnemonic generation and validation
//!
//! Creates and checks BIP-39 recovery phrases (24 words, 256 bits of
//! entropy) and turns them into master keys.
//!
//! SECURITY: entropy and seeds are zeroized after use.

use bip39::Mnemonic;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::WalletResult;
use crate::wallet::derivation::ExtendedKey;

/// Generate a fresh 24-word recovery phrase
pub fn generate_mnemonic() -> WalletResult<String> {
    let mut entropy = Zeroizing::new([0u8; 32]); // 256 bits yields MNEMONIC_WORD_COUNT words
    OsRng.fill_bytes(entropy.as_mut());

    let mnemonic = Mnemonic::from_entropy(entropy.as_ref())?;
    Ok(mnemonic.to_string())
}

/// Check a recovery phrase against the word list and checksum
///
/// Whitespace and case are normalized before checking, so user input with
/// stray spaces or capitals still validates.
pub fn validate_mnemonic(phrase: &str) -> bool {
    Mnemonic::parse_normalized(&normalize(phrase)).is_ok()
}

/// Derive the master key from a recovery phrase and optional passphrase
pub fn master_key_from_mnemonic(phrase: &str, passphrase: &str) -> WalletResult<ExtendedKey> {
    let mnemonic = Mnemonic::parse_normalized(&normalize(phrase))?;
    let seed = Zeroizing::new(mnemonic.to_seed_normalized(passphrase));
    ExtendedKey::from_seed(seed.as_ref())
}

fn normalize(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MNEMONIC_WORD_COUNT;

    const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_generate_mnemonic() {
        let phrase = generate_mnemonic().unwrap();
        assert_eq!(phrase.split_whitespace().count(), MNEMONIC_WORD_COUNT);
        assert!(validate_mnemonic(&phrase));
    }

    #[test]
    fn test_validate_known_vector() {
        assert!(validate_mnemonic(TEST_MNEMONIC));
    }

    #[test]
    fn test_validate_normalizes_input() {
        let messy = "  Abandon ABANDON abandon abandon abandon abandon\tabandon abandon abandon abandon abandon about ";
        assert!(validate_mnemonic(messy));
    }

    #[test]
    fn test_checksum_catches_word_swap() {
        // Replacing the checksum-bearing last word breaks validation
        let broken = TEST_MNEMONIC.replace("about", "abandon");
        assert!(!validate_mnemonic(&broken));
    }

    #[test]
    fn test_master_key_is_deterministic() {
        let a = master_key_from_mnemonic(TEST_MNEMONIC, "").unwrap();
        let b = master_key_from_mnemonic(TEST_MNEMONIC, "").unwrap();
        assert_eq!(a.public_key().as_bytes(), b.public_key().as_bytes());

        let c = master_key_from_mnemonic(TEST_MNEMONIC, "extra").unwrap();
        assert_ne!(a.public_key().as_bytes(), c.public_key().as_bytes());
    }

    #[test]
    fn test_invalid_mnemonic_rejected() {
        let err = master_key_from_mnemonic("not a real phrase", "").unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidMnemonic);
    }
}
