//! Unified error types for the wallet core
//!
//! All errors flow through this module so boundary callers can
//! pattern-match on `ErrorCode` instead of message text.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Main error type for all wallet core operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl WalletError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, msg)
    }

    pub fn bad_password() -> Self {
        // Single uniform message: must not reveal which factor failed
        Self::new(ErrorCode::BadPassword, "Verification failed")
    }

    pub fn no_vault() -> Self {
        Self::new(ErrorCode::NoVault, "No vault has been set up")
    }

    pub fn locked() -> Self {
        Self::new(ErrorCode::Locked, "Vault is locked")
    }

    pub fn invalid_mnemonic(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidMnemonic, msg)
    }

    pub fn invalid_account_index(index: usize) -> Self {
        Self::new(
            ErrorCode::InvalidAccountIndex,
            format!("No account at index {}", index),
        )
    }

    pub fn insufficient_funds(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InsufficientFunds, msg)
    }

    pub fn bad_address(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadAddress, msg)
    }

    pub fn hardware_required() -> Self {
        Self::new(
            ErrorCode::HardwareRequired,
            "Hardware key-wrapping is active; an authenticator proof is required",
        )
    }

    pub fn hardware_verification_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::HardwareVerificationFailed, msg)
    }

    pub fn decryption_failed() -> Self {
        Self::new(ErrorCode::DecryptionFailed, "Authenticated decryption failed")
    }

    pub fn signing_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::SigningFailed, msg)
    }

    pub fn method_not_supported(method: &str) -> Self {
        Self::new(
            ErrorCode::MethodNotSupported,
            format!("Unknown method: {}", method),
        )
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, msg)
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Timeout, msg)
    }

    pub fn crypto_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::CryptoError, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }
}

impl fmt::Display for WalletError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for WalletError {}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Vault state errors
    BadPassword,
    NoVault,
    Locked,

    // Input errors
    InvalidInput,
    InvalidMnemonic,
    InvalidAccountIndex,
    BadAddress,

    // Transaction errors
    InsufficientFunds,

    // Hardware authenticator errors
    HardwareRequired,
    HardwareVerificationFailed,
    Timeout,

    // Crypto errors
    DecryptionFailed,
    SigningFailed,
    VerificationFailed,
    InvalidPrivateKey,
    InvalidPublicKey,
    InvalidDigest,
    InvalidSignature,
    CryptoError,

    // Boundary errors
    MethodNotSupported,
    Unauthorized,

    // Parse errors
    JsonError,
    HexError,

    // Internal
    Internal,
}

/// Result type alias for wallet core operations
pub type WalletResult<T> = Result<T, WalletError>;

// Conversions from common error types

impl From<serde_json::Error> for WalletError {
    fn from(e: serde_json::Error) -> Self {
        WalletError::new(ErrorCode::JsonError, e.to_string())
    }
}

impl From<hex::FromHexError> for WalletError {
    fn from(e: hex::FromHexError) -> Self {
        WalletError::new(ErrorCode::HexError, e.to_string())
    }
}

impl From<bip39::Error> for WalletError {
    fn from(e: bip39::Error) -> Self {
        WalletError::new(ErrorCode::InvalidMnemonic, format!("BIP39 error: {}", e))
    }
}

impl From<bs58::decode::Error> for WalletError {
    fn from(e: bs58::decode::Error) -> Self {
        WalletError::new(ErrorCode::BadAddress, format!("Base58 error: {}", e))
    }
}
