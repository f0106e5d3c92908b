//! Hardware authenticator support
//!
//! Models a WebAuthn-style security key in two roles: plain second factor
//! (possession check at unlock) and PRF key-wrapping, where the
//! authenticator's PRF output derives an AES key that wraps the vault key.
//! The PRF-derived key never touches storage.

pub mod authenticator;
pub mod manager;
pub mod prf;

pub use authenticator::{AssertionResult, Authenticator, RegistrationResult, SoftwareAuthenticator};
pub use manager::{HardwareConfig, HardwareCredential, HardwareManager, SecurityMode};
pub use prf::{derive_key_from_prf, unwrap_key, wrap_key};
