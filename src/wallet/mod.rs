//! Wallet key management
//!
//! Hierarchical key derivation from a recovery phrase, plus the address
//! codec that maps public keys to presentable addresses.

pub mod address;
pub mod derivation;
pub mod keygen;

pub use address::{address_to_public_key, is_valid_address, public_key_to_address, AddressVersion};
pub use derivation::ExtendedKey;
pub use keygen::{generate_mnemonic, master_key_from_mnemonic, validate_mnemonic};
