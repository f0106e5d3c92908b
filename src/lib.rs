//! Nockchain browser-wallet core
//!
//! Pure custody and transaction-construction logic for the extension:
//! key derivation, the address codec, the transaction builder, hardware
//! key-wrapping, and the vault orchestrator behind a single request
//! boundary. The crate performs no network or file I/O; chain data comes
//! in, signed bytes go out.

pub mod api;
pub mod crypto;
pub mod error;
pub mod hardware;
pub mod storage;
pub mod tx;
pub mod types;
pub mod vault;
pub mod wallet;

pub use api::{CallContext, WalletApi};
pub use error::{ErrorCode, WalletError, WalletResult};
pub use hardware::manager::{HardwareCredential, SecurityMode};
pub use storage::{KeyValueStorage, MemoryStorage};
pub use types::{Account, Keyfile, WalletState};
pub use vault::{HardwareProof, Vault};
