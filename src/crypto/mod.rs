//! Primitive Crypto Layer
//!
//! Digest hashing and digital signatures over fixed-width byte arrays.
//! All operations are pure functions; this module owns no long-lived state.

pub mod hash;
pub mod sign;

pub use hash::{digest, Digest};
pub use sign::{sign_digest, verify_signature, PrivateKey, PublicKey, Signature};
