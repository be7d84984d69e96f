//! Cryptographic primitives for capstore
//!
//! - **Identity**: Ed25519 keypairs. A user's public key owns every location
//!   in that user's namespace and signs the username registration.
//! - **Node encryption**: ChaCha20-Poly1305 `Secret`s, one read key and one
//!   write key per node.
//!
//! # Capability model
//!
//! A read-only capability carries `(owner, map key, read key)`: enough to find
//! a node's pointer and decrypt the node. A writable capability adds the
//! write key, which the vault checks against the commitment stored with the
//! pointer before accepting an update. Dropping the write key is the only
//! projection; nothing in a read-only capability lets a holder rebuild it.

mod keys;
mod secret;

pub use ed25519_dalek::Signature;
pub use keys::{KeyError, PublicKey, SecretKey, PUBLIC_KEY_SIZE};
pub use secret::{Secret, SecretError, BLAKE3_HASH_SIZE, SECRET_SIZE};
