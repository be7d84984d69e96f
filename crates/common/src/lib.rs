/**
 * Capabilities and the names of the files
 *  they are shared through.
 */
pub mod capability;
/**
 * DAG-CBOR encoding and the length-prefixed
 *  record framing used by sharing logs.
 */
pub mod codec;
/**
 * Cryptographic types and operations.
 *  - Public and Private key implementations
 *  - Symmetric node keys
 */
pub mod crypto;
/**
 * Storage layer implementation.
 *  Just a light wrapper around an Iroh-Blobs store
 */
pub mod peer;
/**
 * The capability sharing store: append-only
 *  per-recipient logs, resolution of logged
 *  capabilities, and the recipient-side cache.
 */
pub mod sharing;
/**
 * Fault-injecting network for tests.
 *  Enabled with the `testkit` feature.
 */
#[cfg(feature = "testkit")]
pub mod testkit;
pub mod username;
/**
 * Encrypted filesystem over the blob store.
 *  Users, directories and files addressed by
 *  capability, plus the network that resolves
 *  entry points.
 */
pub mod vault;

pub mod prelude {
    pub use crate::capability::{
        AccessKind, Capability, CapabilityWithPath, EntryPoint, ReadCapability,
        WritableCapability,
    };
    pub use crate::crypto::{PublicKey, SecretKey};
    pub use crate::sharing::{CapabilitiesFromUser, SharingConfig, SharingError, SharingStore};
    pub use crate::username::is_valid_username;
    pub use crate::vault::{FileWrapper, FsError, Network, Vault};
}
