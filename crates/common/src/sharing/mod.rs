//! # Capability sharing
//!
//! An owner shares a subtree with a recipient by appending the subtree's
//! capability to a log in their own namespace, one log per recipient and
//! access kind:
//!
//! ```text
//! /<owner>/sharing/<recipient>/sharing.r    read-only capabilities
//! /<owner>/sharing/<recipient>/sharing.w    writable capabilities
//! ```
//!
//! Logs only ever grow. The recipient reads a log by resolving each record
//! against the network, which yields the path the shared node has now, and
//! keeps a snapshot of the result in its own home so the next read only
//! resolves what was appended since:
//!
//! ```text
//! /<recipient>/.capabilitycache/<owner>r
//! /<recipient>/.capabilitycache/<owner>w
//! ```
//!
//! Resolution is best effort. A record whose entry point cannot be found,
//! or whose path can no longer be walked, contributes nothing to this load
//! and is tried again on the next one. Only a log that does not parse is an
//! error.

mod cache;
mod config;
mod error;
mod log;
mod resolver;
mod store;

pub use cache::{
    capability_cache_dir, load_cache, save_cache, CacheLookup, CapabilitiesFromUser,
    HomeDirSupplier, LazyHome, CAPABILITY_CACHE_DIR,
};
pub use config::SharingConfig;
pub use error::SharingError;
pub use log::{append_link, ensure_sharing_dir, sharing_file, sharing_file_size, SHARING_DIR};
pub use resolver::{resolve, resolve_or_skip};
pub use store::SharingStore;
