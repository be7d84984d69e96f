//! # Vault
//!
//! A small encrypted filesystem over the blob store. It is the surface the
//! sharing store reads and writes through, and it doubles as the network
//! that resolves entry points.
//!
//! Every node lives at a [`Location`] `(owner, map key)`. The vault keeps a
//! pointer per location: the hash of the node's current encrypted blob and a
//! BLAKE3 commitment to the node's write key. Anyone holding the read key
//! can fetch and decrypt the node; moving the pointer requires presenting
//! the write key, and is a compare-and-swap against the hash the writer last
//! saw, so racing writers lose with [`FsError::Conflict`] instead of
//! clobbering each other.
//!
//! Users register a name against their identity key and get back a
//! writable capability for their home directory, `/<username>`.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::capability::{Capability, Location, MapKey, WritableCapability};
use crate::crypto::{PublicKey, Secret, SecretKey, Signature, BLAKE3_HASH_SIZE};
use crate::peer::{BlobsStore, Hash};
use crate::username::is_valid_username;

mod error;
mod file;
mod network;
mod node;
mod reader;

pub use error::FsError;
pub use file::{FileWrapper, CHUNK_SIZE};
pub use network::{Network, NetworkError};
pub use node::{ChildLink, NodeKind, NodeRecord, ParentLink};
pub use reader::FileReader;

const TABLE_FILE: &str = "vault.json";
const BLOBS_DIR: &str = "blobs";

/// Current state of a location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Pointer {
    hash: [u8; 32],
    write_commitment: [u8; BLAKE3_HASH_SIZE],
}

impl Pointer {
    fn hash(&self) -> Hash {
        Hash::from_bytes(self.hash)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserEntry {
    owner: PublicKey,
    root: MapKey,
    signature: Vec<u8>,
}

#[derive(Debug, Default)]
struct VaultState {
    users: BTreeMap<String, UserEntry>,
    pointers: HashMap<Location, Pointer>,
}

/// On-disk form of [`VaultState`]
#[derive(Debug, Default, Serialize, Deserialize)]
struct VaultTable {
    users: BTreeMap<String, UserEntry>,
    pointers: Vec<(Location, Pointer)>,
}

impl From<&VaultState> for VaultTable {
    fn from(state: &VaultState) -> Self {
        let mut pointers: Vec<_> = state.pointers.iter().map(|(l, p)| (*l, *p)).collect();
        pointers.sort_by(|a, b| a.0.cmp(&b.0));
        Self {
            users: state.users.clone(),
            pointers,
        }
    }
}

impl From<VaultTable> for VaultState {
    fn from(table: VaultTable) -> Self {
        Self {
            users: table.users,
            pointers: table.pointers.into_iter().collect(),
        }
    }
}

#[derive(Debug)]
struct VaultInner {
    blobs: BlobsStore,
    state: RwLock<VaultState>,
    table_path: Option<PathBuf>,
    // serializes table writes so an older snapshot never lands after a newer one
    persist_lock: Mutex<()>,
}

#[derive(Debug, Clone)]
pub struct Vault {
    inner: Arc<VaultInner>,
}

fn registration_message(username: &str, owner: &PublicKey) -> Vec<u8> {
    format!("capstore-register:{}:{}", username, owner.to_hex()).into_bytes()
}

impl Vault {
    /// A vault that lives only as long as the process
    pub async fn memory() -> Result<Self, FsError> {
        let blobs = BlobsStore::memory().await?;
        Ok(Self::with_state(blobs, VaultState::default(), None))
    }

    /// Load (or initialise) a vault rooted at `dir`
    pub async fn fs(dir: &Path) -> Result<Self, FsError> {
        tokio::fs::create_dir_all(dir).await?;
        let blobs = BlobsStore::fs(&dir.join(BLOBS_DIR)).await?;

        let table_path = dir.join(TABLE_FILE);
        let state = match tokio::fs::read(&table_path).await {
            Ok(bytes) => serde_json::from_slice::<VaultTable>(&bytes)?.into(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => VaultState::default(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(
            "Vault::fs loaded {} users, {} pointers from {:?}",
            state.users.len(),
            state.pointers.len(),
            table_path
        );

        Ok(Self::with_state(blobs, state, Some(table_path)))
    }

    fn with_state(blobs: BlobsStore, state: VaultState, table_path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(VaultInner {
                blobs,
                state: RwLock::new(state),
                table_path,
                persist_lock: Mutex::new(()),
            }),
        }
    }

    pub fn blobs(&self) -> &BlobsStore {
        &self.inner.blobs
    }

    /// Flush the blob store
    pub async fn shutdown(&self) -> Result<(), FsError> {
        self.inner.blobs.shutdown().await?;
        Ok(())
    }

    /// Register `username` for `identity` and create its home directory.
    ///
    /// The claim is signed with the identity key and checked before anything
    /// is written. Returns the writable capability for `/<username>`.
    pub async fn register(
        &self,
        username: &str,
        identity: &SecretKey,
    ) -> Result<WritableCapability, FsError> {
        if !is_valid_username(username) {
            return Err(FsError::InvalidUsername(username.to_string()));
        }
        if self.inner.state.read().users.contains_key(username) {
            return Err(FsError::UsernameTaken(username.to_string()));
        }

        let owner = identity.public();
        let signature = identity.sign(&registration_message(username, &owner));
        owner.verify(&registration_message(username, &owner), &signature)?;

        let home = WritableCapability::generate(owner);
        let root = NodeRecord::dir(username, None, false);
        self.create_node(&home, &root).await?;

        {
            let mut state = self.inner.state.write();
            if state.users.contains_key(username) {
                state.pointers.remove(&home.location());
                return Err(FsError::UsernameTaken(username.to_string()));
            }
            state.users.insert(
                username.to_string(),
                UserEntry {
                    owner,
                    root: home.location().map_key,
                    signature: signature.to_bytes().to_vec(),
                },
            );
        }
        self.persist().await?;

        tracing::info!("registered user {} ({})", username, owner.short_hex());
        Ok(home)
    }

    /// Identity key registered under `username`, if any.
    ///  Returns `None` if the stored registration does not verify.
    pub fn user_key(&self, username: &str) -> Option<PublicKey> {
        let state = self.inner.state.read();
        let entry = state.users.get(username)?;
        let signature = Signature::from_slice(&entry.signature).ok()?;
        entry
            .owner
            .verify(&registration_message(username, &entry.owner), &signature)
            .ok()?;
        Some(entry.owner)
    }

    /// Location of a registered user's home directory
    pub fn home_location(&self, username: &str) -> Result<Location, FsError> {
        let state = self.inner.state.read();
        let entry = state
            .users
            .get(username)
            .ok_or_else(|| FsError::UnknownUser(username.to_string()))?;
        Ok(Location::new(entry.owner, entry.root))
    }

    /// Open the node a capability points at. `None` if the location has
    ///  no pointer.
    pub async fn open(&self, cap: &Capability) -> Result<Option<FileWrapper>, FsError> {
        let Some((node, version)) = self.fetch_node(&cap.location(), cap.read_key()).await?
        else {
            return Ok(None);
        };
        Ok(Some(FileWrapper::new(self.clone(), cap.clone(), node, version)))
    }

    /* Pointer operations used by `FileWrapper` */

    pub(crate) async fn fetch_node(
        &self,
        location: &Location,
        read_key: &Secret,
    ) -> Result<Option<(NodeRecord, Hash)>, FsError> {
        let pointer = self.inner.state.read().pointers.get(location).copied();
        let Some(pointer) = pointer else {
            return Ok(None);
        };
        let hash = pointer.hash();
        let ciphertext = self.inner.blobs.get(&hash).await?;
        let node = NodeRecord::unseal(&ciphertext, read_key)?;
        Ok(Some((node, hash)))
    }

    /// Store `node` at a fresh location. Fails if the location is taken.
    pub(crate) async fn create_node(
        &self,
        cap: &WritableCapability,
        node: &NodeRecord,
    ) -> Result<Hash, FsError> {
        let location = cap.location();
        let hash = self.inner.blobs.put(node.seal(cap.read_key())?).await?;
        {
            let mut state = self.inner.state.write();
            if state.pointers.contains_key(&location) {
                return Err(FsError::AlreadyExists(location.to_string()));
            }
            state.pointers.insert(
                location,
                Pointer {
                    hash: *hash.as_bytes(),
                    write_commitment: cap.write_key().commitment(),
                },
            );
        }
        self.persist().await?;
        Ok(hash)
    }

    /// Replace the node at `cap`'s location, provided it is still at `expected`
    pub(crate) async fn swap_node(
        &self,
        cap: &WritableCapability,
        expected: Hash,
        node: &NodeRecord,
    ) -> Result<Hash, FsError> {
        let location = cap.location();
        let hash = self.inner.blobs.put(node.seal(cap.read_key())?).await?;
        {
            let mut state = self.inner.state.write();
            let pointer = state
                .pointers
                .get_mut(&location)
                .ok_or_else(|| FsError::NotFound(location.to_string()))?;
            if pointer.write_commitment != cap.write_key().commitment() {
                return Err(FsError::NotWritable(location.to_string()));
            }
            if pointer.hash() != expected {
                return Err(FsError::Conflict(location));
            }
            pointer.hash = *hash.as_bytes();
        }
        self.persist().await?;
        Ok(hash)
    }

    /// Drop the pointer at `cap`'s location
    pub(crate) async fn delete_node(&self, cap: &WritableCapability) -> Result<(), FsError> {
        let location = cap.location();
        {
            let mut state = self.inner.state.write();
            let pointer = state
                .pointers
                .get(&location)
                .ok_or_else(|| FsError::NotFound(location.to_string()))?;
            if pointer.write_commitment != cap.write_key().commitment() {
                return Err(FsError::NotWritable(location.to_string()));
            }
            state.pointers.remove(&location);
        }
        self.persist().await
    }

    async fn persist(&self) -> Result<(), FsError> {
        let Some(path) = &self.inner.table_path else {
            return Ok(());
        };
        let _guard = self.inner.persist_lock.lock().await;
        let bytes = {
            let state = self.inner.state.read();
            serde_json::to_vec_pretty(&VaultTable::from(&*state))?
        };

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}
