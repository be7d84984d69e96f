//! # Capabilities
//!
//! A capability is the cryptographic grant to one subtree of an owner's
//! encrypted namespace. It names where the subtree root lives
//! ([`Location`]: owner key + random map key) and carries the keys needed
//! to use it:
//!
//! - [`ReadCapability`]: the read key, enough to fetch and decrypt
//! - [`WritableCapability`]: the read key plus the write key the vault
//!   demands before it moves the node's pointer
//!
//! [`WritableCapability::read_only`] projects a writable grant down to a
//! read-only one. There is no way back: the write key is simply not there.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::codec::{encode_record, CborEncoded, CodecError};
use crate::crypto::{PublicKey, Secret};

/// Size of a location's map key in bytes
pub const MAP_KEY_SIZE: usize = 32;

/// Random label that, together with the owner key, addresses a node's pointer
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MapKey(#[serde(with = "serde_bytes")] [u8; MAP_KEY_SIZE]);

impl MapKey {
    pub fn generate() -> Self {
        let mut buff = [0; MAP_KEY_SIZE];
        getrandom::getrandom(&mut buff).expect("failed to generate random bytes");
        Self(buff)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<[u8; MAP_KEY_SIZE]> for MapKey {
    fn from(bytes: [u8; MAP_KEY_SIZE]) -> Self {
        MapKey(bytes)
    }
}

impl fmt::Debug for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MapKey({})", hex::encode(&self.0[..4]))
    }
}

/// Address of a mutable pointer in the vault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub owner: PublicKey,
    pub map_key: MapKey,
}

impl Location {
    pub fn new(owner: PublicKey, map_key: MapKey) -> Self {
        Self { owner, map_key }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            self.owner.short_hex(),
            hex::encode(&self.map_key.0[..4])
        )
    }
}

/// Grant sufficient to locate and decrypt a subtree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadCapability {
    owner: PublicKey,
    map_key: MapKey,
    read_key: Secret,
}

impl ReadCapability {
    pub fn new(owner: PublicKey, map_key: MapKey, read_key: Secret) -> Self {
        Self {
            owner,
            map_key,
            read_key,
        }
    }

    pub fn location(&self) -> Location {
        Location::new(self.owner, self.map_key)
    }

    pub fn read_key(&self) -> &Secret {
        &self.read_key
    }
}

/// Grant sufficient to locate, decrypt and update a subtree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WritableCapability {
    owner: PublicKey,
    map_key: MapKey,
    read_key: Secret,
    write_key: Secret,
}

impl WritableCapability {
    pub fn new(owner: PublicKey, map_key: MapKey, read_key: Secret, write_key: Secret) -> Self {
        Self {
            owner,
            map_key,
            read_key,
            write_key,
        }
    }

    /// Fresh capability for a new node owned by `owner`
    pub fn generate(owner: PublicKey) -> Self {
        Self::new(
            owner,
            MapKey::generate(),
            Secret::generate(),
            Secret::generate(),
        )
    }

    pub fn location(&self) -> Location {
        Location::new(self.owner, self.map_key)
    }

    pub fn read_key(&self) -> &Secret {
        &self.read_key
    }

    pub fn write_key(&self) -> &Secret {
        &self.write_key
    }

    /// Drop the write key
    pub fn read_only(&self) -> ReadCapability {
        ReadCapability::new(self.owner, self.map_key, self.read_key.clone())
    }
}

/// Either kind of grant, as stored in sharing logs and caches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Capability {
    ReadOnly(ReadCapability),
    Writable(WritableCapability),
}

impl CborEncoded for Capability {}

impl From<ReadCapability> for Capability {
    fn from(cap: ReadCapability) -> Self {
        Capability::ReadOnly(cap)
    }
}

impl From<WritableCapability> for Capability {
    fn from(cap: WritableCapability) -> Self {
        Capability::Writable(cap)
    }
}

impl Capability {
    pub fn owner(&self) -> PublicKey {
        self.location().owner
    }

    pub fn location(&self) -> Location {
        match self {
            Capability::ReadOnly(cap) => cap.location(),
            Capability::Writable(cap) => cap.location(),
        }
    }

    pub fn read_key(&self) -> &Secret {
        match self {
            Capability::ReadOnly(cap) => cap.read_key(),
            Capability::Writable(cap) => cap.read_key(),
        }
    }

    pub fn write_key(&self) -> Option<&Secret> {
        match self {
            Capability::ReadOnly(_) => None,
            Capability::Writable(cap) => Some(cap.write_key()),
        }
    }

    pub fn is_writable(&self) -> bool {
        matches!(self, Capability::Writable(_))
    }

    pub fn as_writable(&self) -> Option<&WritableCapability> {
        match self {
            Capability::ReadOnly(_) => None,
            Capability::Writable(cap) => Some(cap),
        }
    }

    /// Read-only projection; a no-op for read-only capabilities
    pub fn read_only(&self) -> Capability {
        match self {
            Capability::ReadOnly(cap) => Capability::ReadOnly(cap.clone()),
            Capability::Writable(cap) => Capability::ReadOnly(cap.read_only()),
        }
    }

    /// This capability framed as a sharing-log record
    pub fn to_record(&self) -> Result<Vec<u8>, CodecError> {
        encode_record(self)
    }
}

/// A capability resolved to the path it had in the owner's namespace when
///  it was last looked up. The path is advisory; the capability is the
///  authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityWithPath {
    pub path: PathBuf,
    pub cap: Capability,
}

impl CapabilityWithPath {
    pub fn new(path: PathBuf, cap: Capability) -> Self {
        Self { path, cap }
    }
}

/// What the network is asked to find: a capability plus the display name
///  of the user it was obtained from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    pub pointer: Capability,
    pub owner_name: String,
}

impl EntryPoint {
    pub fn new(pointer: Capability, owner_name: impl Into<String>) -> Self {
        Self {
            pointer,
            owner_name: owner_name.into(),
        }
    }
}

/// Which of the two parallel sharing logs an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessKind {
    Read,
    Write,
}

impl AccessKind {
    /// Name of the log file inside `/<owner>/sharing/<recipient>/`
    pub fn sharing_file_name(&self) -> &'static str {
        match self {
            AccessKind::Read => "sharing.r",
            AccessKind::Write => "sharing.w",
        }
    }

    /// Name of the snapshot file for `friend` inside `/<recipient>/.capabilitycache/`
    pub fn cache_file_name(&self, friend: &str) -> String {
        match self {
            AccessKind::Read => format!("{}r", friend),
            AccessKind::Write => format!("{}w", friend),
        }
    }
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessKind::Read => write!(f, "read"),
            AccessKind::Write => write!(f, "write"),
        }
    }
}
