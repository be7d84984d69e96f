use std::path::{Component, Path, PathBuf};

use bytes::Bytes;

use crate::capability::{Capability, Location, ReadCapability, WritableCapability};
use crate::crypto::{PublicKey, Secret};
use crate::peer::Hash;

use super::node::{ChildLink, NodeKind, NodeRecord, ParentLink};
use super::reader::FileReader;
use super::{FsError, Vault};

/// Size of one storage chunk when planning locations for file content
pub const CHUNK_SIZE: u64 = 5 * 1024 * 1024;

/// Handle on one node in the vault, as seen through a capability.
///
/// A wrapper is a snapshot: it holds the node as it was when the wrapper
///  was produced, together with the blob hash it was read from. Mutating
///  operations re-read the current node, update it with a compare-and-swap
///  against that fresh version, and return a new wrapper for the updated
///  directory. Lookups of children always go to the current node, so an old
///  handle on a directory still sees new entries.
#[derive(Debug, Clone)]
pub struct FileWrapper {
    vault: Vault,
    cap: Capability,
    node: NodeRecord,
    version: Hash,
}

impl FileWrapper {
    pub(crate) fn new(vault: Vault, cap: Capability, node: NodeRecord, version: Hash) -> Self {
        Self {
            vault,
            cap,
            node,
            version,
        }
    }

    pub fn name(&self) -> &str {
        &self.node.name
    }

    pub fn owner(&self) -> PublicKey {
        self.cap.owner()
    }

    pub fn location(&self) -> Location {
        self.cap.location()
    }

    pub fn capability(&self) -> &Capability {
        &self.cap
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    pub fn is_directory(&self) -> bool {
        self.node.is_dir()
    }

    pub fn is_writable(&self) -> bool {
        self.cap.is_writable()
    }

    pub fn is_system(&self) -> bool {
        matches!(self.node.kind, NodeKind::Dir { system: true, .. })
    }

    /// Content length for files, zero for directories
    pub fn size(&self) -> u64 {
        self.node.data().map(|d| d.len() as u64).unwrap_or(0)
    }

    /// The same node seen through its read-only capability
    pub fn read_only(&self) -> FileWrapper {
        Self {
            vault: self.vault.clone(),
            cap: self.cap.read_only(),
            node: self.node.clone(),
            version: self.version,
        }
    }

    /// Re-read the node's current version
    pub async fn refresh(&self) -> Result<FileWrapper, FsError> {
        self.vault
            .open(&self.cap)
            .await?
            .ok_or_else(|| FsError::NotFound(self.location().to_string()))
    }

    /// Look up a direct child by name in the current version of this directory
    pub async fn get_child(&self, name: &str) -> Result<Option<FileWrapper>, FsError> {
        let current = self.current_dir().await?;
        let Some(link) = current.child_link(name)? else {
            return Ok(None);
        };
        let cap = current.child_capability(link);
        self.vault.open(&cap).await
    }

    /// All children of the current version of this directory, in name order.
    ///  Entries whose node has been removed are skipped.
    pub async fn children(&self) -> Result<Vec<FileWrapper>, FsError> {
        let current = self.current_dir().await?;
        let links = current
            .node
            .children()
            .ok_or_else(|| FsError::NotDirectory(current.name().to_string()))?;

        let mut children = Vec::with_capacity(links.len());
        for link in links.values() {
            if let Some(child) = self.vault.open(&current.child_capability(link)).await? {
                children.push(child);
            }
        }
        Ok(children)
    }

    /// Walk a relative path down from this directory
    pub async fn get_by_path(&self, path: &Path) -> Result<Option<FileWrapper>, FsError> {
        let mut current = self.clone();
        for component in path.components() {
            let name = match component {
                Component::Normal(name) => name.to_string_lossy(),
                Component::RootDir | Component::CurDir => continue,
                _ => return Err(FsError::NotFound(path.display().to_string())),
            };
            match current.get_child(&name).await? {
                Some(child) => current = child,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// Absolute path of this node in its owner's namespace.
    ///
    /// Walks the parent links up to the owner's home. Every ancestor must
    ///  still exist and still list the node below it under the same name,
    ///  otherwise the walk fails with [`FsError::MissingAncestor`].
    pub async fn path(&self) -> Result<PathBuf, FsError> {
        let owner = self.owner();
        let mut names = vec![self.node.name.clone()];
        let mut child_key = self.location().map_key;
        let mut child_name = self.node.name.clone();
        let mut parent = self.node.parent.clone();

        while let Some(link) = parent {
            let location = Location::new(owner, link.map_key);
            let missing = |names: &[String]| FsError::MissingAncestor {
                location,
                partial: names.iter().rev().collect(),
            };

            let Some((node, _)) = self.vault.fetch_node(&location, &link.read_key).await? else {
                return Err(missing(names.as_slice()));
            };
            let still_listed = node
                .children()
                .and_then(|children| children.get(&child_name))
                .map(|entry| entry.map_key == child_key)
                .unwrap_or(false);
            if !still_listed {
                return Err(missing(names.as_slice()));
            }

            names.push(node.name.clone());
            child_key = link.map_key;
            child_name = node.name;
            parent = node.parent;
        }

        let mut path = PathBuf::from("/");
        path.extend(names.iter().rev());
        Ok(path)
    }

    /// Reader over this file's content
    pub async fn reader(&self) -> Result<FileReader, FsError> {
        let data = self
            .node
            .data()
            .ok_or_else(|| FsError::NotAFile(self.name().to_string()))?;
        Ok(FileReader::new(Bytes::copy_from_slice(data)))
    }

    pub async fn read_all(&self) -> Result<Vec<u8>, FsError> {
        let mut reader = self.reader().await?;
        let mut buf = vec![0u8; reader.remaining() as usize];
        reader.read_into(&mut buf);
        Ok(buf)
    }

    /// Write `data` into the byte range `[start, end)` of child file `name`,
    ///  creating the file if it does not exist.
    ///
    /// Without `overwrite` the section must start exactly at the file's
    ///  current length, which makes this an append that either lands at the
    ///  expected offset or fails with [`FsError::SectionConflict`]. With
    ///  `overwrite` any start inside the file is accepted.
    ///
    /// Returns the updated directory.
    pub async fn upload_file_section(
        &self,
        name: &str,
        data: &[u8],
        overwrite: bool,
        start: u64,
        end: u64,
    ) -> Result<FileWrapper, FsError> {
        if end < start || end - start != data.len() as u64 {
            return Err(FsError::InvalidSection {
                start,
                end,
                len: data.len() as u64,
            });
        }
        let dir = self.writable_dir().await?;

        match dir.get_child(name).await? {
            Some(file) => {
                let file_cap = file.writable_cap()?;
                let existing = file
                    .node
                    .data()
                    .ok_or_else(|| FsError::NotAFile(name.to_string()))?;
                let len = existing.len() as u64;
                if (!overwrite && start != len) || start > len {
                    return Err(FsError::SectionConflict {
                        expected: len,
                        start,
                        end,
                    });
                }

                let mut content = existing[..start as usize].to_vec();
                content.extend_from_slice(data);
                if end < len {
                    content.extend_from_slice(&existing[end as usize..]);
                }
                let mut updated = file.node.clone();
                updated.kind = NodeKind::File { data: content };
                self.vault
                    .swap_node(&file_cap, file.version, &updated)
                    .await?;
                tracing::debug!(
                    "wrote [{}, {}) of {} in {}",
                    start,
                    end,
                    name,
                    dir.location()
                );
                dir.refresh().await
            }
            None => {
                if start != 0 {
                    return Err(FsError::SectionConflict {
                        expected: 0,
                        start,
                        end,
                    });
                }
                let node = NodeRecord::file(name, Some(dir.parent_link()), data.to_vec());
                dir.add_child(name, node).await
            }
        }
    }

    /// Replace child file `name` with `data`, creating it if needed.
    ///  Returns the updated directory.
    pub async fn upload_or_overwrite_file(
        &self,
        name: &str,
        data: &[u8],
    ) -> Result<FileWrapper, FsError> {
        let dir = self.writable_dir().await?;
        match dir.get_child(name).await? {
            Some(file) => {
                let file_cap = file.writable_cap()?;
                if file.is_directory() {
                    return Err(FsError::NotAFile(name.to_string()));
                }
                let mut updated = file.node.clone();
                updated.kind = NodeKind::File {
                    data: data.to_vec(),
                };
                self.vault
                    .swap_node(&file_cap, file.version, &updated)
                    .await?;
                dir.refresh().await
            }
            None => {
                let node = NodeRecord::file(name, Some(dir.parent_link()), data.to_vec());
                dir.add_child(name, node).await
            }
        }
    }

    /// Create child directory `name`. Returns the updated parent; look the
    ///  new directory up with [`FileWrapper::get_child`].
    pub async fn mkdir(&self, name: &str, system: bool) -> Result<FileWrapper, FsError> {
        let dir = self.writable_dir().await?;
        if dir.child_link(name)?.is_some() {
            return Err(FsError::AlreadyExists(name.to_string()));
        }
        let node = NodeRecord::dir(name, Some(dir.parent_link()), system);
        dir.add_child(name, node).await
    }

    /// Unlink child `name` and drop its node. Anything below a removed
    ///  directory is left without an ancestor.
    pub async fn remove_child(&self, name: &str) -> Result<FileWrapper, FsError> {
        let dir = self.writable_dir().await?;
        let link = dir
            .child_link(name)?
            .ok_or_else(|| FsError::NotFound(name.to_string()))?
            .clone();
        let child_cap = dir
            .child_capability(&link)
            .as_writable()
            .cloned()
            .ok_or_else(|| FsError::NotWritable(name.to_string()))?;

        let mut updated = dir.node.clone();
        if let Some(children) = updated.children_mut() {
            children.remove(name);
        }
        self.vault
            .swap_node(dir.writable_cap()?, dir.version, &updated)
            .await?;
        match self.vault.delete_node(&child_cap).await {
            Ok(()) | Err(FsError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
        tracing::debug!("removed {} from {}", name, dir.location());
        dir.refresh().await
    }

    /// Fresh, unused locations under this node's owner
    pub fn generate_child_locations(&self, count: usize) -> Vec<Location> {
        (0..count)
            .map(|_| WritableCapability::generate(self.owner()).location())
            .collect()
    }

    /// Locations for a file of `bytes` bytes, one per storage chunk
    pub fn generate_child_locations_from_size(&self, bytes: u64) -> Vec<Location> {
        self.generate_child_locations(bytes.div_ceil(CHUNK_SIZE).max(1) as usize)
    }

    /* Internal helpers */

    async fn current_dir(&self) -> Result<FileWrapper, FsError> {
        if !self.is_directory() {
            return Err(FsError::NotDirectory(self.name().to_string()));
        }
        self.refresh().await
    }

    async fn writable_dir(&self) -> Result<FileWrapper, FsError> {
        let dir = self.current_dir().await?;
        if !dir.is_writable() {
            return Err(FsError::NotWritable(dir.name().to_string()));
        }
        Ok(dir)
    }

    fn writable_cap(&self) -> Result<&WritableCapability, FsError> {
        self.cap
            .as_writable()
            .ok_or_else(|| FsError::NotWritable(self.name().to_string()))
    }

    fn child_link(&self, name: &str) -> Result<Option<&ChildLink>, FsError> {
        let children = self
            .node
            .children()
            .ok_or_else(|| FsError::NotDirectory(self.name().to_string()))?;
        Ok(children.get(name))
    }

    fn parent_link(&self) -> ParentLink {
        ParentLink {
            map_key: self.location().map_key,
            read_key: self.cap.read_key().clone(),
        }
    }

    /// Capability for a child, writable only if this handle can unseal the
    ///  child's write key
    fn child_capability(&self, link: &ChildLink) -> Capability {
        let owner = self.owner();
        let write_key = self.cap.write_key().and_then(|parent_key| {
            parent_key
                .decrypt(&link.sealed_write_key)
                .and_then(|bytes| Secret::from_slice(&bytes))
                .ok()
        });
        match write_key {
            Some(write_key) => WritableCapability::new(
                owner,
                link.map_key,
                link.read_key.clone(),
                write_key,
            )
            .into(),
            None => ReadCapability::new(owner, link.map_key, link.read_key.clone()).into(),
        }
    }

    /// Store `node` under a fresh location and link it into this directory.
    ///  If the directory moved underneath us the new node is dropped again.
    async fn add_child(&self, name: &str, node: NodeRecord) -> Result<FileWrapper, FsError> {
        let dir_cap = self.writable_cap()?;
        let child_cap = WritableCapability::generate(self.owner());
        self.vault.create_node(&child_cap, &node).await?;

        let mut updated = self.node.clone();
        if let Some(children) = updated.children_mut() {
            children.insert(
                name.to_string(),
                ChildLink {
                    map_key: child_cap.location().map_key,
                    read_key: child_cap.read_key().clone(),
                    sealed_write_key: dir_cap.write_key().encrypt(child_cap.write_key().bytes())?,
                },
            );
        }

        if let Err(e) = self.vault.swap_node(dir_cap, self.version, &updated).await {
            if let Err(cleanup) = self.vault.delete_node(&child_cap).await {
                tracing::warn!("failed to drop unlinked node {}: {}", child_cap.location(), cleanup);
            }
            return Err(e);
        }
        tracing::debug!("linked {} into {}", name, self.location());
        self.refresh().await
    }
}
