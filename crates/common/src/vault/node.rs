use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::capability::MapKey;
use crate::codec::CborEncoded;
use crate::crypto::Secret;

use super::FsError;

/// Link from a node back up to the directory that contains it.
///  Parents always share their child's owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentLink {
    pub map_key: MapKey,
    pub read_key: Secret,
}

/// Directory entry pointing at a child node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildLink {
    pub map_key: MapKey,
    pub read_key: Secret,
    // child's write key, encrypted under the parent's write key
    #[serde(with = "serde_bytes")]
    pub sealed_write_key: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Dir {
        children: BTreeMap<String, ChildLink>,
        system: bool,
    },
    File {
        #[serde(with = "serde_bytes")]
        data: Vec<u8>,
    },
}

/// Plaintext of a vault node. Stored DAG-CBOR encoded and
///  encrypted under the node's read key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub name: String,
    pub parent: Option<ParentLink>,
    pub kind: NodeKind,
}

impl CborEncoded for NodeRecord {}

impl NodeRecord {
    pub fn dir(name: impl Into<String>, parent: Option<ParentLink>, system: bool) -> Self {
        Self {
            name: name.into(),
            parent,
            kind: NodeKind::Dir {
                children: BTreeMap::new(),
                system,
            },
        }
    }

    pub fn file(name: impl Into<String>, parent: Option<ParentLink>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            parent,
            kind: NodeKind::File { data },
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Dir { .. })
    }

    pub fn children(&self) -> Option<&BTreeMap<String, ChildLink>> {
        match &self.kind {
            NodeKind::Dir { children, .. } => Some(children),
            NodeKind::File { .. } => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut BTreeMap<String, ChildLink>> {
        match &mut self.kind {
            NodeKind::Dir { children, .. } => Some(children),
            NodeKind::File { .. } => None,
        }
    }

    pub fn data(&self) -> Option<&[u8]> {
        match &self.kind {
            NodeKind::File { data } => Some(data),
            NodeKind::Dir { .. } => None,
        }
    }

    /// Encode and encrypt under `read_key`
    pub fn seal(&self, read_key: &Secret) -> Result<Vec<u8>, FsError> {
        let plaintext = self.encode()?;
        Ok(read_key.encrypt(&plaintext)?)
    }

    /// Decrypt with `read_key` and decode
    pub fn unseal(ciphertext: &[u8], read_key: &Secret) -> Result<Self, FsError> {
        let plaintext = read_key.decrypt(ciphertext)?;
        Ok(Self::decode(&plaintext)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_seal_unseal() {
        let read_key = Secret::generate();
        let mut node = NodeRecord::dir("docs", None, false);
        node.children_mut().unwrap().insert(
            "x.txt".to_string(),
            ChildLink {
                map_key: MapKey::generate(),
                read_key: Secret::generate(),
                sealed_write_key: vec![1, 2, 3],
            },
        );

        let sealed = node.seal(&read_key).unwrap();
        assert_eq!(NodeRecord::unseal(&sealed, &read_key).unwrap(), node);
        assert!(NodeRecord::unseal(&sealed, &Secret::generate()).is_err());
    }

    #[test]
    fn test_kind_accessors() {
        let file = NodeRecord::file("x.txt", None, b"hi".to_vec());
        assert!(!file.is_dir());
        assert_eq!(file.data(), Some(&b"hi"[..]));
        assert!(file.children().is_none());

        let dir = NodeRecord::dir("home", None, true);
        assert!(dir.is_dir());
        assert!(dir.data().is_none());
    }
}
