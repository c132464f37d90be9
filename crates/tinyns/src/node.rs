// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Permission bits in their short form (e.g. `0o755`).
pub type Permission = u16;

/// Block size used when allocating content references for files.
pub const DEFAULT_BLOCK_SIZE: u64 = 128 * 1024 * 1024;

/// Reference to one block of file content held outside the namespace
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRef {
    pub id: u64,
    pub len: u64,
}

/// Kind of a namespace entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Directory,
    File,
}

/// Contents of a node: child entries for directories, block references for files
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Body {
    Directory(BTreeMap<String, Node>),
    File(Vec<BlockRef>),
}

/// One entry in the namespace tree, including everything below it.
///
/// A cloned `Node` is a complete snapshot of its subtree and is what
/// `Namespace::snapshot` hands out and `Namespace::restore` takes back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub permission: Permission,
    pub owner: String,
    pub modification_time: i64,
    pub access_time: i64,
    pub body: Body,
}

impl Node {
    pub fn directory(permission: Permission, owner: &str, now: i64) -> Self {
        Self {
            permission,
            owner: owner.to_string(),
            modification_time: now,
            access_time: now,
            body: Body::Directory(BTreeMap::new()),
        }
    }

    pub fn file(permission: Permission, owner: &str, now: i64, blocks: Vec<BlockRef>) -> Self {
        Self {
            permission,
            owner: owner.to_string(),
            modification_time: now,
            access_time: now,
            body: Body::File(blocks),
        }
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self.body {
            Body::Directory(_) => NodeKind::Directory,
            Body::File(_) => NodeKind::File,
        }
    }

    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind() == NodeKind::Directory
    }

    /// Child entries, or `None` for files.
    #[must_use]
    pub fn children(&self) -> Option<&BTreeMap<String, Node>> {
        match &self.body {
            Body::Directory(children) => Some(children),
            Body::File(_) => None,
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut BTreeMap<String, Node>> {
        match &mut self.body {
            Body::Directory(children) => Some(children),
            Body::File(_) => None,
        }
    }

    /// Block references of a file; empty for directories.
    #[must_use]
    pub fn blocks(&self) -> &[BlockRef] {
        match &self.body {
            Body::Directory(_) => &[],
            Body::File(blocks) => blocks,
        }
    }

    /// File length in bytes; zero for directories.
    #[must_use]
    pub fn length(&self) -> u64 {
        self.blocks().iter().map(|b| b.len).sum()
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children().and_then(|c| c.get(name))
    }

    /// Number of nodes in this subtree, itself included.
    #[must_use]
    pub fn count(&self) -> usize {
        1 + self
            .children()
            .map(|c| c.values().map(Node::count).sum())
            .unwrap_or(0)
    }
}
