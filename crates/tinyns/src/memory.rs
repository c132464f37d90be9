// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! In-memory namespace
//!
//! The whole tree lives behind one async mutex, so each operation observes
//! and modifies the tree atomically. This is the namespace used by tests and
//! by the `specserver` binary.

use async_trait::async_trait;
use diagnostics::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::listing::{DirectoryListing, FileStatus};
use crate::namespace::Namespace;
use crate::node::{BlockRef, DEFAULT_BLOCK_SIZE, Node, Permission};
use crate::path::{join, segments};

/// Default number of entries per listing page (HDFS `dfs.ls.limit`)
pub const DEFAULT_LISTING_LIMIT: usize = 1000;

const DEFAULT_OWNER: &str = "hdfs";
const ROOT_PERMISSION: Permission = 0o755;

/// Namespace held entirely in memory
#[derive(Clone)]
pub struct MemoryNamespace(Arc<Mutex<State>>);

struct State {
    root: Node,
    owner: String,
    listing_limit: usize,
    next_block: u64,
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

impl Default for MemoryNamespace {
    fn default() -> Self {
        Self::with_listing_limit(DEFAULT_LISTING_LIMIT)
    }
}

impl MemoryNamespace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A namespace returning at most `limit` entries per listing page.
    #[must_use]
    pub fn with_listing_limit(limit: usize) -> Self {
        Self(Arc::new(Mutex::new(State {
            root: Node::directory(ROOT_PERMISSION, DEFAULT_OWNER, now()),
            owner: DEFAULT_OWNER.to_string(),
            listing_limit: limit.max(1),
            next_block: 1,
        })))
    }

    /// Create a file of `length` bytes, allocating block references for it.
    pub async fn create_file<P: AsRef<Path>>(
        &self,
        path: P,
        permission: Permission,
        length: u64,
    ) -> Result<Vec<BlockRef>> {
        self.0
            .lock()
            .await
            .create_file(path.as_ref(), permission, length)
    }

    pub async fn exists<P: AsRef<Path>>(&self, path: P) -> bool {
        let state = self.0.lock().await;
        segments(path.as_ref()).is_ok_and(|segs| state.lookup(&segs).is_some())
    }

    /// A copy of the whole tree, for comparing namespace states.
    pub async fn tree(&self) -> Node {
        self.0.lock().await.root.clone()
    }
}

impl State {
    fn lookup(&self, segs: &[String]) -> Option<&Node> {
        let mut node = &self.root;
        for seg in segs {
            node = node.child(seg)?;
        }
        Some(node)
    }

    /// Entries of the directory at `segs`, or `None` if it is missing or a file.
    fn lookup_dir_mut(&mut self, segs: &[String]) -> Option<&mut BTreeMap<String, Node>> {
        let mut node = &mut self.root;
        for seg in segs {
            node = node.children_mut()?.get_mut(seg)?;
        }
        node.children_mut()
    }

    fn get_listing(
        &self,
        path: &Path,
        start_after: &[u8],
        need_location: bool,
    ) -> Result<DirectoryListing> {
        let segs = segments(path)?;
        let node = self.lookup(&segs).ok_or_else(|| Error::not_found(path))?;

        let Some(children) = node.children() else {
            let name = segs.last().map(String::as_str).unwrap_or_default();
            return Ok(DirectoryListing {
                partial_listing: vec![FileStatus::from_node(name, node, need_location)],
                remaining_entries: 0,
            });
        };

        let mut after = children
            .iter()
            .filter(|(name, _)| name.as_bytes() > start_after);
        let partial_listing = after
            .by_ref()
            .take(self.listing_limit)
            .map(|(name, child)| FileStatus::from_node(name, child, need_location))
            .collect();
        let remaining_entries = after.count();

        Ok(DirectoryListing {
            partial_listing,
            remaining_entries,
        })
    }

    fn mkdirs(&mut self, path: &Path, permission: Permission, create_parents: bool) -> Result<bool> {
        let segs = segments(path)?;

        let mut node = &self.root;
        let mut first_missing = None;
        for (i, seg) in segs.iter().enumerate() {
            match node.child(seg) {
                Some(child) if child.is_dir() => node = child,
                Some(_) if i + 1 == segs.len() => return Err(Error::already_exists(path)),
                Some(_) => return Err(Error::not_a_directory(join(&segs[..=i]))),
                None => {
                    first_missing = Some(i);
                    break;
                }
            }
        }

        let Some(first) = first_missing else {
            return Ok(true);
        };
        if first + 1 < segs.len() && !create_parents {
            return Err(Error::parent_not_found(join(&segs[..segs.len() - 1])));
        }

        // Build the missing chain bottom-up, then hang it off the deepest
        // existing directory.
        let now = now();
        let mut chain = Node::directory(permission, &self.owner, now);
        for seg in segs[first + 1..].iter().rev() {
            let mut parent = Node::directory(permission, &self.owner, now);
            if let Some(children) = parent.children_mut() {
                children.insert(seg.clone(), chain);
            }
            chain = parent;
        }

        let parent = self
            .lookup_dir_mut(&segs[..first])
            .ok_or_else(|| Error::parent_not_found(join(&segs[..first])))?;
        parent.insert(segs[first].clone(), chain);
        Ok(true)
    }

    fn delete(&mut self, path: &Path, recursive: bool) -> Result<bool> {
        let segs = segments(path)?;
        let Some((name, parent_segs)) = segs.split_last() else {
            return Ok(false);
        };
        let Some(parent) = self.lookup_dir_mut(parent_segs) else {
            return Ok(false);
        };
        let Some(target) = parent.get(name) else {
            return Ok(false);
        };
        if !recursive && target.children().is_some_and(|c| !c.is_empty()) {
            return Err(Error::directory_not_empty(path));
        }
        _ = parent.remove(name);
        Ok(true)
    }

    fn missing_segments(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let segs = segments(path)?;
        let mut node = &self.root;
        for (i, seg) in segs.iter().enumerate() {
            match node.child(seg) {
                Some(child) if child.is_dir() => node = child,
                // mkdirs will refuse this path; it creates nothing.
                Some(_) => return Ok(Vec::new()),
                None => return Ok((i..segs.len()).map(|j| join(&segs[..=j])).collect()),
            }
        }
        Ok(Vec::new())
    }

    fn remove_empty_dir(&mut self, path: &Path) -> Result<()> {
        let segs = segments(path)?;
        let Some((name, parent_segs)) = segs.split_last() else {
            return Err(Error::Root);
        };
        let parent = self
            .lookup_dir_mut(parent_segs)
            .ok_or_else(|| Error::not_found(path))?;
        match parent.get(name).map(Node::children) {
            None => return Err(Error::not_found(path)),
            Some(None) => return Err(Error::not_a_directory(path)),
            Some(Some(children)) if !children.is_empty() => {
                return Err(Error::directory_not_empty(path));
            }
            Some(Some(_)) => {}
        }
        _ = parent.remove(name);
        Ok(())
    }

    fn restore(&mut self, path: &Path, node: Node) -> Result<()> {
        let segs = segments(path)?;
        let Some((name, parent_segs)) = segs.split_last() else {
            return Err(Error::Root);
        };
        let parent = self
            .lookup_dir_mut(parent_segs)
            .ok_or_else(|| Error::parent_not_found(join(parent_segs)))?;
        if parent.contains_key(name) {
            return Err(Error::already_exists(path));
        }
        _ = parent.insert(name.clone(), node);
        Ok(())
    }

    fn create_file(&mut self, path: &Path, permission: Permission, length: u64) -> Result<Vec<BlockRef>> {
        let segs = segments(path)?;
        let Some((_, parent_segs)) = segs.split_last() else {
            return Err(Error::Root);
        };
        match self.lookup(parent_segs) {
            Some(parent) if parent.is_dir() => {}
            Some(_) => return Err(Error::not_a_directory(join(parent_segs))),
            None => return Err(Error::parent_not_found(join(parent_segs))),
        }
        if self.lookup(&segs).is_some() {
            return Err(Error::already_exists(path));
        }

        let mut blocks = Vec::new();
        let mut left = length;
        while left > 0 {
            let len = left.min(DEFAULT_BLOCK_SIZE);
            blocks.push(BlockRef {
                id: self.next_block,
                len,
            });
            self.next_block += 1;
            left -= len;
        }

        let file = Node::file(permission, &self.owner, now(), blocks.clone());
        self.restore(path, file)?;
        Ok(blocks)
    }
}

#[async_trait]
impl Namespace for MemoryNamespace {
    async fn get_listing(
        &self,
        path: &Path,
        start_after: &[u8],
        need_location: bool,
    ) -> Result<DirectoryListing> {
        self.0
            .lock()
            .await
            .get_listing(path, start_after, need_location)
    }

    async fn mkdirs(
        &self,
        path: &Path,
        permission: Permission,
        create_parents: bool,
    ) -> Result<bool> {
        let result = self.0.lock().await.mkdirs(path, permission, create_parents);
        let path_str = path.to_string_lossy().to_string();
        log_debug!("mkdirs {path} ok={ok}", path: path_str.as_str(), ok: result.is_ok());
        result
    }

    async fn delete(&self, path: &Path, recursive: bool) -> Result<bool> {
        let result = self.0.lock().await.delete(path, recursive);
        let path_str = path.to_string_lossy().to_string();
        log_debug!("delete {path} ok={ok}", path: path_str.as_str(), ok: result.is_ok());
        result
    }

    async fn missing_segments(&self, path: &Path) -> Result<Vec<PathBuf>> {
        self.0.lock().await.missing_segments(path)
    }

    async fn snapshot(&self, path: &Path) -> Result<Option<Node>> {
        let state = self.0.lock().await;
        let segs = segments(path)?;
        Ok(state.lookup(&segs).cloned())
    }

    async fn remove_empty_dir(&self, path: &Path) -> Result<()> {
        self.0.lock().await.remove_empty_dir(path)
    }

    async fn restore(&self, path: &Path, node: Node) -> Result<()> {
        self.0.lock().await.restore(path, node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mkdirs_creates_missing_chain() {
        let ns = MemoryNamespace::new();
        assert_eq!(ns.mkdirs(Path::new("/a/b/c"), 0o750, true).await, Ok(true));

        let tree = ns.tree().await;
        let c = tree
            .child("a")
            .and_then(|a| a.child("b"))
            .and_then(|b| b.child("c"))
            .expect("chain created");
        assert_eq!(c.permission, 0o750);
        assert!(c.is_dir());
    }

    #[tokio::test]
    async fn test_mkdirs_without_parents() {
        let ns = MemoryNamespace::new();
        assert_eq!(
            ns.mkdirs(Path::new("/a/b"), 0o755, false).await,
            Err(Error::parent_not_found("/a"))
        );
        assert!(!ns.exists("/a").await);

        assert_eq!(ns.mkdirs(Path::new("/a"), 0o755, false).await, Ok(true));
        assert_eq!(ns.mkdirs(Path::new("/a"), 0o700, false).await, Ok(true));
        assert_eq!(ns.tree().await.child("a").map(|a| a.permission), Some(0o755));
    }

    #[tokio::test]
    async fn test_mkdirs_over_file() {
        let ns = MemoryNamespace::new();
        ns.create_file("/f", 0o644, 10).await.unwrap();
        assert_eq!(
            ns.mkdirs(Path::new("/f"), 0o755, true).await,
            Err(Error::already_exists("/f"))
        );
        assert_eq!(
            ns.mkdirs(Path::new("/f/g"), 0o755, true).await,
            Err(Error::not_a_directory("/f"))
        );
    }

    #[tokio::test]
    async fn test_missing_segments() {
        let ns = MemoryNamespace::new();
        ns.mkdirs(Path::new("/a"), 0o755, false).await.unwrap();

        let missing = ns.missing_segments(Path::new("/a/b/c")).await.unwrap();
        assert_eq!(missing, vec![PathBuf::from("/a/b"), PathBuf::from("/a/b/c")]);
        assert!(ns.missing_segments(Path::new("/a")).await.unwrap().is_empty());
        assert!(ns.missing_segments(Path::new("/")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let ns = MemoryNamespace::new();
        ns.mkdirs(Path::new("/a/b"), 0o755, true).await.unwrap();

        assert_eq!(ns.delete(Path::new("/missing"), true).await, Ok(false));
        assert_eq!(ns.delete(Path::new("/"), true).await, Ok(false));
        assert_eq!(
            ns.delete(Path::new("/a"), false).await,
            Err(Error::directory_not_empty("/a"))
        );
        assert_eq!(ns.delete(Path::new("/a"), true).await, Ok(true));
        assert!(!ns.exists("/a").await);
    }

    #[tokio::test]
    async fn test_snapshot_restore() {
        let ns = MemoryNamespace::new();
        ns.mkdirs(Path::new("/d/e"), 0o711, true).await.unwrap();
        ns.create_file("/d/e/f", 0o600, DEFAULT_BLOCK_SIZE + 1).await.unwrap();
        let before = ns.tree().await;

        let snap = ns.snapshot(Path::new("/d")).await.unwrap().expect("exists");
        assert_eq!(snap.count(), 3);
        assert!(ns.delete(Path::new("/d"), true).await.unwrap());

        ns.restore(Path::new("/d"), snap.clone()).await.unwrap();
        assert_eq!(ns.tree().await, before);
        assert_eq!(
            ns.restore(Path::new("/d"), snap).await,
            Err(Error::already_exists("/d"))
        );
    }

    #[tokio::test]
    async fn test_remove_empty_dir() {
        let ns = MemoryNamespace::new();
        ns.mkdirs(Path::new("/a/b"), 0o755, true).await.unwrap();

        assert_eq!(
            ns.remove_empty_dir(Path::new("/a")).await,
            Err(Error::directory_not_empty("/a"))
        );
        ns.remove_empty_dir(Path::new("/a/b")).await.unwrap();
        ns.remove_empty_dir(Path::new("/a")).await.unwrap();
        assert_eq!(
            ns.remove_empty_dir(Path::new("/a")).await,
            Err(Error::not_found("/a"))
        );
        assert_eq!(ns.remove_empty_dir(Path::new("/")).await, Err(Error::Root));
    }

    #[tokio::test]
    async fn test_create_file_blocks() {
        let ns = MemoryNamespace::new();
        let blocks = ns
            .create_file("/big", 0o644, 2 * DEFAULT_BLOCK_SIZE + 3)
            .await
            .unwrap();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[2].len, 3);

        let empty = ns.create_file("/empty", 0o644, 0).await.unwrap();
        assert!(empty.is_empty());
        assert_eq!(
            ns.create_file("/nodir/f", 0o644, 1).await,
            Err(Error::parent_not_found("/nodir"))
        );
    }
}
