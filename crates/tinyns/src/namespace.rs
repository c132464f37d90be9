// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::listing::DirectoryListing;
use crate::node::{Node, Permission};

/// The namespace service as seen by the upcall layer.
///
/// The first three methods are the operations replicas execute. The rest
/// are the pre-image and reversal primitives needed to undo them: they let
/// a caller find out what a mutation is about to change and put it back
/// afterwards.
#[async_trait]
pub trait Namespace: Send + Sync {
    /// List a directory, starting strictly after `start_after` (empty for
    /// the first page). Listing a file yields just that file.
    async fn get_listing(
        &self,
        path: &Path,
        start_after: &[u8],
        need_location: bool,
    ) -> Result<DirectoryListing>;

    /// Create a directory. Succeeds without change if it already exists.
    async fn mkdirs(&self, path: &Path, permission: Permission, create_parents: bool)
    -> Result<bool>;

    /// Delete a path. Returns `false` if there was nothing to delete.
    async fn delete(&self, path: &Path, recursive: bool) -> Result<bool>;

    /// Prefixes of `path`, shallowest first, that do not currently exist.
    async fn missing_segments(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Capture the subtree rooted at `path`, or `None` if nothing is there.
    async fn snapshot(&self, path: &Path) -> Result<Option<Node>>;

    /// Remove a directory that has no entries.
    async fn remove_empty_dir(&self, path: &Path) -> Result<()>;

    /// Put a captured subtree back at `path`. The parent must exist and the
    /// name must be free.
    async fn restore(&self, path: &Path, node: Node) -> Result<()>;
}
