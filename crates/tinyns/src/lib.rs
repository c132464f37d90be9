// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Tiny namespace: directory/file metadata with the undo primitives an
//! upcall layer needs to reverse its own mutations.

mod error;
mod listing;
mod memory;
mod namespace;
mod node;
mod path;

pub use error::{Error, Result};
pub use listing::{DirectoryListing, FileStatus};
pub use memory::{DEFAULT_LISTING_LIMIT, MemoryNamespace};
pub use namespace::Namespace;
pub use node::{BlockRef, Body, DEFAULT_BLOCK_SIZE, Node, NodeKind, Permission};
pub use path::{join, segments};

#[cfg(test)]
mod tests;
