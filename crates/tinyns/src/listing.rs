// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::node::{BlockRef, Node, NodeKind, Permission};

/// Status of one entry as reported by a listing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStatus {
    pub name: String,
    pub kind: NodeKind,
    pub length: u64,
    pub permission: Permission,
    pub owner: String,
    pub modification_time: i64,
    pub access_time: i64,
    pub children_num: usize,
    /// Block references, present only when locations were requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<BlockRef>>,
}

impl FileStatus {
    pub(crate) fn from_node(name: &str, node: &Node, need_location: bool) -> Self {
        Self {
            name: name.to_string(),
            kind: node.kind(),
            length: node.length(),
            permission: node.permission,
            owner: node.owner.clone(),
            modification_time: node.modification_time,
            access_time: node.access_time,
            children_num: node.children().map_or(0, |c| c.len()),
            locations: (need_location && !node.is_dir()).then(|| node.blocks().to_vec()),
        }
    }

    /// Clear the times, which differ between replicas applying the same operation.
    pub fn void_timestamps(&mut self) {
        self.modification_time = 0;
        self.access_time = 0;
    }
}

/// One page of a directory listing
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryListing {
    pub partial_listing: Vec<FileStatus>,
    pub remaining_entries: usize,
}

impl DirectoryListing {
    pub fn void_timestamps(&mut self) {
        for status in &mut self.partial_listing {
            status.void_timestamps();
        }
    }

    /// Name of the last entry, to pass as `start_after` for the next page.
    #[must_use]
    pub fn last_name(&self) -> Option<&[u8]> {
        self.partial_listing.last().map(|s| s.name.as_bytes())
    }

    #[must_use]
    pub fn has_more(&self) -> bool {
        self.remaining_entries > 0
    }
}
