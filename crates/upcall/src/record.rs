// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Undo records: one reversible mutation each

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tinyns::{Namespace, Node};

/// Position of an operation in the externally agreed order
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpNum(i64);

impl OpNum {
    #[must_use]
    pub const fn new(n: i64) -> Self {
        Self(n)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for OpNum {
    fn from(n: i64) -> Self {
        Self(n)
    }
}

impl std::fmt::Display for OpNum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operation kinds a replica upcall can request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
    List,
    MakeDirectory,
    Remove,
}

impl OpKind {
    /// Name used on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OpKind::List => "LIST",
            OpKind::MakeDirectory => "MAKE_DIRECTORY",
            OpKind::Remove => "REMOVE",
        }
    }

    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "LIST" => Some(OpKind::List),
            "MAKE_DIRECTORY" => Some(OpKind::MakeDirectory),
            "REMOVE" => Some(OpKind::Remove),
            _ => None,
        }
    }
}

/// What it takes to put the namespace back the way it was
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reversal {
    /// Directories that mkdirs brought into existence, shallowest first.
    RemoveCreated { created: Vec<PathBuf> },
    /// The subtree a delete took away; `None` if the delete removed nothing.
    RestoreDeleted { subtree: Option<Node> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UndoRecord {
    pub opnum: OpNum,
    pub path: PathBuf,
    pub reversal: Reversal,
}

impl UndoRecord {
    pub fn new<P: AsRef<Path>>(opnum: OpNum, path: P, reversal: Reversal) -> Self {
        Self {
            opnum,
            path: path.as_ref().to_path_buf(),
            reversal,
        }
    }

    #[must_use]
    pub fn kind(&self) -> OpKind {
        match self.reversal {
            Reversal::RemoveCreated { .. } => OpKind::MakeDirectory,
            Reversal::RestoreDeleted { .. } => OpKind::Remove,
        }
    }

    /// Reverse this record's mutation.
    ///
    /// Assumes every later mutation has already been reversed, so the
    /// namespace around `path` looks exactly as it did right after this one.
    pub async fn undo(&self, ns: &dyn Namespace) -> tinyns::Result<()> {
        match &self.reversal {
            Reversal::RemoveCreated { created } => {
                // Deepest first: each one is empty once its child is gone.
                // One already gone was removed by an earlier, partial attempt.
                for dir in created.iter().rev() {
                    match ns.remove_empty_dir(dir).await {
                        Ok(()) | Err(tinyns::Error::NotFound(_)) => {}
                        Err(e) => return Err(e),
                    }
                }
                Ok(())
            }
            Reversal::RestoreDeleted {
                subtree: Some(node),
            } => ns.restore(&self.path, node.clone()).await,
            Reversal::RestoreDeleted { subtree: None } => Ok(()),
        }
    }
}
