// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Request and reply payloads exchanged with the checker
//!
//! Both are JSON objects. A request names its operation in `op`; a reply
//! carries exactly one of `directory_listing`, `success` or `exception`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tinyns::Permission;

use crate::error::{Error, Result};
use crate::record::OpKind;

const DEFAULT_PERMISSION: Permission = 0o755;

fn default_permission() -> Permission {
    DEFAULT_PERMISSION
}

/// Request as it appears on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireRequest {
    op: String,
    path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    start_after: Vec<u8>,
    #[serde(default)]
    need_location: bool,
    #[serde(default = "default_permission")]
    permission: Permission,
    #[serde(default)]
    create_parents: bool,
    #[serde(default)]
    recursive: bool,
}

/// A mutation, which must go through the write lock and the undo log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    MakeDirectory {
        path: PathBuf,
        permission: Permission,
        create_parents: bool,
    },
    Remove {
        path: PathBuf,
        recursive: bool,
    },
}

impl WriteOp {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            WriteOp::MakeDirectory { path, .. } | WriteOp::Remove { path, .. } => path,
        }
    }

    #[must_use]
    pub fn kind(&self) -> OpKind {
        match self {
            WriteOp::MakeDirectory { .. } => OpKind::MakeDirectory,
            WriteOp::Remove { .. } => OpKind::Remove,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    List {
        path: PathBuf,
        start_after: Vec<u8>,
        need_location: bool,
    },
    Write(WriteOp),
}

impl Request {
    pub fn list<P: AsRef<Path>>(path: P, start_after: &[u8], need_location: bool) -> Self {
        Request::List {
            path: path.as_ref().to_path_buf(),
            start_after: start_after.to_vec(),
            need_location,
        }
    }

    pub fn mkdir<P: AsRef<Path>>(path: P, permission: Permission, create_parents: bool) -> Self {
        Request::Write(WriteOp::MakeDirectory {
            path: path.as_ref().to_path_buf(),
            permission,
            create_parents,
        })
    }

    pub fn remove<P: AsRef<Path>>(path: P, recursive: bool) -> Self {
        Request::Write(WriteOp::Remove {
            path: path.as_ref().to_path_buf(),
            recursive,
        })
    }

    #[must_use]
    pub fn kind(&self) -> OpKind {
        match self {
            Request::List { .. } => OpKind::List,
            Request::Write(op) => op.kind(),
        }
    }

    /// Decode a request. Malformed JSON is `Error::Parse`; a well-formed
    /// request naming an operation we do not serve is
    /// `Error::UnknownOperation`.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let wire: WireRequest = serde_json::from_slice(raw)?;
        let kind = OpKind::from_wire(&wire.op).ok_or(Error::UnknownOperation(wire.op))?;
        let path = PathBuf::from(wire.path);

        Ok(match kind {
            OpKind::List => Request::List {
                path,
                start_after: wire.start_after,
                need_location: wire.need_location,
            },
            OpKind::MakeDirectory => Request::Write(WriteOp::MakeDirectory {
                path,
                permission: wire.permission,
                create_parents: wire.create_parents,
            }),
            OpKind::Remove => Request::Write(WriteOp::Remove {
                path,
                recursive: wire.recursive,
            }),
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut wire = WireRequest {
            op: self.kind().as_str().to_string(),
            path: String::new(),
            start_after: Vec::new(),
            need_location: false,
            permission: DEFAULT_PERMISSION,
            create_parents: false,
            recursive: false,
        };
        match self {
            Request::List {
                path,
                start_after,
                need_location,
            } => {
                wire.path = path.to_string_lossy().into_owned();
                wire.start_after = start_after.clone();
                wire.need_location = *need_location;
            }
            Request::Write(WriteOp::MakeDirectory {
                path,
                permission,
                create_parents,
            }) => {
                wire.path = path.to_string_lossy().into_owned();
                wire.permission = *permission;
                wire.create_parents = *create_parents;
            }
            Request::Write(WriteOp::Remove { path, recursive }) => {
                wire.path = path.to_string_lossy().into_owned();
                wire.recursive = *recursive;
            }
        }
        Ok(serde_json::to_vec(&wire)?)
    }
}

/// Reply to a replica upcall
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reply {
    /// serde_json encoding of a `tinyns::DirectoryListing`
    DirectoryListing(Vec<u8>),
    Success(bool),
    Exception(String),
}

impl Reply {
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_else(|e| {
            format!("{{\"exception\":{:?}}}", format!("cannot encode reply: {e}")).into_bytes()
        })
    }

    pub fn decode(raw: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(raw)?)
    }

    /// Decode the listing carried by a `DirectoryListing` reply.
    pub fn listing(&self) -> Option<Result<tinyns::DirectoryListing>> {
        match self {
            Reply::DirectoryListing(bytes) => {
                Some(serde_json::from_slice(bytes).map_err(Error::from))
            }
            _ => None,
        }
    }
}
