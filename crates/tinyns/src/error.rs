// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

pub type Result<T> = std::result::Result<T, Error>;

/// Represents errors that can occur in namespace operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Path not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Parent directory does not exist: {}", .0.display())]
    ParentNotFound(PathBuf),

    #[error("Entry already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Directory is not empty: {}", .0.display())]
    DirectoryNotEmpty(PathBuf),

    #[error("Invalid path: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error("Root directory cannot be modified")]
    Root,
}

impl Error {
    pub fn not_found<P: AsRef<Path>>(path: P) -> Self {
        Error::NotFound(path.as_ref().to_path_buf())
    }

    pub fn not_a_directory<P: AsRef<Path>>(path: P) -> Self {
        Error::NotADirectory(path.as_ref().to_path_buf())
    }

    pub fn parent_not_found<P: AsRef<Path>>(path: P) -> Self {
        Error::ParentNotFound(path.as_ref().to_path_buf())
    }

    pub fn already_exists<P: AsRef<Path>>(path: P) -> Self {
        Error::AlreadyExists(path.as_ref().to_path_buf())
    }

    pub fn directory_not_empty<P: AsRef<Path>>(path: P) -> Self {
        Error::DirectoryNotEmpty(path.as_ref().to_path_buf())
    }

    pub fn invalid_path<P: AsRef<Path>>(path: P) -> Self {
        Error::InvalidPath(path.as_ref().to_path_buf())
    }
}
