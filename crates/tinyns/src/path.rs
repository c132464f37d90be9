// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Split an absolute namespace path into its named segments.
///
/// `/` yields no segments. Relative paths, `..` and platform prefixes are
/// rejected since the namespace has no working directory to resolve them
/// against.
pub fn segments(path: &Path) -> Result<Vec<String>> {
    if !path.has_root() {
        return Err(Error::invalid_path(path));
    }

    let mut out = Vec::new();
    for component in path.components() {
        match component {
            Component::RootDir | Component::CurDir => continue,
            Component::ParentDir | Component::Prefix(_) => {
                return Err(Error::invalid_path(path));
            }
            Component::Normal(name) => {
                let name = name.to_str().ok_or_else(|| Error::invalid_path(path))?;
                out.push(name.to_string());
            }
        }
    }
    Ok(out)
}

/// Rebuild an absolute path from segments.
#[must_use]
pub fn join(segments: &[String]) -> PathBuf {
    let mut path = PathBuf::from("/");
    for segment in segments {
        path.push(segment);
    }
    path
}
